//! Declarative schema management for relational databases.
//!
//! You describe the schema you want; purlin compares it against what a
//! database actually has and produces the minimal ordered set of DDL
//! operations to converge the two. Applying the delta and diffing again
//! reports no difference.
//!
//! The pipeline:
//!
//! - declared text -> [`parse::load_schema`] -> canonical [`Schema`]
//! - live database -> [`introspect`] (through an [`Adapter`]) -> canonical [`Schema`]
//! - [`Differ::diff`] -> [`Delta`] (ordered operations + warnings)
//! - [`Delta::migrate`] -> operations applied through the [`Adapter`], in
//!   order, fail-fast
//!
//! Schemas are immutable once built and a delta is a pure function of
//! `(current, desired, options)`, so the whole pipeline is repeatable and
//! deterministic.
//!
//! # Example
//!
//! ```
//! use purlin::{DiffOptions, Differ, MemoryAdapter, ParseOptions, load_schema};
//!
//! let desired = load_schema(
//!     r#"
//! create_table "users" do |t|
//!   t.string "email", null: false
//! end
//! "#,
//!     &ParseOptions::default(),
//! )?;
//!
//! let differ = Differ::new(DiffOptions::default());
//! let mut adapter = MemoryAdapter::default();
//!
//! let delta = differ.diff(&purlin::introspect(&adapter)?, &desired);
//! assert!(delta.differ());
//! delta.migrate(&mut adapter)?;
//!
//! // Converged: the same diff is now empty.
//! let delta = differ.diff(&purlin::introspect(&adapter)?, &desired);
//! assert!(!delta.differ());
//! # Ok::<(), purlin::Error>(())
//! ```
//!
//! No driver ships in this crate: engines plug in by implementing
//! [`Adapter`]. [`MemoryAdapter`] applies DDL to an in-process schema and
//! backs tests and dry runs.

mod adapter;
mod delta;
mod diff;
mod dump;
mod error;
mod introspect;
mod migrate;
pub mod parse;
mod report;
pub mod schema;

pub use adapter::{Adapter, AdapterError, Dialect, MemoryAdapter};
pub use delta::{Delta, Operation};
pub use diff::{DiffOptions, Differ};
pub use dump::{DumpOptions, dump};
pub use error::Error;
pub use introspect::introspect;
pub use parse::{ParseOptions, load_schema};
pub use report::{CollectingReporter, Reporter, TracingReporter, Warning};
pub use schema::{
    Column, ColumnType, DefaultValue, ForeignKey, Index, IndexMethod, RefAction, Schema, Table,
    TableOptions,
};
