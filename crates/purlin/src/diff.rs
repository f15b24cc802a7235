//! Schema diffing - compare a desired schema against the current one.
//!
//! The differ takes two canonical [`Schema`]s and produces a [`Delta`]: the
//! ordered operations that transform `current` into `desired`. It mutates
//! nothing; both schemas are normalized copies and the delta is a pure
//! function of `(current, desired, options)` - diffing the same inputs
//! twice yields byte-identical scripts.

use crate::adapter::Dialect;
use crate::delta::{Delta, Operation};
use crate::report::{Reporter, TracingReporter, Warning};
use crate::schema::{Schema, Table};

/// Configuration for a diff run.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Fold consecutive same-table alterations into one composite statement
    pub bulk_change: bool,
    /// Integer limit assumed when a column doesn't specify one
    pub default_int_limit: Option<u32>,
    /// Swap current/desired before diffing (computes the downgrade delta)
    pub reverse: bool,
    /// When dumping a snapshot, spell out auto-generated foreign-key names
    pub dump_with_default_fk_name: bool,
    /// Dialect quirks of the engine being targeted
    pub dialect: Dialect,
}

static DEFAULT_REPORTER: TracingReporter = TracingReporter;

/// Computes deltas between two schemas.
///
/// Warnings go to the injected [`Reporter`]; the default logs through
/// `tracing`.
pub struct Differ<'r> {
    options: DiffOptions,
    reporter: &'r dyn Reporter,
}

impl Differ<'static> {
    pub fn new(options: DiffOptions) -> Self {
        Differ {
            options,
            reporter: &DEFAULT_REPORTER,
        }
    }
}

impl<'r> Differ<'r> {
    pub fn with_reporter(options: DiffOptions, reporter: &'r dyn Reporter) -> Differ<'r> {
        Differ { options, reporter }
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    /// Compare `current` against `desired` and return the delta that
    /// converges them.
    pub fn diff(&self, current: &Schema, desired: &Schema) -> Delta {
        let (current, desired) = if self.options.reverse {
            (desired, current)
        } else {
            (current, desired)
        };

        let dialect = &self.options.dialect;
        let current = current.normalized(dialect, self.options.default_int_limit);
        let desired = desired.normalized(dialect, self.options.default_int_limit);

        let mut ops: Vec<Operation> = Vec::new();
        let mut warnings: Vec<Warning> = Vec::new();

        // Tables only in desired: create, then indexes and foreign keys as
        // separate operations (ordering pushes dependent FK adds last).
        for table in desired.tables() {
            if current.has_table(&table.name) {
                continue;
            }
            let mut created = table.clone();
            let indexes = std::mem::take(&mut created.indexes);
            let foreign_keys = std::mem::take(&mut created.foreign_keys);
            ops.push(Operation::CreateTable { table: created });
            for index in indexes {
                ops.push(Operation::AddIndex {
                    table: table.name.clone(),
                    index,
                });
            }
            for fk in foreign_keys {
                ops.push(Operation::AddForeignKey { fk });
            }
        }

        // Tables only in current.
        for table in current.tables() {
            if !desired.has_table(&table.name) {
                ops.push(Operation::DropTable {
                    table: table.name.clone(),
                });
            }
        }

        // Tables in both: columns, indexes, foreign keys, then options.
        for des_table in desired.tables() {
            let Some(cur_table) = current.table(&des_table.name) else {
                continue;
            };
            let before = ops.len();
            diff_columns(cur_table, des_table, &mut ops);
            diff_indexes(cur_table, des_table, &mut ops);
            diff_foreign_keys(cur_table, des_table, &mut ops);
            let structural = ops.len() > before;

            if cur_table.options != des_table.options {
                if structural {
                    ops.push(Operation::ChangeTableOptions {
                        table: des_table.name.clone(),
                        from: cur_table.options.clone(),
                        to: des_table.options.clone(),
                    });
                } else {
                    // Option-only difference: never an operation, exactly
                    // one warning with both maps.
                    let warning = Warning {
                        table: des_table.name.clone(),
                        from: cur_table.options.clone(),
                        to: des_table.options.clone(),
                    };
                    self.reporter.warn(&warning);
                    warnings.push(warning);
                }
            }
        }

        Delta::build(ops, warnings, self.options.bulk_change, dialect)
    }
}

/// Column diff by name: removals in current order first, then additions and
/// changes following desired's declaration order.
fn diff_columns(current: &Table, desired: &Table, ops: &mut Vec<Operation>) {
    for column in &current.columns {
        if desired.column(&column.name).is_none() {
            ops.push(Operation::RemoveColumn {
                table: desired.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    for column in &desired.columns {
        match current.column(&column.name) {
            None => ops.push(Operation::AddColumn {
                table: desired.name.clone(),
                column: column.clone(),
            }),
            Some(existing) if !existing.same_structure(column) => {
                ops.push(Operation::ChangeColumn {
                    table: desired.name.clone(),
                    column: column.clone(),
                });
            }
            Some(_) => {}
        }
    }
}

/// Index diff by identity key. Indexes are never altered in place: a
/// changed index is a removal followed by an addition.
fn diff_indexes(current: &Table, desired: &Table, ops: &mut Vec<Operation>) {
    for index in &current.indexes {
        let key = index.identity_key();
        match desired.index_by_key(&key) {
            Some(counterpart) if counterpart == index => {}
            _ => ops.push(Operation::RemoveIndex {
                table: desired.name.clone(),
                index: index.clone(),
            }),
        }
    }

    for index in &desired.indexes {
        let key = index.identity_key();
        match current.index_by_key(&key) {
            Some(counterpart) if counterpart == index => {}
            _ => ops.push(Operation::AddIndex {
                table: desired.name.clone(),
                index: index.clone(),
            }),
        }
    }
}

/// Foreign-key diff by resolved name; like indexes, any attribute change is
/// a removal plus an addition.
fn diff_foreign_keys(current: &Table, desired: &Table, ops: &mut Vec<Operation>) {
    for fk in &current.foreign_keys {
        match desired.foreign_key(&fk.name) {
            Some(counterpart) if counterpart.same_structure(fk) => {}
            _ => ops.push(Operation::RemoveForeignKey { fk: fk.clone() }),
        }
    }

    for fk in &desired.foreign_keys {
        match current.foreign_key(&fk.name) {
            Some(counterpart) if counterpart.same_structure(fk) => {}
            _ => ops.push(Operation::AddForeignKey { fk: fk.clone() }),
        }
    }
}
