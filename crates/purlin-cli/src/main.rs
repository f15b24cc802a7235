//! The `purlin` command: diff, validate and re-render declared schemas.
//!
//! Every command is file-based. Real database engines plug in through the
//! library's `Adapter` trait; `diff --apply` runs the delta against an
//! in-memory adapter seeded with the current file, which makes it a full
//! dry run of the migration.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use purlin::{
    Dialect, DiffOptions, Differ, DumpOptions, MemoryAdapter, ParseOptions, Schema, dump,
    introspect, load_schema,
};
use tracing_subscriber::EnvFilter;

/// Declarative schema management - diff a declared schema against another
/// and converge them.
#[derive(Parser, Debug)]
#[command(name = "purlin", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff two declared schema files and print the migration script
    Diff {
        /// The current schema
        current: PathBuf,
        /// The desired schema
        desired: PathBuf,
        /// Swap current/desired (compute the downgrade delta)
        #[arg(long)]
        reverse: bool,
        /// Fold consecutive same-table alterations into one statement
        #[arg(long)]
        bulk_change: bool,
        /// Integer limit assumed when a column doesn't specify one
        #[arg(long)]
        default_int_limit: Option<u32>,
        /// Target dialect: postgresql (default) or mysql
        #[arg(long)]
        dialect: Option<String>,
        /// Apply the delta to an in-memory copy and print the converged dump
        #[arg(long)]
        apply: bool,
    },
    /// Parse and validate a declared schema file
    Check {
        file: PathBuf,
    },
    /// Parse a declared schema file and re-render its canonical form
    Export {
        file: PathBuf,
        /// Spell out auto-generated foreign-key names
        #[arg(long)]
        with_default_fk_name: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{} {}", "error:".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = config::load().map_err(|e| e.to_string())?;

    match cli.command {
        Commands::Diff {
            current,
            desired,
            reverse,
            bulk_change,
            default_int_limit,
            dialect,
            apply,
        } => {
            let dialect = parse_dialect(dialect.as_deref().or(config.dialect.as_deref()))?;
            let options = DiffOptions {
                bulk_change: bulk_change || config.bulk_change,
                default_int_limit: default_int_limit.or(config.default_int_limit),
                reverse,
                dump_with_default_fk_name: config.dump_with_default_fk_name,
                dialect,
            };
            let parse_options = ParseOptions {
                default_fk_name: options.dump_with_default_fk_name,
            };

            let current = load_file(&current, &parse_options)?;
            let desired = load_file(&desired, &parse_options)?;

            let differ = Differ::new(options.clone());
            let delta = differ.diff(&current, &desired);

            for warning in delta.warnings() {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }

            if !delta.differ() {
                eprintln!("{}", "No changes detected.".dimmed());
                return Ok(());
            }

            for op in delta.operations() {
                let line = op.to_string();
                let colored = match line.as_bytes().first() {
                    Some(b'+') => line.green().to_string(),
                    Some(b'-') => line.red().to_string(),
                    _ => line.yellow().to_string(),
                };
                eprintln!("{colored}");
            }
            println!("{}", delta.script());

            if apply {
                let seed = if options.reverse { &desired } else { &current };
                let mut adapter =
                    MemoryAdapter::new(options.dialect.clone()).with_schema(seed.clone());
                delta.migrate(&mut adapter).map_err(|e| e.to_string())?;
                let converged = introspect(&adapter).map_err(|e| e.to_string())?;
                println!();
                println!(
                    "{}",
                    dump(
                        &converged,
                        &DumpOptions {
                            with_default_fk_name: options.dump_with_default_fk_name,
                        }
                    )
                );
            }
            Ok(())
        }
        Commands::Check { file } => {
            let schema = load_file(&file, &ParseOptions::default())?;
            let columns: usize = schema.tables().map(|t| t.columns.len()).sum();
            let fks: usize = schema.tables().map(|t| t.foreign_keys.len()).sum();
            eprintln!(
                "{} {} tables, {columns} columns, {fks} foreign keys",
                "ok:".green().bold(),
                schema.len(),
            );
            Ok(())
        }
        Commands::Export {
            file,
            with_default_fk_name,
        } => {
            let parse_options = ParseOptions {
                default_fk_name: with_default_fk_name || config.dump_with_default_fk_name,
            };
            let schema = load_file(&file, &parse_options)?;
            print!(
                "{}",
                dump(
                    &schema,
                    &DumpOptions {
                        with_default_fk_name: with_default_fk_name
                            || config.dump_with_default_fk_name,
                    }
                )
            );
            Ok(())
        }
    }
}

fn parse_dialect(name: Option<&str>) -> Result<Dialect, String> {
    match name {
        None | Some("postgresql") | Some("postgres") => Ok(Dialect::postgres()),
        Some("mysql") => Ok(Dialect::mysql()),
        Some(other) => Err(format!("unknown dialect `{other}`")),
    }
}

fn load_file(path: &Path, options: &ParseOptions) -> Result<Schema, String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    load_schema(&source, options).map_err(|e| format!("{}: {e}", path.display()))
}
