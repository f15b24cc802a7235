use crate::adapter::AdapterError;
use thiserror::Error;

/// Errors raised while loading a declared schema or applying a delta.
///
/// The validation variants keep their exact message texts stable; callers
/// match on them for compatibility.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Foreign Key `{table}({name})` already defined")]
    DuplicateForeignKey { table: String, name: String },

    #[error("Foreign key name in `{table}` is undefined")]
    UndefinedForeignKeyName { table: String },

    #[error("Table `{table}` to create the foreign key is not defined: {name}")]
    OrphanForeignKey { table: String, name: String },

    #[error("Table `{0}` already defined")]
    DuplicateTable(String),

    #[error("Table `{0}` is not defined")]
    UnknownTable(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
