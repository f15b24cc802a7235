//! The adapter seam: everything engine-specific lives behind [`Adapter`].
//!
//! The core never talks to a driver. It introspects through the read half
//! of this trait and applies DDL through the write half; a concrete adapter
//! (postgres, mysql, ...) maps each call onto one statement. [`MemoryAdapter`]
//! is the in-process implementation used by tests and dry runs.

use thiserror::Error;

use crate::delta::Operation;
use crate::schema::{Column, ForeignKey, Index, Schema, Table, TableOptions};

/// Errors surfaced by an adapter while introspecting or executing DDL.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error("column '{table}.{column}' already exists")]
    ColumnAlreadyExists { table: String, column: String },

    #[error("column '{table}.{column}' does not exist")]
    ColumnNotFound { table: String, column: String },

    #[error("index '{key}' already exists on '{table}'")]
    IndexAlreadyExists { table: String, key: String },

    #[error("index '{key}' does not exist on '{table}'")]
    IndexNotFound { table: String, key: String },

    #[error("foreign key '{name}' already exists on '{table}'")]
    ForeignKeyAlreadyExists { table: String, name: String },

    #[error("foreign key '{name}' does not exist on '{table}'")]
    ForeignKeyNotFound { table: String, name: String },

    #[error("table '{table}' is still referenced by foreign key '{name}'")]
    TableReferenced { table: String, name: String },

    #[error("operation not supported inside alter table: {0}")]
    UnsupportedBulkOperation(String),

    #[error("{0}")]
    Execution(String),
}

/// Engine identity and dialect quirks, as reported by an adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    /// Engine name, e.g. `postgresql`
    pub engine: String,
    /// Whether unsigned integer columns exist in this engine
    pub supports_unsigned: bool,
    /// Byte limit assumed for an integer column that doesn't specify one
    pub default_int_limit: u32,
    /// Whether a bulk alter-table can also carry index/foreign-key changes
    pub bulk_alter_includes_indexes: bool,
    /// Whether DDL runs inside transactions
    pub transactional_ddl: bool,
    /// Whether the engine auto-names unnamed foreign keys
    pub auto_fk_names: bool,
}

impl Dialect {
    pub fn postgres() -> Self {
        Dialect {
            engine: "postgresql".into(),
            supports_unsigned: false,
            default_int_limit: 4,
            bulk_alter_includes_indexes: false,
            transactional_ddl: true,
            auto_fk_names: true,
        }
    }

    pub fn mysql() -> Self {
        Dialect {
            engine: "mysql".into(),
            supports_unsigned: true,
            default_int_limit: 4,
            bulk_alter_includes_indexes: true,
            transactional_ddl: false,
            auto_fk_names: true,
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::postgres()
    }
}

/// Per-engine introspection and DDL execution capability.
///
/// Read methods feed the snapshot extractor; write methods each correspond
/// to exactly one delta operation kind. The provided `alter_table` unrolls a
/// bulk group into single calls; adapters whose engine has a real multi-part
/// `ALTER TABLE` override it with a one-statement implementation.
pub trait Adapter {
    fn dialect(&self) -> Dialect;

    fn tables(&self) -> Result<Vec<String>, AdapterError>;
    fn columns(&self, table: &str) -> Result<Vec<Column>, AdapterError>;
    fn indexes(&self, table: &str) -> Result<Vec<Index>, AdapterError>;
    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, AdapterError>;
    fn table_options(&self, table: &str) -> Result<TableOptions, AdapterError>;

    fn create_table(&mut self, table: &Table) -> Result<(), AdapterError>;
    fn drop_table(&mut self, table: &str) -> Result<(), AdapterError>;
    fn add_column(&mut self, table: &str, column: &Column) -> Result<(), AdapterError>;
    fn remove_column(&mut self, table: &str, column: &str) -> Result<(), AdapterError>;
    fn change_column(&mut self, table: &str, column: &Column) -> Result<(), AdapterError>;
    fn add_index(&mut self, table: &str, index: &Index) -> Result<(), AdapterError>;
    fn remove_index(&mut self, table: &str, index: &Index) -> Result<(), AdapterError>;
    fn add_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), AdapterError>;
    fn remove_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), AdapterError>;
    fn change_table_options(
        &mut self,
        table: &str,
        options: &TableOptions,
    ) -> Result<(), AdapterError>;

    /// Apply a bulk group of per-table operations.
    fn alter_table(&mut self, table: &str, ops: &[Operation]) -> Result<(), AdapterError> {
        for op in ops {
            match op {
                Operation::AddColumn { column, .. } => self.add_column(table, column)?,
                Operation::RemoveColumn { column, .. } => self.remove_column(table, column)?,
                Operation::ChangeColumn { column, .. } => self.change_column(table, column)?,
                Operation::AddIndex { index, .. } => self.add_index(table, index)?,
                Operation::RemoveIndex { index, .. } => self.remove_index(table, index)?,
                Operation::AddForeignKey { fk } => self.add_foreign_key(fk)?,
                Operation::RemoveForeignKey { fk } => self.remove_foreign_key(fk)?,
                other => {
                    return Err(AdapterError::UnsupportedBulkOperation(
                        other.kind_name().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// An adapter over an owned in-process [`Schema`].
///
/// Applies every DDL operation to the schema it holds and introspects it
/// back out, with the same existence checks a real engine would enforce.
/// Dropping a table that another table still references is an error, which
/// makes ordering bugs fail loudly in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    schema: Schema,
    dialect: Dialect,
}

impl MemoryAdapter {
    pub fn new(dialect: Dialect) -> Self {
        MemoryAdapter {
            schema: Schema::new(),
            dialect,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    fn table(&self, name: &str) -> Result<&Table, AdapterError> {
        self.schema
            .table(name)
            .ok_or_else(|| AdapterError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, AdapterError> {
        self.schema
            .table_mut(name)
            .ok_or_else(|| AdapterError::TableNotFound(name.to_string()))
    }
}

impl Adapter for MemoryAdapter {
    fn dialect(&self) -> Dialect {
        self.dialect.clone()
    }

    fn tables(&self) -> Result<Vec<String>, AdapterError> {
        Ok(self.schema.tables().map(|t| t.name.clone()).collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>, AdapterError> {
        Ok(self.table(table)?.columns.clone())
    }

    fn indexes(&self, table: &str) -> Result<Vec<Index>, AdapterError> {
        Ok(self.table(table)?.indexes.clone())
    }

    fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, AdapterError> {
        Ok(self.table(table)?.foreign_keys.clone())
    }

    fn table_options(&self, table: &str) -> Result<TableOptions, AdapterError> {
        Ok(self.table(table)?.options.clone())
    }

    fn create_table(&mut self, table: &Table) -> Result<(), AdapterError> {
        if self.schema.has_table(&table.name) {
            return Err(AdapterError::TableAlreadyExists(table.name.clone()));
        }
        let mut stored = table.clone();
        for (position, column) in stored.columns.iter_mut().enumerate() {
            column.position = position as u32;
        }
        self.schema
            .insert_table(stored)
            .map_err(|e| AdapterError::Execution(e.to_string()))
    }

    fn drop_table(&mut self, table: &str) -> Result<(), AdapterError> {
        self.table(table)?;
        if let Some(fk) = self
            .schema
            .tables()
            .filter(|t| t.name != table)
            .flat_map(|t| t.foreign_keys.iter())
            .find(|fk| fk.to_table == table)
        {
            return Err(AdapterError::TableReferenced {
                table: table.to_string(),
                name: fk.name.clone(),
            });
        }
        self.schema.remove_table(table);
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &Column) -> Result<(), AdapterError> {
        let t = self.table_mut(table)?;
        if t.column(&column.name).is_some() {
            return Err(AdapterError::ColumnAlreadyExists {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }
        let mut column = column.clone();
        column.position = t.columns.len() as u32;
        t.columns.push(column);
        Ok(())
    }

    fn remove_column(&mut self, table: &str, column: &str) -> Result<(), AdapterError> {
        let t = self.table_mut(table)?;
        let len_before = t.columns.len();
        t.columns.retain(|c| c.name != column);
        if t.columns.len() == len_before {
            return Err(AdapterError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        for (position, col) in t.columns.iter_mut().enumerate() {
            col.position = position as u32;
        }
        Ok(())
    }

    fn change_column(&mut self, table: &str, column: &Column) -> Result<(), AdapterError> {
        let t = self.table_mut(table)?;
        let Some(existing) = t.columns.iter_mut().find(|c| c.name == column.name) else {
            return Err(AdapterError::ColumnNotFound {
                table: table.to_string(),
                column: column.name.clone(),
            });
        };
        let position = existing.position;
        *existing = column.clone();
        existing.position = position;
        Ok(())
    }

    fn add_index(&mut self, table: &str, index: &Index) -> Result<(), AdapterError> {
        let t = self.table(table)?;
        for col in &index.columns {
            if t.column(col).is_none() {
                return Err(AdapterError::ColumnNotFound {
                    table: table.to_string(),
                    column: col.clone(),
                });
            }
        }
        let key = index.identity_key();
        if t.index_by_key(&key).is_some() {
            return Err(AdapterError::IndexAlreadyExists {
                table: table.to_string(),
                key,
            });
        }
        self.table_mut(table)?.indexes.push(index.clone());
        Ok(())
    }

    fn remove_index(&mut self, table: &str, index: &Index) -> Result<(), AdapterError> {
        let key = index.identity_key();
        let t = self.table_mut(table)?;
        let len_before = t.indexes.len();
        t.indexes.retain(|i| i.identity_key() != key);
        if t.indexes.len() == len_before {
            return Err(AdapterError::IndexNotFound {
                table: table.to_string(),
                key,
            });
        }
        Ok(())
    }

    fn add_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), AdapterError> {
        if !self.schema.has_table(&fk.to_table) {
            return Err(AdapterError::TableNotFound(fk.to_table.clone()));
        }
        let t = self.table_mut(&fk.from_table)?;
        if t.foreign_key(&fk.name).is_some() {
            return Err(AdapterError::ForeignKeyAlreadyExists {
                table: fk.from_table.clone(),
                name: fk.name.clone(),
            });
        }
        t.foreign_keys.push(fk.clone());
        Ok(())
    }

    fn remove_foreign_key(&mut self, fk: &ForeignKey) -> Result<(), AdapterError> {
        let t = self.table_mut(&fk.from_table)?;
        let len_before = t.foreign_keys.len();
        t.foreign_keys.retain(|existing| existing.name != fk.name);
        if t.foreign_keys.len() == len_before {
            return Err(AdapterError::ForeignKeyNotFound {
                table: fk.from_table.clone(),
                name: fk.name.clone(),
            });
        }
        Ok(())
    }

    fn change_table_options(
        &mut self,
        table: &str,
        options: &TableOptions,
    ) -> Result<(), AdapterError> {
        self.table_mut(table)?.options = options.clone();
        Ok(())
    }
}
