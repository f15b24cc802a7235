//! Canonical schema model.
//!
//! Everything the differ compares lives here: tables, columns, indexes and
//! foreign keys in an engine-independent representation. Two schemas that
//! spell the same thing differently (`t.integer "n", limit: 8` vs
//! `t.bigint "n"`) normalize to equal values, so the differ never has to
//! know about engine spellings.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

use crate::adapter::Dialect;
use crate::error::Error;

/// Column type tags.
///
/// The closed set covers what the declared format can spell directly;
/// `Other` carries engine-specific types through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Decimal,
    String,
    Text,
    Binary,
    Boolean,
    Date,
    DateTime,
    Time,
    Timestamp,
    Uuid,
    Json,
    Jsonb,
    Other(std::string::String),
}

impl ColumnType {
    /// Parse a statement keyword (`integer`, `bigint`, ...) into a type tag.
    pub fn parse(word: &str) -> Option<ColumnType> {
        let ty = match word {
            "smallint" => ColumnType::SmallInt,
            "integer" => ColumnType::Integer,
            "bigint" => ColumnType::BigInt,
            "float" => ColumnType::Float,
            "decimal" => ColumnType::Decimal,
            "string" => ColumnType::String,
            "text" => ColumnType::Text,
            "binary" => ColumnType::Binary,
            "boolean" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime,
            "time" => ColumnType::Time,
            "timestamp" => ColumnType::Timestamp,
            "uuid" => ColumnType::Uuid,
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::Jsonb,
            _ => return None,
        };
        Some(ty)
    }

    /// The statement keyword for this type (also the symbol form in scripts).
    pub fn keyword(&self) -> &str {
        match self {
            ColumnType::SmallInt => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Binary => "binary",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Uuid => "uuid",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Other(name) => name,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.keyword())
    }
}

/// A column default.
///
/// `Expression` is raw SQL text and compares textually; it is never
/// evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultValue {
    #[default]
    None,
    Literal(String),
    Expression(String),
}

impl DefaultValue {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None)
    }
}

/// A database column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Type tag
    pub ctype: ColumnType,
    /// Length/limit, engine units (bytes for integers, chars for strings)
    pub limit: Option<u32>,
    /// Whether the column allows NULL
    pub null: bool,
    /// Default value (if any)
    pub default: DefaultValue,
    /// Unsigned integer column (engine-dependent)
    pub unsigned: bool,
    /// Ordinal position within the table, 0-based
    pub position: u32,
}

impl Column {
    pub fn new(name: impl Into<String>, ctype: ColumnType) -> Self {
        Column {
            name: name.into(),
            ctype,
            limit: None,
            null: true,
            default: DefaultValue::None,
            unsigned: false,
            position: 0,
        }
    }

    /// Canonicalize this column for comparison.
    ///
    /// Integer limits collapse into the canonical type tag (8 bytes is a
    /// bigint however it was spelled, 2 bytes a smallint), a limit equal to
    /// the dialect default is dropped, and `unsigned` is suppressed on
    /// dialects without unsigned integers. `default_int_limit` is the limit
    /// assumed for an integer column that doesn't specify one.
    pub fn normalized(&self, dialect: &Dialect, default_int_limit: Option<u32>) -> Column {
        let mut col = self.clone();

        if matches!(
            col.ctype,
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt
        ) {
            let limit = col
                .limit
                .or(default_int_limit)
                .unwrap_or(dialect.default_int_limit);
            col.ctype = match limit {
                0..=2 => ColumnType::SmallInt,
                3..=4 => ColumnType::Integer,
                _ => ColumnType::BigInt,
            };
            col.limit = None;
        }

        if !dialect.supports_unsigned {
            col.unsigned = false;
        }

        if let DefaultValue::Expression(expr) = &col.default {
            let trimmed = expr.trim().to_string();
            col.default = DefaultValue::Expression(trimmed);
        }

        col
    }

    /// Attribute-wise comparison for diffing; ordinal position is layout,
    /// not structure, and does not participate.
    pub fn same_structure(&self, other: &Column) -> bool {
        self.ctype == other.ctype
            && self.limit == other.limit
            && self.null == other.null
            && self.default == other.default
            && self.unsigned == other.unsigned
    }
}

/// Index storage method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    BTree,
    Hash,
}

impl IndexMethod {
    pub fn parse(word: &str) -> Option<IndexMethod> {
        match word {
            "btree" => Some(IndexMethod::BTree),
            "hash" => Some(IndexMethod::Hash),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            IndexMethod::BTree => "btree",
            IndexMethod::Hash => "hash",
        }
    }
}

/// A database index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Index name; unnamed indexes are identified by their column sequence
    pub name: Option<String>,
    /// Ordered column names
    pub columns: Vec<String>,
    /// Whether this is a unique index
    pub unique: bool,
    /// Storage method, if specified
    pub using: Option<IndexMethod>,
}

impl Index {
    /// Two indexes are the same entity iff their identity keys match:
    /// the name when present, the column sequence otherwise.
    pub fn identity_key(&self) -> String {
        match &self.name {
            Some(name) => format!("n:{name}"),
            None => format!("c:{}", self.columns.join(",")),
        }
    }
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefAction {
    Cascade,
    Restrict,
    Nullify,
}

impl RefAction {
    pub fn parse(word: &str) -> Option<RefAction> {
        match word {
            "cascade" => Some(RefAction::Cascade),
            "restrict" => Some(RefAction::Restrict),
            "nullify" => Some(RefAction::Nullify),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            RefAction::Cascade => "cascade",
            RefAction::Restrict => "restrict",
            RefAction::Nullify => "nullify",
        }
    }
}

/// A foreign key constraint.
///
/// The name is always resolved before a `ForeignKey` enters a [`Schema`];
/// the loader either takes the explicit name, derives the default one, or
/// fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name (resolved, never empty)
    pub name: String,
    /// Table the constraint is created on
    pub from_table: String,
    /// Referenced table
    pub to_table: String,
    /// Source column
    pub column: String,
    /// Referenced column
    pub primary_key: String,
    pub on_delete: Option<RefAction>,
    pub on_update: Option<RefAction>,
}

impl ForeignKey {
    /// Structural comparison ignoring the constraint name.
    pub fn same_structure(&self, other: &ForeignKey) -> bool {
        self.from_table == other.from_table
            && self.to_table == other.to_table
            && self.column == other.column
            && self.primary_key == other.primary_key
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
    }
}

/// Derive the deterministic default name for an unnamed foreign key.
///
/// Constraint names must be unique within a schema, so the name carries a
/// stable truncated hash of (source table, target table, source column).
pub fn default_fk_name(from_table: &str, to_table: &str, column: &str) -> String {
    let identifier = format!("{from_table}_{to_table}_{column}");
    let hex = blake3::hash(identifier.as_bytes()).to_hex().to_string();
    format!("fk_{}", &hex[..10])
}

/// Default source column for a foreign key: the referenced table's singular
/// name suffixed with `_id` (`parent` -> `parent_id`, `users` -> `user_id`).
pub fn default_fk_column(to_table: &str) -> String {
    let singular = to_table.strip_suffix('s').unwrap_or(to_table);
    format!("{singular}_id")
}

/// A table-option value in the declared format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Symbol(String),
    Expr(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Str(s) | OptionValue::Expr(s) => write!(f, "{s:?}"),
            OptionValue::Symbol(s) => write!(f, ":{s}"),
        }
    }
}

/// Table-level options.
///
/// A closed record for the options the differ understands, plus an
/// escape-hatch map for engine-specific extension options. Option
/// differences never make a delta non-empty on their own (§ option-only
/// rule in the differ).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOptions {
    /// Id-column strategy: `false` (no implicit id), `:uuid`, `:bigint`, ...
    pub id: Option<OptionValue>,
    /// Table-granularity default value expression
    pub default: Option<OptionValue>,
    /// Storage engine (MySQL)
    pub engine: Option<String>,
    /// Character set (MySQL)
    pub charset: Option<String>,
    /// Engine-specific extension options
    pub extra: BTreeMap<String, OptionValue>,
}

impl TableOptions {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.default.is_none()
            && self.engine.is_none()
            && self.charset.is_none()
            && self.extra.is_empty()
    }

    /// Render as a stably-ordered map literal: `{:id=>:uuid, :default=>"f()"}`.
    pub fn render_map(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        if let Some(id) = &self.id {
            pairs.push(format!(":id=>{id}"));
        }
        if let Some(default) = &self.default {
            pairs.push(format!(":default=>{default}"));
        }
        if let Some(engine) = &self.engine {
            pairs.push(format!(":engine=>{engine:?}"));
        }
        if let Some(charset) = &self.charset {
            pairs.push(format!(":charset=>{charset:?}"));
        }
        for (key, value) in &self.extra {
            pairs.push(format!(":{key}=>{value}"));
        }
        format!("{{{}}}", pairs.join(", "))
    }
}

/// A database table: ordered columns, indexes, foreign keys and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    /// Columns in declaration order; order affects physical layout and
    /// rendering, not structural equality of individual columns
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub options: TableOptions,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            options: TableOptions::default(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index_by_key(&self, key: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.identity_key() == key)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }
}

/// An immutable schema: tables keyed by name, insertion-ordered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    tables: IndexMap<String, Table>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Insert a table; duplicate names are a load-time error.
    pub fn insert_table(&mut self, table: Table) -> Result<(), Error> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub(crate) fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// A copy with every column canonicalized for comparison.
    pub fn normalized(&self, dialect: &Dialect, default_int_limit: Option<u32>) -> Schema {
        let mut schema = Schema::new();
        for table in self.tables() {
            let mut normalized = table.clone();
            normalized.columns = table
                .columns
                .iter()
                .map(|c| c.normalized(dialect, default_int_limit))
                .collect();
            schema
                .tables
                .insert(normalized.name.clone(), normalized);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_limit_8_normalizes_to_bigint() {
        let dialect = Dialect::mysql();
        let mut col = Column::new("emp_no", ColumnType::Integer);
        col.limit = Some(8);
        let normalized = col.normalized(&dialect, None);
        assert_eq!(normalized.ctype, ColumnType::BigInt);
        assert_eq!(normalized.limit, None);

        let bigint = Column::new("emp_no", ColumnType::BigInt).normalized(&dialect, None);
        assert!(normalized.same_structure(&bigint));
    }

    #[test]
    fn integer_limit_2_normalizes_to_smallint() {
        let dialect = Dialect::mysql();
        let mut col = Column::new("n", ColumnType::Integer);
        col.limit = Some(2);
        assert_eq!(col.normalized(&dialect, None).ctype, ColumnType::SmallInt);
    }

    #[test]
    fn default_int_limit_fills_unspecified_limits() {
        let dialect = Dialect::mysql();
        let col = Column::new("n", ColumnType::Integer);
        let normalized = col.normalized(&dialect, Some(8));
        assert_eq!(normalized.ctype, ColumnType::BigInt);
    }

    #[test]
    fn unsigned_suppressed_without_dialect_support() {
        let dialect = Dialect::postgres();
        let mut col = Column::new("n", ColumnType::Integer);
        col.unsigned = true;
        assert!(!col.normalized(&dialect, None).unsigned);
    }

    #[test]
    fn index_identity_prefers_name() {
        let named = Index {
            name: Some("par_id".into()),
            columns: vec!["parent_id".into()],
            unique: false,
            using: None,
        };
        let unnamed = Index {
            name: None,
            columns: vec!["parent_id".into()],
            unique: false,
            using: None,
        };
        assert_eq!(named.identity_key(), "n:par_id");
        assert_eq!(unnamed.identity_key(), "c:parent_id");
    }

    #[test]
    fn default_fk_name_is_deterministic() {
        let a = default_fk_name("child", "parent", "parent_id");
        let b = default_fk_name("child", "parent", "parent_id");
        assert_eq!(a, b);
        assert!(a.starts_with("fk_"));
        assert_eq!(a.len(), 13);
        assert_ne!(a, default_fk_name("child", "parent", "other_id"));
    }

    #[test]
    fn default_fk_column_singularizes() {
        assert_eq!(default_fk_column("parent"), "parent_id");
        assert_eq!(default_fk_column("users"), "user_id");
    }

    #[test]
    fn duplicate_table_rejected() {
        let mut schema = Schema::new();
        schema.insert_table(Table::new("users")).unwrap();
        let err = schema.insert_table(Table::new("users")).unwrap_err();
        assert_eq!(err.to_string(), "Table `users` already defined");
    }

    #[test]
    fn options_map_rendering_is_stable() {
        let options = TableOptions {
            id: Some(OptionValue::Symbol("uuid".into())),
            default: Some(OptionValue::Expr("uuid_generate_v4()".into())),
            ..TableOptions::default()
        };
        assert_eq!(
            options.render_map(),
            r#"{:id=>:uuid, :default=>"uuid_generate_v4()"}"#
        );
    }
}
