//! Delta: the ordered operation list produced by a diff.
//!
//! Raw per-table operations come out of the differ interleaved in discovery
//! order. Before a delta is exposed it is reordered so dependencies hold
//! (a table exists before a foreign key references it, a foreign key is
//! gone before its target table drops) and, when bulk mode is on,
//! consecutive same-table operations fold into one composite alter.

use std::collections::HashSet;
use std::fmt;

use crate::adapter::{Adapter, Dialect};
use crate::error::Error;
use crate::migrate;
use crate::report::Warning;
use crate::schema::{Column, DefaultValue, ForeignKey, Index, Table, TableOptions, default_fk_column};

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create a table (columns and options only; indexes and foreign keys
    /// arrive as separate operations)
    CreateTable { table: Table },
    /// Drop an existing table
    DropTable { table: String },
    /// Add a new column
    AddColumn { table: String, column: Column },
    /// Drop an existing column
    RemoveColumn { table: String, column: String },
    /// Change an existing column's attributes
    ChangeColumn { table: String, column: Column },
    /// Add an index
    AddIndex { table: String, index: Index },
    /// Drop an index
    RemoveIndex { table: String, index: Index },
    /// Add a foreign key
    AddForeignKey { fk: ForeignKey },
    /// Drop a foreign key
    RemoveForeignKey { fk: ForeignKey },
    /// Replace a table's option map
    ChangeTableOptions {
        table: String,
        from: TableOptions,
        to: TableOptions,
    },
    /// Bulk group: several per-table operations as one composite alter
    ChangeTable { table: String, ops: Vec<Operation> },
}

impl Operation {
    /// The table this operation belongs to.
    pub fn table_name(&self) -> &str {
        match self {
            Operation::CreateTable { table } => &table.name,
            Operation::DropTable { table }
            | Operation::AddColumn { table, .. }
            | Operation::RemoveColumn { table, .. }
            | Operation::ChangeColumn { table, .. }
            | Operation::AddIndex { table, .. }
            | Operation::RemoveIndex { table, .. }
            | Operation::ChangeTableOptions { table, .. }
            | Operation::ChangeTable { table, .. } => table,
            Operation::AddForeignKey { fk } | Operation::RemoveForeignKey { fk } => &fk.from_table,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Operation::CreateTable { .. } => "create_table",
            Operation::DropTable { .. } => "drop_table",
            Operation::AddColumn { .. } => "add_column",
            Operation::RemoveColumn { .. } => "remove_column",
            Operation::ChangeColumn { .. } => "change_column",
            Operation::AddIndex { .. } => "add_index",
            Operation::RemoveIndex { .. } => "remove_index",
            Operation::AddForeignKey { .. } => "add_foreign_key",
            Operation::RemoveForeignKey { .. } => "remove_foreign_key",
            Operation::ChangeTableOptions { .. } => "change_table_options",
            Operation::ChangeTable { .. } => "change_table",
        }
    }

    /// Render this operation as one call-style script entry.
    pub fn render(&self) -> String {
        match self {
            Operation::CreateTable { table } => {
                let mut out = format!(
                    "create_table({:?}, {}) do |t|\n",
                    table.name,
                    table.options.render_map()
                );
                for column in &table.columns {
                    out.push_str(&format!(
                        "  t.column({:?}, {}, {})\n",
                        column.name,
                        column.ctype,
                        column_attrs(column)
                    ));
                }
                out.push_str("end");
                out
            }
            Operation::DropTable { table } => format!("drop_table({table:?})"),
            Operation::AddColumn { table, column } => format!(
                "add_column({:?}, {:?}, {}, {})",
                table,
                column.name,
                column.ctype,
                column_attrs(column)
            ),
            Operation::RemoveColumn { table, column } => {
                format!("remove_column({table:?}, {column:?})")
            }
            Operation::ChangeColumn { table, column } => format!(
                "change_column({:?}, {:?}, {}, {})",
                table,
                column.name,
                column.ctype,
                column_attrs(column)
            ),
            Operation::AddIndex { table, index } => format!(
                "add_index({:?}, {}, {})",
                table,
                render_string_array(&index.columns),
                index_attrs(index)
            ),
            Operation::RemoveIndex { table, index } => {
                format!("remove_index({:?}, {})", table, index_identity_attrs(index))
            }
            Operation::AddForeignKey { fk } => format!(
                "add_foreign_key({:?}, {:?}, {})",
                fk.from_table,
                fk.to_table,
                fk_attrs(fk)
            ),
            Operation::RemoveForeignKey { fk } => format!(
                "remove_foreign_key({:?}, {{:name=>{:?}}})",
                fk.from_table, fk.name
            ),
            Operation::ChangeTableOptions { table, to, .. } => {
                format!("change_table_options({:?}, {})", table, to.render_map())
            }
            Operation::ChangeTable { table, ops } => {
                let mut out = format!("change_table({table:?}, {{:bulk=>true}}) do |t|\n");
                for op in ops {
                    out.push_str(&format!("  {}\n", op.render_bulk_entry()));
                }
                out.push_str("end");
                out
            }
        }
    }

    /// Render as an entry inside a `change_table` block.
    fn render_bulk_entry(&self) -> String {
        match self {
            Operation::AddColumn { column, .. } => format!(
                "t.column({:?}, {}, {})",
                column.name,
                column.ctype,
                column_attrs(column)
            ),
            Operation::RemoveColumn { column, .. } => format!("t.remove({column:?})"),
            Operation::ChangeColumn { column, .. } => format!(
                "t.change({:?}, {}, {})",
                column.name,
                column.ctype,
                column_attrs(column)
            ),
            Operation::AddIndex { index, .. } => format!(
                "t.index({}, {})",
                render_string_array(&index.columns),
                index_attrs(index)
            ),
            Operation::RemoveIndex { index, .. } => {
                format!("t.remove_index({})", index_identity_attrs(index))
            }
            Operation::AddForeignKey { fk } => {
                format!("t.foreign_key({:?}, {})", fk.to_table, fk_attrs(fk))
            }
            Operation::RemoveForeignKey { fk } => {
                format!("t.remove_foreign_key({{:name=>{:?}}})", fk.name)
            }
            other => other.render(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateTable { table } => write!(f, "+ table {}", table.name),
            Operation::DropTable { table } => write!(f, "- table {table}"),
            Operation::AddColumn { table, column } => {
                write!(f, "+ {}.{}: {}", table, column.name, column.ctype)
            }
            Operation::RemoveColumn { table, column } => write!(f, "- {table}.{column}"),
            Operation::ChangeColumn { table, column } => {
                write!(f, "~ {}.{}: {}", table, column.name, column.ctype)
            }
            Operation::AddIndex { table, index } => {
                let unique = if index.unique { "unique " } else { "" };
                write!(f, "+ {}index on {} ({})", unique, table, index.columns.join(", "))
            }
            Operation::RemoveIndex { table, index } => {
                write!(f, "- index on {} ({})", table, index.columns.join(", "))
            }
            Operation::AddForeignKey { fk } => {
                write!(f, "+ fk {} -> {} ({})", fk.from_table, fk.to_table, fk.name)
            }
            Operation::RemoveForeignKey { fk } => {
                write!(f, "- fk {} -> {} ({})", fk.from_table, fk.to_table, fk.name)
            }
            Operation::ChangeTableOptions { table, .. } => {
                write!(f, "~ options of {table}")
            }
            Operation::ChangeTable { table, ops } => {
                write!(f, "~ table {} ({} changes)", table, ops.len())
            }
        }
    }
}

fn render_string_array(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("{s:?}")).collect();
    format!("[{}]", quoted.join(", "))
}

fn render_default(default: &DefaultValue) -> Option<String> {
    match default {
        DefaultValue::None => None,
        DefaultValue::Literal(value) => {
            let bare = value.parse::<i64>().is_ok()
                || value.parse::<f64>().is_ok()
                || value == "true"
                || value == "false";
            Some(if bare {
                value.clone()
            } else {
                format!("{value:?}")
            })
        }
        DefaultValue::Expression(expr) => Some(format!("-> {{ {expr:?} }}")),
    }
}

/// Column attributes as a stably-ordered map literal.
fn column_attrs(column: &Column) -> String {
    let mut pairs: Vec<String> = Vec::new();
    if let Some(limit) = column.limit {
        pairs.push(format!(":limit=>{limit}"));
    }
    pairs.push(format!(":null=>{}", column.null));
    if let Some(default) = render_default(&column.default) {
        pairs.push(format!(":default=>{default}"));
    }
    if column.unsigned {
        pairs.push(":unsigned=>true".to_string());
    }
    format!("{{{}}}", pairs.join(", "))
}

fn index_attrs(index: &Index) -> String {
    let mut pairs: Vec<String> = Vec::new();
    if let Some(name) = &index.name {
        pairs.push(format!(":name=>{name:?}"));
    }
    if index.unique {
        pairs.push(":unique=>true".to_string());
    }
    if let Some(using) = index.using {
        pairs.push(format!(":using=>:{}", using.keyword()));
    }
    format!("{{{}}}", pairs.join(", "))
}

fn index_identity_attrs(index: &Index) -> String {
    match &index.name {
        Some(name) => format!("{{:name=>{name:?}}}"),
        None => format!("{{:column=>{}}}", render_string_array(&index.columns)),
    }
}

fn fk_attrs(fk: &ForeignKey) -> String {
    let mut pairs: Vec<String> = vec![format!(":name=>{:?}", fk.name)];
    if fk.column != default_fk_column(&fk.to_table) {
        pairs.push(format!(":column=>{:?}", fk.column));
    }
    if fk.primary_key != "id" {
        pairs.push(format!(":primary_key=>{:?}", fk.primary_key));
    }
    if let Some(action) = fk.on_delete {
        pairs.push(format!(":on_delete=>:{}", action.keyword()));
    }
    if let Some(action) = fk.on_update {
        pairs.push(format!(":on_update=>:{}", action.keyword()));
    }
    format!("{{{}}}", pairs.join(", "))
}

/// The ordered set of operations transforming `current` into `desired`,
/// plus the non-fatal warnings discovered along the way.
///
/// A delta is a pure value: building one mutates nothing, and rendering or
/// applying it is repeatable (a second application of a fully-applied delta
/// diffs to nothing).
#[derive(Debug, Clone, Default)]
pub struct Delta {
    ops: Vec<Operation>,
    warnings: Vec<Warning>,
}

impl Delta {
    /// Order raw operations and fold bulk groups.
    pub(crate) fn build(
        raw_ops: Vec<Operation>,
        warnings: Vec<Warning>,
        bulk_change: bool,
        dialect: &Dialect,
    ) -> Delta {
        let ordered = order(raw_ops);
        let ops = if bulk_change {
            fold_bulk(ordered, dialect)
        } else {
            ordered
        };
        Delta { ops, warnings }
    }

    /// True iff the operation sequence is non-empty. Warnings never count.
    pub fn differ(&self) -> bool {
        !self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Deterministic textual rendering: one call-style entry per operation.
    pub fn script(&self) -> String {
        let rendered: Vec<String> = self.ops.iter().map(|op| op.render()).collect();
        rendered.join("\n")
    }

    /// Apply every operation through the adapter, in order, fail-fast.
    pub fn migrate(&self, adapter: &mut dyn Adapter) -> Result<(), Error> {
        migrate::apply(self, adapter)
    }
}

/// Reorder operations so dependencies hold, keeping discovery order within
/// each phase:
///
/// - a `RemoveForeignKey` touching a table that drops in this delta runs
///   before any `DropTable`;
/// - an `AddForeignKey` touching a table created in this delta runs after
///   every `CreateTable`.
fn order(ops: Vec<Operation>) -> Vec<Operation> {
    let created: HashSet<String> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::CreateTable { table } => Some(table.name.clone()),
            _ => None,
        })
        .collect();
    let dropped: HashSet<String> = ops
        .iter()
        .filter_map(|op| match op {
            Operation::DropTable { table } => Some(table.clone()),
            _ => None,
        })
        .collect();

    let phase = |op: &Operation| -> u8 {
        match op {
            Operation::RemoveForeignKey { fk }
                if dropped.contains(&fk.from_table) || dropped.contains(&fk.to_table) =>
            {
                0
            }
            Operation::AddForeignKey { fk }
                if created.contains(&fk.from_table) || created.contains(&fk.to_table) =>
            {
                2
            }
            _ => 1,
        }
    };

    let mut indexed: Vec<(usize, Operation)> = ops.into_iter().enumerate().collect();
    indexed.sort_by_key(|(position, op)| (phase(op), *position));
    indexed.into_iter().map(|(_, op)| op).collect()
}

/// Which table a bulk-foldable operation belongs to, if the dialect lets it
/// join a composite alter.
fn bulk_table<'a>(op: &'a Operation, dialect: &Dialect) -> Option<&'a str> {
    match op {
        Operation::AddColumn { table, .. }
        | Operation::RemoveColumn { table, .. }
        | Operation::ChangeColumn { table, .. } => Some(table),
        Operation::AddIndex { table, .. } | Operation::RemoveIndex { table, .. }
            if dialect.bulk_alter_includes_indexes =>
        {
            Some(table)
        }
        Operation::AddForeignKey { fk } | Operation::RemoveForeignKey { fk }
            if dialect.bulk_alter_includes_indexes =>
        {
            Some(&fk.from_table)
        }
        _ => None,
    }
}

/// Fold runs of two or more consecutive same-table operations into one
/// composite `ChangeTable`; internal order within a run is preserved.
fn fold_bulk(ops: Vec<Operation>, dialect: &Dialect) -> Vec<Operation> {
    let mut out: Vec<Operation> = Vec::new();
    let mut run: Vec<Operation> = Vec::new();
    let mut run_table: Option<String> = None;

    let flush = |out: &mut Vec<Operation>, run: &mut Vec<Operation>, run_table: &mut Option<String>| {
        match (run.len(), run_table.take()) {
            (2.., Some(table)) => out.push(Operation::ChangeTable {
                table,
                ops: std::mem::take(run),
            }),
            _ => out.append(run),
        }
    };

    for op in ops {
        let target = bulk_table(&op, dialect).map(str::to_string);
        match target {
            Some(table) if run_table.as_deref() == Some(table.as_str()) => run.push(op),
            Some(table) => {
                flush(&mut out, &mut run, &mut run_table);
                run_table = Some(table);
                run.push(op);
            }
            None => {
                flush(&mut out, &mut run, &mut run_table);
                out.push(op);
            }
        }
    }
    flush(&mut out, &mut run, &mut run_table);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, default_fk_name};

    fn fk(from: &str, to: &str, column: &str) -> ForeignKey {
        ForeignKey {
            name: default_fk_name(from, to, column),
            from_table: from.into(),
            to_table: to.into(),
            column: column.into(),
            primary_key: "id".into(),
            on_delete: None,
            on_update: None,
        }
    }

    #[test]
    fn add_fk_moves_after_all_creates() {
        let raw = vec![
            Operation::CreateTable {
                table: Table::new("child"),
            },
            Operation::AddForeignKey {
                fk: fk("child", "parent", "parent_id"),
            },
            Operation::CreateTable {
                table: Table::new("parent"),
            },
        ];
        let ordered = order(raw);
        assert_eq!(ordered[0].kind_name(), "create_table");
        assert_eq!(ordered[1].kind_name(), "create_table");
        assert_eq!(ordered[2].kind_name(), "add_foreign_key");
    }

    #[test]
    fn remove_fk_moves_before_drop_of_target() {
        let raw = vec![
            Operation::DropTable {
                table: "parent".into(),
            },
            Operation::RemoveForeignKey {
                fk: fk("child", "parent", "parent_id"),
            },
        ];
        let ordered = order(raw);
        assert_eq!(ordered[0].kind_name(), "remove_foreign_key");
        assert_eq!(ordered[1].kind_name(), "drop_table");
    }

    #[test]
    fn fk_between_existing_tables_keeps_position() {
        let raw = vec![
            Operation::AddColumn {
                table: "child".into(),
                column: Column::new("flag", ColumnType::Boolean),
            },
            Operation::AddForeignKey {
                fk: fk("child", "parent", "parent_id"),
            },
        ];
        let ordered = order(raw);
        assert_eq!(ordered[0].kind_name(), "add_column");
        assert_eq!(ordered[1].kind_name(), "add_foreign_key");
    }

    #[test]
    fn bulk_folds_consecutive_same_table_column_ops() {
        let dialect = Dialect::mysql();
        let ops = vec![
            Operation::ChangeColumn {
                table: "t".into(),
                column: Column::new("a", ColumnType::BigInt),
            },
            Operation::ChangeColumn {
                table: "t".into(),
                column: Column::new("b", ColumnType::Text),
            },
            Operation::AddColumn {
                table: "u".into(),
                column: Column::new("c", ColumnType::Integer),
            },
        ];
        let folded = fold_bulk(ops, &dialect);
        assert_eq!(folded.len(), 2);
        assert!(
            matches!(&folded[0], Operation::ChangeTable { table, ops } if table == "t" && ops.len() == 2)
        );
        assert_eq!(folded[1].kind_name(), "add_column");
    }

    #[test]
    fn single_op_runs_stay_unfolded() {
        let dialect = Dialect::mysql();
        let ops = vec![Operation::AddForeignKey {
            fk: fk("child", "parent", "parent_id"),
        }];
        let folded = fold_bulk(ops, &dialect);
        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].kind_name(), "add_foreign_key");
    }

    #[test]
    fn postgres_bulk_excludes_indexes() {
        let dialect = Dialect::postgres();
        let ops = vec![
            Operation::AddColumn {
                table: "t".into(),
                column: Column::new("a", ColumnType::Integer),
            },
            Operation::AddIndex {
                table: "t".into(),
                index: Index {
                    name: Some("idx".into()),
                    columns: vec!["a".into()],
                    unique: false,
                    using: None,
                },
            },
        ];
        let folded = fold_bulk(ops, &dialect);
        assert_eq!(folded.len(), 2);
    }

    #[test]
    fn script_renders_fk_ops_in_call_style() {
        let op = Operation::AddForeignKey {
            fk: ForeignKey {
                name: "fk_name".into(),
                from_table: "child".into(),
                to_table: "parent".into(),
                column: "parent_id".into(),
                primary_key: "id".into(),
                on_delete: None,
                on_update: None,
            },
        };
        assert_eq!(
            op.render(),
            r#"add_foreign_key("child", "parent", {:name=>"fk_name"})"#
        );

        let op = Operation::RemoveForeignKey {
            fk: ForeignKey {
                name: "fk_name".into(),
                from_table: "child".into(),
                to_table: "parent".into(),
                column: "parent_id".into(),
                primary_key: "id".into(),
                on_delete: None,
                on_update: None,
            },
        };
        assert_eq!(op.render(), r#"remove_foreign_key("child", {:name=>"fk_name"})"#);
    }

    #[test]
    fn create_table_renders_as_block() {
        let mut table = Table::new("child");
        table.columns.push(Column::new("parent_id", ColumnType::Integer));
        let op = Operation::CreateTable { table };
        insta::assert_snapshot!(op.render(), @r#"
        create_table("child", {}) do |t|
          t.column("parent_id", :integer, {:null=>true})
        end
        "#);
    }
}
