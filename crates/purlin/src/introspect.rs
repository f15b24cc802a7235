//! Snapshot extraction: live database -> canonical schema.
//!
//! Walks the adapter's introspection capabilities and normalizes everything
//! on the way in, so cosmetic engine spellings (integer byte limits,
//! Postgres cast suffixes on defaults, unsigned flags on engines without
//! unsigned) never reach the differ as differences.

use crate::adapter::{Adapter, Dialect};
use crate::error::Error;
use crate::schema::{Column, DefaultValue, Schema, Table};

/// Build a [`Schema`] reflecting the adapter's current live state.
pub fn introspect(adapter: &dyn Adapter) -> Result<Schema, Error> {
    let dialect = adapter.dialect();
    let mut schema = Schema::new();

    for name in adapter.tables()? {
        let mut table = Table::new(name.clone());
        table.columns = adapter
            .columns(&name)?
            .into_iter()
            .map(|c| normalize_column(c, &dialect))
            .collect();
        for (position, column) in table.columns.iter_mut().enumerate() {
            column.position = position as u32;
        }
        table.indexes = adapter.indexes(&name)?;
        table.foreign_keys = adapter.foreign_keys(&name)?;
        table.options = adapter.table_options(&name)?;
        schema.insert_table(table)?;
    }

    tracing::debug!(tables = schema.len(), "introspected schema snapshot");
    Ok(schema)
}

fn normalize_column(column: Column, dialect: &Dialect) -> Column {
    let mut column = column.normalized(dialect, None);
    column.default = normalize_default(column.default);
    column
}

/// Collapse engine spellings of the same default value.
///
/// Postgres reports literal defaults with a cast suffix
/// (`'draft'::character varying`, `0::bigint`); the declared form has none.
fn normalize_default(default: DefaultValue) -> DefaultValue {
    match default {
        DefaultValue::Literal(value) => DefaultValue::Literal(strip_cast(&value)),
        DefaultValue::Expression(expr) => {
            let expr = expr.trim();
            // A cast-wrapped literal is a literal, not an expression.
            let stripped = strip_cast(expr);
            if stripped != expr && is_plain_literal(&stripped) {
                DefaultValue::Literal(stripped)
            } else {
                DefaultValue::Expression(expr.to_string())
            }
        }
        DefaultValue::None => DefaultValue::None,
    }
}

/// Strip a trailing `::type` cast and surrounding single quotes.
fn strip_cast(value: &str) -> String {
    let value = value.trim();
    let without_cast = match value.find("::") {
        Some(position) if !value[..position].is_empty() => &value[..position],
        _ => value,
    };
    let without_cast = without_cast.trim();
    if without_cast.len() >= 2 && without_cast.starts_with('\'') && without_cast.ends_with('\'') {
        without_cast[1..without_cast.len() - 1].replace("''", "'")
    } else {
        without_cast.to_string()
    }
}

fn is_plain_literal(value: &str) -> bool {
    !value.contains('(')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::diff::{DiffOptions, Differ};
    use crate::schema::{ColumnType, Table};

    #[test]
    fn strips_postgres_cast_from_literal_defaults() {
        assert_eq!(strip_cast("'draft'::character varying"), "draft");
        assert_eq!(strip_cast("0::bigint"), "0");
        assert_eq!(strip_cast("'it''s'::text"), "it's");
        assert_eq!(strip_cast("draft"), "draft");
    }

    #[test]
    fn cast_wrapped_literal_becomes_literal() {
        let normalized =
            normalize_default(DefaultValue::Expression("'draft'::character varying".into()));
        assert_eq!(normalized, DefaultValue::Literal("draft".into()));
    }

    #[test]
    fn function_expressions_stay_expressions() {
        let normalized = normalize_default(DefaultValue::Expression(" now() ".into()));
        assert_eq!(normalized, DefaultValue::Expression("now()".into()));
    }

    #[test]
    fn snapshot_of_migrated_state_diffs_empty() {
        let mut desired = Schema::new();
        let mut salaries = Table::new("salaries");
        let mut emp_no = Column::new("emp_no", ColumnType::Integer);
        emp_no.limit = Some(8);
        emp_no.null = false;
        salaries.columns.push(emp_no);
        desired.insert_table(salaries).unwrap();

        let differ = Differ::new(DiffOptions::default());
        let mut adapter = MemoryAdapter::default();
        differ
            .diff(&Schema::new(), &desired)
            .migrate(&mut adapter)
            .unwrap();

        let snapshot = introspect(&adapter).unwrap();
        // The snapshot sees the canonical bigint; the declared form spelled
        // it integer/limit 8. Still no difference.
        assert!(!differ.diff(&snapshot, &desired).differ());
        assert_eq!(
            snapshot.table("salaries").unwrap().columns[0].ctype,
            ColumnType::BigInt
        );
    }
}
