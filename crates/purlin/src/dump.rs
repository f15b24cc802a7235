//! Render a canonical schema back to the declared text format.
//!
//! The output is deterministic: tables sort by name, columns keep their
//! ordinal order, foreign keys come last so a dump always re-loads without
//! forward-reference surprises. `parse(dump(schema))` rebuilds an equal
//! schema.

use crate::schema::{
    Column, DefaultValue, ForeignKey, Index, OptionValue, Schema, Table, default_fk_name,
};

/// Dump configuration.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Spell out auto-generated foreign-key names instead of omitting them.
    pub with_default_fk_name: bool,
}

/// Render `schema` as declared statements.
pub fn dump(schema: &Schema, options: &DumpOptions) -> String {
    let mut tables: Vec<&Table> = schema.tables().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));

    let mut sections: Vec<String> = Vec::new();
    for table in &tables {
        sections.push(render_table(table));
        for index in &table.indexes {
            sections.push(render_index(&table.name, index));
        }
    }
    for table in &tables {
        for fk in &table.foreign_keys {
            sections.push(render_foreign_key(fk, options));
        }
    }

    let mut out = sections.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Declared-form rendering of an option value (`:uuid`, `-> { "f()" }`, ...).
fn render_option_value(value: &OptionValue) -> String {
    match value {
        OptionValue::Bool(b) => b.to_string(),
        OptionValue::Int(i) => i.to_string(),
        OptionValue::Str(s) => format!("{s:?}"),
        OptionValue::Symbol(s) => format!(":{s}"),
        OptionValue::Expr(e) => format!("-> {{ {e:?} }}"),
    }
}

fn render_table(table: &Table) -> String {
    let mut header = format!("create_table {:?}", table.name);
    if let Some(id) = &table.options.id {
        header.push_str(&format!(", id: {}", render_option_value(id)));
    }
    if let Some(default) = &table.options.default {
        header.push_str(&format!(", default: {}", render_option_value(default)));
    }
    if let Some(engine) = &table.options.engine {
        header.push_str(&format!(", engine: {engine:?}"));
    }
    if let Some(charset) = &table.options.charset {
        header.push_str(&format!(", charset: {charset:?}"));
    }
    for (key, value) in &table.options.extra {
        header.push_str(&format!(", {key}: {}", render_option_value(value)));
    }
    header.push_str(", force: :cascade do |t|");

    let mut out = header;
    for column in &table.columns {
        out.push('\n');
        out.push_str(&render_column(column));
    }
    out.push_str("\nend");
    out
}

fn render_column(column: &Column) -> String {
    use crate::schema::ColumnType;

    let mut line = match &column.ctype {
        ColumnType::Other(name) => format!("  t.column {:?}, :{}", column.name, name),
        ctype => format!("  t.{} {:?}", ctype.keyword(), column.name),
    };
    if let Some(limit) = column.limit {
        line.push_str(&format!(", limit: {limit}"));
    }
    if !column.null {
        line.push_str(", null: false");
    }
    match &column.default {
        DefaultValue::None => {}
        DefaultValue::Literal(value) => {
            let bare = value.parse::<i64>().is_ok()
                || value.parse::<f64>().is_ok()
                || value == "true"
                || value == "false";
            if bare {
                line.push_str(&format!(", default: {value}"));
            } else {
                line.push_str(&format!(", default: {value:?}"));
            }
        }
        DefaultValue::Expression(expr) => {
            line.push_str(&format!(", default: -> {{ {expr:?} }}"));
        }
    }
    if column.unsigned {
        line.push_str(", unsigned: true");
    }
    line
}

fn render_index(table: &str, index: &Index) -> String {
    let columns: Vec<String> = index.columns.iter().map(|c| format!("{c:?}")).collect();
    let mut line = format!("add_index {:?}, [{}]", table, columns.join(", "));
    if let Some(name) = &index.name {
        line.push_str(&format!(", name: {name:?}"));
    }
    if index.unique {
        line.push_str(", unique: true");
    }
    if let Some(using) = index.using {
        line.push_str(&format!(", using: :{}", using.keyword()));
    }
    line
}

fn render_foreign_key(fk: &ForeignKey, options: &DumpOptions) -> String {
    let mut line = format!("add_foreign_key {:?}, {:?}", fk.from_table, fk.to_table);
    let auto_named = fk.name == default_fk_name(&fk.from_table, &fk.to_table, &fk.column);
    if !auto_named || options.with_default_fk_name {
        line.push_str(&format!(", name: {:?}", fk.name));
    }
    if fk.column != crate::schema::default_fk_column(&fk.to_table) {
        line.push_str(&format!(", column: {:?}", fk.column));
    }
    if fk.primary_key != "id" {
        line.push_str(&format!(", primary_key: {:?}", fk.primary_key));
    }
    if let Some(action) = fk.on_delete {
        line.push_str(&format!(", on_delete: :{}", action.keyword()));
    }
    if let Some(action) = fk.on_update {
        line.push_str(&format!(", on_update: :{}", action.keyword()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{ParseOptions, load_schema};

    const SOURCE: &str = r#"
create_table "child", force: :cascade do |t|
  t.integer "parent_id", limit: 4
  t.string  "state", null: false, default: "draft"
end

add_index "child", ["parent_id"], name: "par_id", using: :btree

create_table "parent", force: :cascade do |t|
end

add_foreign_key "child", "parent", name: "fk_rails_e74ce85cbc"
"#;

    #[test]
    fn dump_round_trips_through_the_loader() {
        let schema = load_schema(SOURCE, &ParseOptions::default()).unwrap();
        let dumped = dump(&schema, &DumpOptions::default());
        let reloaded = load_schema(&dumped, &ParseOptions::default()).unwrap();
        assert_eq!(schema, reloaded);
    }

    #[test]
    fn dump_renders_sorted_tables_with_fks_last() {
        let schema = load_schema(SOURCE, &ParseOptions::default()).unwrap();
        insta::assert_snapshot!(dump(&schema, &DumpOptions::default()), @r#"
        create_table "child", force: :cascade do |t|
          t.integer "parent_id", limit: 4
          t.string "state", null: false, default: "draft"
        end

        add_index "child", ["parent_id"], name: "par_id", using: :btree

        create_table "parent", force: :cascade do |t|
        end

        add_foreign_key "child", "parent", name: "fk_rails_e74ce85cbc"
        "#);
    }

    #[test]
    fn auto_generated_fk_names_are_omitted_unless_requested() {
        let source = r#"
create_table "parent", force: :cascade do |t|
end

create_table "child", force: :cascade do |t|
  t.integer "parent_id"
end

add_foreign_key "child", "parent"
"#;
        let options = ParseOptions {
            default_fk_name: true,
        };
        let schema = load_schema(source, &options).unwrap();

        let plain = dump(&schema, &DumpOptions::default());
        assert!(plain.contains("add_foreign_key \"child\", \"parent\"\n"));
        assert!(!plain.contains("name:"));

        let explicit = dump(
            &schema,
            &DumpOptions {
                with_default_fk_name: true,
            },
        );
        let expected = crate::schema::default_fk_name("child", "parent", "parent_id");
        assert!(explicit.contains(&format!("name: {expected:?}")));

        // Either spelling reloads to the same schema.
        let reloaded = load_schema(&plain, &options).unwrap();
        assert_eq!(schema, reloaded);
        let reloaded = load_schema(&explicit, &ParseOptions::default()).unwrap();
        assert_eq!(schema, reloaded);
    }

    #[test]
    fn table_options_render_in_declared_form() {
        let source = r#"
create_table "users", id: :uuid, default: -> { "uuid_generate_v4()" }, force: :cascade do |t|
  t.string "name"
end
"#;
        let schema = load_schema(source, &ParseOptions::default()).unwrap();
        let dumped = dump(&schema, &DumpOptions::default());
        assert!(dumped.starts_with(
            "create_table \"users\", id: :uuid, default: -> { \"uuid_generate_v4()\" }, force: :cascade do |t|"
        ));
        let reloaded = load_schema(&dumped, &ParseOptions::default()).unwrap();
        assert_eq!(schema, reloaded);
    }
}
