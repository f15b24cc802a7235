//! Schema loader: declared text -> validated [`Schema`].
//!
//! The declared format is an ordered statement sequence: `create_table`
//! blocks with nested column/index lines, plus standalone `add_index` and
//! `add_foreign_key` statements referencing tables by name. Nothing is
//! evaluated; a lambda default (`-> { "now()" }`) is carried as a raw
//! expression string.
//!
//! Statement order is free: every table is read before references are
//! validated, so a child's foreign key may precede its parent's table.

use std::collections::HashMap;

use crate::error::Error;
use crate::schema::{
    Column, ColumnType, DefaultValue, ForeignKey, Index, IndexMethod, OptionValue, RefAction,
    Schema, Table, default_fk_column, default_fk_name,
};

/// Loader configuration.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Derive a deterministic name for foreign keys declared without one.
    /// Disabled, an unnamed foreign key is a validation error.
    pub default_fk_name: bool,
}

/// Parse and validate a declared schema.
pub fn load_schema(source: &str, options: &ParseOptions) -> Result<Schema, Error> {
    let tokens = tokenize(source)?;
    let statements = Parser::new(tokens).parse_statements()?;
    build_schema(statements, options)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Symbol(String),
    Int(i64),
    Comma,
    Colon,
    Dot,
    Arrow,
    Pipe,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Newline,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("`{w}`"),
            Token::Str(s) => format!("{s:?}"),
            Token::Symbol(s) => format!(":{s}"),
            Token::Int(i) => i.to_string(),
            Token::Comma => "`,`".into(),
            Token::Colon => "`:`".into(),
            Token::Dot => "`.`".into(),
            Token::Arrow => "`->`".into(),
            Token::Pipe => "`|`".into(),
            Token::LBracket => "`[`".into(),
            Token::RBracket => "`]`".into(),
            Token::LBrace => "`{`".into(),
            Token::RBrace => "`}`".into(),
            Token::Newline => "end of line".into(),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, Error> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                tokens.push((line, Token::Newline));
                line += 1;
                i += 1;
            }
            ' ' | '\t' | '\r' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                let mut value = String::new();
                loop {
                    if i >= chars.len() || chars[i] == '\n' {
                        return Err(Error::parse(line, "unterminated string literal"));
                    }
                    match chars[i] {
                        '"' => {
                            i += 1;
                            break;
                        }
                        '\\' if i + 1 < chars.len() => {
                            value.push(chars[i + 1]);
                            i += 2;
                        }
                        other => {
                            value.push(other);
                            i += 1;
                        }
                    }
                }
                tokens.push((line, Token::Str(value)));
            }
            ':' => {
                if i + 1 < chars.len() && is_word_char(chars[i + 1]) && !chars[i + 1].is_ascii_digit()
                {
                    let start = i + 1;
                    i += 1;
                    while i < chars.len() && is_word_char(chars[i]) {
                        i += 1;
                    }
                    tokens.push((line, Token::Symbol(chars[start..i].iter().collect())));
                } else {
                    tokens.push((line, Token::Colon));
                    i += 1;
                }
            }
            '-' if i + 1 < chars.len() && chars[i + 1] == '>' => {
                tokens.push((line, Token::Arrow));
                i += 2;
            }
            '-' | '0'..='9' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| Error::parse(line, format!("invalid number `{text}`")))?;
                tokens.push((line, Token::Int(value)));
            }
            ',' => {
                tokens.push((line, Token::Comma));
                i += 1;
            }
            '.' => {
                tokens.push((line, Token::Dot));
                i += 1;
            }
            '|' => {
                tokens.push((line, Token::Pipe));
                i += 1;
            }
            '[' => {
                tokens.push((line, Token::LBracket));
                i += 1;
            }
            ']' => {
                tokens.push((line, Token::RBracket));
                i += 1;
            }
            '{' => {
                tokens.push((line, Token::LBrace));
                i += 1;
            }
            '}' => {
                tokens.push((line, Token::RBrace));
                i += 1;
            }
            other if is_word_char(other) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                tokens.push((line, Token::Word(chars[start..i].iter().collect())));
            }
            other => {
                return Err(Error::parse(line, format!("unexpected character `{other}`")));
            }
        }
    }
    Ok(tokens)
}

/// A parsed statement, before cross-statement validation.
#[derive(Debug)]
enum Statement {
    CreateTable(Table),
    AddIndex {
        table: String,
        index: Index,
    },
    AddForeignKey {
        from_table: String,
        to_table: String,
        name: Option<String>,
        column: Option<String>,
        primary_key: Option<String>,
        on_delete: Option<RefAction>,
        on_update: Option<RefAction>,
    },
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<(usize, Token)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(line, _)| *line)
            .unwrap_or(1)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline)) {
            self.pos += 1;
        }
    }

    fn expect_str(&mut self, what: &str) -> Result<String, Error> {
        let line = self.line();
        match self.next() {
            Some(Token::Str(s)) => Ok(s),
            Some(other) => Err(Error::parse(
                line,
                format!("expected {what}, found {}", other.describe()),
            )),
            None => Err(Error::parse(line, format!("expected {what}, found end of input"))),
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<(), Error> {
        let line = self.line();
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(other) => Err(Error::parse(
                line,
                format!("expected {}, found {}", expected.describe(), other.describe()),
            )),
            None => Err(Error::parse(
                line,
                format!("expected {}, found end of input", expected.describe()),
            )),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), Error> {
        let line = self.line();
        match self.next() {
            Some(Token::Word(w)) if w == word => Ok(()),
            Some(other) => Err(Error::parse(
                line,
                format!("expected `{word}`, found {}", other.describe()),
            )),
            None => Err(Error::parse(line, format!("expected `{word}`, found end of input"))),
        }
    }

    fn parse_statements(mut self) -> Result<Vec<Statement>, Error> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            let line = self.line();
            match self.next() {
                None => break,
                Some(Token::Word(word)) => match word.as_str() {
                    "create_table" => statements.push(self.parse_create_table()?),
                    "add_index" => statements.push(self.parse_add_index()?),
                    "add_foreign_key" => statements.push(self.parse_add_foreign_key()?),
                    other => {
                        return Err(Error::parse(line, format!("unknown statement `{other}`")));
                    }
                },
                Some(other) => {
                    return Err(Error::parse(
                        line,
                        format!("expected a statement, found {}", other.describe()),
                    ));
                }
            }
        }
        Ok(statements)
    }

    /// `key: value [, key: value ...]` up to (not consuming) `do` or end of line.
    fn parse_pairs(&mut self) -> Result<Vec<(usize, String, OptionValue)>, Error> {
        let mut pairs = Vec::new();
        loop {
            let line = self.line();
            let key = match self.next() {
                Some(Token::Word(w)) => w,
                Some(other) => {
                    return Err(Error::parse(
                        line,
                        format!("expected option name, found {}", other.describe()),
                    ));
                }
                None => return Err(Error::parse(line, "expected option name, found end of input")),
            };
            self.expect_token(Token::Colon)?;
            let value = self.parse_value()?;
            pairs.push((line, key, value));

            if matches!(self.peek(), Some(Token::Comma)) {
                self.pos += 1;
            } else {
                break;
            }
        }
        Ok(pairs)
    }

    fn parse_value(&mut self) -> Result<OptionValue, Error> {
        let line = self.line();
        match self.next() {
            Some(Token::Str(s)) => Ok(OptionValue::Str(s)),
            Some(Token::Symbol(s)) => Ok(OptionValue::Symbol(s)),
            Some(Token::Int(i)) => Ok(OptionValue::Int(i)),
            Some(Token::Word(w)) if w == "true" => Ok(OptionValue::Bool(true)),
            Some(Token::Word(w)) if w == "false" => Ok(OptionValue::Bool(false)),
            Some(Token::Arrow) => {
                self.expect_token(Token::LBrace)?;
                let expr = self.expect_str("an expression string")?;
                self.expect_token(Token::RBrace)?;
                Ok(OptionValue::Expr(expr))
            }
            Some(other) => Err(Error::parse(
                line,
                format!("expected a value, found {}", other.describe()),
            )),
            None => Err(Error::parse(line, "expected a value, found end of input")),
        }
    }

    fn parse_string_array(&mut self) -> Result<Vec<String>, Error> {
        self.expect_token(Token::LBracket)?;
        let mut items = Vec::new();
        loop {
            items.push(self.expect_str("a column name")?);
            if matches!(self.peek(), Some(Token::Comma)) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.expect_token(Token::RBracket)?;
        Ok(items)
    }

    fn parse_create_table(&mut self) -> Result<Statement, Error> {
        let name = self.expect_str("a table name")?;
        let mut table = Table::new(name);

        if matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            for (line, key, value) in self.parse_pairs()? {
                apply_table_option(&mut table, line, &key, value)?;
            }
        }

        self.expect_word("do")?;
        self.expect_token(Token::Pipe)?;
        let var = match self.next() {
            Some(Token::Word(w)) => w,
            _ => return Err(Error::parse(self.line(), "expected a block variable")),
        };
        self.expect_token(Token::Pipe)?;
        self.expect_token(Token::Newline)?;

        loop {
            self.skip_newlines();
            let line = self.line();
            match self.next() {
                Some(Token::Word(w)) if w == "end" => break,
                Some(Token::Word(w)) if w == var => {
                    self.expect_token(Token::Dot)?;
                    self.parse_table_entry(&mut table, line)?;
                }
                Some(other) => {
                    return Err(Error::parse(
                        line,
                        format!("expected `{var}.` or `end`, found {}", other.describe()),
                    ));
                }
                None => {
                    return Err(Error::parse(line, "unterminated create_table block"));
                }
            }
        }

        for (position, column) in table.columns.iter_mut().enumerate() {
            column.position = position as u32;
        }
        Ok(Statement::CreateTable(table))
    }

    /// One `t.<something>` line inside a create_table block.
    fn parse_table_entry(&mut self, table: &mut Table, line: usize) -> Result<(), Error> {
        let method = match self.next() {
            Some(Token::Word(w)) => w,
            Some(other) => {
                return Err(Error::parse(
                    line,
                    format!("expected a column type, found {}", other.describe()),
                ));
            }
            None => return Err(Error::parse(line, "expected a column type, found end of input")),
        };

        if method == "index" {
            let columns = if matches!(self.peek(), Some(Token::LBracket)) {
                self.parse_string_array()?
            } else {
                vec![self.expect_str("a column name")?]
            };
            let pairs = if matches!(self.peek(), Some(Token::Comma)) {
                self.pos += 1;
                self.parse_pairs()?
            } else {
                Vec::new()
            };
            let index = build_index(columns, pairs)?;
            table.indexes.push(index);
            return Ok(());
        }

        let (name, ctype) = if method == "column" {
            let name = self.expect_str("a column name")?;
            self.expect_token(Token::Comma)?;
            let ctype = match self.next() {
                Some(Token::Symbol(s)) => {
                    ColumnType::parse(&s).unwrap_or(ColumnType::Other(s))
                }
                Some(other) => {
                    return Err(Error::parse(
                        line,
                        format!("expected a type symbol, found {}", other.describe()),
                    ));
                }
                None => return Err(Error::parse(line, "expected a type symbol")),
            };
            (name, ctype)
        } else {
            let Some(ctype) = ColumnType::parse(&method) else {
                return Err(Error::parse(line, format!("unknown column type `{method}`")));
            };
            (self.expect_str("a column name")?, ctype)
        };

        let mut column = Column::new(name, ctype);
        if matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            for (line, key, value) in self.parse_pairs()? {
                apply_column_option(&mut column, line, &key, value)?;
            }
        }
        table.columns.push(column);
        Ok(())
    }

    fn parse_add_index(&mut self) -> Result<Statement, Error> {
        let table = self.expect_str("a table name")?;
        self.expect_token(Token::Comma)?;
        let columns = if matches!(self.peek(), Some(Token::LBracket)) {
            self.parse_string_array()?
        } else {
            vec![self.expect_str("a column name")?]
        };
        let pairs = if matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            self.parse_pairs()?
        } else {
            Vec::new()
        };
        Ok(Statement::AddIndex {
            table,
            index: build_index(columns, pairs)?,
        })
    }

    fn parse_add_foreign_key(&mut self) -> Result<Statement, Error> {
        let from_table = self.expect_str("a table name")?;
        self.expect_token(Token::Comma)?;
        let to_table = self.expect_str("a table name")?;
        let pairs = if matches!(self.peek(), Some(Token::Comma)) {
            self.pos += 1;
            self.parse_pairs()?
        } else {
            Vec::new()
        };

        let mut name = None;
        let mut column = None;
        let mut primary_key = None;
        let mut on_delete = None;
        let mut on_update = None;
        for (line, key, value) in pairs {
            match (key.as_str(), value) {
                ("name", OptionValue::Str(s)) => name = Some(s),
                ("column", OptionValue::Str(s)) => column = Some(s),
                ("primary_key", OptionValue::Str(s)) => primary_key = Some(s),
                ("on_delete", OptionValue::Symbol(s)) => {
                    on_delete = Some(parse_ref_action(line, &s)?);
                }
                ("on_update", OptionValue::Symbol(s)) => {
                    on_update = Some(parse_ref_action(line, &s)?);
                }
                (key, value) => {
                    return Err(Error::parse(
                        line,
                        format!("invalid foreign key option `{key}: {value}`"),
                    ));
                }
            }
        }

        Ok(Statement::AddForeignKey {
            from_table,
            to_table,
            name,
            column,
            primary_key,
            on_delete,
            on_update,
        })
    }
}

fn parse_ref_action(line: usize, word: &str) -> Result<RefAction, Error> {
    RefAction::parse(word)
        .ok_or_else(|| Error::parse(line, format!("unknown referential action `:{word}`")))
}

fn build_index(columns: Vec<String>, pairs: Vec<(usize, String, OptionValue)>) -> Result<Index, Error> {
    let mut index = Index {
        name: None,
        columns,
        unique: false,
        using: None,
    };
    for (line, key, value) in pairs {
        match (key.as_str(), value) {
            ("name", OptionValue::Str(s)) => index.name = Some(s),
            ("unique", OptionValue::Bool(b)) => index.unique = b,
            ("using", OptionValue::Symbol(s)) => {
                index.using = Some(IndexMethod::parse(&s).ok_or_else(|| {
                    Error::parse(line, format!("unknown index method `:{s}`"))
                })?);
            }
            (key, value) => {
                return Err(Error::parse(
                    line,
                    format!("invalid index option `{key}: {value}`"),
                ));
            }
        }
    }
    Ok(index)
}

fn apply_table_option(
    table: &mut Table,
    line: usize,
    key: &str,
    value: OptionValue,
) -> Result<(), Error> {
    match (key, value) {
        // `force: :cascade` is accepted for compatibility and not recorded;
        // it controls drop-before-create in the original tooling, which the
        // differ supersedes.
        ("force", _) => {}
        ("id", value) => table.options.id = Some(value),
        ("default", value) => table.options.default = Some(value),
        ("engine", OptionValue::Str(s)) => table.options.engine = Some(s),
        ("charset", OptionValue::Str(s)) => table.options.charset = Some(s),
        (key, OptionValue::Expr(_)) if key != "default" => {
            return Err(Error::parse(
                line,
                format!("expression value not allowed for table option `{key}`"),
            ));
        }
        (key, value) => {
            table.options.extra.insert(key.to_string(), value);
        }
    }
    Ok(())
}

fn apply_column_option(
    column: &mut Column,
    line: usize,
    key: &str,
    value: OptionValue,
) -> Result<(), Error> {
    match (key, value) {
        ("limit", OptionValue::Int(i)) if i > 0 => column.limit = Some(i as u32),
        ("null", OptionValue::Bool(b)) => column.null = b,
        ("unsigned", OptionValue::Bool(b)) => column.unsigned = b,
        ("default", OptionValue::Expr(e)) => column.default = DefaultValue::Expression(e),
        ("default", OptionValue::Str(s)) => column.default = DefaultValue::Literal(s),
        ("default", OptionValue::Int(i)) => column.default = DefaultValue::Literal(i.to_string()),
        ("default", OptionValue::Bool(b)) => column.default = DefaultValue::Literal(b.to_string()),
        (key, value) => {
            return Err(Error::parse(
                line,
                format!("invalid column option `{key}: {value}`"),
            ));
        }
    }
    Ok(())
}

/// Resolve references and validate: every table inserted first, then
/// standalone indexes attached, then foreign keys named, checked and
/// attached.
fn build_schema(statements: Vec<Statement>, options: &ParseOptions) -> Result<Schema, Error> {
    let mut schema = Schema::new();

    for statement in &statements {
        if let Statement::CreateTable(table) = statement {
            schema.insert_table(table.clone())?;
        }
    }

    let mut fk_names: HashMap<String, String> = HashMap::new();

    for statement in statements {
        match statement {
            Statement::CreateTable(_) => {}
            Statement::AddIndex { table, index, .. } => {
                let Some(t) = schema.table_mut(&table) else {
                    return Err(Error::UnknownTable(table));
                };
                // A standalone add_index duplicating an in-block index is
                // the same entity; keep the first.
                if t.index_by_key(&index.identity_key()).is_none() {
                    t.indexes.push(index);
                }
            }
            Statement::AddForeignKey {
                from_table,
                to_table,
                name,
                column,
                primary_key,
                on_delete,
                on_update,
            } => {
                let column = column.unwrap_or_else(|| default_fk_column(&to_table));
                let name = match name {
                    Some(name) => name,
                    None if options.default_fk_name => {
                        default_fk_name(&from_table, &to_table, &column)
                    }
                    None => {
                        return Err(Error::UndefinedForeignKeyName { table: from_table });
                    }
                };

                if !schema.has_table(&from_table) {
                    return Err(Error::OrphanForeignKey {
                        table: from_table,
                        name,
                    });
                }
                if !schema.has_table(&to_table) {
                    return Err(Error::OrphanForeignKey {
                        table: to_table,
                        name,
                    });
                }
                if fk_names.contains_key(&name) {
                    return Err(Error::DuplicateForeignKey {
                        table: from_table,
                        name,
                    });
                }
                fk_names.insert(name.clone(), from_table.clone());

                let fk = ForeignKey {
                    name,
                    from_table: from_table.clone(),
                    to_table,
                    column,
                    primary_key: primary_key.unwrap_or_else(|| "id".to_string()),
                    on_delete,
                    on_update,
                };
                if let Some(table) = schema.table_mut(&from_table) {
                    table.foreign_keys.push(fk);
                }
            }
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(source: &str) -> Result<Schema, Error> {
        load_schema(source, &ParseOptions::default())
    }

    #[test]
    fn parses_table_with_columns_and_index() {
        let schema = load(
            r#"
create_table "child", force: :cascade do |t|
  t.integer "parent_id", limit: 4
  t.string  "note", null: false, default: "n/a"
end

add_index "child", ["parent_id"], name: "par_id", using: :btree
"#,
        )
        .unwrap();

        let child = schema.table("child").unwrap();
        assert_eq!(child.columns.len(), 2);
        assert_eq!(child.columns[0].name, "parent_id");
        assert_eq!(child.columns[0].limit, Some(4));
        assert!(child.columns[0].null);
        assert_eq!(child.columns[1].default, DefaultValue::Literal("n/a".into()));
        assert!(!child.columns[1].null);
        assert_eq!(child.indexes.len(), 1);
        assert_eq!(child.indexes[0].name.as_deref(), Some("par_id"));
        assert_eq!(child.indexes[0].using, Some(IndexMethod::BTree));
    }

    #[test]
    fn parses_inline_index_and_generic_column() {
        let schema = load(
            r#"
create_table "child" do |t|
  t.column "parent_id", :integer
  t.index ["parent_id"], name: "par_id", unique: true
end
"#,
        )
        .unwrap();
        let child = schema.table("child").unwrap();
        assert_eq!(child.columns[0].ctype, ColumnType::Integer);
        assert!(child.indexes[0].unique);
    }

    #[test]
    fn parses_table_options_and_lambda_default() {
        let schema = load(
            r#"
create_table "users", id: :uuid, default: -> { "uuid_generate_v4()" }, force: :cascade do |t|
  t.string   "name"
  t.datetime "created_at", null: false
end
"#,
        )
        .unwrap();
        let users = schema.table("users").unwrap();
        assert_eq!(users.options.id, Some(OptionValue::Symbol("uuid".into())));
        assert_eq!(
            users.options.default,
            Some(OptionValue::Expr("uuid_generate_v4()".into()))
        );
        // force is compatibility-only, never recorded
        assert!(users.options.extra.is_empty());
    }

    #[test]
    fn resolves_forward_references() {
        // Child's fk precedes the parent table in statement order.
        let schema = load(
            r#"
add_foreign_key "child", "parent", name: "fk_child_parent"

create_table "child" do |t|
  t.integer "parent_id"
end

create_table "parent" do |t|
end
"#,
        )
        .unwrap();
        let child = schema.table("child").unwrap();
        assert_eq!(child.foreign_keys.len(), 1);
        assert_eq!(child.foreign_keys[0].column, "parent_id");
        assert_eq!(child.foreign_keys[0].primary_key, "id");
    }

    #[test]
    fn duplicate_fk_name_fails_with_exact_message() {
        let err = load(
            r#"
create_table "parent" do |t|
end

create_table "child" do |t|
  t.integer "parent_id"
end

add_foreign_key "child", "parent", name: "fk_rails_e74ce85cbc"
add_foreign_key "child", "parent", name: "fk_rails_e74ce85cbc"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Foreign Key `child(fk_rails_e74ce85cbc)` already defined"
        );
    }

    #[test]
    fn nameless_fk_fails_with_exact_message() {
        let err = load(
            r#"
create_table "parent" do |t|
end

create_table "child" do |t|
  t.integer "parent_id"
end

add_foreign_key "child", "parent"
"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Foreign key name in `child` is undefined");
    }

    #[test]
    fn nameless_fk_resolves_when_default_names_enabled() {
        let schema = load_schema(
            r#"
create_table "parent" do |t|
end

create_table "child" do |t|
  t.integer "parent_id"
end

add_foreign_key "child", "parent"
"#,
            &ParseOptions {
                default_fk_name: true,
            },
        )
        .unwrap();
        let fk = &schema.table("child").unwrap().foreign_keys[0];
        assert_eq!(fk.name, default_fk_name("child", "parent", "parent_id"));
    }

    #[test]
    fn orphan_fk_fails_with_exact_message() {
        let err = load(
            r#"
create_table "parent" do |t|
end

add_foreign_key "child", "parent", name: "fk_rails_e74ce85cbc"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table `child` to create the foreign key is not defined: fk_rails_e74ce85cbc"
        );
    }

    #[test]
    fn fk_with_missing_target_table_is_orphan_too() {
        let err = load(
            r#"
create_table "child" do |t|
  t.integer "parent_id"
end

add_foreign_key "child", "parent", name: "fk_x"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Table `parent` to create the foreign key is not defined: fk_x"
        );
    }

    #[test]
    fn duplicate_table_definition_fails() {
        let err = load(
            r#"
create_table "users" do |t|
end

create_table "users" do |t|
end
"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Table `users` already defined");
    }

    #[test]
    fn unknown_column_type_is_a_parse_error() {
        let err = load(
            r#"
create_table "users" do |t|
  t.varchar "name"
end
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }), "{err}");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let schema = load(
            r#"
# Define parent before child
create_table "parent" do |t|
end

# trailing comment
create_table "child" do |t|
  t.integer "parent_id" # not here though
end
"#,
        )
        .unwrap();
        assert_eq!(schema.len(), 2);
    }
}
