//! SQL identifier quoting and statement helpers for CrateDB

use crate::error::{CtkError, Result};

/// Reserved words which always need quoting when used as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "add", "all", "alter", "and", "any", "array", "as", "asc", "between", "by", "called", "case",
    "cast", "column", "constraint", "costs", "create", "cross", "current_date", "current_schema",
    "current_time", "current_timestamp", "current_user", "default", "delete", "deny", "desc",
    "describe", "directory", "distinct", "drop", "else", "end", "escape", "except", "exists",
    "extract", "false", "first", "for", "from", "full", "function", "grant", "group", "having",
    "if", "in", "index", "inner", "input", "insert", "intersect", "into", "is", "join", "last",
    "left", "like", "limit", "match", "natural", "not", "null", "nulls", "object", "offset", "on",
    "or", "order", "outer", "persistent", "recursive", "reset", "returns", "revoke", "right",
    "select", "session_user", "set", "some", "stratify", "table", "then", "transient", "true",
    "try_cast", "unbounded", "union", "update", "user", "using", "when", "where", "with",
];

/// Name of the column holding primary key attributes
pub const PK_COLUMN: &str = "pk";

/// Name of the column holding the full document
pub const DATA_COLUMN: &str = "data";

/// Name of the column holding auxiliary, non-indexed values
pub const AUX_COLUMN: &str = "aux";

fn is_plain_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quote an identifier when needed.
pub fn quote_ident(name: &str) -> String {
    if is_plain_ident(name) && !RESERVED_WORDS.contains(&name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Reverse `quote_ident` for a single identifier.
pub fn unquote_ident(name: &str) -> String {
    let name = name.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        name[1..name.len() - 1].replace("\"\"", "\"")
    } else {
        name.to_string()
    }
}

/// Quote a relation name like `schema.table`, leaving quoted names untouched.
pub fn quote_relation_name(name: &str) -> Result<String> {
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        return Ok(name.to_string());
    }
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [table] => Ok(quote_ident(table)),
        [schema, table] => Ok(format!("{}.{}", quote_ident(schema), quote_ident(table))),
        _ => Err(CtkError::InvalidAddress(format!(
            "Invalid relation name: {}",
            name
        ))),
    }
}

/// DDL for a table holding translated documents.
///
/// `pk` is a strict object, so every key attribute has to be declared as a
/// sub-column with its type.
pub fn create_table_for_documents(table: &str, pk_columns: &[(&str, &str)]) -> String {
    let pk_definition = if pk_columns.is_empty() {
        "OBJECT(STRICT)".to_string()
    } else {
        let columns: Vec<String> = pk_columns
            .iter()
            .map(|(name, sql_type)| format!("{} {}", quote_ident(name), sql_type))
            .collect();
        format!("OBJECT(STRICT) AS ({})", columns.join(", "))
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} {}, {} OBJECT(DYNAMIC), {} OBJECT(IGNORED))",
        table, PK_COLUMN, pk_definition, DATA_COLUMN, AUX_COLUMN
    )
}

/// Parameterised insert for a table holding translated documents.
pub fn insert_documents(table: &str) -> String {
    format!(
        "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
        table, PK_COLUMN, DATA_COLUMN, AUX_COLUMN
    )
}

pub fn count_records(table: &str) -> String {
    format!("SELECT COUNT(*) AS count FROM {}", table)
}

pub fn refresh_table(table: &str) -> String {
    format!("REFRESH TABLE {}", table)
}

/// Column listing for one table; takes `[schema, table]` as arguments.
pub fn table_columns() -> &'static str {
    "SELECT column_name, data_type, is_nullable \
     FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY ordinal_position"
}

/// Table existence check; takes `[schema, table]` as arguments.
pub fn table_exists() -> &'static str {
    "SELECT table_name FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ?"
}
