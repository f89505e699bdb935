//! Statement information: SQL text, recorded bindings and reconstruction.
//!
//! A [`StatementInfo`] is created for each logical execution (or batch
//! element), receives bindings as the statement wrapper observes them, and is
//! handed to listeners by reference. Reconstruction replaces each `?` with the
//! literal of the corresponding binding and is meant for logs only, never for
//! execution.
//!
//! # Example
//!
//! ```rust
//! use sqlspy::statement_info;
//!
//! let mut stmt = statement_info("SELECT * FROM t WHERE a=? AND b=?");
//! stmt.set_parameter_value(1, 5);
//! assert_eq!(stmt.sql_with_values(), "SELECT * FROM t WHERE a=5 AND b=null");
//! ```

mod params;

#[cfg(test)]
mod tests;

pub use params::ParameterStore;

use crate::error::SpyResult;
use crate::value::{BoundValue, NULL_LITERAL};
use serde::Serialize;

/// How the statement was created by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Plain statement, SQL executed as-is.
    Plain,
    /// Prepared statement with positional `?` parameters.
    Prepared,
    /// Callable (stored procedure) statement; accepts named parameters too.
    Callable,
}

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Other SQL (e.g., DDL, CALL)
    Other,
}

impl StatementType {
    /// Detect statement type from SQL string.
    ///
    /// For CTEs (`WITH ...`), looks past the CTE definitions to find the
    /// actual DML keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") {
            StatementType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            StatementType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            StatementType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            StatementType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::detect_cte_dml(trimmed)
        } else {
            StatementType::Other
        }
    }

    /// The final statement follows the last top-level closing paren of the
    /// CTE definitions.
    fn detect_cte_dml(sql: &str) -> Self {
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                b'\'' => i = skip_quoted(bytes, i, b'\''),
                _ => {}
            }
            i += 1;
        }

        let remainder = sql[last_top_level..].trim_start();
        if starts_with_keyword(remainder, "INSERT") {
            StatementType::Insert
        } else if starts_with_keyword(remainder, "UPDATE") {
            StatementType::Update
        } else if starts_with_keyword(remainder, "DELETE") {
            StatementType::Delete
        } else {
            StatementType::Select
        }
    }
}

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// to find the first meaningful keyword.
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
        None => false,
    }
}

/// Return the index of the closing `quote` for the literal opened at `start`.
///
/// A doubled quote inside the literal is an escaped quote. Unterminated
/// literals run to the end of input.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 1;
            } else {
                return i;
            }
        }
        i += 1;
    }
    i
}

fn push_binding(out: &mut String, value: Option<&BoundValue>) {
    match value {
        Some(value) => value.write_literal(out),
        None => out.push_str(NULL_LITERAL),
    }
}

fn reserve_for(sql: &str, params: &ParameterStore) -> String {
    String::with_capacity(sql.len() + params.len() * 8)
}

/// Replace every `?` in `sql` with the literal of the corresponding binding.
///
/// The scan is not quote-aware: a `?` inside a string literal in the SQL text
/// also consumes a binding. Slots without a binding render as `null`.
pub fn sql_with_values(sql: &str, params: &ParameterStore) -> String {
    let mut out = reserve_for(sql, params);
    let mut next_placeholder = 0;
    for ch in sql.chars() {
        if ch == '?' {
            push_binding(&mut out, params.get(next_placeholder));
            next_placeholder += 1;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Like [`sql_with_values`], but `?` inside single-quoted literals and
/// double-quoted identifiers is copied verbatim.
pub fn sql_with_values_quote_aware(sql: &str, params: &ParameterStore) -> String {
    let mut out = reserve_for(sql, params);
    let bytes = sql.as_bytes();
    let mut next_placeholder = 0;
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => i = skip_quoted(bytes, i, quote),
            b'?' => {
                out.push_str(&sql[copied..i]);
                push_binding(&mut out, params.get(next_placeholder));
                next_placeholder += 1;
                copied = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&sql[copied..]);
    out
}

/// Start tracking a prepared statement.
pub fn statement_info(sql: impl Into<String>) -> StatementInfo {
    StatementInfo::new(sql)
}

/// SQL text and bindings of one statement execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementInfo {
    sql: String,
    kind: StatementKind,
    parameters: ParameterStore,
}

impl StatementInfo {
    /// Create info for a prepared statement.
    pub fn new(sql: impl Into<String>) -> Self {
        Self::with_kind(sql, StatementKind::Prepared)
    }

    /// Create info for a plain statement; its SQL carries no placeholders.
    pub fn plain(sql: impl Into<String>) -> Self {
        Self::with_kind(sql, StatementKind::Plain)
    }

    /// Create info for a callable statement.
    pub fn callable(sql: impl Into<String>) -> Self {
        Self::with_kind(sql, StatementKind::Callable)
    }

    fn with_kind(sql: impl Into<String>, kind: StatementKind) -> Self {
        Self {
            sql: sql.into(),
            kind,
            parameters: ParameterStore::new(),
        }
    }

    /// The original SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Detected statement type.
    pub fn statement_type(&self) -> StatementType {
        StatementType::from_sql(&self.sql)
    }

    /// Recorded bindings.
    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    /// Bind a value at a 1-based position.
    pub fn set_parameter_value(&mut self, position: usize, value: impl Into<BoundValue>) {
        self.parameters.set(position, value);
    }

    /// Bind a value to a named parameter.
    pub fn set_named_parameter_value(
        &mut self,
        name: impl Into<String>,
        value: impl Into<BoundValue>,
    ) {
        self.parameters.set_named(name, value);
    }

    /// Binding at a zero-based slot, if any.
    pub fn parameter_value(&self, slot: usize) -> Option<&BoundValue> {
        self.parameters.get(slot)
    }

    /// Named binding, if any.
    pub fn named_parameter_value(&self, name: &str) -> Option<&BoundValue> {
        self.parameters.get_named(name)
    }

    /// Drop all bindings, e.g. between batch elements.
    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Number of `?` characters in the SQL text (not quote-aware).
    pub fn placeholder_count(&self) -> usize {
        self.sql.chars().filter(|&c| c == '?').count()
    }

    /// SQL with bound values substituted, for display.
    ///
    /// Plain statements are returned verbatim.
    pub fn sql_with_values(&self) -> String {
        match self.kind {
            StatementKind::Plain => self.sql.clone(),
            StatementKind::Prepared | StatementKind::Callable => {
                sql_with_values(&self.sql, &self.parameters)
            }
        }
    }

    /// Like [`sql_with_values`](Self::sql_with_values), skipping `?` inside
    /// quoted literals and identifiers.
    pub fn sql_with_values_quote_aware(&self) -> String {
        match self.kind {
            StatementKind::Plain => self.sql.clone(),
            StatementKind::Prepared | StatementKind::Callable => {
                sql_with_values_quote_aware(&self.sql, &self.parameters)
            }
        }
    }

    /// JSON snapshot with the original and reconstructed SQL.
    pub fn to_json(&self) -> SpyResult<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert(
                "sql_with_values".to_string(),
                serde_json::Value::String(self.sql_with_values()),
            );
        }
        Ok(value)
    }
}
