//! Result-set tracking for row-level events.

use crate::statement::StatementInfo;
use crate::value::BoundValue;
use std::cell::Cell;
use std::fmt;

/// Column addressed by a result-set getter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRef<'a> {
    /// 1-based column index
    Index(usize),
    /// Column label
    Label(&'a str),
}

impl fmt::Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Index(index) => write!(f, "{index}"),
            ColumnRef::Label(label) => f.write_str(label),
        }
    }
}

/// State of one open result set: the row cursor and the values read from the
/// current row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSetInfo {
    sql_with_values: String,
    current_row: i64,
    row_values: Vec<(String, BoundValue)>,
    last_logged_row: Cell<i64>,
}

impl ResultSetInfo {
    /// Track a result set produced by `statement`.
    pub fn new(statement: &StatementInfo) -> Self {
        Self {
            sql_with_values: statement.sql_with_values(),
            current_row: -1,
            row_values: Vec::new(),
            last_logged_row: Cell::new(-1),
        }
    }

    /// Reconstructed SQL of the statement that produced this result set.
    pub fn sql_with_values(&self) -> &str {
        &self.sql_with_values
    }

    /// Zero-based index of the current row; `-1` before the first `next`.
    pub fn current_row(&self) -> i64 {
        self.current_row
    }

    /// Move to the next row and forget the previous row's values.
    pub fn increment_current_row(&mut self) {
        self.current_row += 1;
        self.row_values.clear();
    }

    /// Record a value read from the current row. Reading the same column
    /// again replaces the earlier value.
    pub fn set_column_value(&mut self, column: ColumnRef<'_>, value: BoundValue) {
        let key = column.to_string();
        match self.row_values.iter_mut().find(|(name, _)| *name == key) {
            Some((_, slot)) => *slot = value,
            None => self.row_values.push((key, value)),
        }
    }

    /// Mark the current row as logged.
    ///
    /// Returns `false` before the first row and when the current row was
    /// already marked, so a row is logged once even though both the next
    /// `next` call and the close can report it.
    pub fn mark_row_logged(&self) -> bool {
        if self.current_row < 0 || self.last_logged_row.get() == self.current_row {
            return false;
        }
        self.last_logged_row.set(self.current_row);
        true
    }

    /// Values read from the current row, in read order.
    pub fn row_values(&self) -> &[(String, BoundValue)] {
        &self.row_values
    }

    /// `col = literal` pairs of the current row, comma separated.
    pub fn row_string(&self) -> String {
        let mut out = String::new();
        for (i, (column, value)) in self.row_values.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(column);
            out.push_str(" = ");
            value.write_literal(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_before_first_row() {
        let mut stmt = StatementInfo::new("SELECT * FROM t WHERE id = ?");
        stmt.set_parameter_value(1, 3);
        let rs = ResultSetInfo::new(&stmt);

        assert_eq!(rs.current_row(), -1);
        assert_eq!(rs.sql_with_values(), "SELECT * FROM t WHERE id = 3");
        assert!(rs.row_values().is_empty());
    }

    #[test]
    fn captures_values_of_current_row() {
        let mut rs = ResultSetInfo::new(&StatementInfo::plain("SELECT id, name FROM t"));
        rs.increment_current_row();
        rs.set_column_value(ColumnRef::Index(1), BoundValue::Int(1));
        rs.set_column_value(ColumnRef::Label("name"), BoundValue::from("bob"));
        rs.set_column_value(ColumnRef::Label("name"), BoundValue::from("alice"));

        assert_eq!(rs.current_row(), 0);
        assert_eq!(rs.row_string(), "1 = 1, name = 'alice'");

        rs.increment_current_row();
        assert_eq!(rs.current_row(), 1);
        assert_eq!(rs.row_string(), "");
    }

    #[test]
    fn each_row_is_marked_logged_once() {
        let mut rs = ResultSetInfo::new(&StatementInfo::plain("SELECT 1"));
        assert!(!rs.mark_row_logged());

        rs.increment_current_row();
        assert!(rs.mark_row_logged());
        assert!(!rs.mark_row_logged());

        rs.increment_current_row();
        assert!(rs.mark_row_logged());
    }
}
