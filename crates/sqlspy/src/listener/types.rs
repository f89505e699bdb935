use super::dispatcher::ListenerResults;
use crate::error::{DbError, ListenerResult};
use crate::result_set::{ColumnRef, ResultSetInfo};
use crate::statement::StatementInfo;
use crate::value::BoundValue;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Coarse grouping of events, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Connection acquisition and close
    Connection,
    /// Statement execution and close
    Statement,
    /// Batch building and execution
    Batch,
    /// Result-set cursor and getters
    ResultSet,
    /// Commit and rollback
    Transaction,
}

impl EventCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Connection => "connection",
            EventCategory::Statement => "statement",
            EventCategory::Batch => "batch",
            EventCategory::ResultSet => "result_set",
            EventCategory::Transaction => "transaction",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every event a listener can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BeforeGetConnection,
    AfterGetConnection,
    AfterConnectionClose,
    BeforeAddBatch,
    AfterAddBatch,
    BeforeExecuteBatch,
    AfterExecuteBatch,
    BeforeExecute,
    AfterExecute,
    BeforeExecuteUpdate,
    AfterExecuteUpdate,
    BeforeExecuteUpdateWithValue,
    AfterExecuteUpdateWithValues,
    BeforeExecuteQuery,
    AfterExecuteQuery,
    SlowStatement,
    AfterStatementClose,
    AfterGetResultSet,
    BeforeResultSetNext,
    AfterResultSetNext,
    AfterResultSetGet,
    AfterResultSetClose,
    BeforeCommit,
    AfterCommit,
    BeforeRollback,
    AfterRollback,
}

impl EventKind {
    pub fn category(self) -> EventCategory {
        use EventKind::*;

        match self {
            BeforeGetConnection | AfterGetConnection | AfterConnectionClose => {
                EventCategory::Connection
            }
            BeforeAddBatch | AfterAddBatch | BeforeExecuteBatch | AfterExecuteBatch => {
                EventCategory::Batch
            }
            BeforeExecute
            | AfterExecute
            | BeforeExecuteUpdate
            | AfterExecuteUpdate
            | BeforeExecuteUpdateWithValue
            | AfterExecuteUpdateWithValues
            | BeforeExecuteQuery
            | AfterExecuteQuery
            | SlowStatement
            | AfterStatementClose => EventCategory::Statement,
            AfterGetResultSet
            | BeforeResultSetNext
            | AfterResultSetNext
            | AfterResultSetGet
            | AfterResultSetClose => EventCategory::ResultSet,
            BeforeCommit | AfterCommit | BeforeRollback | AfterRollback => {
                EventCategory::Transaction
            }
        }
    }

    /// Whether a listener failure on this event stops delivery and is
    /// returned immediately.
    pub fn is_fail_fast(self) -> bool {
        matches!(
            self,
            EventKind::BeforeExecuteUpdateWithValue | EventKind::AfterExecuteUpdateWithValues
        )
    }

    pub fn as_str(self) -> &'static str {
        use EventKind::*;

        match self {
            BeforeGetConnection => "before_get_connection",
            AfterGetConnection => "after_get_connection",
            AfterConnectionClose => "after_connection_close",
            BeforeAddBatch => "before_add_batch",
            AfterAddBatch => "after_add_batch",
            BeforeExecuteBatch => "before_execute_batch",
            AfterExecuteBatch => "after_execute_batch",
            BeforeExecute => "before_execute",
            AfterExecute => "after_execute",
            BeforeExecuteUpdate => "before_execute_update",
            AfterExecuteUpdate => "after_execute_update",
            BeforeExecuteUpdateWithValue => "before_execute_update_with_value",
            AfterExecuteUpdateWithValues => "after_execute_update_with_values",
            BeforeExecuteQuery => "before_execute_query",
            AfterExecuteQuery => "after_execute_query",
            SlowStatement => "slow_statement",
            AfterStatementClose => "after_statement_close",
            AfterGetResultSet => "after_get_result_set",
            BeforeResultSetNext => "before_result_set_next",
            AfterResultSetNext => "after_result_set_next",
            AfterResultSetGet => "after_result_set_get",
            AfterResultSetClose => "after_result_set_close",
            BeforeCommit => "before_commit",
            AfterCommit => "after_commit",
            BeforeRollback => "before_rollback",
            AfterRollback => "after_rollback",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives instrumentation events from a [`Dispatcher`](super::Dispatcher).
///
/// Every method has a no-op default, so implementations only override what
/// they care about. After-events carry the elapsed time of the driver call and
/// the driver error, if the call failed.
///
/// Listeners run in-line on the thread that reports the event and must not
/// block indefinitely.
pub trait EventListener: Send + Sync {
    /// Name used in [`ListenerId`](super::ListenerId) and error reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    // ── Connection ──

    fn on_before_get_connection(&self) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_get_connection(
        &self,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_connection_close(&self, _error: Option<&DbError>) -> ListenerResult<()> {
        Ok(())
    }

    // ── Batch ──

    fn on_before_add_batch(&self, _statement: &StatementInfo) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_add_batch(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_before_execute_batch(&self, _statement: &StatementInfo) -> ListenerResult<()> {
        Ok(())
    }

    /// `update_counts` holds one entry per batch element as reported by the driver.
    fn on_after_execute_batch(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _update_counts: &[i64],
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    // ── Statement ──

    fn on_before_execute(&self, _statement: &StatementInfo) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_execute(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_before_execute_update(&self, _statement: &StatementInfo) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_execute_update(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _row_count: i64,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// Called before an update whose caller wants a value from each listener
    /// (an annotation, a veto token, a captured "before" image).
    ///
    /// Returning an error stops delivery to later listeners and aborts the
    /// dispatch.
    fn on_before_execute_update_with_value(
        &self,
        _statement: &StatementInfo,
    ) -> ListenerResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    /// Called after an update announced with
    /// [`on_before_execute_update_with_value`](Self::on_before_execute_update_with_value).
    ///
    /// `values` holds every listener's value from the before-call; look up
    /// your own with [`ListenerResults::get_by_name`]. Returning an error stops
    /// delivery to later listeners.
    fn on_after_execute_update_with_values(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _row_count: i64,
        _error: Option<&DbError>,
        _values: &ListenerResults<serde_json::Value>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_before_execute_query(&self, _statement: &StatementInfo) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_execute_query(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// Called after an execution exceeded the configured slow statement threshold.
    fn on_slow_statement(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_statement_close(
        &self,
        _statement: &StatementInfo,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    // ── Result set ──

    fn on_after_get_result_set(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    /// Called before the cursor moves; the values of the row being left are
    /// still available.
    fn on_before_result_set_next(&self, _result_set: &ResultSetInfo) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_result_set_next(
        &self,
        _result_set: &ResultSetInfo,
        _elapsed: Duration,
        _has_next: bool,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_result_set_get(
        &self,
        _result_set: &ResultSetInfo,
        _column: ColumnRef<'_>,
        _value: &BoundValue,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_result_set_close(
        &self,
        _result_set: &ResultSetInfo,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }

    // ── Transaction ──

    fn on_before_commit(&self) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_commit(&self, _elapsed: Duration, _error: Option<&DbError>) -> ListenerResult<()> {
        Ok(())
    }

    fn on_before_rollback(&self) -> ListenerResult<()> {
        Ok(())
    }

    fn on_after_rollback(
        &self,
        _elapsed: Duration,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        Ok(())
    }
}
