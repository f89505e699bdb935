use super::truncate_sql_bytes;
use super::types::{EventKind, EventListener};
use crate::error::{DbError, ListenerResult};
use crate::result_set::ResultSetInfo;
use crate::statement::StatementInfo;
use std::time::Duration;
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// A `tracing`-based listener that logs executed statements with their bound
/// values substituted.
///
/// Statement, batch and transaction events go to target `sqlspy.sql`; row
/// values go to `sqlspy.result_set`. Failed operations and slow statements
/// are always logged at WARN.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    /// Tracing event level for successful operations.
    pub level: Level,
    /// Minimum duration to log (filters out fast statements).
    pub min_duration: Option<Duration>,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Log the reconstructed SQL instead of the raw SQL.
    pub log_values: bool,
    /// Log the values read from each result-set row.
    pub log_rows: bool,
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            min_duration: None,
            max_sql_length: Some(200),
            log_values: true,
            log_rows: false,
        }
    }
}

impl LoggingListener {
    /// Create a new listener with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Only log statements slower than this duration.
    pub fn min_duration(mut self, duration: Duration) -> Self {
        self.min_duration = Some(duration);
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Log the raw SQL with its `?` placeholders.
    pub fn without_values(mut self) -> Self {
        self.log_values = false;
        self
    }

    /// Log the values read from result-set rows.
    pub fn with_rows(mut self) -> Self {
        self.log_rows = true;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    pub(crate) fn should_log(&self, elapsed: Duration, error: Option<&DbError>) -> bool {
        error.is_some() || self.min_duration.is_none_or(|min| elapsed >= min)
    }

    fn statement_sql(&self, statement: &StatementInfo) -> String {
        if self.log_values {
            self.truncate_sql(&statement.sql_with_values())
        } else {
            self.truncate_sql(statement.sql())
        }
    }

    fn log_statement(
        &self,
        event: EventKind,
        statement: &StatementInfo,
        elapsed: Duration,
        rows: Option<i64>,
        error: Option<&DbError>,
    ) {
        if !self.should_log(elapsed, error) {
            return;
        }

        let sql = self.statement_sql(statement);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match error {
            Some(error) => tracing::warn!(
                target: "sqlspy.sql",
                kind = %event,
                category = %event.category(),
                elapsed_ms,
                sql = %sql,
                sql_state = error.sql_state.as_deref().unwrap_or("-"),
                error = %error,
                "statement failed"
            ),
            None => emit_at_level!(
                self.level,
                target: "sqlspy.sql",
                kind = %event,
                category = %event.category(),
                elapsed_ms,
                rows = ?rows,
                sql = %sql,
            ),
        }
    }

    fn log_simple(&self, event: EventKind, elapsed: Duration, error: Option<&DbError>) {
        if !self.should_log(elapsed, error) {
            return;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match error {
            Some(error) => tracing::warn!(
                target: "sqlspy.sql",
                kind = %event,
                category = %event.category(),
                elapsed_ms,
                error = %error,
                "operation failed"
            ),
            None => emit_at_level!(
                self.level,
                target: "sqlspy.sql",
                kind = %event,
                category = %event.category(),
                elapsed_ms,
            ),
        }
    }

    fn log_row(&self, result_set: &ResultSetInfo) {
        if !self.log_rows || result_set.row_values().is_empty() || !result_set.mark_row_logged() {
            return;
        }

        emit_at_level!(
            self.level,
            target: "sqlspy.result_set",
            row = result_set.current_row(),
            values = %result_set.row_string(),
            sql = %self.truncate_sql(result_set.sql_with_values()),
        );
    }
}

impl EventListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_after_get_connection(
        &self,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_simple(EventKind::AfterGetConnection, elapsed, error);
        Ok(())
    }

    fn on_after_add_batch(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_statement(EventKind::AfterAddBatch, statement, elapsed, None, error);
        Ok(())
    }

    fn on_after_execute_batch(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        update_counts: &[i64],
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        let rows = update_counts.iter().filter(|&&n| n > 0).sum();
        self.log_statement(
            EventKind::AfterExecuteBatch,
            statement,
            elapsed,
            Some(rows),
            error,
        );
        Ok(())
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_statement(EventKind::AfterExecute, statement, elapsed, None, error);
        Ok(())
    }

    fn on_after_execute_update(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_statement(
            EventKind::AfterExecuteUpdate,
            statement,
            elapsed,
            Some(row_count),
            error,
        );
        Ok(())
    }

    fn on_after_execute_update_with_values(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
        _values: &super::ListenerResults<serde_json::Value>,
    ) -> ListenerResult<()> {
        self.log_statement(
            EventKind::AfterExecuteUpdateWithValues,
            statement,
            elapsed,
            Some(row_count),
            error,
        );
        Ok(())
    }

    fn on_after_execute_query(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_statement(EventKind::AfterExecuteQuery, statement, elapsed, None, error);
        Ok(())
    }

    fn on_slow_statement(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
    ) -> ListenerResult<()> {
        tracing::warn!(
            target: "sqlspy.sql",
            statement_type = ?statement.statement_type(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            sql = %self.statement_sql(statement),
            "slow statement"
        );
        Ok(())
    }

    fn on_before_result_set_next(&self, result_set: &ResultSetInfo) -> ListenerResult<()> {
        self.log_row(result_set);
        Ok(())
    }

    fn on_after_result_set_close(
        &self,
        result_set: &ResultSetInfo,
        _error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.log_row(result_set);
        Ok(())
    }

    fn on_after_commit(&self, elapsed: Duration, error: Option<&DbError>) -> ListenerResult<()> {
        self.log_simple(EventKind::AfterCommit, elapsed, error);
        Ok(())
    }

    fn on_after_rollback(&self, elapsed: Duration, error: Option<&DbError>) -> ListenerResult<()> {
        self.log_simple(EventKind::AfterRollback, elapsed, error);
        Ok(())
    }
}
