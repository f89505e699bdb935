use super::dispatcher::ListenerResults;
use super::types::EventListener;
use crate::error::{DbError, ListenerResult};
use crate::result_set::ResultSetInfo;
use crate::statement::{StatementInfo, StatementType};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A listener that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EventListener for NoopListener {
    fn name(&self) -> &str {
        "noop"
    }
}

/// A listener that tracks execution statistics.
#[derive(Debug, Default)]
pub struct StatsListener {
    statements_executed: AtomicU64,
    failed_statements: AtomicU64,
    total_duration_nanos: AtomicU64,
    max_duration_nanos: AtomicU64,
    slowest_statement: Mutex<Option<String>>,
    select_count: AtomicU64,
    insert_count: AtomicU64,
    update_count: AtomicU64,
    delete_count: AtomicU64,
    rows_affected: AtomicU64,
    batches_executed: AtomicU64,
    batch_elements: AtomicU64,
    rows_fetched: AtomicU64,
    slow_statements: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    connections_opened: AtomicU64,
    connection_failures: AtomicU64,
}

/// Collected statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpyStats {
    /// Statements executed (execute, update, query and batch executions).
    pub statements_executed: u64,
    /// Executions that reported a driver error.
    pub failed_statements: u64,
    /// Total execution time.
    pub total_duration: Duration,
    /// Slowest execution duration.
    pub max_duration: Duration,
    /// Reconstructed SQL of the slowest execution.
    pub slowest_statement: Option<String>,
    /// Number of SELECT executions.
    pub select_count: u64,
    /// Number of INSERT executions.
    pub insert_count: u64,
    /// Number of UPDATE executions.
    pub update_count: u64,
    /// Number of DELETE executions.
    pub delete_count: u64,
    /// Rows reported by updates and batches.
    pub rows_affected: u64,
    /// Batches executed.
    pub batches_executed: u64,
    /// Elements added to batches.
    pub batch_elements: u64,
    /// Rows the result-set cursor moved onto.
    pub rows_fetched: u64,
    /// Executions over the slow statement threshold.
    pub slow_statements: u64,
    /// Successful commits.
    pub commits: u64,
    /// Successful rollbacks.
    pub rollbacks: u64,
    /// Connections acquired.
    pub connections_opened: u64,
    /// Failed connection attempts.
    pub connection_failures: u64,
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

fn saturating_add(counter: &AtomicU64, amount: u64) {
    let prev = counter.fetch_add(amount, Ordering::Relaxed);
    if prev.checked_add(amount).is_none() {
        counter.store(u64::MAX, Ordering::Relaxed);
    }
}

impl StatsListener {
    /// Create a new stats listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current statistics.
    pub fn stats(&self) -> SpyStats {
        SpyStats {
            statements_executed: self.statements_executed.load(Ordering::Relaxed),
            failed_statements: self.failed_statements.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_statement: self.slowest_statement_guard().clone(),
            select_count: self.select_count.load(Ordering::Relaxed),
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            delete_count: self.delete_count.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            batches_executed: self.batches_executed.load(Ordering::Relaxed),
            batch_elements: self.batch_elements.load(Ordering::Relaxed),
            rows_fetched: self.rows_fetched.load(Ordering::Relaxed),
            slow_statements: self.slow_statements.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
        }
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        for counter in [
            &self.statements_executed,
            &self.failed_statements,
            &self.total_duration_nanos,
            &self.max_duration_nanos,
            &self.select_count,
            &self.insert_count,
            &self.update_count,
            &self.delete_count,
            &self.rows_affected,
            &self.batches_executed,
            &self.batch_elements,
            &self.rows_fetched,
            &self.slow_statements,
            &self.commits,
            &self.rollbacks,
            &self.connections_opened,
            &self.connection_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        *self.slowest_statement_guard() = None;
    }

    // A panic while holding the lock cannot leave the Option half-written.
    fn slowest_statement_guard(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slowest_statement
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_execution(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) {
        let nanos = saturating_nanos(elapsed);

        self.statements_executed.fetch_add(1, Ordering::Relaxed);
        saturating_add(&self.total_duration_nanos, nanos);

        match statement.statement_type() {
            StatementType::Select => self.select_count.fetch_add(1, Ordering::Relaxed),
            StatementType::Insert => self.insert_count.fetch_add(1, Ordering::Relaxed),
            StatementType::Update => self.update_count.fetch_add(1, Ordering::Relaxed),
            StatementType::Delete => self.delete_count.fetch_add(1, Ordering::Relaxed),
            StatementType::Other => 0,
        };

        if error.is_some() {
            self.failed_statements.fetch_add(1, Ordering::Relaxed);
        }

        // Update max duration + slowest statement only when we become the new max.
        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self.slowest_statement_guard() = Some(statement.sql_with_values());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn record_rows(&self, row_count: i64, error: Option<&DbError>) {
        if error.is_none() {
            if let Ok(rows) = u64::try_from(row_count) {
                saturating_add(&self.rows_affected, rows);
            }
        }
    }
}

impl EventListener for StatsListener {
    fn name(&self) -> &str {
        "stats"
    }

    fn on_after_get_connection(
        &self,
        _elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        match error {
            Some(_) => self.connection_failures.fetch_add(1, Ordering::Relaxed),
            None => self.connections_opened.fetch_add(1, Ordering::Relaxed),
        };
        Ok(())
    }

    fn on_after_add_batch(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        if error.is_none() {
            self.batch_elements.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn on_after_execute_batch(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        update_counts: &[i64],
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
        self.record_execution(statement, elapsed, error);
        for &count in update_counts {
            self.record_rows(count, error);
        }
        Ok(())
    }

    fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.record_execution(statement, elapsed, error);
        Ok(())
    }

    fn on_after_execute_update(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.record_execution(statement, elapsed, error);
        self.record_rows(row_count, error);
        Ok(())
    }

    fn on_after_execute_update_with_values(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
        _values: &ListenerResults<serde_json::Value>,
    ) -> ListenerResult<()> {
        self.record_execution(statement, elapsed, error);
        self.record_rows(row_count, error);
        Ok(())
    }

    fn on_after_execute_query(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        self.record_execution(statement, elapsed, error);
        Ok(())
    }

    fn on_slow_statement(
        &self,
        _statement: &StatementInfo,
        _elapsed: Duration,
    ) -> ListenerResult<()> {
        self.slow_statements.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn on_after_result_set_next(
        &self,
        _result_set: &ResultSetInfo,
        _elapsed: Duration,
        has_next: bool,
        error: Option<&DbError>,
    ) -> ListenerResult<()> {
        if has_next && error.is_none() {
            self.rows_fetched.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn on_after_commit(&self, _elapsed: Duration, error: Option<&DbError>) -> ListenerResult<()> {
        if error.is_none() {
            self.commits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn on_after_rollback(&self, _elapsed: Duration, error: Option<&DbError>) -> ListenerResult<()> {
        if error.is_none() {
            self.rollbacks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}
