use super::config::DispatcherConfig;
use super::types::{EventKind, EventListener};
use crate::error::{
    DbError, DispatchErrors, ListenerFailure, ListenerResult, SpyError, SpyResult,
};
use crate::result_set::{ColumnRef, ResultSetInfo};
use crate::statement::StatementInfo;
use crate::value::BoundValue;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Stable identity of a registered listener: its registration index and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListenerId {
    index: usize,
    name: String,
}

impl ListenerId {
    pub(crate) fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }

    /// Position in registration (and dispatch) order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// One result per listener, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerResults<T> {
    entries: Vec<(ListenerId, T)>,
}

impl<T> Default for ListenerResults<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ListenerResults<T> {
    /// Create an empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, id: ListenerId, value: T) {
        self.entries.push((id, value));
    }

    /// Result produced by the listener with `id`.
    pub fn get(&self, id: &ListenerId) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, value)| value)
    }

    /// Result produced by the first listener named `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(id, _)| id.name() == name)
            .map(|(_, value)| value)
    }

    /// `(listener, result)` pairs in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (&ListenerId, &T)> {
        self.entries.iter().map(|(id, value)| (id, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<(ListenerId, T)> {
        self.entries
    }
}

impl<T> IntoIterator for ListenerResults<T> {
    type Item = (ListenerId, T);
    type IntoIter = std::vec::IntoIter<(ListenerId, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A listener together with the identity assigned at registration.
#[derive(Clone)]
pub struct RegisteredListener {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
}

impl RegisteredListener {
    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    pub fn listener(&self) -> &Arc<dyn EventListener> {
        &self.listener
    }
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Fans every event out to the registered listeners, in registration order.
///
/// Notification events are delivered to every listener; failures are
/// collected and returned together as [`SpyError::Dispatch`] once all
/// listeners have run. Events that produce a value per listener, or that are
/// documented as error-propagating, stop at the first failure and return it
/// as [`SpyError::Listener`].
///
/// Listeners are added through `&mut self` before the dispatcher is shared;
/// dispatch only needs `&self`, so a built dispatcher can be wrapped in an
/// `Arc` and used from many threads.
#[derive(Debug, Default)]
pub struct Dispatcher {
    listeners: Vec<RegisteredListener>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Create a dispatcher with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch configuration.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a listener.
    #[allow(clippy::should_implement_trait)]
    pub fn add<L: EventListener + 'static>(mut self, listener: L) -> Self {
        self.add_listener(Arc::new(listener));
        self
    }

    /// Add an Arc-wrapped listener.
    pub fn add_arc(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Register a listener and return the identity its results are keyed by.
    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId::new(self.listeners.len(), listener.name());
        self.listeners.push(RegisteredListener {
            id: id.clone(),
            listener,
        });
        id
    }

    /// Registered listeners in dispatch order.
    pub fn listeners(&self) -> &[RegisteredListener] {
        &self.listeners
    }

    /// Listener identities in dispatch order.
    pub fn ids(&self) -> impl Iterator<Item = &ListenerId> {
        self.listeners.iter().map(RegisteredListener::id)
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Get the current configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut DispatcherConfig {
        &mut self.config
    }

    fn deliver<F>(&self, event: EventKind, failures: &mut Vec<ListenerFailure>, call: F)
    where
        F: Fn(&dyn EventListener) -> ListenerResult<()>,
    {
        for entry in &self.listeners {
            if let Err(source) = call(entry.listener.as_ref()) {
                failures.push(ListenerFailure {
                    listener: entry.id.clone(),
                    event,
                    source,
                });
            }
        }
    }

    fn finish(failures: Vec<ListenerFailure>) -> SpyResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SpyError::Dispatch(DispatchErrors::new(failures)))
        }
    }

    fn notify<F>(&self, event: EventKind, call: F) -> SpyResult<()>
    where
        F: Fn(&dyn EventListener) -> ListenerResult<()>,
    {
        if !self.config.accepts(event) {
            return Ok(());
        }
        let mut failures = Vec::new();
        self.deliver(event, &mut failures, call);
        Self::finish(failures)
    }

    /// Notify, then report a slow statement if `elapsed` crossed the threshold.
    fn notify_timed<F>(
        &self,
        event: EventKind,
        statement: &StatementInfo,
        elapsed: Duration,
        call: F,
    ) -> SpyResult<()>
    where
        F: Fn(&dyn EventListener) -> ListenerResult<()>,
    {
        let mut failures = Vec::new();
        if self.config.accepts(event) {
            self.deliver(event, &mut failures, call);
        }
        self.deliver_slow(statement, elapsed, &mut failures);
        Self::finish(failures)
    }

    fn deliver_slow(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        failures: &mut Vec<ListenerFailure>,
    ) {
        if self.config.is_slow(elapsed) && self.config.accepts(EventKind::SlowStatement) {
            self.deliver(EventKind::SlowStatement, failures, |listener| {
                listener.on_slow_statement(statement, elapsed)
            });
        }
    }

    fn fail_fast<T, F>(&self, event: EventKind, call: F) -> SpyResult<ListenerResults<T>>
    where
        F: Fn(&dyn EventListener) -> ListenerResult<T>,
    {
        let mut results = ListenerResults::with_capacity(self.listeners.len());
        if !self.config.accepts(event) {
            return Ok(results);
        }
        for entry in &self.listeners {
            match call(entry.listener.as_ref()) {
                Ok(value) => results.push(entry.id.clone(), value),
                Err(source) => {
                    return Err(SpyError::Listener(ListenerFailure {
                        listener: entry.id.clone(),
                        event,
                        source,
                    }));
                }
            }
        }
        Ok(results)
    }

    // ── Bindings ──

    /// Record a positional binding observed on a prepared statement.
    ///
    /// Not delivered to listeners; the binding shows up in the statement's
    /// reconstructed SQL. Recorded regardless of configuration and of `error`.
    pub fn on_after_prepared_statement_set(
        &self,
        statement: &mut StatementInfo,
        position: usize,
        value: impl Into<BoundValue>,
        _error: Option<&DbError>,
    ) {
        statement.set_parameter_value(position, value);
    }

    /// Record a named binding observed on a callable statement.
    pub fn on_after_callable_statement_set(
        &self,
        statement: &mut StatementInfo,
        name: impl Into<String>,
        value: impl Into<BoundValue>,
        _error: Option<&DbError>,
    ) {
        statement.set_named_parameter_value(name, value);
    }

    // ── Connection ──

    pub fn on_before_get_connection(&self) -> SpyResult<()> {
        self.notify(EventKind::BeforeGetConnection, |l| {
            l.on_before_get_connection()
        })
    }

    pub fn on_after_get_connection(
        &self,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify(EventKind::AfterGetConnection, |l| {
            l.on_after_get_connection(elapsed, error)
        })
    }

    pub fn on_after_connection_close(&self, error: Option<&DbError>) -> SpyResult<()> {
        self.notify(EventKind::AfterConnectionClose, |l| {
            l.on_after_connection_close(error)
        })
    }

    // ── Batch ──

    pub fn on_before_add_batch(&self, statement: &StatementInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeAddBatch, |l| l.on_before_add_batch(statement))
    }

    pub fn on_after_add_batch(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify(EventKind::AfterAddBatch, |l| {
            l.on_after_add_batch(statement, elapsed, error)
        })
    }

    pub fn on_before_execute_batch(&self, statement: &StatementInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeExecuteBatch, |l| {
            l.on_before_execute_batch(statement)
        })
    }

    pub fn on_after_execute_batch(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        update_counts: &[i64],
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify_timed(EventKind::AfterExecuteBatch, statement, elapsed, |l| {
            l.on_after_execute_batch(statement, elapsed, update_counts, error)
        })
    }

    // ── Statement ──

    pub fn on_before_execute(&self, statement: &StatementInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeExecute, |l| l.on_before_execute(statement))
    }

    pub fn on_after_execute(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify_timed(EventKind::AfterExecute, statement, elapsed, |l| {
            l.on_after_execute(statement, elapsed, error)
        })
    }

    pub fn on_before_execute_update(&self, statement: &StatementInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeExecuteUpdate, |l| {
            l.on_before_execute_update(statement)
        })
    }

    pub fn on_after_execute_update(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify_timed(EventKind::AfterExecuteUpdate, statement, elapsed, |l| {
            l.on_after_execute_update(statement, elapsed, row_count, error)
        })
    }

    /// Collect one value per listener before an update.
    ///
    /// Stops at the first failing listener; listeners after it are not called.
    pub fn on_before_execute_update_with_value(
        &self,
        statement: &StatementInfo,
    ) -> SpyResult<ListenerResults<serde_json::Value>> {
        self.fail_fast(EventKind::BeforeExecuteUpdateWithValue, |l| {
            l.on_before_execute_update_with_value(statement)
        })
    }

    /// Hand every listener the values collected before the update.
    ///
    /// Stops at the first failing listener; listeners after it are not called.
    /// Once every listener has accepted the values, a slow update is reported
    /// like any other execution.
    pub fn on_after_execute_update_with_values(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        row_count: i64,
        error: Option<&DbError>,
        values: &ListenerResults<serde_json::Value>,
    ) -> SpyResult<()> {
        self.fail_fast(EventKind::AfterExecuteUpdateWithValues, |l| {
            l.on_after_execute_update_with_values(statement, elapsed, row_count, error, values)
        })?;
        let mut failures = Vec::new();
        self.deliver_slow(statement, elapsed, &mut failures);
        Self::finish(failures)
    }

    pub fn on_before_execute_query(&self, statement: &StatementInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeExecuteQuery, |l| {
            l.on_before_execute_query(statement)
        })
    }

    pub fn on_after_execute_query(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify_timed(EventKind::AfterExecuteQuery, statement, elapsed, |l| {
            l.on_after_execute_query(statement, elapsed, error)
        })
    }

    pub fn on_after_statement_close(
        &self,
        statement: &StatementInfo,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify(EventKind::AfterStatementClose, |l| {
            l.on_after_statement_close(statement, error)
        })
    }

    // ── Result set ──

    pub fn on_after_get_result_set(
        &self,
        statement: &StatementInfo,
        elapsed: Duration,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify(EventKind::AfterGetResultSet, |l| {
            l.on_after_get_result_set(statement, elapsed, error)
        })
    }

    pub fn on_before_result_set_next(&self, result_set: &ResultSetInfo) -> SpyResult<()> {
        self.notify(EventKind::BeforeResultSetNext, |l| {
            l.on_before_result_set_next(result_set)
        })
    }

    /// Advance the row cursor when the driver reported another row, then notify.
    pub fn on_after_result_set_next(
        &self,
        result_set: &mut ResultSetInfo,
        elapsed: Duration,
        has_next: bool,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        if has_next && error.is_none() {
            result_set.increment_current_row();
        }
        let result_set = &*result_set;
        self.notify(EventKind::AfterResultSetNext, |l| {
            l.on_after_result_set_next(result_set, elapsed, has_next, error)
        })
    }

    /// Record the value read from the current row, then notify.
    pub fn on_after_result_set_get(
        &self,
        result_set: &mut ResultSetInfo,
        column: ColumnRef<'_>,
        value: impl Into<BoundValue>,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        let value = value.into();
        if error.is_none() {
            result_set.set_column_value(column, value.clone());
        }
        let result_set = &*result_set;
        self.notify(EventKind::AfterResultSetGet, |l| {
            l.on_after_result_set_get(result_set, column, &value, error)
        })
    }

    pub fn on_after_result_set_close(
        &self,
        result_set: &ResultSetInfo,
        error: Option<&DbError>,
    ) -> SpyResult<()> {
        self.notify(EventKind::AfterResultSetClose, |l| {
            l.on_after_result_set_close(result_set, error)
        })
    }

    // ── Transaction ──

    pub fn on_before_commit(&self) -> SpyResult<()> {
        self.notify(EventKind::BeforeCommit, |l| l.on_before_commit())
    }

    pub fn on_after_commit(&self, elapsed: Duration, error: Option<&DbError>) -> SpyResult<()> {
        self.notify(EventKind::AfterCommit, |l| l.on_after_commit(elapsed, error))
    }

    pub fn on_before_rollback(&self) -> SpyResult<()> {
        self.notify(EventKind::BeforeRollback, |l| l.on_before_rollback())
    }

    pub fn on_after_rollback(&self, elapsed: Duration, error: Option<&DbError>) -> SpyResult<()> {
        self.notify(EventKind::AfterRollback, |l| l.on_after_rollback(elapsed, error))
    }
}
