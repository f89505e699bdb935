//! # sqlspy
//!
//! Instrumentation core for database statement wrappers.
//!
//! A driver wrapper reports what it sees (bindings, executions, timings,
//! result-set reads, commits) to a [`Dispatcher`], which records bindings on
//! the [`StatementInfo`] and fans each event out to the registered
//! [`EventListener`]s in registration order.
//!
//! ## Features
//!
//! - **Binding capture**: positional (1-based) and named bindings, last write wins
//! - **SQL reconstruction**: `?` placeholders replaced by SQL literals for display
//! - **Ordered fan-out**: notification failures are collected, value-producing
//!   events fail fast
//! - **Built-in listeners**: `tracing` logging and atomic statistics
//!
//! ## Example
//!
//! ```rust
//! use sqlspy::{Dispatcher, StatementInfo, StatsListener};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsListener::new());
//! let dispatcher = Dispatcher::new().add_arc(stats.clone());
//!
//! let mut stmt = StatementInfo::new("UPDATE users SET name = ? WHERE id = ?");
//! stmt.set_parameter_value(1, "alice");
//! stmt.set_parameter_value(2, 7);
//! assert_eq!(stmt.sql_with_values(), "UPDATE users SET name = 'alice' WHERE id = 7");
//!
//! dispatcher.on_after_execute_update(&stmt, Duration::from_millis(2), 1, None)?;
//! assert_eq!(stats.stats().rows_affected, 1);
//! # Ok::<(), sqlspy::SpyError>(())
//! ```

pub mod error;
pub mod listener;
pub mod prelude;
pub mod result_set;
pub mod statement;
pub mod value;

pub use error::{
    DbError, DispatchErrors, ListenerError, ListenerFailure, ListenerResult, SpyError, SpyResult,
};
pub use listener::{
    Dispatcher, DispatcherConfig, EventCategory, EventKind, EventListener, ListenerId,
    ListenerResults, LoggingListener, NoopListener, RegisteredListener, SpyStats, StatsListener,
};
pub use result_set::{ColumnRef, ResultSetInfo};
pub use statement::{
    ParameterStore, StatementInfo, StatementKind, StatementType, sql_with_values,
    sql_with_values_quote_aware, statement_info,
};
pub use value::{BoundValue, NULL_LITERAL};
