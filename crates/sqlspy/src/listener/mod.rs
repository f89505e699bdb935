//! Event listeners and the dispatcher that fans events out to them.
//!
//! This module provides:
//! - The [`EventListener`] trait, one method per instrumentation event
//! - [`Dispatcher`], an ordered composite of listeners
//! - Built-in listeners for logging and statistics
//!
//! # Example
//!
//! ```rust
//! use sqlspy::listener::{Dispatcher, DispatcherConfig, LoggingListener, StatsListener};
//! use sqlspy::statement_info;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsListener::new());
//! let dispatcher = Dispatcher::new()
//!     .with_config(DispatcherConfig::new().with_slow_statement_threshold(Duration::from_secs(1)))
//!     .add(LoggingListener::new())
//!     .add_arc(stats.clone());
//!
//! let mut stmt = statement_info("SELECT * FROM users WHERE id = ?");
//! dispatcher.on_after_prepared_statement_set(&mut stmt, 1, 42, None);
//! dispatcher.on_before_execute_query(&stmt)?;
//! dispatcher.on_after_execute_query(&stmt, Duration::from_millis(3), None)?;
//!
//! assert_eq!(stats.stats().select_count, 1);
//! # Ok::<(), sqlspy::SpyError>(())
//! ```

mod config;
mod dispatcher;
mod listeners;
mod logging;
mod types;


pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, ListenerId, ListenerResults, RegisteredListener};
pub use listeners::{NoopListener, SpyStats, StatsListener};
pub use logging::LoggingListener;
pub use types::{EventCategory, EventKind, EventListener};

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
