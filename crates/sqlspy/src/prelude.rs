//! Common imports for statement wrappers and listener implementations.
//!
//! ```ignore
//! use sqlspy::prelude::*;
//! ```

pub use crate::error::{DbError, ListenerError, ListenerResult, SpyError, SpyResult};
pub use crate::listener::{
    Dispatcher, DispatcherConfig, EventCategory, EventKind, EventListener, ListenerId,
    ListenerResults,
};
pub use crate::result_set::{ColumnRef, ResultSetInfo};
pub use crate::statement::{StatementInfo, statement_info};
pub use crate::value::BoundValue;
