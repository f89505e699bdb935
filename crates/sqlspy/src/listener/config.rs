use super::types::{EventCategory, EventKind};
use std::collections::BTreeSet;
use std::time::Duration;

/// Configuration for event dispatch.
///
/// By default dispatch is enabled, no category is excluded and slow
/// statement detection is off.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Whether listeners receive events at all.
    pub enabled: bool,
    /// Executions slower than this additionally trigger `on_slow_statement`.
    pub slow_statement_threshold: Option<Duration>,
    /// Events in these categories are not delivered.
    pub excluded_categories: BTreeSet<EventCategory>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slow_statement_threshold: None,
            excluded_categories: BTreeSet::new(),
        }
    }
}

impl DispatcherConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the slow statement threshold.
    pub fn with_slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold = Some(threshold);
        self
    }

    /// Stop delivering events of `category`.
    pub fn exclude_category(mut self, category: EventCategory) -> Self {
        self.excluded_categories.insert(category);
        self
    }

    /// Enable dispatch.
    pub fn enable(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Disable dispatch. Bindings are still recorded.
    pub fn disable(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether `event` should be delivered under this configuration.
    pub fn accepts(&self, event: EventKind) -> bool {
        self.enabled && !self.excluded_categories.contains(&event.category())
    }

    pub(crate) fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_statement_threshold
            .is_some_and(|threshold| elapsed > threshold)
    }
}
