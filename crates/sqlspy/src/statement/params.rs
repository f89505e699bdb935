use crate::value::BoundValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bindings recorded for one statement execution.
///
/// Positional bindings are stored zero-based; the public setter takes the
/// 1-based index used by statement APIs. Named bindings (callable statements)
/// are kept separately and never take part in positional reconstruction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterStore {
    positional: BTreeMap<usize, BoundValue>,
    named: BTreeMap<String, BoundValue>,
}

impl ParameterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` at the 1-based `position`, replacing any earlier binding.
    ///
    /// Position `0` has no slot and is ignored.
    pub fn set(&mut self, position: usize, value: impl Into<BoundValue>) {
        if let Some(slot) = position.checked_sub(1) {
            self.positional.insert(slot, value.into());
        }
    }

    /// Look up the binding at a zero-based slot.
    pub fn get(&self, slot: usize) -> Option<&BoundValue> {
        self.positional.get(&slot)
    }

    /// Bind `value` to a named parameter, replacing any earlier binding.
    pub fn set_named(&mut self, name: impl Into<String>, value: impl Into<BoundValue>) {
        self.named.insert(name.into(), value.into());
    }

    /// Look up a named binding.
    pub fn get_named(&self, name: &str) -> Option<&BoundValue> {
        self.named.get(name)
    }

    /// Positional bindings as `(zero_based_slot, value)` in slot order.
    pub fn positional(&self) -> impl Iterator<Item = (usize, &BoundValue)> {
        self.positional.iter().map(|(slot, value)| (*slot, value))
    }

    /// Named bindings in name order.
    pub fn named(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.named.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of distinct positional and named bindings.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Drop every binding.
    pub fn clear(&mut self) {
        self.positional.clear();
        self.named.clear();
    }
}
