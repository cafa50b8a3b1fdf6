//! Non-fatal warnings raised while rendering or deploying
//!
//! A `WarningRegistry` is owned by whoever drives a deploy (the orchestrator,
//! the CLI, a test) and passed down explicitly. Warnings are logged as they are
//! raised and kept so the caller can surface them afterwards.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tracing::warn;

#[derive(Debug, Default)]
struct RegistryState {
    seen: HashSet<String>,
    emitted: Vec<String>,
}

/// Records warnings for one invocation context
#[derive(Debug, Default)]
pub struct WarningRegistry {
    state: Mutex<RegistryState>,
}

impl WarningRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and record a warning about the given action
    pub fn emit(&self, action: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(action = %action, "{}", message);
        self.lock().emitted.push(message);
    }

    /// Like [`emit`](Self::emit), but only the first call per `key` has any effect.
    ///
    /// Returns whether the warning was emitted.
    pub fn emit_once(&self, key: &str, action: &str, message: impl Into<String>) -> bool {
        if !self.lock().seen.insert(key.to_string()) {
            return false;
        }
        self.emit(action, message);
        true
    }

    /// Warnings emitted so far, oldest first
    pub fn warnings(&self) -> Vec<String> {
        self.lock().emitted.clone()
    }

    /// Whether nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.lock().emitted.is_empty()
    }

    // Every update is a single insert or push; a poisoned lock still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_records_every_call() {
        let registry = WarningRegistry::new();
        registry.emit("api", "first");
        registry.emit("api", "first");
        assert_eq!(registry.warnings(), vec!["first", "first"]);
    }

    #[test]
    fn emit_once_dedupes_by_key() {
        let registry = WarningRegistry::new();
        assert!(registry.emit_once("strategy", "api", "deprecated"));
        assert!(!registry.emit_once("strategy", "worker", "deprecated"));
        assert_eq!(registry.warnings().len(), 1);
    }

    #[test]
    fn registries_are_independent() {
        let first = WarningRegistry::new();
        let second = WarningRegistry::new();
        assert!(first.emit_once("strategy", "api", "deprecated"));
        assert!(second.emit_once("strategy", "api", "deprecated"));
        assert!(!second.is_empty());
    }
}
