//! Warning sink injected into the state store and orchestrator.
//!
//! Non-fatal conditions (a recovered state record, an unrecognized scale
//! token) are reported here instead of through a global logger so callers
//! can redirect or inspect them.

use std::sync::{Arc, Mutex};

pub trait Reporter: Send + Sync {
    fn warn(&self, message: &str);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

/// Collects warnings in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every warning reported so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages().is_empty()
    }
}

impl Reporter for MemoryReporter {
    fn warn(&self, message: &str) {
        let mut guard = match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(message.to_string());
    }
}

/// Default reporter used when none is injected.
pub fn default_reporter() -> Arc<dyn Reporter> {
    Arc::new(TracingReporter)
}
