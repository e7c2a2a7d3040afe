//! Diagnostic message sinks.
//!
//! Rules and the engine report what they do through a [`DiagnosticSink`].
//! Lazy messages are only formatted when the sink is enabled.

use std::sync::{Arc, Mutex};

use tracing::Level;

/// Target used by [`TracingSink`].
pub const TARGET: &str = "depgraph::differentiate";

pub trait DiagnosticSink: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn debug(&self, message: &str);

    fn debug_lazy(&self, message: &dyn Fn() -> String) {
        if self.is_enabled() {
            self.debug(&message());
        }
    }
}

/// Forwards to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn is_enabled(&self) -> bool {
        tracing::enabled!(target: TARGET, Level::DEBUG)
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: TARGET, "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn is_enabled(&self) -> bool {
        false
    }

    fn debug(&self, _message: &str) {}
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn is_enabled(&self) -> bool {
        true
    }

    fn debug(&self, message: &str) {
        let mut messages = match self.messages.lock() {
            Ok(messages) => messages,
            Err(poisoned) => poisoned.into_inner(),
        };
        messages.push(message.to_string());
    }
}

/// Fans messages out to several sinks.
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn DiagnosticSink>>) -> Self {
        CompositeSink { sinks }
    }
}

impl DiagnosticSink for CompositeSink {
    fn is_enabled(&self) -> bool {
        self.sinks.iter().any(|s| s.is_enabled())
    }

    fn debug(&self, message: &str) {
        for sink in self.sinks.iter().filter(|s| s.is_enabled()) {
            sink.debug(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn lazy_message_is_not_built_when_disabled() {
        let calls = AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "expensive".to_string()
        };
        NullSink.debug_lazy(&build);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let memory = MemorySink::new();
        memory.debug_lazy(&build);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(memory.messages(), vec!["expensive".to_string()]);
    }

    #[test]
    fn composite_skips_disabled_sinks() {
        let memory = Arc::new(MemorySink::new());
        let sinks: Vec<Arc<dyn DiagnosticSink>> = vec![Arc::new(NullSink), memory.clone()];
        let composite = CompositeSink::new(sinks);
        assert!(composite.is_enabled());
        composite.debug("affected B");
        assert_eq!(memory.messages(), vec!["affected B".to_string()]);
    }

    #[test]
    fn tracing_sink_follows_subscriber_level() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            assert!(!TracingSink.is_enabled());
        });
    }
}
