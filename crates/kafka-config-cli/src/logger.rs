//! Bridge from the engine's `Logger` to `tracing`

use kafka_config_core::Logger;

const TARGET: &str = "kafka_config";

/// Forwards engine messages to the installed tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: TARGET, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: TARGET, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: TARGET, "{}", message);
    }
}
