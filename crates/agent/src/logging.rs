use std::sync::{Arc, Mutex};

/// Channel-scoped error log the processor reports recovered failures to.
pub trait ErrorLogger: Send + Sync {
    fn error(&self, channel: &str, message: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorLogger;

impl ErrorLogger for TracingErrorLogger {
    fn error(&self, channel: &str, message: &str) {
        tracing::error!(event_name = "assistant.process.error", channel, "{message}");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedError {
    pub channel: String,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct InMemoryErrorLogger {
    entries: Arc<Mutex<Vec<LoggedError>>>,
}

impl InMemoryErrorLogger {
    pub fn entries(&self) -> Vec<LoggedError> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorLogger for InMemoryErrorLogger {
    fn error(&self, channel: &str, message: &str) {
        let entry = LoggedError { channel: channel.to_string(), message: message.to_string() };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
