use parking_lot::Mutex;
use tracing::warn;

/// Fire-and-forget surface for user-visible errors.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn report_error(&self, message: &str);
}

/// Routes notifications into the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn report_error(&self, message: &str) {
        warn!(target: "iweather::notify", "{message}");
    }
}

/// Keeps every reported message, for headless front ends and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Remove and return the recorded messages.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn report_error(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
