//! Notification sinks.
//!
//! A sink receives the pre-rendered report text. Delivery failures are
//! reported to the caller and logged; nothing is retried.

pub mod discord;

pub use discord::{split_message, DiscordWebhook, DISCORD_MESSAGE_LIMIT};

use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    DeliveryFailure(String),

    #[error("notification client error: {0}")]
    Client(String),
}

pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// Whether `send` writes to stdout, where the report is already printed.
    fn prints_to_stdout(&self) -> bool {
        false
    }
}

/// Send and log the outcome. Returns whether delivery succeeded.
pub fn deliver(sink: &dyn NotificationSink, text: &str) -> bool {
    match sink.send(text) {
        Ok(()) => {
            info!(sink = sink.name(), chars = text.chars().count(), "notification delivered");
            true
        }
        Err(e) => {
            warn!(sink = sink.name(), error = %e, "notification not delivered");
            false
        }
    }
}

/// Deliver a report that has already been printed. Sinks that write to
/// stdout are skipped so the report is not printed twice.
pub fn deliver_report(sink: &dyn NotificationSink, text: &str) -> bool {
    if sink.prints_to_stdout() {
        return true;
    }
    deliver(sink, text)
}

/// Prints to stdout; used for dry runs.
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        println!("{text}");
        Ok(())
    }

    fn prints_to_stdout(&self) -> bool {
        true
    }
}

/// Keeps every message in memory; for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every message.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::DeliveryFailure("sink configured to fail".into()));
        }
        let mut messages = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        messages.push(text.to_string());
        Ok(())
    }
}
