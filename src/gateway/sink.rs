//! Outbound notification sink interface

use crate::error::Result;
use crate::types::ChannelId;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for delivering one chunk of text to a channel
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<()>;
}

/// Sink that logs outbound chunks; used by standalone runs with no
/// platform attached
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<()> {
        info!("[channel {}] {}", channel, text);
        Ok(())
    }
}

/// Sink that records every chunk for test assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(ChannelId, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far, in send order
    pub fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().expect("sink lock poisoned").clone()
    }

    /// Chunks sent to one channel, in send order
    pub fn sent_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, channel: ChannelId, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("sink lock poisoned")
            .push((channel, text.to_string()));
        Ok(())
    }
}
