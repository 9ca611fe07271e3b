//! Notification batcher
//!
//! Coalesces successive notices for a channel into as few sink calls as fit
//! the platform message-size ceiling. Submission order is preserved within
//! a channel; there is no cross-channel ordering. A background task flushes
//! on a fixed cadence; a delivery failure re-queues the undelivered chunks
//! for the next flush and never stops future flushes.

use crate::error::Result;
use crate::gateway::sink::NotificationSink;
use crate::types::ChannelId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::error;

/// Per-channel outbound text queue with size-bounded coalescing
pub struct MessageBatcher {
    queues: Mutex<HashMap<ChannelId, Vec<String>>>,
    sink: Arc<dyn NotificationSink>,
    max_chunk_chars: usize,
}

impl MessageBatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, max_chunk_chars: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            sink,
            max_chunk_chars,
        }
    }

    /// Queue one notice for a channel; delivered on the next flush
    pub fn enqueue(&self, channel: ChannelId, text: impl Into<String>) {
        self.queues
            .lock()
            .expect("batcher queue lock poisoned")
            .entry(channel)
            .or_default()
            .push(text.into());
    }

    /// Drain all queues and deliver their contents in coalesced chunks.
    ///
    /// A failed send re-queues that channel's undelivered chunks at the
    /// front of its queue for the next flush; the other channels still get
    /// their deliveries. The first failure is reported after every channel
    /// has been attempted.
    pub async fn flush(&self) -> Result<()> {
        let drained: Vec<(ChannelId, Vec<String>)> = {
            let mut queues = self.queues.lock().expect("batcher queue lock poisoned");
            queues.drain().collect()
        };

        let mut first_failure = None;
        for (channel, notices) in drained {
            let chunks = coalesce(&notices, self.max_chunk_chars);
            for (i, chunk) in chunks.iter().enumerate() {
                if let Err(e) = self.sink.send(channel, chunk).await {
                    error!("Delivery to channel {} failed: {}", channel, e);
                    let mut queues = self.queues.lock().expect("batcher queue lock poisoned");
                    let queue = queues.entry(channel).or_default();
                    for (offset, undelivered) in chunks[i..].iter().enumerate() {
                        queue.insert(offset, undelivered.clone());
                    }
                    first_failure.get_or_insert(e);
                    break;
                }
            }
        }
        match first_failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Spawn the periodic flush task. Errors are logged and the cadence
    /// continues; the task only ends when the handle is aborted.
    pub fn spawn_flush_task(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.flush().await {
                    error!("Notification flush failed: {}", e);
                }
            }
        })
    }
}

/// Pack notices into the minimum number of chunks that respect the size
/// ceiling, keeping original order. A single notice longer than the ceiling
/// becomes its own chunk; the sink owns truncation policy for those.
fn coalesce(notices: &[String], max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for notice in notices {
        if !current.is_empty() && current.len() + 1 + notice.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(notice);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
