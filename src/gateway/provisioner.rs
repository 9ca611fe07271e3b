//! Room sub-channel provisioning interface

use crate::error::Result;
use crate::types::{ChannelId, SubChannelId};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Trait for creating a room sub-channel under an event's channel.
///
/// Creation is fallible; a failure for one room must never abort
/// provisioning or partitioning of the remaining rooms.
#[async_trait]
pub trait SubChannelProvisioner: Send + Sync {
    async fn create_sub_channel(&self, parent: ChannelId, name: &str) -> Result<SubChannelId>;
}

/// In-memory provisioner handing out sequential sub-channel ids, with
/// optional injected failures for tests
#[derive(Debug, Default)]
pub struct InMemorySubChannelProvisioner {
    next_id: AtomicU64,
    calls: AtomicU64,
    /// 0-based call indices that fail
    failing_calls: Mutex<HashSet<u64>>,
    created: Mutex<Vec<(ChannelId, SubChannelId, String)>>,
}

impl InMemorySubChannelProvisioner {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(9000),
            ..Self::default()
        }
    }

    /// Make the given 0-based calls fail
    pub fn with_failures(calls: impl IntoIterator<Item = u64>) -> Self {
        let provisioner = Self::new();
        *provisioner.failing_calls.lock().expect("lock poisoned") = calls.into_iter().collect();
        provisioner
    }

    /// Sub-channels created so far as (parent, id, name)
    pub fn created(&self) -> Vec<(ChannelId, SubChannelId, String)> {
        self.created.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl SubChannelProvisioner for InMemorySubChannelProvisioner {
    async fn create_sub_channel(&self, parent: ChannelId, name: &str) -> Result<SubChannelId> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_calls
            .lock()
            .expect("lock poisoned")
            .contains(&call)
        {
            return Err(anyhow!("sub-channel creation refused for {}", name));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created
            .lock()
            .expect("lock poisoned")
            .push((parent, id, name.to_string()));
        Ok(id)
    }
}
