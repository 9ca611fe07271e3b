//! Registry of active events keyed by channel
//!
//! The raw map is never exposed; callers receive per-event handles. Each
//! event sits behind a FIFO-fair `tokio::sync::Mutex`, so concurrent
//! operations against one event queue in arrival order while distinct
//! events proceed in parallel. The scheduler's deadline pass takes the same
//! handle lock as command-driven operations.

use crate::event::instance::Event;
use crate::types::ChannelId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Shared handle to one active event
pub type EventHandle = Arc<Mutex<Event>>;

/// Active events, at most one per channel
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: RwLock<HashMap<ChannelId, EventHandle>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an event as the channel's active one, returning the handle
    /// it replaced, if any.
    pub fn insert(&self, event: Event) -> Option<EventHandle> {
        let channel = event.channel;
        let handle = Arc::new(Mutex::new(event));
        self.events
            .write()
            .expect("event registry lock poisoned")
            .insert(channel, handle)
    }

    pub fn get(&self, channel: ChannelId) -> Option<EventHandle> {
        self.events
            .read()
            .expect("event registry lock poisoned")
            .get(&channel)
            .cloned()
    }

    /// End the channel's event, discarding its in-memory state
    pub fn remove(&self, channel: ChannelId) -> Option<EventHandle> {
        self.events
            .write()
            .expect("event registry lock poisoned")
            .remove(&channel)
    }

    /// Snapshot of all active handles; taken before iterating so passes
    /// never hold the map lock across an await
    pub fn handles(&self) -> Vec<(ChannelId, EventHandle)> {
        self.events
            .read()
            .expect("event registry lock poisoned")
            .iter()
            .map(|(channel, handle)| (*channel, handle.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .read()
            .expect("event registry lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(channel: ChannelId) -> Event {
        Event::new(1, 2, 4, channel).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = EventRegistry::new();
        assert!(registry.get(100).is_none());

        registry.insert(event(100));
        let handle = registry.get(100).unwrap();
        assert_eq!(handle.lock().await.channel, 100);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_replaces_previous() {
        let registry = EventRegistry::new();
        registry.insert(event(100));
        let mut replacement = event(100);
        replacement.id = 2;
        let old = registry.insert(replacement).unwrap();
        assert_eq!(old.lock().await.id, 1);
        assert_eq!(registry.get(100).unwrap().lock().await.id, 2);
    }

    #[test]
    fn test_remove_discards_state() {
        let registry = EventRegistry::new();
        registry.insert(event(100));
        assert!(registry.remove(100).is_some());
        assert!(registry.get(100).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_handles_snapshot() {
        let registry = EventRegistry::new();
        registry.insert(event(100));
        registry.insert(event(200));
        let mut channels: Vec<_> = registry.handles().iter().map(|(c, _)| *c).collect();
        channels.sort_unstable();
        assert_eq!(channels, vec![100, 200]);
    }
}
