use dashmap::DashMap;

use crate::event::Event;

/// Key→object staging buffer between the watch loop and the workers.
///
/// The watch loop is the sole writer; workers only read and delete.
/// Entries hold the latest observed state for a key and are removed
/// explicitly after every sink confirms delivery, so no TTL or eviction
/// policy is needed.
#[derive(Debug, Default)]
pub struct EventCache {
    entries: DashMap<String, Event>,
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the latest state for a key, replacing any previous entry.
    pub fn insert(&self, key: String, event: Event) {
        self.entries.insert(key, event);
    }

    /// Returns a clone of the cached state for a key, if still present.
    pub fn get(&self, key: &str) -> Option<Event> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the resource version of the cached entry for a key.
    pub fn resource_version(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .map(|entry| entry.value().metadata.resource_version.clone())
    }

    /// Removes a key after successful processing.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
