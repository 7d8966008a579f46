//! Process-lifetime registry of ingested picks
//!
//! Picked items are never persisted; the registry and the cache files it
//! points at live until process teardown. Reads and writes come from
//! different tasks concurrently, so the map is a concurrent one rather than
//! an externally locked table.

use std::path::PathBuf;

use dashmap::DashMap;

use crate::models::MediaType;

/// One ingested pick
#[derive(Debug, Clone)]
pub struct PickedItem {
    pub file: PathBuf,
    pub mime_type: String,
    pub media_type: MediaType,
}

/// Concurrent identifier → ingested file mapping
#[derive(Debug, Default)]
pub struct PickedItemRegistry {
    items: DashMap<String, PickedItem>,
}

impl PickedItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: String, item: PickedItem) {
        self.items.insert(identifier, item);
    }

    pub fn get(&self, identifier: &str) -> Option<PickedItem> {
        self.items.get(identifier).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, identifier: &str) -> Option<PickedItem> {
        self.items.remove(identifier).map(|(_, item)| item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
