//! Registry of group watchers keyed by group name.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EngineError, Result};
use crate::watcher::GroupWatcher;

/// Maps group names to their watchers.
///
/// Lookups take a short read lock and hand out an `Arc`, so mutations of one
/// group never contend with another group's.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    watchers: RwLock<BTreeMap<String, Arc<GroupWatcher>>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `watcher` under its own name.
    pub fn register(&self, watcher: GroupWatcher) -> Result<Arc<GroupWatcher>> {
        let name = watcher.name().to_string();

        // Fast path: reject duplicates with only a read lock
        if self.watchers.read().contains_key(&name) {
            return Err(EngineError::DuplicateGroup(name));
        }

        let mut watchers = self.watchers.write();
        if watchers.contains_key(&name) {
            return Err(EngineError::DuplicateGroup(name));
        }
        let watcher = Arc::new(watcher);
        watchers.insert(name, watcher.clone());
        Ok(watcher)
    }

    pub fn get(&self, name: &str) -> Option<Arc<GroupWatcher>> {
        self.watchers.read().get(name).cloned()
    }

    /// Like [`get`](Self::get), but an absent group is an error.
    pub fn require(&self, name: &str) -> Result<Arc<GroupWatcher>> {
        self.get(name)
            .ok_or_else(|| EngineError::UnknownGroup(name.to_string()))
    }

    /// Remove a group. Existing `Arc`s to its watcher keep working.
    pub fn unregister(&self, name: &str) -> Option<Arc<GroupWatcher>> {
        self.watchers.write().remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.watchers.read().keys().cloned().collect()
    }

    /// Watchers in name order.
    pub fn watchers(&self) -> Vec<Arc<GroupWatcher>> {
        self.watchers.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.watchers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
