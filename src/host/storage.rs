/*!
 * Storage Manager
 * Privileged-side persisted copy of each applet's local storage
 */

use ahash::RandomState;
use dashmap::DashMap;
use log::debug;
use std::collections::HashMap;

use crate::core::types::AppletId;

type Entries = HashMap<String, String>;

/// Per-applet key-value copies, applied from mirror requests and served as a
/// full snapshot at context bootstrap.
///
/// Last-writer-wins; durable persistence is a store layered on top, fed via
/// [`StorageManager::snapshot`] / [`StorageManager::restore`].
pub struct StorageManager {
    stores: DashMap<AppletId, Entries, RandomState>,
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Full current copy for one applet, replayed into its sandbox at boot
    #[must_use]
    pub fn snapshot_for(&self, applet_id: &str) -> Entries {
        self.stores
            .get(applet_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    pub fn set(&self, applet_id: AppletId, key: String, value: String) {
        self.stores.entry(applet_id).or_default().insert(key, value);
    }

    pub fn remove(&self, applet_id: &str, key: &str) {
        if let Some(mut entries) = self.stores.get_mut(applet_id) {
            entries.remove(key);
        }
    }

    pub fn clear(&self, applet_id: &str) {
        if let Some(mut entries) = self.stores.get_mut(applet_id) {
            entries.clear();
        }
        debug!("cleared mirrored storage for applet {applet_id}");
    }

    /// All per-applet copies, for the persistence layer
    #[must_use]
    pub fn snapshot(&self) -> HashMap<AppletId, Entries> {
        self.stores
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Replace the in-memory copies with a persisted snapshot
    pub fn restore(&self, snapshot: HashMap<AppletId, Entries>) {
        self.stores.clear();
        for (applet_id, entries) in snapshot {
            self.stores.insert(applet_id, entries);
        }
    }
}
