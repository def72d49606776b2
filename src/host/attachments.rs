/*!
 * Attachment Registry
 * Discovers and caches the attachment types each applet offers
 */

use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::errors::ChannelError;
use crate::core::types::{AppletHash, AppletId, AttachmentName, AttachmentTypeDescriptor};
use crate::rpc::channel::AppletChannel;
use crate::rpc::types::HostToAppletRequest;

/// Bound on one discovery call. Expiry yields an empty map, not an error.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before the second scheduled discovery fire
pub const DISCOVERY_DELAY: Duration = Duration::from_secs(2);

/// Steady discovery interval
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(10);

/// A remote error carrying this substring means the applet's request listener
/// is not attached yet: expected, silent, retried on the next scheduled fire.
const NOT_READY_MARKER: &str = "before initialization";

type TypeMap = HashMap<AttachmentName, AttachmentTypeDescriptor>;

/// Per-applet attachment-type cache with a scheduled discovery task per
/// tracked applet.
///
/// A tracked applet's sandbox may not have attached its request listener when
/// the first discovery call arrives, hence three overlapping cadences:
/// immediately on tracking, once after a short delay, then on a steady
/// interval. Timers are per execution context and must be torn down with it
/// ([`AttachmentRegistry::untrack`] / [`AttachmentRegistry::shutdown`]) or
/// they run indefinitely.
pub struct AttachmentRegistry {
    cache: DashMap<AppletHash, TypeMap, RandomState>,
    tasks: DashMap<AppletHash, JoinHandle<()>, RandomState>,
}

impl Default for AttachmentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentRegistry {
    #[must_use]
    pub fn new() -> Self {
        info!("Attachment registry initialized");
        Self {
            cache: DashMap::with_hasher(RandomState::new()),
            tasks: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Start tracking an applet, scheduling discovery against its sandbox.
    /// Re-tracking an applet replaces its previous schedule.
    pub fn track(self: &Arc<Self>, applet_hash: AppletHash, channel: AppletChannel) {
        let registry = self.clone();
        let hash = applet_hash.clone();
        let task = tokio::spawn(async move {
            registry.discover_into_cache(&hash, &channel).await;
            tokio::time::sleep(DISCOVERY_DELAY).await;
            registry.discover_into_cache(&hash, &channel).await;
            loop {
                tokio::time::sleep(DISCOVERY_INTERVAL).await;
                registry.discover_into_cache(&hash, &channel).await;
            }
        });
        if let Some(previous) = self.tasks.insert(applet_hash, task) {
            previous.abort();
        }
    }

    /// Stop tracking an applet and drop its cached types
    pub fn untrack(&self, applet_hash: &AppletHash) {
        if let Some((_, task)) = self.tasks.remove(applet_hash) {
            task.abort();
        }
        self.cache.remove(applet_hash);
        debug!("untracked applet {applet_hash}");
    }

    /// Abort every discovery schedule
    pub fn shutdown(&self) {
        self.tasks.retain(|_, task| {
            task.abort();
            false
        });
    }

    /// Cached attachment types for one applet. Empty until discovery
    /// succeeds.
    #[must_use]
    pub fn attachment_types_for(&self, applet_hash: &AppletHash) -> TypeMap {
        self.cache
            .get(applet_hash)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// All non-empty attachment-type maps, keyed by applet id (wire form)
    #[must_use]
    pub fn all(&self) -> HashMap<AppletId, TypeMap> {
        self.cache
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| (entry.key().to_b64(), entry.value().clone()))
            .collect()
    }

    async fn discover_into_cache(&self, applet_hash: &AppletHash, channel: &AppletChannel) {
        if let Some(types) = discover_once(applet_hash, channel).await {
            self.cache.insert(applet_hash.clone(), types);
        }
    }
}

/// One bounded discovery call. `None` keeps the previous cache entry.
async fn discover_once(applet_hash: &AppletHash, channel: &AppletChannel) -> Option<TypeMap> {
    let call = channel.call_typed::<TypeMap>(HostToAppletRequest::GetAttachmentTypes);
    match tokio::time::timeout(DISCOVERY_TIMEOUT, call).await {
        Ok(Ok(types)) => Some(types),
        Ok(Err(ChannelError::Remote(message))) if message.contains(NOT_READY_MARKER) => {
            // Listener not attached yet; the next scheduled fire retries
            None
        }
        Ok(Err(e)) => {
            warn!("failed to get attachment types from applet {applet_hash}: {e}");
            None
        }
        Err(_) => {
            warn!(
                "getting attachment types for applet {applet_hash} timed out in {}ms",
                DISCOVERY_TIMEOUT.as_millis()
            );
            Some(TypeMap::new())
        }
    }
}
