/*!
 * Storage Mirror
 * Sandbox-local key-value storage, mirrored to the privileged side
 */

use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::core::errors::ChannelError;
use crate::rpc::channel::HostChannel;
use crate::rpc::types::AppletToHostRequest;

/// Delay between a local mutation and its mirror send
pub const MIRROR_DELAY: Duration = Duration::from_millis(100);

/// Sandbox-side local storage.
///
/// Mutations apply locally right away; the corresponding mirror request is
/// sent fire-and-forget [`MIRROR_DELAY`] after the mutation, without blocking
/// the caller. All sends funnel through one queue task, so mirror order
/// matches mutation order. Eventually-mirrored, last-writer-wins: a crash
/// between the local mutation and the delayed send loses that one mutation.
pub struct LocalStorage {
    entries: RwLock<HashMap<String, String>>,
    mirror_tx: mpsc::UnboundedSender<(Instant, AppletToHostRequest)>,
}

impl LocalStorage {
    /// Fetch the privileged side's persisted copy once and replay it
    /// entry-by-entry. Runs during bootstrap, before any applet code.
    pub async fn seed(channel: HostChannel) -> Result<Self, ChannelError> {
        let snapshot: HashMap<String, String> = channel
            .call_typed(AppletToHostRequest::GetLocalStorage)
            .await?;
        debug!(
            "seeded local storage for applet {} with {} entries",
            channel.applet_hash(),
            snapshot.len()
        );
        Ok(Self::with_entries(channel, snapshot))
    }

    /// Empty storage that mirrors into the given channel, without seeding
    #[must_use]
    pub fn unseeded(channel: HostChannel) -> Self {
        Self::with_entries(channel, HashMap::new())
    }

    fn with_entries(channel: HostChannel, entries: HashMap<String, String>) -> Self {
        let (mirror_tx, mut mirror_rx) =
            mpsc::unbounded_channel::<(Instant, AppletToHostRequest)>();
        // The queue task exits when the storage (and with it the sender) is
        // dropped
        tokio::spawn(async move {
            while let Some((deadline, request)) = mirror_rx.recv().await {
                tokio::time::sleep_until(deadline).await;
                if channel.cast(request).is_err() {
                    warn!("storage mirror send failed: boundary transport closed");
                }
            }
        });
        Self {
            entries: RwLock::new(entries),
            mirror_tx,
        }
    }

    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.entries.write().insert(key.clone(), value.clone());
        self.mirror(AppletToHostRequest::LocalStorageSet { key, value });
    }

    pub fn remove_item(&self, key: &str) {
        self.entries.write().remove(key);
        self.mirror(AppletToHostRequest::LocalStorageRemove {
            key: key.to_string(),
        });
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.mirror(AppletToHostRequest::LocalStorageClear);
    }

    /// Enqueue the delayed fire-and-forget mirror send
    fn mirror(&self, request: AppletToHostRequest) {
        let deadline = Instant::now() + MIRROR_DELAY;
        if self.mirror_tx.send((deadline, request)).is_err() {
            warn!("storage mirror queue closed");
        }
    }
}
