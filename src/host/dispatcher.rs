/*!
 * Host Dispatcher
 * Exhaustive privileged-side handling of every applet request kind
 */

use ahash::RandomState;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use super::attachments::AttachmentRegistry;
use super::resolver::HrlResolver;
use super::storage::StorageManager;
use crate::bridge::config::IframeConfig;
use crate::core::errors::HostError;
use crate::core::types::{
    AppletHash, AppletInfo, AttachableInfo, AttachableLocationAndInfo, DnaHash, GroupProfile,
    HrlLocation, HrlWithContext, Notification,
};
use crate::rpc::channel::{AppletChannel, HostEndpoint};
use crate::rpc::types::{
    AppletToHostRequest, HostToAppletRequest, OpenViewRequest, ReplyEnvelope, RequestEnvelope,
};

/// Operations owned by the windowing shell. The shell itself is an external
/// collaborator; the dispatcher only relays into it.
pub trait ShellSurface: Send + Sync {
    fn open_view(
        &self,
        source: AppletHash,
        request: OpenViewRequest,
    ) -> BoxFuture<'_, Result<(), HostError>>;

    fn iframe_config(
        &self,
        source: AppletHash,
        cross_applet: bool,
    ) -> BoxFuture<'_, Result<IframeConfig, HostError>>;

    fn group_profile(
        &self,
        group_id: DnaHash,
    ) -> BoxFuture<'_, Result<Option<GroupProfile>, HostError>>;

    fn applet_info(
        &self,
        applet_hash: AppletHash,
    ) -> BoxFuture<'_, Result<Option<AppletInfo>, HostError>>;

    fn hrl_to_clipboard(
        &self,
        hrl_with_context: HrlWithContext,
    ) -> BoxFuture<'_, Result<(), HostError>>;

    fn user_select_hrl(&self) -> BoxFuture<'_, Result<Option<HrlWithContext>, HostError>>;

    fn user_select_screen(&self) -> BoxFuture<'_, Result<String, HostError>>;

    fn notify(
        &self,
        source: AppletHash,
        notifications: Vec<Notification>,
    ) -> BoxFuture<'_, Result<(), HostError>>;
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, HostError> {
    serde_json::to_value(value).map_err(|e| HostError::Internal(e.to_string()))
}

/// Privileged-side request dispatcher for one shell.
///
/// Each incoming exchange is served independently; replies may complete out
/// of send order. The one `match` over the closed request enum is exhaustive,
/// so a new request kind does not compile until it is handled here.
pub struct HostDispatcher {
    shell: Arc<dyn ShellSurface>,
    resolver: HrlResolver,
    attachments: Arc<AttachmentRegistry>,
    storage: Arc<StorageManager>,
    applet_channels: DashMap<AppletHash, AppletChannel, RandomState>,
}

impl HostDispatcher {
    #[must_use]
    pub fn new(shell: Arc<dyn ShellSurface>, resolver: HrlResolver) -> Self {
        info!("Host dispatcher initialized");
        Self {
            shell,
            resolver,
            attachments: Arc::new(AttachmentRegistry::new()),
            storage: Arc::new(StorageManager::new()),
            applet_channels: DashMap::with_hasher(RandomState::new()),
        }
    }

    #[must_use]
    pub fn attachments(&self) -> &Arc<AttachmentRegistry> {
        &self.attachments
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    /// Register a sandboxed context that announced readiness, starting
    /// attachment discovery against it
    pub fn register_applet(&self, applet_hash: AppletHash, channel: AppletChannel) {
        self.attachments.track(applet_hash.clone(), channel.clone());
        self.applet_channels.insert(applet_hash, channel);
    }

    /// Tear down everything tied to one execution context
    pub fn unregister_applet(&self, applet_hash: &AppletHash) {
        self.applet_channels.remove(applet_hash);
        self.attachments.untrack(applet_hash);
    }

    /// Abort all per-applet discovery timers
    pub fn shutdown(&self) {
        self.attachments.shutdown();
    }

    /// Serve one boundary endpoint until its sandbox goes away
    pub async fn serve(self: Arc<Self>, mut endpoint: HostEndpoint) {
        while let Some(message) = endpoint.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                let reply = dispatcher.dispatch(message.envelope).await;
                // A dropped receiver means the caller stopped awaiting
                let _ = message.reply.send(reply);
            });
        }
        debug!("boundary endpoint closed");
    }

    /// Handle one envelope and flatten the outcome into a reply
    pub async fn dispatch(&self, envelope: RequestEnvelope) -> ReplyEnvelope {
        match self.handle(envelope).await {
            Ok(result) => ReplyEnvelope::Success { result },
            Err(e) => ReplyEnvelope::error(e.to_string()),
        }
    }

    async fn handle(&self, envelope: RequestEnvelope) -> Result<serde_json::Value, HostError> {
        let RequestEnvelope {
            request,
            applet_hash: sender,
        } = envelope;

        match request {
            AppletToHostRequest::OpenView { request } => {
                self.shell.open_view(sender, request).await?;
                Ok(serde_json::Value::Null)
            }
            AppletToHostRequest::GetIframeConfig { cross_applet } => {
                let config = self.shell.iframe_config(sender, cross_applet).await?;
                to_json(&config)
            }
            AppletToHostRequest::GetHrlLocation { hrl } => {
                let location: Option<HrlLocation> = self
                    .resolver
                    .resolve(&hrl)
                    .await
                    .map(|resolved| resolved.location);
                to_json(&location)
            }
            AppletToHostRequest::GetGroupProfile { group_id } => {
                to_json(&self.shell.group_profile(group_id).await?)
            }
            AppletToHostRequest::GetAppletInfo { applet_hash } => {
                to_json(&self.shell.applet_info(applet_hash).await?)
            }
            AppletToHostRequest::GetGlobalAttachableInfo { hrl_with_context } => {
                to_json(&self.global_attachable_info(hrl_with_context).await?)
            }
            AppletToHostRequest::GetGlobalAttachmentTypes => to_json(&self.attachments.all()),
            AppletToHostRequest::CreateAttachment {
                applet_hash,
                attachment_type,
                attach_to,
            } => {
                let channel = self
                    .applet_channels
                    .get(&applet_hash)
                    .map(|entry| entry.clone())
                    .ok_or_else(|| HostError::NoAppletHost(applet_hash.to_b64()))?;
                Ok(channel
                    .call(HostToAppletRequest::CreateAttachment {
                        attachment_type,
                        attach_to,
                    })
                    .await?)
            }
            AppletToHostRequest::Search { filter } => {
                to_json(&self.global_search(filter).await)
            }
            AppletToHostRequest::HrlToClipboard { hrl_with_context } => {
                self.shell.hrl_to_clipboard(hrl_with_context).await?;
                Ok(serde_json::Value::Null)
            }
            AppletToHostRequest::UserSelectHrl => to_json(&self.shell.user_select_hrl().await?),
            AppletToHostRequest::UserSelectScreen => {
                to_json(&self.shell.user_select_screen().await?)
            }
            AppletToHostRequest::Notify { notifications } => {
                self.shell.notify(sender, notifications).await?;
                Ok(serde_json::Value::Null)
            }
            AppletToHostRequest::GetLocalStorage => {
                to_json(&self.storage.snapshot_for(&sender.to_b64()))
            }
            AppletToHostRequest::LocalStorageSet { key, value } => {
                self.storage.set(sender.to_b64(), key, value);
                Ok(serde_json::Value::Null)
            }
            AppletToHostRequest::LocalStorageRemove { key } => {
                self.storage.remove(&sender.to_b64(), &key);
                Ok(serde_json::Value::Null)
            }
            AppletToHostRequest::LocalStorageClear => {
                self.storage.clear(&sender.to_b64());
                Ok(serde_json::Value::Null)
            }
        }
    }

    /// Resolve the locator, then ask its owning applet for the info
    async fn global_attachable_info(
        &self,
        hrl_with_context: HrlWithContext,
    ) -> Result<Option<AttachableLocationAndInfo>, HostError> {
        let Some(resolved) = self.resolver.resolve(&hrl_with_context.hrl).await else {
            return Ok(None);
        };
        let Some(channel) = self
            .applet_channels
            .get(&resolved.applet_hash)
            .map(|entry| entry.clone())
        else {
            return Ok(None);
        };

        let info: Option<AttachableInfo> = channel
            .call_typed(HostToAppletRequest::GetAttachableInfo {
                role_name: resolved.location.role_name,
                integrity_zome_name: resolved.location.integrity_zome_name,
                entry_type: resolved.location.entry_type,
                hrl_with_context,
            })
            .await?;

        Ok(info.map(|attachable_info| AttachableLocationAndInfo {
            applet_hash: resolved.applet_hash,
            attachable_info,
        }))
    }

    /// Fan the search out to every registered applet; failures only drop
    /// that applet's results
    async fn global_search(&self, filter: String) -> Vec<HrlWithContext> {
        let channels: Vec<(AppletHash, AppletChannel)> = self
            .applet_channels
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let searches = channels.into_iter().map(|(applet_hash, channel)| {
            let filter = filter.clone();
            async move {
                match channel
                    .call_typed::<Vec<HrlWithContext>>(HostToAppletRequest::Search { filter })
                    .await
                {
                    Ok(results) => results,
                    Err(e) => {
                        warn!("search in applet {applet_hash} failed: {e}");
                        Vec::new()
                    }
                }
            }
        });

        join_all(searches).await.into_iter().flatten().collect()
    }
}
