/*!
 * Capability Bridge
 * Injected object graph; every method is exactly one RPC channel call
 */

use arc_swap::ArcSwap;
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::errors::ChannelError;
use crate::core::types::{
    AppletBundleId, AppletHash, AppletInfo, AttachableLocationAndInfo, AttachmentName,
    AttachmentTypeDescriptor, DnaHash, GroupProfile, Hrl, HrlWithContext, Notification,
    OpenHrlMode,
};
use crate::rpc::channel::HostChannel;
use crate::rpc::types::{AppletToHostRequest, OpenViewRequest};

/// Materialized attachment type: the wire descriptor plus a remote-invocation
/// stub keyed by `(applet hash, attachment-type name)`.
#[derive(Clone)]
pub struct AttachmentType {
    pub label: String,
    pub icon_src: String,
    applet_hash: AppletHash,
    name: AttachmentName,
    channel: HostChannel,
}

impl AttachmentType {
    /// Ask the owning applet to attach its content to the given locator.
    /// One RPC round trip to the privileged side, which relays into the
    /// owning applet's sandbox.
    pub async fn create(&self, attach_to: HrlWithContext) -> Result<Hrl, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::CreateAttachment {
                applet_hash: self.applet_hash.clone(),
                attachment_type: self.name.clone(),
                attach_to,
            })
            .await
    }
}

/// Global attachment types, per offering applet
pub type AttachmentTypeMap = HashMap<AppletHash, HashMap<AttachmentName, AttachmentType>>;

/// The capability object graph injected into a sandboxed context before its
/// own code executes.
///
/// Holds no state beyond the read-mostly attachment-type cache; every
/// operation is one channel call with a request kind unique to it, and errors
/// propagate unchanged from the underlying call. Installed exactly once and
/// never replaced, this is the capability-injection boundary.
pub struct CapabilityBridge {
    channel: HostChannel,
    attachment_types: ArcSwap<AttachmentTypeMap>,
}

impl CapabilityBridge {
    #[must_use]
    pub fn new(channel: HostChannel) -> Self {
        Self {
            channel,
            attachment_types: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Underlying channel, for the storage mirror and bootstrap plumbing
    #[must_use]
    pub fn channel(&self) -> &HostChannel {
        &self.channel
    }

    /// Navigate to an applet's main view
    pub async fn open_applet_main(&self, applet_hash: AppletHash) -> Result<(), ChannelError> {
        self.open_view(OpenViewRequest::AppletMain { applet_hash })
            .await
    }

    /// Navigate to a named block view of an applet
    pub async fn open_applet_block(
        &self,
        applet_hash: AppletHash,
        block: impl Into<String>,
        context: serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.open_view(OpenViewRequest::AppletBlock {
            applet_hash,
            block: block.into(),
            context,
        })
        .await
    }

    /// Navigate to the cross-applet main view of an applet type
    pub async fn open_cross_applet_main(
        &self,
        applet_bundle_id: AppletBundleId,
    ) -> Result<(), ChannelError> {
        self.open_view(OpenViewRequest::CrossAppletMain { applet_bundle_id })
            .await
    }

    /// Navigate to a cross-applet block view of an applet type
    pub async fn open_cross_applet_block(
        &self,
        applet_bundle_id: AppletBundleId,
        block: impl Into<String>,
        context: serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.open_view(OpenViewRequest::CrossAppletBlock {
            applet_bundle_id,
            block: block.into(),
            context,
        })
        .await
    }

    /// Navigate to a resolved locator
    pub async fn open_hrl(
        &self,
        hrl_with_context: HrlWithContext,
        mode: Option<OpenHrlMode>,
    ) -> Result<(), ChannelError> {
        self.open_view(OpenViewRequest::Hrl {
            hrl_with_context,
            mode,
        })
        .await
    }

    async fn open_view(&self, request: OpenViewRequest) -> Result<(), ChannelError> {
        self.channel
            .call(AppletToHostRequest::OpenView { request })
            .await
            .map(|_| ())
    }

    /// Fetch the profile of a group this applet is shared with
    pub async fn group_profile(
        &self,
        group_id: DnaHash,
    ) -> Result<Option<GroupProfile>, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::GetGroupProfile { group_id })
            .await
    }

    /// Fetch descriptive info about an installed applet
    pub async fn applet_info(
        &self,
        applet_hash: AppletHash,
    ) -> Result<Option<AppletInfo>, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::GetAppletInfo { applet_hash })
            .await
    }

    /// Resolve global info about a locator owned by any applet
    pub async fn attachable_info(
        &self,
        hrl_with_context: HrlWithContext,
    ) -> Result<Option<AttachableLocationAndInfo>, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::GetGlobalAttachableInfo { hrl_with_context })
            .await
    }

    /// Add a locator to the shared clipboard
    pub async fn hrl_to_clipboard(
        &self,
        hrl_with_context: HrlWithContext,
    ) -> Result<(), ChannelError> {
        self.channel
            .call(AppletToHostRequest::HrlToClipboard { hrl_with_context })
            .await
            .map(|_| ())
    }

    /// Run a search across all applets
    pub async fn search(&self, filter: impl Into<String>) -> Result<Vec<HrlWithContext>, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::Search {
                filter: filter.into(),
            })
            .await
    }

    /// Prompt the user to select a locator. `None` if the user cancels.
    pub async fn user_select_hrl(&self) -> Result<Option<HrlWithContext>, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::UserSelectHrl)
            .await
    }

    /// Prompt the user to select a screen or window for capture
    pub async fn user_select_screen(&self) -> Result<String, ChannelError> {
        self.channel
            .call_typed(AppletToHostRequest::UserSelectScreen)
            .await
    }

    /// Dispatch notifications towards the shell
    pub async fn notify(&self, notifications: Vec<Notification>) -> Result<(), ChannelError> {
        self.channel
            .call(AppletToHostRequest::Notify { notifications })
            .await
            .map(|_| ())
    }

    /// Currently known attachment types across all applets.
    ///
    /// Served from the local cache; refreshed on the bootstrap's schedule.
    #[must_use]
    pub fn attachment_types(&self) -> Arc<AttachmentTypeMap> {
        self.attachment_types.load_full()
    }

    /// Fetch the global attachment-type map and swap the cache, re-attaching
    /// a remote `create` stub to every wire descriptor.
    pub async fn refresh_attachment_types(&self) -> Result<(), ChannelError> {
        let wire: HashMap<String, HashMap<AttachmentName, AttachmentTypeDescriptor>> = self
            .channel
            .call_typed(AppletToHostRequest::GetGlobalAttachmentTypes)
            .await?;

        let mut materialized: AttachmentTypeMap = HashMap::with_capacity(wire.len());
        for (applet_id, types) in wire {
            let applet_hash = AppletHash::from_b64(&applet_id)
                .map_err(|e| ChannelError::Decode(e.to_string()))?;
            let types = types
                .into_iter()
                .map(|(name, descriptor)| {
                    let attachment_type = AttachmentType {
                        label: descriptor.label,
                        icon_src: descriptor.icon_src,
                        applet_hash: applet_hash.clone(),
                        name: name.clone(),
                        channel: self.channel.clone(),
                    };
                    (name, attachment_type)
                })
                .collect();
            materialized.insert(applet_hash, types);
        }

        trace!("attachment-type cache refreshed: {} applets", materialized.len());
        self.attachment_types.store(Arc::new(materialized));
        Ok(())
    }
}
