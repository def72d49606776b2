/*!
 * RPC Wire Types
 * Request envelopes, reply envelopes, and boundary messages
 */

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tokio::sync::oneshot;

use crate::core::errors::ChannelError;
use crate::core::types::{
    AppletBundleId, AppletHash, AttachmentName, DnaHash, Hrl, HrlWithContext, Notification,
    OpenHrlMode, RoleName,
};

/// Navigation targets of the `open_view` capability
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OpenViewRequest {
    /// Main view of an installed applet
    AppletMain { applet_hash: AppletHash },
    /// Named block view of an installed applet
    AppletBlock {
        applet_hash: AppletHash,
        block: String,
        #[serde(default)]
        context: serde_json::Value,
    },
    /// Cross-applet main view of an applet type
    CrossAppletMain { applet_bundle_id: AppletBundleId },
    /// Cross-applet block view of an applet type
    CrossAppletBlock {
        applet_bundle_id: AppletBundleId,
        block: String,
        #[serde(default)]
        context: serde_json::Value,
    },
    /// A resolved locator, opened as an attachable view
    Hrl {
        hrl_with_context: HrlWithContext,
        mode: Option<OpenHrlMode>,
    },
}

/// Every privileged operation a sandboxed applet can request.
///
/// Closed tagged union: one variant per request kind, dispatched exhaustively
/// on the privileged side so adding a kind forces every handler site to be
/// updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
#[allow(clippy::large_enum_variant)]
pub enum AppletToHostRequest {
    OpenView {
        request: OpenViewRequest,
    },
    GetIframeConfig {
        cross_applet: bool,
    },
    GetHrlLocation {
        hrl: Hrl,
    },
    GetGroupProfile {
        group_id: DnaHash,
    },
    GetAppletInfo {
        applet_hash: AppletHash,
    },
    GetGlobalAttachableInfo {
        hrl_with_context: HrlWithContext,
    },
    GetGlobalAttachmentTypes,
    CreateAttachment {
        applet_hash: AppletHash,
        attachment_type: AttachmentName,
        attach_to: HrlWithContext,
    },
    HrlToClipboard {
        hrl_with_context: HrlWithContext,
    },
    Search {
        filter: String,
    },
    UserSelectHrl,
    UserSelectScreen,
    Notify {
        notifications: Vec<Notification>,
    },
    GetLocalStorage,
    LocalStorageSet {
        key: String,
        value: String,
    },
    LocalStorageRemove {
        key: String,
    },
    LocalStorageClear,
}

/// Requests the privileged side sends into a sandboxed applet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum HostToAppletRequest {
    GetAttachmentTypes,
    GetBlockTypes,
    GetAttachableInfo {
        role_name: RoleName,
        integrity_zome_name: String,
        entry_type: String,
        hrl_with_context: HrlWithContext,
    },
    Search {
        filter: String,
    },
    CreateAttachment {
        attachment_type: AttachmentName,
        attach_to: HrlWithContext,
    },
}

/// Request plus the identity of the sending execution context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestEnvelope {
    pub request: AppletToHostRequest,
    pub applet_hash: AppletHash,
}

/// Reply to one request. Sent at most once per request envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ReplyEnvelope {
    Success { result: serde_json::Value },
    Error { error: String },
}

impl ReplyEnvelope {
    /// Successful reply with a serializable result
    pub fn success<T: Serialize>(result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self::Success { result },
            Err(e) => Self::Error {
                error: format!("Failed to serialize reply: {e}"),
            },
        }
    }

    /// Successful reply with no payload
    #[must_use]
    pub fn unit() -> Self {
        Self::Success {
            result: serde_json::Value::Null,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Collapse into the caller-visible result
    pub fn into_result(self) -> Result<serde_json::Value, ChannelError> {
        match self {
            Self::Success { result } => Ok(result),
            Self::Error { error } => Err(ChannelError::Remote(error)),
        }
    }
}

/// Single-use reply endpoint attached to one request.
///
/// Consuming `send` makes a second reply unrepresentable; dropping the guard
/// without replying is observable to the caller as a closed channel.
#[derive(Debug)]
pub struct ReplyGuard(oneshot::Sender<ReplyEnvelope>);

impl ReplyGuard {
    #[must_use]
    pub fn new(tx: oneshot::Sender<ReplyEnvelope>) -> Self {
        Self(tx)
    }

    /// Send the one reply. Returns the envelope back if the caller already
    /// stopped awaiting.
    pub fn send(self, reply: ReplyEnvelope) -> Result<(), ReplyEnvelope> {
        self.0.send(reply)
    }
}

/// One applet→host exchange in flight: the envelope and its reply endpoint
#[derive(Debug)]
pub struct AppletToHostMessage {
    pub envelope: RequestEnvelope,
    pub reply: ReplyGuard,
}

/// One host→applet exchange in flight
#[derive(Debug)]
pub struct HostToAppletMessage {
    pub request: HostToAppletRequest,
    pub reply: ReplyGuard,
}
