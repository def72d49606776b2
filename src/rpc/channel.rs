/*!
 * RPC Channel
 * One dedicated reply endpoint per call over the always-available boundary transport
 */

use log::trace;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};

use super::types::{
    AppletToHostMessage, AppletToHostRequest, HostToAppletMessage, HostToAppletRequest,
    ReplyGuard, RequestEnvelope,
};
use crate::core::errors::ChannelError;
use crate::core::types::AppletHash;

/// Receiving end of the applet→host transport, held by the privileged side
pub type HostEndpoint = mpsc::UnboundedReceiver<AppletToHostMessage>;

/// Receiving end of the host→applet transport, held inside the sandbox
pub type AppletEndpoint = mpsc::UnboundedReceiver<HostToAppletMessage>;

/// Sending half of the applet→host transport, before an identity is bound
pub type HostTransport = mpsc::UnboundedSender<AppletToHostMessage>;

/// Sandbox-side handle for calling into the privileged host.
///
/// Each call constructs a dedicated one-shot reply channel, transmits the
/// request envelope together with that endpoint, and resolves on the first
/// (and only) reply. Ordering is guaranteed within one call only; concurrent
/// calls are independent and may complete out of order.
#[derive(Debug, Clone)]
pub struct HostChannel {
    applet_hash: AppletHash,
    tx: mpsc::UnboundedSender<AppletToHostMessage>,
}

impl HostChannel {
    /// Create the boundary transport for one execution context. Returns the
    /// sandbox-side handle and the privileged-side receiving endpoint.
    #[must_use]
    pub fn boundary(applet_hash: AppletHash) -> (Self, HostEndpoint) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { applet_hash, tx }, rx)
    }

    /// Create an unbound transport pair. The bootstrap binds the identity it
    /// derived from its assigned address via [`HostChannel::bind`].
    #[must_use]
    pub fn transport() -> (HostTransport, HostEndpoint) {
        mpsc::unbounded_channel()
    }

    /// Bind an identity to an existing transport
    #[must_use]
    pub fn bind(applet_hash: AppletHash, tx: HostTransport) -> Self {
        Self { applet_hash, tx }
    }

    /// Identity this channel stamps on every envelope
    #[must_use]
    pub fn applet_hash(&self) -> &AppletHash {
        &self.applet_hash
    }

    /// Issue one request and await its reply.
    ///
    /// There is no built-in timeout: if the privileged side holds the reply
    /// endpoint without answering, the returned future stays pending. Call
    /// sites needing bounded latency race their own timer and treat expiry as
    /// "no answer." A dropped endpoint surfaces as [`ChannelError::Closed`].
    pub async fn call(
        &self,
        request: AppletToHostRequest,
    ) -> Result<serde_json::Value, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = AppletToHostMessage {
            envelope: RequestEnvelope {
                request,
                applet_hash: self.applet_hash.clone(),
            },
            reply: ReplyGuard::new(reply_tx),
        };
        self.tx.send(message).map_err(|_| ChannelError::Closed)?;
        match reply_rx.await {
            Ok(reply) => reply.into_result(),
            Err(_) => Err(ChannelError::Closed),
        }
    }

    /// Issue one request and deserialize the reply payload
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        request: AppletToHostRequest,
    ) -> Result<T, ChannelError> {
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| ChannelError::Decode(e.to_string()))
    }

    /// Send one request without awaiting its reply.
    ///
    /// The reply endpoint is still attached so the transport can signal
    /// failure, but it is dropped immediately; the privileged side's reply, if
    /// any, goes nowhere.
    pub fn cast(&self, request: AppletToHostRequest) -> Result<(), ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        drop(reply_rx);
        let message = AppletToHostMessage {
            envelope: RequestEnvelope {
                request,
                applet_hash: self.applet_hash.clone(),
            },
            reply: ReplyGuard::new(reply_tx),
        };
        trace!("cast from applet {}", self.applet_hash);
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }
}

/// Privileged-side handle for calling into one sandboxed applet.
///
/// Symmetric to [`HostChannel`]: one reply endpoint per call, first reply
/// wins, no cross-call ordering.
#[derive(Debug, Clone)]
pub struct AppletChannel {
    tx: mpsc::UnboundedSender<HostToAppletMessage>,
}

impl AppletChannel {
    /// Create the host→applet transport for one execution context
    #[must_use]
    pub fn boundary() -> (Self, AppletEndpoint) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Issue one request into the sandbox and await its reply
    pub async fn call(
        &self,
        request: HostToAppletRequest,
    ) -> Result<serde_json::Value, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = HostToAppletMessage {
            request,
            reply: ReplyGuard::new(reply_tx),
        };
        self.tx.send(message).map_err(|_| ChannelError::Closed)?;
        match reply_rx.await {
            Ok(reply) => reply.into_result(),
            Err(_) => Err(ChannelError::Closed),
        }
    }

    /// Issue one request and deserialize the reply payload
    pub async fn call_typed<T: DeserializeOwned>(
        &self,
        request: HostToAppletRequest,
    ) -> Result<T, ChannelError> {
        let value = self.call(request).await?;
        serde_json::from_value(value).map_err(|e| ChannelError::Decode(e.to_string()))
    }
}
