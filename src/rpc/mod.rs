/*!
 * RPC Module
 * One-shot request/reply protocol across the isolation boundary
 */

pub mod channel;
pub mod types;

pub use channel::{AppletChannel, AppletEndpoint, HostChannel, HostEndpoint, HostTransport};
pub use types::{
    AppletToHostMessage, AppletToHostRequest, HostToAppletMessage, HostToAppletRequest,
    OpenViewRequest, ReplyEnvelope, ReplyGuard, RequestEnvelope,
};
