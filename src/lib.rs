/*!
 * Applet Host Core
 * Capability-mediated protocol between sandboxed applets and the privileged host
 */

pub mod bridge;
pub mod codec;
pub mod core;
pub mod host;
pub mod rpc;
pub mod storage;
pub mod views;

// Re-exports
pub use crate::core::errors::{BootstrapError, ChannelError, CodecError, HostError, RouterError};
pub use crate::core::types::{
    AppletHash, AppletId, DnaHash, EntryHash, Hrl, HrlLocation, HrlWithContext,
};
pub use bridge::{AppletServices, CapabilityBridge, IframeConfig, RenderInfo};
pub use host::{AppRegistry, AttachmentRegistry, EntryTypeIndex, HostDispatcher, HrlResolver};
pub use rpc::{AppletChannel, HostChannel, ReplyEnvelope};
pub use storage::LocalStorage;
pub use views::{AppletView, RenderView};
