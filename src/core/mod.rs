/*!
 * Core Module
 * Shared types and centralized error handling
 */

pub mod errors;
pub mod types;

pub use errors::{BootstrapError, ChannelError, CodecError, HostError, RouterError};
pub use types::{
    AppletBundleId, AppletHash, AppletId, AppletInfo, AttachableInfo, AttachableLocationAndInfo,
    AttachmentName, AttachmentTypeDescriptor, BlockName, BlockType, DnaHash, EntryHash,
    GroupProfile, Hrl, HrlLocation, HrlWithContext, Notification, NotificationUrgency,
    OpenHrlMode, RoleName,
};
