/*!
 * Host Module
 * Privileged-side counterpart: dispatch, resolution, discovery, storage
 */

pub mod attachments;
pub mod dispatcher;
pub mod resolver;
pub mod storage;

pub use attachments::AttachmentRegistry;
pub use dispatcher::{HostDispatcher, ShellSurface};
pub use resolver::{AppCell, AppRegistry, EntryTypeIndex, EntryTypeLocation, HrlResolver,
    InstalledApp, ResolvedHrl};
pub use storage::StorageManager;
