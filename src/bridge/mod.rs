/*!
 * Bridge Module
 * Sandbox-side capability bridge, execution config, and bootstrap
 */

pub mod applet_handler;
pub mod bootstrap;
pub mod config;
pub mod services;

pub use applet_handler::{spawn_applet_handler, AppletContext, AppletServices};
pub use bootstrap::{run_applet_bootstrap, AppletRuntime};
pub use config::{
    AppClient, AppletConnection, ClientFactory, IframeConfig, ProfilesClient, ProfilesLocation,
    RenderInfo,
};
pub use services::{AttachmentType, CapabilityBridge};
