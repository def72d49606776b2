/*!
 * Execution Config
 * What the bootstrap must construct before the capability bridge exists
 */

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::types::{AppletHash, AppletId, GroupProfile, RoleName};
use crate::views::types::{AppletView, CrossAppletView};

/// Where the profiles cell of an applet's group lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilesLocation {
    pub profiles_app_id: String,
    pub profiles_role_name: RoleName,
}

/// Configuration fetched once per execution context, before any applet code
/// runs. Drives which clients the bootstrap constructs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum IframeConfig {
    /// The addressed applet is not installed; bootstrap must abort and the
    /// shell renders a fallback surface.
    NotInstalled { applet_name: String },
    /// Single-applet context
    Applet {
        app_port: u16,
        role_name: RoleName,
        profiles_location: ProfilesLocation,
        group_profiles: Vec<GroupProfile>,
    },
    /// Cross-applet context: one client pair per running instance
    CrossApplet {
        app_port: u16,
        applets: HashMap<AppletId, ProfilesLocation>,
    },
}

/// Connection to one installed app on the ledger runtime.
///
/// The runtime itself is an external collaborator; this is the seam the
/// bootstrap talks to it through.
pub trait AppClient: Send + Sync {
    /// Installed-app id this client is scoped to
    fn app_id(&self) -> &str;
}

/// Connects module-scoped clients during bootstrap
pub trait ClientFactory: Send + Sync {
    fn connect(
        &self,
        app_port: u16,
        app_id: String,
    ) -> BoxFuture<'_, Result<Arc<dyn AppClient>, String>>;
}

/// An app client scoped to the profiles role of a group
#[derive(Clone)]
pub struct ProfilesClient {
    pub client: Arc<dyn AppClient>,
    pub role_name: RoleName,
}

/// Client pair for one applet instance inside a cross-applet context
#[derive(Clone)]
pub struct AppletConnection {
    pub applet_client: Arc<dyn AppClient>,
    pub profiles_client: ProfilesClient,
}

/// The companion render-context object installed next to the capability
/// bridge: which view to show and which clients are available. Read-only
/// after construction.
pub enum RenderInfo {
    AppletView {
        view: AppletView,
        applet_hash: AppletHash,
        applet_client: Arc<dyn AppClient>,
        profiles_client: ProfilesClient,
        group_profiles: Vec<GroupProfile>,
    },
    CrossAppletView {
        view: CrossAppletView,
        applets: HashMap<AppletId, AppletConnection>,
    },
}
