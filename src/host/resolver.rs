/*!
 * Resource Locator Resolver
 * Maps an HRL to its owning applet, role, and content classification
 */

use futures::future::BoxFuture;
use log::debug;
use std::sync::Arc;

use crate::codec::{applet_hash_from_app_id, APP_ID_PREFIX};
use crate::core::types::{AppletHash, DnaHash, EntryHash, Hrl, HrlLocation, RoleName};

/// One cell of an installed app: the role it is installed under and the
/// network it operates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCell {
    pub role_name: RoleName,
    pub dna_hash: DnaHash,
}

/// An installed, running app as the conductor reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledApp {
    pub app_id: String,
    pub cells: Vec<AppCell>,
}

/// Classification of one entry within a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTypeLocation {
    pub integrity_zome_name: String,
    pub entry_type: String,
}

/// Currently installed, running apps. The conductor behind this is an
/// external collaborator.
pub trait AppRegistry: Send + Sync {
    fn running_apps(&self) -> BoxFuture<'_, Vec<InstalledApp>>;
}

/// Content-type registry of a network. `None` when the entry no longer
/// exists.
pub trait EntryTypeIndex: Send + Sync {
    fn entry_type<'a>(
        &'a self,
        dna_hash: &'a DnaHash,
        entry_hash: &'a EntryHash,
    ) -> BoxFuture<'a, Option<EntryTypeLocation>>;
}

/// A fully resolved HRL: the owning applet plus the wire-visible location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHrl {
    pub applet_hash: AppletHash,
    pub location: HrlLocation,
}

/// Resolves HRLs against the running conductor state.
///
/// Every legitimate miss is `None`, never an error: a locator may reference
/// content deleted, or an applet uninstalled, after it was captured, and
/// callers render a fallback instead of failing outright.
pub struct HrlResolver {
    registry: Arc<dyn AppRegistry>,
    index: Arc<dyn EntryTypeIndex>,
}

impl HrlResolver {
    #[must_use]
    pub fn new(registry: Arc<dyn AppRegistry>, index: Arc<dyn EntryTypeIndex>) -> Self {
        Self { registry, index }
    }

    pub async fn resolve(&self, hrl: &Hrl) -> Option<ResolvedHrl> {
        let apps = self.registry.running_apps().await;

        let (app, cell) = apps.iter().find_map(|app| {
            app.cells
                .iter()
                .find(|cell| cell.dna_hash == hrl.dna_hash)
                .map(|cell| (app, cell))
        })?;

        // An owning app that is not an applet is as good as no owner
        if !app.app_id.starts_with(APP_ID_PREFIX) {
            debug!(
                "hrl {hrl} is owned by non-applet app '{}', treating as not found",
                app.app_id
            );
            return None;
        }
        let applet_hash = applet_hash_from_app_id(&app.app_id).ok()?;

        let entry_type = self
            .index
            .entry_type(&hrl.dna_hash, &hrl.entry_hash)
            .await?;

        Some(ResolvedHrl {
            applet_hash,
            location: HrlLocation {
                role_name: cell.role_name.clone(),
                integrity_zome_name: entry_type.integrity_zome_name,
                entry_type: entry_type.entry_type,
            },
        })
    }
}
