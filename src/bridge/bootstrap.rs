/*!
 * Applet Bootstrap
 * Assembles one execution context before its applet code runs
 */

use futures::future::try_join_all;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::applet_handler::{spawn_applet_handler, AppletContext, AppletServices};
use super::config::{
    AppletConnection, ClientFactory, IframeConfig, ProfilesClient, RenderInfo,
};
use super::services::CapabilityBridge;
use crate::codec::{self, app_id_from_applet_hash};
use crate::core::errors::{BootstrapError, RouterError};
use crate::core::types::AppletHash;
use crate::rpc::channel::{AppletEndpoint, HostChannel, HostTransport};
use crate::rpc::types::AppletToHostRequest;
use crate::storage::LocalStorage;
use crate::views::router::{parse_initial_view, query_of_address};
use crate::views::types::RenderView;

/// Delay before the second attachment-type refresh fire
pub const REFRESH_DELAY: Duration = Duration::from_secs(2);

/// Steady attachment-type refresh interval
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// A fully bootstrapped execution context.
///
/// The capability bridge and render info are installed once, here, and never
/// replaced afterwards; applet code only ever receives shared references.
pub struct AppletRuntime {
    pub applet_hash: AppletHash,
    pub bridge: Arc<CapabilityBridge>,
    pub render_info: RenderInfo,
    pub local_storage: Arc<LocalStorage>,
    refresh_task: JoinHandle<()>,
    handler_task: Option<JoinHandle<()>>,
}

impl AppletRuntime {
    /// Tear down the context's background timers. Required on context
    /// teardown; the refresh timer runs indefinitely otherwise.
    pub fn shutdown(&self) {
        self.refresh_task.abort();
        if let Some(handler) = &self.handler_task {
            handler.abort();
        }
    }
}

impl Drop for AppletRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// The render info holds client trait objects, so the fields are summarized
impl std::fmt::Debug for AppletRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppletRuntime")
            .field("applet_hash", &self.applet_hash)
            .field(
                "cross_applet",
                &matches!(self.render_info, RenderInfo::CrossAppletView { .. }),
            )
            .field("storage_entries", &self.local_storage.len())
            .finish_non_exhaustive()
    }
}

async fn refresh_once(bridge: &CapabilityBridge) {
    if let Err(e) = bridge.refresh_attachment_types().await {
        debug!("attachment-type refresh failed: {e}");
    }
}

/// Three overlapping fires: immediately, once after a short delay, then on a
/// steady interval. The early fires cover applets whose request listener is
/// not attached yet when the first refresh arrives.
fn spawn_refresh_schedule(bridge: Arc<CapabilityBridge>) -> JoinHandle<()> {
    tokio::spawn(async move {
        refresh_once(&bridge).await;
        tokio::time::sleep(REFRESH_DELAY).await;
        refresh_once(&bridge).await;
        loop {
            tokio::time::sleep(REFRESH_INTERVAL).await;
            refresh_once(&bridge).await;
        }
    })
}

/// Bootstrap one sandboxed execution context from its assigned address.
///
/// Derives the context's identity from the address (its only legitimate
/// source), seeds local storage from the privileged copy, parses the initial
/// view, fetches the execution config, connects the module-scoped clients,
/// and assembles the capability bridge. Any failure aborts the bootstrap and
/// the shell renders a fallback surface instead.
pub async fn run_applet_bootstrap(
    address: &str,
    transport: HostTransport,
    applet_endpoint: AppletEndpoint,
    services: Arc<dyn AppletServices>,
    clients: Arc<dyn ClientFactory>,
) -> Result<AppletRuntime, BootstrapError> {
    codec::verify_marker_disjoint()?;

    let applet_hash = crate::views::router::applet_hash_from_address(address)?;
    let channel = HostChannel::bind(applet_hash.clone(), transport);

    let query = query_of_address(address).ok_or_else(|| {
        RouterError::InvalidQuery(format!("{address}: missing query component"))
    })?;

    let (local_storage, view) = tokio::join!(
        LocalStorage::seed(channel.clone()),
        parse_initial_view(query, &channel),
    );
    let local_storage = Arc::new(local_storage?);
    let view = view?;

    let config: IframeConfig = channel
        .call_typed(AppletToHostRequest::GetIframeConfig {
            cross_applet: view.is_cross_applet(),
        })
        .await?;

    let bridge = Arc::new(CapabilityBridge::new(channel.clone()));

    let (render_info, handler_task) = match (config, view) {
        (IframeConfig::NotInstalled { applet_name }, _) => {
            warn!("applet '{applet_name}' addressed but not installed, aborting bootstrap");
            return Err(BootstrapError::NotInstalled { applet_name });
        }
        (
            IframeConfig::Applet {
                app_port,
                profiles_location,
                group_profiles,
                ..
            },
            RenderView::Applet(view),
        ) => {
            let (applet_client, profiles_app_client) = tokio::try_join!(
                clients.connect(app_port, app_id_from_applet_hash(&applet_hash)),
                clients.connect(app_port, profiles_location.profiles_app_id.clone()),
            )
            .map_err(BootstrapError::Client)?;
            let profiles_client = ProfilesClient {
                client: profiles_app_client,
                role_name: profiles_location.profiles_role_name,
            };

            // Request listener only exists for single-applet contexts
            let ctx = AppletContext {
                applet_hash: applet_hash.clone(),
                client: applet_client.clone(),
                bridge: bridge.clone(),
            };
            let handler = spawn_applet_handler(applet_endpoint, services, ctx);

            (
                RenderInfo::AppletView {
                    view,
                    applet_hash: applet_hash.clone(),
                    applet_client,
                    profiles_client,
                    group_profiles,
                },
                Some(handler),
            )
        }
        (IframeConfig::CrossApplet { app_port, applets }, RenderView::CrossApplet(view)) => {
            let connections = try_join_all(applets.into_iter().map(
                |(applet_id, profiles_location)| {
                    let clients = clients.clone();
                    async move {
                        let (applet_client, profiles_app_client) = tokio::try_join!(
                            clients.connect(
                                app_port,
                                format!(
                                    "{}{}",
                                    codec::APP_ID_PREFIX,
                                    codec::to_address_safe(&applet_id)
                                ),
                            ),
                            clients.connect(app_port, profiles_location.profiles_app_id.clone()),
                        )?;
                        Ok::<_, String>((
                            applet_id,
                            AppletConnection {
                                applet_client,
                                profiles_client: ProfilesClient {
                                    client: profiles_app_client,
                                    role_name: profiles_location.profiles_role_name,
                                },
                            },
                        ))
                    }
                },
            ))
            .await
            .map_err(BootstrapError::Client)?;

            (
                RenderInfo::CrossAppletView {
                    view,
                    applets: connections.into_iter().collect::<HashMap<_, _>>(),
                },
                None,
            )
        }
        (config, view) => {
            return Err(BootstrapError::BadConfig(format!(
                "config arity does not match view arity (config: {config:?}, cross_applet view: {})",
                view.is_cross_applet()
            )));
        }
    };

    let refresh_task = spawn_refresh_schedule(bridge.clone());

    info!("applet {applet_hash} bootstrapped, context ready");
    Ok(AppletRuntime {
        applet_hash,
        bridge,
        render_info,
        local_storage,
        refresh_task,
        handler_task,
    })
}
