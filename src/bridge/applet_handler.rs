/*!
 * Applet-Side Request Handler
 * Serves host→applet requests against the applet's own service callbacks
 */

use futures::future::BoxFuture;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::config::AppClient;
use super::services::CapabilityBridge;
use crate::core::types::{
    AppletHash, AttachableInfo, AttachmentName, AttachmentTypeDescriptor, BlockName, BlockType,
    Hrl, HrlWithContext, RoleName,
};
use crate::rpc::channel::AppletEndpoint;
use crate::rpc::types::{HostToAppletRequest, ReplyEnvelope};

/// What applet-side service callbacks get to work with
#[derive(Clone)]
pub struct AppletContext {
    pub applet_hash: AppletHash,
    pub client: Arc<dyn AppClient>,
    pub bridge: Arc<CapabilityBridge>,
}

/// Callbacks an applet registers to serve privileged-side requests.
///
/// Every method has a default implementation so an applet only overrides what
/// it actually offers.
pub trait AppletServices: Send + Sync {
    /// Attachment types this applet offers for other applets' content
    fn attachment_types<'a>(
        &'a self,
        ctx: &'a AppletContext,
    ) -> BoxFuture<'a, Result<HashMap<AttachmentName, AttachmentTypeDescriptor>, String>> {
        let _ = ctx;
        Box::pin(async { Ok(HashMap::new()) })
    }

    /// Render block types this applet offers
    fn block_types(&self) -> HashMap<BlockName, BlockType> {
        HashMap::new()
    }

    /// Search inside this applet
    fn search<'a>(
        &'a self,
        ctx: &'a AppletContext,
        filter: String,
    ) -> BoxFuture<'a, Result<Vec<HrlWithContext>, String>> {
        let _ = (ctx, filter);
        Box::pin(async { Ok(Vec::new()) })
    }

    /// Info about one of this applet's attachables
    fn attachable_info<'a>(
        &'a self,
        ctx: &'a AppletContext,
        role_name: RoleName,
        integrity_zome_name: String,
        entry_type: String,
        hrl_with_context: HrlWithContext,
    ) -> BoxFuture<'a, Result<Option<AttachableInfo>, String>> {
        let _ = (ctx, role_name, integrity_zome_name, entry_type, hrl_with_context);
        Box::pin(async { Ok(None) })
    }

    /// Attach this applet's content to the given locator
    fn create_attachment<'a>(
        &'a self,
        ctx: &'a AppletContext,
        attachment_type: AttachmentName,
        attach_to: HrlWithContext,
    ) -> BoxFuture<'a, Result<Hrl, String>> {
        let _ = (ctx, attachment_type, attach_to);
        Box::pin(async { Err("Necessary attachment type not provided by the applet.".to_string()) })
    }
}

async fn handle_request(
    services: &dyn AppletServices,
    ctx: &AppletContext,
    request: HostToAppletRequest,
) -> ReplyEnvelope {
    match request {
        HostToAppletRequest::GetAttachmentTypes => {
            match services.attachment_types(ctx).await {
                Ok(types) => ReplyEnvelope::success(&types),
                Err(e) => ReplyEnvelope::error(e),
            }
        }
        HostToAppletRequest::GetBlockTypes => ReplyEnvelope::success(&services.block_types()),
        HostToAppletRequest::GetAttachableInfo {
            role_name,
            integrity_zome_name,
            entry_type,
            hrl_with_context,
        } => {
            match services
                .attachable_info(ctx, role_name, integrity_zome_name, entry_type, hrl_with_context)
                .await
            {
                Ok(info) => ReplyEnvelope::success(&info),
                Err(e) => ReplyEnvelope::error(e),
            }
        }
        HostToAppletRequest::Search { filter } => match services.search(ctx, filter).await {
            Ok(results) => ReplyEnvelope::success(&results),
            Err(e) => ReplyEnvelope::error(e),
        },
        HostToAppletRequest::CreateAttachment {
            attachment_type,
            attach_to,
        } => {
            match services
                .create_attachment(ctx, attachment_type.clone(), attach_to)
                .await
            {
                Ok(hrl) => ReplyEnvelope::success(&hrl),
                Err(e) => ReplyEnvelope::error(format!(
                    "Failed to create attachment of type '{attachment_type}' for applet with hash '{}': {e}",
                    ctx.applet_hash
                )),
            }
        }
    }
}

/// Install the applet-side listener for privileged-side requests. Each
/// request is served independently; the reply guard enforces at most one
/// reply.
pub fn spawn_applet_handler(
    mut endpoint: AppletEndpoint,
    services: Arc<dyn AppletServices>,
    ctx: AppletContext,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = endpoint.recv().await {
            let services = services.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let reply = handle_request(&*services, &ctx, message.request).await;
                if message.reply.send(reply).is_err() {
                    warn!(
                        "host dropped reply endpoint for applet {}",
                        ctx.applet_hash
                    );
                }
            });
        }
    })
}
