/*!
 * View Router
 * Positional query-string encoding of initial views, parsed and produced
 */

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;

use super::types::{AppletView, CrossAppletView, RenderView};
use crate::codec::{from_address_safe, to_address_safe};
use crate::core::errors::RouterError;
use crate::core::types::{AppletHash, Hrl, HrlLocation, HrlWithContext};
use crate::rpc::channel::HostChannel;
use crate::rpc::types::{AppletToHostRequest, OpenViewRequest};

/// Scheme applet execution contexts are routed under
pub const ADDRESS_SCHEME: &str = "applet://";

const VIEW_SINGLE: &str = "single-module";
const VIEW_CROSS: &str = "cross-module";

/// Percent escape of the codec marker in the case-insensitive address space
const MARKER_ESCAPE: &str = "%24";

fn value_of(token: &str) -> Option<&str> {
    token.split_once('=').map(|(_, v)| v)
}

fn key_of(token: &str) -> Option<&str> {
    token.split_once('=').map(|(k, _)| k)
}

/// Token 3, if present, is `context=<base64 JSON bytes>`
fn decode_context(token: Option<&str>) -> Result<serde_json::Value, RouterError> {
    let Some(token) = token else {
        return Ok(serde_json::Value::Null);
    };
    if key_of(token) != Some("context") {
        return Ok(serde_json::Value::Null);
    }
    let encoded = value_of(token).unwrap_or_default();
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| RouterError::InvalidContext(format!("{encoded}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| RouterError::InvalidContext(e.to_string()))
}

fn encode_context(context: &serde_json::Value) -> Option<String> {
    if context.is_null() {
        return None;
    }
    let bytes = serde_json::to_vec(context).ok()?;
    Some(STANDARD.encode(bytes))
}

/// Parse the query component of an execution context's assigned address into
/// a typed view descriptor.
///
/// The query is an ordered sequence of `key=value` tokens where position, not
/// key lookup, determines meaning: token 0 is the coarse view kind, token 1
/// the fine-grained kind, token 2 a `block` name or `hrl` locator, token 3 an
/// opaque `context`. An attachable view additionally resolves its locator
/// over one round trip; failure to resolve is a hard error for that kind.
pub async fn parse_initial_view(
    query: &str,
    channel: &HostChannel,
) -> Result<RenderView, RouterError> {
    let tokens: Vec<&str> = query.split('&').collect();

    let view = tokens
        .first()
        .and_then(|t| value_of(t))
        .ok_or_else(|| RouterError::InvalidQuery(query.to_string()))?;
    let view_type = tokens
        .get(1)
        .and_then(|t| value_of(t))
        .ok_or_else(|| RouterError::InvalidQuery(query.to_string()))?;

    match view_type {
        "main" => match view {
            VIEW_SINGLE => Ok(RenderView::Applet(AppletView::Main)),
            VIEW_CROSS => Ok(RenderView::CrossApplet(CrossAppletView::Main)),
            _ => Err(RouterError::InvalidQuery(query.to_string())),
        },
        "block" => {
            let name = match tokens.get(2) {
                Some(t) if key_of(t) == Some("block") => value_of(t).unwrap_or_default(),
                _ => return Err(RouterError::MissingBlock(query.to_string())),
            };
            if name.is_empty() {
                return Err(RouterError::MissingBlock(query.to_string()));
            }
            let context = decode_context(tokens.get(3).copied())?;
            match view {
                VIEW_SINGLE => Ok(RenderView::Applet(AppletView::Block {
                    name: name.to_string(),
                    context,
                })),
                VIEW_CROSS => Ok(RenderView::CrossApplet(CrossAppletView::Block {
                    name: name.to_string(),
                    context,
                })),
                _ => Err(RouterError::InvalidQuery(query.to_string())),
            }
        }
        "attachable" => {
            // Cross-module contexts never render attachables
            if view != VIEW_SINGLE {
                return Err(RouterError::InvalidQuery(query.to_string()));
            }
            let hrl = match tokens.get(2) {
                Some(t) if key_of(t) == Some("hrl") => {
                    Hrl::parse(value_of(t).unwrap_or_default())
                        .map_err(|e| RouterError::InvalidQuery(format!("{query}: {e}")))?
                }
                _ => return Err(RouterError::MissingHrl(query.to_string())),
            };
            let context = decode_context(tokens.get(3).copied())?;

            debug!("resolving hrl {hrl} for attachable view");
            let location: Option<HrlLocation> = channel
                .call_typed(AppletToHostRequest::GetHrlLocation { hrl: hrl.clone() })
                .await
                .map_err(|e| RouterError::HrlResolution {
                    hrl: hrl.to_string(),
                    message: e.to_string(),
                })?;
            let location = location.ok_or_else(|| RouterError::HrlResolution {
                hrl: hrl.to_string(),
                message: "no owning applet or entry type found".to_string(),
            })?;

            Ok(RenderView::Applet(AppletView::Attachable {
                role_name: location.role_name,
                integrity_zome_name: location.integrity_zome_name,
                entry_type: location.entry_type,
                hrl_with_context: HrlWithContext { hrl, context },
            }))
        }
        _ => Err(RouterError::InvalidQuery(query.to_string())),
    }
}

/// Privileged side: the addressable authority routing one applet's execution
/// context. The marker travels percent-escaped because the address space
/// normalizes case but not percent sequences.
#[must_use]
pub fn applet_address(applet_hash: &AppletHash) -> String {
    let label = to_address_safe(&applet_hash.to_b64()).replace('$', MARKER_ESCAPE);
    format!("{ADDRESS_SCHEME}{label}")
}

/// Sandbox side: recover the assigned applet hash from the context's address.
///
/// This is the only source the sandboxed side may derive its identity from.
pub fn applet_hash_from_address(address: &str) -> Result<AppletHash, RouterError> {
    let rest = address
        .strip_prefix(ADDRESS_SCHEME)
        .ok_or_else(|| RouterError::InvalidAddress(address.to_string()))?;
    let authority = rest
        .split(|c| c == '/' || c == '?')
        .next()
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default();
    let label = authority.replace(MARKER_ESCAPE, "$");
    AppletHash::from_b64(&from_address_safe(&label))
        .map_err(|e| RouterError::InvalidAddress(format!("{address}: {e}")))
}

/// Query component of an address, if any
#[must_use]
pub fn query_of_address(address: &str) -> Option<&str> {
    address.split_once('?').map(|(_, query)| query)
}

/// Privileged side: produce the positional query encoding for a navigation
/// target. Mirrors [`parse_initial_view`] exactly.
#[must_use]
pub fn query_for_open_view(request: &OpenViewRequest) -> String {
    let with_context = |mut query: String, context: &serde_json::Value| {
        if let Some(encoded) = encode_context(context) {
            query.push_str("&context=");
            query.push_str(&encoded);
        }
        query
    };
    match request {
        OpenViewRequest::AppletMain { .. } => format!("view={VIEW_SINGLE}&viewType=main"),
        OpenViewRequest::AppletBlock { block, context, .. } => with_context(
            format!("view={VIEW_SINGLE}&viewType=block&block={block}"),
            context,
        ),
        OpenViewRequest::CrossAppletMain { .. } => format!("view={VIEW_CROSS}&viewType=main"),
        OpenViewRequest::CrossAppletBlock { block, context, .. } => with_context(
            format!("view={VIEW_CROSS}&viewType=block&block={block}"),
            context,
        ),
        OpenViewRequest::Hrl {
            hrl_with_context, ..
        } => with_context(
            format!(
                "view={VIEW_SINGLE}&viewType=attachable&hrl={}",
                hrl_with_context.hrl
            ),
            &hrl_with_context.context,
        ),
    }
}
