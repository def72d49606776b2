/*!
 * Applet Handler Tests
 * Default service callbacks and error wrapping for host→applet requests
 */

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use pretty_assertions::assert_eq;

use applet_host::bridge::{
    spawn_applet_handler, AppClient, AppletContext, AppletServices, CapabilityBridge,
};
use applet_host::core::types::{
    AttachableInfo, BlockType, DnaHash, EntryHash, Hrl, HrlWithContext,
};
use applet_host::rpc::{AppletChannel, HostChannel, HostToAppletRequest};
use applet_host::{AppletHash, ChannelError};

fn applet_hash(n: u8) -> AppletHash {
    AppletHash::from_raw(vec![n; 8])
}

fn sample_hrl() -> Hrl {
    Hrl::new(
        DnaHash::from_raw(vec![1, 2, 3, 4]),
        EntryHash::from_raw(vec![5, 6, 7, 8]),
    )
}

struct FakeClient(String);

impl AppClient for FakeClient {
    fn app_id(&self) -> &str {
        &self.0
    }
}

fn test_context(hash: AppletHash) -> AppletContext {
    let (channel, _endpoint) = HostChannel::boundary(hash.clone());
    AppletContext {
        applet_hash: hash,
        client: Arc::new(FakeClient("applet#test".to_string())),
        bridge: Arc::new(CapabilityBridge::new(channel)),
    }
}

/// Spawn the handler with the given services and return the privileged-side
/// channel into it
fn serve(services: Arc<dyn AppletServices>, hash: AppletHash) -> AppletChannel {
    let (channel, endpoint) = AppletChannel::boundary();
    spawn_applet_handler(endpoint, services, test_context(hash));
    channel
}

struct DefaultServices;

impl AppletServices for DefaultServices {}

#[tokio::test]
async fn test_defaults_serve_empty_offers() {
    let channel = serve(Arc::new(DefaultServices), applet_hash(1));

    let types: HashMap<String, serde_json::Value> = channel
        .call_typed(HostToAppletRequest::GetAttachmentTypes)
        .await
        .unwrap();
    assert!(types.is_empty());

    let blocks: HashMap<String, BlockType> = channel
        .call_typed(HostToAppletRequest::GetBlockTypes)
        .await
        .unwrap();
    assert!(blocks.is_empty());

    let results: Vec<HrlWithContext> = channel
        .call_typed(HostToAppletRequest::Search {
            filter: "anything".to_string(),
        })
        .await
        .unwrap();
    assert!(results.is_empty());

    let info: Option<AttachableInfo> = channel
        .call_typed(HostToAppletRequest::GetAttachableInfo {
            role_name: "notes".to_string(),
            integrity_zome_name: "notes_integrity".to_string(),
            entry_type: "note".to_string(),
            hrl_with_context: HrlWithContext::new(sample_hrl()),
        })
        .await
        .unwrap();
    assert_eq!(info, None);
}

#[tokio::test]
async fn test_default_create_attachment_reports_missing_type() {
    let hash = applet_hash(2);
    let channel = serve(Arc::new(DefaultServices), hash.clone());

    let err = channel
        .call(HostToAppletRequest::CreateAttachment {
            attachment_type: "sticky_note".to_string(),
            attach_to: HrlWithContext::new(sample_hrl()),
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChannelError::Remote(format!(
            "Failed to create attachment of type 'sticky_note' for applet with hash '{hash}': \
             Necessary attachment type not provided by the applet."
        ))
    );
}

struct SearchingServices;

impl AppletServices for SearchingServices {
    fn search<'a>(
        &'a self,
        _ctx: &'a AppletContext,
        filter: String,
    ) -> BoxFuture<'a, Result<Vec<HrlWithContext>, String>> {
        Box::pin(async move {
            if filter == "note" {
                Ok(vec![HrlWithContext::new(sample_hrl())])
            } else {
                Ok(Vec::new())
            }
        })
    }

    fn create_attachment<'a>(
        &'a self,
        _ctx: &'a AppletContext,
        _attachment_type: String,
        attach_to: HrlWithContext,
    ) -> BoxFuture<'a, Result<Hrl, String>> {
        Box::pin(async move { Ok(attach_to.hrl) })
    }
}

#[tokio::test]
async fn test_overridden_callbacks_serve_requests() {
    let channel = serve(Arc::new(SearchingServices), applet_hash(3));

    let results: Vec<HrlWithContext> = channel
        .call_typed(HostToAppletRequest::Search {
            filter: "note".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(results, vec![HrlWithContext::new(sample_hrl())]);

    let hrl: Hrl = channel
        .call_typed(HostToAppletRequest::CreateAttachment {
            attachment_type: "sticky_note".to_string(),
            attach_to: HrlWithContext::new(sample_hrl()),
        })
        .await
        .unwrap();
    assert_eq!(hrl, sample_hrl());
}

#[tokio::test]
async fn test_requests_are_served_concurrently() {
    struct SlowServices;

    impl AppletServices for SlowServices {
        fn search<'a>(
            &'a self,
            _ctx: &'a AppletContext,
            filter: String,
        ) -> BoxFuture<'a, Result<Vec<HrlWithContext>, String>> {
            Box::pin(async move {
                if filter == "slow" {
                    std::future::pending::<()>().await;
                }
                Ok(Vec::new())
            })
        }
    }

    let channel = serve(Arc::new(SlowServices), applet_hash(4));

    // A request that never completes does not block the next one
    let slow = channel.call(HostToAppletRequest::Search {
        filter: "slow".to_string(),
    });
    tokio::pin!(slow);

    let fast = channel.call_typed::<Vec<HrlWithContext>>(HostToAppletRequest::Search {
        filter: "fast".to_string(),
    });

    tokio::select! {
        results = fast => assert!(results.unwrap().is_empty()),
        _ = &mut slow => panic!("the blocked request should never resolve"),
    }
}
