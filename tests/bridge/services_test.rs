/*!
 * Capability Bridge Tests
 * One request kind per capability, verbatim error propagation, type cache
 */

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use applet_host::bridge::CapabilityBridge;
use applet_host::core::types::{
    AttachmentTypeDescriptor, DnaHash, EntryHash, GroupProfile, Hrl, HrlWithContext, Notification,
    NotificationUrgency,
};
use applet_host::rpc::{AppletToHostRequest, HostChannel, OpenViewRequest, ReplyEnvelope};
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

/// Bridge wired to a responder that records every request and replies from a
/// fixed script keyed by request kind.
fn scripted_bridge(
    reply_for: impl Fn(&AppletToHostRequest) -> ReplyEnvelope + Send + 'static,
) -> (CapabilityBridge, mpsc::UnboundedReceiver<AppletToHostRequest>) {
    let (channel, mut endpoint) = HostChannel::boundary(applet_hash(1));
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(message) = endpoint.recv().await {
            let reply = reply_for(&message.envelope.request);
            let _ = seen_tx.send(message.envelope.request);
            let _ = message.reply.send(reply);
        }
    });
    (CapabilityBridge::new(channel), seen_rx)
}

#[tokio::test]
async fn test_open_view_carries_the_navigation_target() {
    let (bridge, mut seen) = scripted_bridge(|_| ReplyEnvelope::unit());

    bridge.open_applet_main(applet_hash(7)).await.unwrap();
    assert_eq!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::OpenView {
            request: OpenViewRequest::AppletMain {
                applet_hash: applet_hash(7),
            },
        }
    );

    bridge
        .open_applet_block(applet_hash(7), "inbox", serde_json::json!({"page": 1}))
        .await
        .unwrap();
    assert_eq!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::OpenView {
            request: OpenViewRequest::AppletBlock {
                applet_hash: applet_hash(7),
                block: "inbox".to_string(),
                context: serde_json::json!({"page": 1}),
            },
        }
    );
}

#[tokio::test]
async fn test_each_capability_issues_its_own_request_kind() {
    let group = GroupProfile {
        name: "garden".to_string(),
        logo_src: "logo.png".to_string(),
    };
    let group_reply = group.clone();
    let (bridge, mut seen) = scripted_bridge(move |request| match request {
        AppletToHostRequest::GetGroupProfile { .. } => {
            ReplyEnvelope::success(&Some(group_reply.clone()))
        }
        AppletToHostRequest::Search { .. } => {
            ReplyEnvelope::success(&Vec::<HrlWithContext>::new())
        }
        AppletToHostRequest::UserSelectHrl => {
            ReplyEnvelope::success(&None::<HrlWithContext>)
        }
        _ => ReplyEnvelope::unit(),
    });

    let profile = bridge
        .group_profile(DnaHash::from_raw(vec![9; 4]))
        .await
        .unwrap();
    assert_eq!(profile, Some(group));
    assert!(matches!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::GetGroupProfile { .. }
    ));

    assert_eq!(bridge.search("berries").await.unwrap(), Vec::new());
    assert_eq!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::Search {
            filter: "berries".to_string(),
        }
    );

    assert_eq!(bridge.user_select_hrl().await.unwrap(), None);
    assert!(matches!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::UserSelectHrl
    ));

    bridge
        .hrl_to_clipboard(HrlWithContext::new(sample_hrl()))
        .await
        .unwrap();
    assert!(matches!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::HrlToClipboard { .. }
    ));

    bridge
        .notify(vec![Notification {
            title: "ping".to_string(),
            body: "pong".to_string(),
            urgency: NotificationUrgency::Low,
            timestamp: 1_700_000_000_000,
        }])
        .await
        .unwrap();
    assert!(matches!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::Notify { .. }
    ));
}

#[tokio::test]
async fn test_remote_errors_propagate_unchanged() {
    let (bridge, _seen) = scripted_bridge(|_| ReplyEnvelope::error("user dismissed the prompt"));
    let err = bridge.user_select_screen().await.unwrap_err();
    assert_eq!(
        err,
        ChannelError::Remote("user dismissed the prompt".to_string())
    );
}

#[tokio::test]
async fn test_refresh_materializes_the_attachment_type_cache() {
    let offering = applet_hash(0xC4);
    let wire: HashMap<String, HashMap<String, AttachmentTypeDescriptor>> = HashMap::from([(
        offering.to_b64(),
        HashMap::from([(
            "sticky_note".to_string(),
            AttachmentTypeDescriptor {
                label: "Sticky note".to_string(),
                icon_src: "note.svg".to_string(),
            },
        )]),
    )]);
    let created = sample_hrl();
    let created_reply = created.clone();
    let wire_reply = wire.clone();
    let (bridge, mut seen) = scripted_bridge(move |request| match request {
        AppletToHostRequest::GetGlobalAttachmentTypes => ReplyEnvelope::success(&wire_reply),
        AppletToHostRequest::CreateAttachment { .. } => {
            ReplyEnvelope::success(&created_reply)
        }
        _ => ReplyEnvelope::unit(),
    });

    // Cache starts empty and is only populated by a refresh
    assert!(bridge.attachment_types().is_empty());
    bridge.refresh_attachment_types().await.unwrap();
    let _ = seen.recv().await.unwrap();

    let types = bridge.attachment_types();
    let attachment_type = &types[&offering]["sticky_note"];
    assert_eq!(attachment_type.label, "Sticky note");
    assert_eq!(attachment_type.icon_src, "note.svg");

    // The re-attached stub routes back to the offering applet by hash and name
    let target = HrlWithContext::new(sample_hrl());
    let hrl = attachment_type.create(target.clone()).await.unwrap();
    assert_eq!(hrl, created);
    assert_eq!(
        seen.recv().await.unwrap(),
        AppletToHostRequest::CreateAttachment {
            applet_hash: offering,
            attachment_type: "sticky_note".to_string(),
            attach_to: target,
        }
    );
}

#[tokio::test]
async fn test_failed_refresh_keeps_the_previous_cache() {
    let offering = applet_hash(0xC4);
    let wire: HashMap<String, HashMap<String, AttachmentTypeDescriptor>> = HashMap::from([(
        offering.to_b64(),
        HashMap::from([(
            "sticky_note".to_string(),
            AttachmentTypeDescriptor {
                label: "Sticky note".to_string(),
                icon_src: "note.svg".to_string(),
            },
        )]),
    )]);
    let wire_reply = wire.clone();
    let fail = std::sync::atomic::AtomicBool::new(false);
    let (bridge, _seen) = scripted_bridge(move |_| {
        if fail.swap(true, std::sync::atomic::Ordering::SeqCst) {
            ReplyEnvelope::error("registry offline")
        } else {
            ReplyEnvelope::success(&wire_reply)
        }
    });

    bridge.refresh_attachment_types().await.unwrap();
    assert_eq!(bridge.attachment_types().len(), 1);

    bridge.refresh_attachment_types().await.unwrap_err();
    assert_eq!(bridge.attachment_types().len(), 1);
}
