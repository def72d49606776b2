/*!
 * Attachment Registry Tests
 * Scheduled discovery, bounded waits, not-ready retries, teardown
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use applet_host::core::types::AttachmentTypeDescriptor;
use applet_host::host::attachments::{DISCOVERY_DELAY, DISCOVERY_TIMEOUT};
use applet_host::host::AttachmentRegistry;
use applet_host::rpc::{AppletChannel, HostToAppletRequest, ReplyEnvelope};
use applet_host::AppletHash;

fn applet_hash(n: u8) -> AppletHash {
    AppletHash::from_raw(vec![n; 8])
}

fn sticky_note_types() -> HashMap<String, AttachmentTypeDescriptor> {
    HashMap::from([(
        "sticky_note".to_string(),
        AttachmentTypeDescriptor {
            label: "Sticky note".to_string(),
            icon_src: "note.svg".to_string(),
        },
    )])
}

/// One scripted reply per discovery fire, in order. `None` holds the reply
/// endpoint open without answering, forcing the bounded wait to expire.
fn scripted_applet(script: Vec<Option<ReplyEnvelope>>) -> AppletChannel {
    let (channel, mut endpoint) = AppletChannel::boundary();
    tokio::spawn(async move {
        let mut script = script.into_iter();
        let mut held = Vec::new();
        while let Some(message) = endpoint.recv().await {
            assert!(matches!(
                message.request,
                HostToAppletRequest::GetAttachmentTypes
            ));
            match script.next().flatten() {
                Some(reply) => {
                    let _ = message.reply.send(reply);
                }
                None => held.push(message),
            }
        }
    });
    channel
}

#[tokio::test(start_paused = true)]
async fn test_first_discovery_fire_populates_the_cache() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(1);
    registry.track(
        hash.clone(),
        scripted_applet(vec![Some(ReplyEnvelope::success(&sticky_note_types()))]),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(registry.attachment_types_for(&hash), sticky_note_types());
    assert_eq!(
        registry.all(),
        HashMap::from([(hash.to_b64(), sticky_note_types())])
    );
    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_expired_wait_yields_an_empty_map() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(2);
    // First fire answers, second holds the reply endpoint open
    registry.track(
        hash.clone(),
        scripted_applet(vec![
            Some(ReplyEnvelope::success(&sticky_note_types())),
            None,
        ]),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!registry.attachment_types_for(&hash).is_empty());

    // Second fire at the delay mark, expiring after the bounded wait
    tokio::time::sleep(DISCOVERY_DELAY + DISCOVERY_TIMEOUT + Duration::from_millis(10)).await;
    assert!(registry.attachment_types_for(&hash).is_empty());
    // Empty maps are not reported globally
    assert!(registry.all().is_empty());
    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_later_fire_recovers_from_an_expired_wait() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(7);
    // The sandbox never answers the first fire, then becomes responsive
    registry.track(
        hash.clone(),
        scripted_applet(vec![
            None,
            Some(ReplyEnvelope::success(&sticky_note_types())),
        ]),
    );

    tokio::time::sleep(DISCOVERY_TIMEOUT + Duration::from_millis(10)).await;
    assert!(registry.attachment_types_for(&hash).is_empty());

    tokio::time::sleep(DISCOVERY_DELAY + Duration::from_millis(10)).await;
    assert_eq!(registry.attachment_types_for(&hash), sticky_note_types());
    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_applet_keeps_the_previous_cache() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(3);
    // A sandbox whose listener is not attached yet rejects with this wording
    registry.track(
        hash.clone(),
        scripted_applet(vec![
            Some(ReplyEnvelope::error(
                "Capability bridge accessed before initialization",
            )),
            Some(ReplyEnvelope::success(&sticky_note_types())),
        ]),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(registry.attachment_types_for(&hash).is_empty());

    // The next scheduled fire succeeds
    tokio::time::sleep(DISCOVERY_DELAY + Duration::from_millis(10)).await;
    assert_eq!(registry.attachment_types_for(&hash), sticky_note_types());
    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_failed_discovery_keeps_the_previous_cache() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(4);
    registry.track(
        hash.clone(),
        scripted_applet(vec![
            Some(ReplyEnvelope::success(&sticky_note_types())),
            Some(ReplyEnvelope::error("zome call failed")),
        ]),
    );

    tokio::time::sleep(DISCOVERY_DELAY + Duration::from_millis(10)).await;
    assert_eq!(registry.attachment_types_for(&hash), sticky_note_types());
    registry.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_untrack_drops_cache_and_schedule() {
    let registry = Arc::new(AttachmentRegistry::new());
    let hash = applet_hash(5);
    registry.track(
        hash.clone(),
        scripted_applet(vec![Some(ReplyEnvelope::success(&sticky_note_types()))]),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!registry.attachment_types_for(&hash).is_empty());

    registry.untrack(&hash);
    assert!(registry.attachment_types_for(&hash).is_empty());
    assert!(registry.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_untracked_applet_reads_as_empty() {
    let registry = AttachmentRegistry::new();
    assert!(registry.attachment_types_for(&applet_hash(6)).is_empty());
    assert!(registry.all().is_empty());
}
