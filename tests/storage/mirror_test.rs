/*!
 * Storage Mirror Tests
 * Seed replay, immediate local reads, delayed fire-and-forget mirror sends
 */

use std::collections::HashMap;
use std::time::Duration;

use pretty_assertions::assert_eq;

use applet_host::rpc::{AppletToHostRequest, HostChannel, ReplyEnvelope};
use applet_host::storage::{LocalStorage, MIRROR_DELAY};
use applet_host::AppletHash;

fn applet_hash(n: u8) -> AppletHash {
    AppletHash::from_raw(vec![n; 8])
}

#[tokio::test]
async fn test_seed_replays_the_persisted_snapshot() {
    let (channel, mut endpoint) = HostChannel::boundary(applet_hash(1));

    tokio::spawn(async move {
        let message = endpoint.recv().await.unwrap();
        assert!(matches!(
            message.envelope.request,
            AppletToHostRequest::GetLocalStorage
        ));
        let snapshot =
            HashMap::from([("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
        message
            .reply
            .send(ReplyEnvelope::success(&snapshot))
            .unwrap();
    });

    let storage = LocalStorage::seed(channel).await.unwrap();
    assert_eq!(storage.len(), 2);
    assert_eq!(storage.get_item("a"), Some("1".to_string()));
    assert_eq!(storage.get_item("b"), Some("2".to_string()));
    assert_eq!(storage.get_item("c"), None);
}

#[tokio::test]
async fn test_mutations_apply_locally_before_the_mirror_fires() {
    let (channel, _endpoint) = HostChannel::boundary(applet_hash(2));
    let storage = LocalStorage::unseeded(channel);

    storage.set_item("theme", "dark");
    assert_eq!(storage.get_item("theme"), Some("dark".to_string()));

    storage.remove_item("theme");
    assert_eq!(storage.get_item("theme"), None);
    assert!(storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mirror_send_is_delayed_and_happens_exactly_once() {
    let (channel, mut endpoint) = HostChannel::boundary(applet_hash(3));
    let storage = LocalStorage::unseeded(channel);

    storage.set_item("k", "v");

    // Nothing crosses the boundary before the delay elapses
    tokio::time::sleep(MIRROR_DELAY - Duration::from_millis(1)).await;
    assert!(endpoint.try_recv().is_err());

    tokio::time::sleep(Duration::from_millis(2)).await;
    let message = endpoint.recv().await.unwrap();
    assert_eq!(
        message.envelope.request,
        AppletToHostRequest::LocalStorageSet {
            key: "k".to_string(),
            value: "v".to_string(),
        }
    );

    // Exactly one send per mutation
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(endpoint.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_each_mutation_mirrors_its_own_request() {
    let (channel, mut endpoint) = HostChannel::boundary(applet_hash(4));
    let storage = LocalStorage::unseeded(channel);

    storage.set_item("k", "v1");
    storage.set_item("k", "v2");
    storage.clear();

    tokio::time::sleep(MIRROR_DELAY + Duration::from_millis(10)).await;

    let mut requests = Vec::new();
    while let Ok(message) = endpoint.try_recv() {
        requests.push(message.envelope.request);
    }
    assert_eq!(requests.len(), 3);
    assert!(requests.contains(&AppletToHostRequest::LocalStorageSet {
        key: "k".to_string(),
        value: "v1".to_string(),
    }));
    assert!(requests.contains(&AppletToHostRequest::LocalStorageSet {
        key: "k".to_string(),
        value: "v2".to_string(),
    }));
    assert!(requests.contains(&AppletToHostRequest::LocalStorageClear));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_same_key_writes_mirror_in_mutation_order() {
    let (channel, mut endpoint) = HostChannel::boundary(applet_hash(6));
    let storage = LocalStorage::unseeded(channel);

    // Last-writer-wins only holds if the sends cross in mutation order
    storage.set_item("k", "v1");
    storage.set_item("k", "v2");
    storage.set_item("k", "v3");

    tokio::time::sleep(MIRROR_DELAY + Duration::from_millis(10)).await;

    let mut values = Vec::new();
    while let Ok(message) = endpoint.try_recv() {
        match message.envelope.request {
            AppletToHostRequest::LocalStorageSet { key, value } => {
                assert_eq!(key, "k");
                values.push(value);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }
    assert_eq!(values, vec!["v1", "v2", "v3"]);
    assert_eq!(storage.get_item("k"), Some("v3".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_closed_boundary_does_not_panic_the_mirror_task() {
    let (channel, endpoint) = HostChannel::boundary(applet_hash(5));
    let storage = LocalStorage::unseeded(channel);
    drop(endpoint);

    storage.set_item("k", "v");
    tokio::time::sleep(MIRROR_DELAY * 2).await;
    // Local state is intact despite the failed send
    assert_eq!(storage.get_item("k"), Some("v".to_string()));
}
