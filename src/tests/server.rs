use std::time::Duration;

use serde_json::json;
use tokio::{sync::oneshot, time::timeout};

use super::record;
use crate::{
    data::Record,
    error::FetchError,
    host::{Host, Root},
    identity::{Identity, IdentitySequence},
    server::server_plugin,
};

fn server_host(sequence: &IdentitySequence) -> Host {
    let mut host = Host::new();
    server_plugin(&mut host, sequence);
    host
}

async fn received(rx: oneshot::Receiver<u32>) -> Result<u32, FetchError> {
    rx.await.map_err(FetchError::failed)
}

#[test]
fn identities_follow_construction_order() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let root = Root::new();

    let identities = (0..5)
        .map(|_| host.construct(&root, Record::new()).identity())
        .collect::<Vec<_>>();
    assert_eq!(
        identities,
        (0..5).map(|n| Some(Identity::new(n))).collect::<Vec<_>>(),
    );
    assert_eq!(sequence.peek(), Identity::new(5));
}

#[test]
fn reset_between_passes() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);

    let first = Root::new();
    for _ in 0..3 {
        host.construct(&first, Record::new());
    }
    sequence.reset();

    let second = Root::new();
    let instance = host.construct(&second, Record::new());
    assert_eq!(instance.identity(), Some(Identity::new(0)));
    // the native id is not affected by the reset
    assert_eq!(instance.native_id(), 3);
    assert_eq!(
        second.self_store().map(|store| store.identities()),
        Some(vec![Identity::new(0)]),
    );
}

#[test]
fn without_reset_identities_keep_growing() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    host.construct(&Root::new(), Record::new());
    let instance = host.construct(&Root::new(), Record::new());
    assert_eq!(instance.identity(), Some(Identity::new(1)));
}

#[test]
fn store_shares_local_data() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let root = Root::new();
    assert!(root.self_store().is_none());

    let instance = host.construct(&root, record(json!({"a": 1})));
    let store = root.self_store().expect("store created on first write");
    let identity = instance.identity().expect("identity assigned");
    assert_eq!(store.snapshot(identity), Some(record(json!({"a": 1}))));

    instance.data().set("a", 2);
    assert_eq!(store.snapshot(identity), Some(record(json!({"a": 2}))));

    // replacing the record outright detaches it from the store
    instance.replace_data(record(json!({"a": 3})));
    assert_eq!(store.snapshot(identity), Some(record(json!({"a": 2}))));
}

#[test]
fn instances_share_root_store() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let root = Root::new();
    host.construct(&root, record(json!({"name": "parent"})));
    host.construct(&root, record(json!({"name": "child"})));

    let store = root.self_store().expect("store created");
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.snapshot(Identity::new(1)),
        Some(record(json!({"name": "child"}))),
    );
}

#[tokio::test]
async fn fetch_is_tracked_and_returned() -> anyhow::Result<()> {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let instance = host.construct(&Root::new(), Record::new());

    let fetcher = instance.create_fetcher(received);
    let (tx, rx) = oneshot::channel();
    let pending = fetcher.fetch(rx);
    assert_eq!(instance.pending().len(), 1);

    tx.send(42).expect("receiver alive");
    assert_eq!(pending.await?, 42);
    host.server_prefetch(&instance).await?;
    Ok(())
}

#[tokio::test]
async fn prefetch_waits_for_every_fetch() -> anyhow::Result<()> {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let instance = host.construct(&Root::new(), Record::new());
    let fetcher = instance.create_fetcher(received);

    let (tx1, rx1) = oneshot::channel();
    let (tx2, rx2) = oneshot::channel();
    let _ = fetcher.fetch(rx1);
    let _ = fetcher.fetch(rx2);

    let prefetch = tokio::spawn(host.server_prefetch(&instance));
    tx2.send(2).expect("receiver alive");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!prefetch.is_finished());

    tx1.send(1).expect("receiver alive");
    timeout(Duration::from_millis(500), prefetch)
        .await
        .expect("prefetch should complete once all fetches did")??;
    Ok(())
}

#[tokio::test]
async fn prefetch_fails_fast() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let instance = host.construct(&Root::new(), Record::new());

    let slow = instance.create_fetcher(received);
    let failing = instance.create_fetcher(|_: ()| async {
        Err::<u32, _>(FetchError::failed("service unavailable"))
    });

    // senders are kept alive so these never settle
    let (_tx1, rx1) = oneshot::channel();
    let (_tx2, rx2) = oneshot::channel();
    let _ = failing.fetch(());
    let _ = slow.fetch(rx1);
    let _ = slow.fetch(rx2);
    assert_eq!(instance.pending().len(), 3);

    let result = timeout(Duration::from_millis(500), host.server_prefetch(&instance))
        .await
        .expect("prefetch should not wait for the pending fetches");
    assert!(matches!(result, Err(FetchError::Failed(_))));
}

#[tokio::test]
async fn rejection_reaches_the_caller() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let instance = host.construct(&Root::new(), Record::new());
    let failing = instance.create_fetcher(|_: ()| async {
        Err::<u32, _>(FetchError::failed("not found"))
    });

    let result = failing.fetch(()).await;
    assert_eq!(
        result.map_err(|e| e.to_string()),
        Err("fetch failed: not found".to_string()),
    );
}

#[tokio::test]
async fn panicking_fetch_is_aborted() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let instance = host.construct(&Root::new(), Record::new());
    let fetcher = instance.create_fetcher(|fail: bool| async move {
        if fail {
            panic!("fetch blew up");
        }
        Ok::<u32, FetchError>(0)
    });

    let result = host.server_prefetch(&instance).await;
    assert!(result.is_ok());
    let result = fetcher.fetch(true).await;
    assert!(matches!(result, Err(FetchError::Aborted(_))));
    assert!(matches!(
        host.server_prefetch(&instance).await,
        Err(FetchError::Aborted(_))
    ));
}

#[tokio::test]
async fn fetched_data_is_captured_in_store() -> anyhow::Result<()> {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let root = Root::new();
    let instance = host.construct(&root, record(json!({"title": null})));

    let data = instance.data();
    let fetcher = instance.create_fetcher(move |id: u32| {
        let data = data.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let title = format!("Post {id}");
            data.set("title", title.clone());
            Ok::<_, FetchError>(title)
        }
    });
    let _ = fetcher.fetch(7);

    host.server_prefetch(&instance).await?;
    let store = root.self_store().expect("store created");
    assert_eq!(
        store.snapshot(Identity::new(0)),
        Some(record(json!({"title": "Post 7"}))),
    );
    Ok(())
}

#[test]
fn fetch_outside_tokio_runtime() {
    let sequence = IdentitySequence::new();
    let host = server_host(&sequence);
    let root = Root::new();
    let instance = host.construct(&root, record(json!({"count": 0})));

    let data = instance.data();
    let fetcher = instance.create_fetcher(move |n: u32| {
        let data = data.clone();
        async move {
            data.set("count", n);
            Ok::<_, FetchError>(n * 2)
        }
    });

    let result = futures::executor::block_on(fetcher.fetch(1));
    assert_eq!(result.ok(), Some(2));

    // never awaited by the caller, so the join drives it
    let _ = fetcher.fetch(5);
    assert_eq!(instance.pending().len(), 2);
    assert_eq!(instance.data().get("count"), Some(json!(1)));
    futures::executor::block_on(host.server_prefetch(&instance))
        .expect("both fetches succeed");
    assert_eq!(
        root.self_store().and_then(|store| store.snapshot(Identity::new(0))),
        Some(record(json!({"count": 5}))),
    );
}
