use std::sync::Arc;

use leptos::prelude::Owner;
use leptos_prefetch_ssr::{
    client::{client_plugin, ClientOptions},
    context::{use_instance, PrefetchCtx},
    gate::ResolutionGate,
    host::{Host, Root},
    store::SelfStore,
    Record,
};
use serde_json::json;

#[cfg(feature = "ssr")]
mod ssr {
    pub use leptos_prefetch_ssr::{
        identity::{Identity, IdentitySequence},
        server::server_plugin,
    };
}
#[cfg(feature = "ssr")]
use ssr::*;

fn set_reactive_owner() -> Owner {
    let owner = Owner::new();
    owner.set();
    owner
}

#[test]
fn without_context_no_instance() {
    assert!(PrefetchCtx::handle().is_none());
    assert!(use_instance(Record::new()).is_none());
}

#[cfg(feature = "ssr")]
#[test]
fn instances_follow_call_order() {
    let _owner = set_reactive_owner();
    let sequence = IdentitySequence::new();
    let mut host = Host::new();
    server_plugin(&mut host, &sequence);
    let ctx = PrefetchCtx::provide(Arc::new(host), Root::new());

    let first = use_instance(Record::new()).expect("context provided");
    let second = use_instance(Record::new()).expect("context provided");
    assert_eq!(first.identity(), Some(Identity::new(0)));
    assert_eq!(second.identity(), Some(Identity::new(1)));
    assert_eq!(ctx.root().self_store().map(|store| store.len()), Some(2));
}

#[test]
fn client_instance_reads_store() {
    let _owner = set_reactive_owner();
    let mut host = Host::new();
    client_plugin(&mut host, &ResolutionGate::new(), ClientOptions::default());
    let store = SelfStore::from_json(r#"{"0": {"greeting": "hello world"}}"#)
        .expect("valid store");
    PrefetchCtx::provide(Arc::new(host), Root::with_store(store));

    let instance = use_instance(Record::new()).expect("context provided");
    assert_eq!(instance.data().get("greeting"), Some(json!("hello world")));
}

#[test]
fn child_owner_sees_context() {
    let owner = set_reactive_owner();
    PrefetchCtx::provide(Arc::new(Host::new()), Root::new());

    let child = owner.child();
    child.with(|| {
        let instance = use_instance(Record::new()).expect("inherited from parent owner");
        assert_eq!(instance.native_id(), 0);
        assert_eq!(instance.identity(), None);
    });
}
