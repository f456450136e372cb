//! The client phase adapter.
//!
//! The client looks up the data the server captured for each instance
//! using the instance's native id.  As the host hands out native ids in
//! construction order, a client replaying the same tree as the server
//! derives the same keys the server assigned as identities.
//!
//! Two policies exist for consuming that data, see [`HydrationPolicy`];
//! only the one selected through [`ClientOptions`] is installed.

use std::{future::Future, sync::Arc};

use futures::{future, FutureExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    data::Record,
    error::FetchError,
    fetcher::{FetchFuture, FetcherKind},
    gate::ResolutionGate,
    host::{Host, Instance, Mixin, Propagation, Root},
    identity::Identity,
};

/// How the client consumes the transported store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationPolicy {
    /// The stored record is merged into the initial local data, and
    /// fetches return the stored record until the [`Root`] is resolved.
    Merge,
    /// The stored record is assigned onto the constructed instance until
    /// the [`ResolutionGate`] is resolved, and fetches issued before then
    /// fail with [`FetchError::PrematureFetch`].
    #[default]
    Assign,
}

/// Options for [`client_plugin`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub policy: HydrationPolicy,
    /// Stop premature fetch errors at the component boundary rather than
    /// letting them propagate.  Only applies to [`HydrationPolicy::Assign`].
    pub stop: bool,
    /// The message carried by [`FetchError::PrematureFetch`].
    pub message: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            policy: HydrationPolicy::default(),
            stop: true,
            message: "hydration has not been resolved".to_string(),
        }
    }
}

impl ClientOptions {
    pub fn policy(mut self, policy: HydrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stop(mut self, stop: bool) -> Self {
        self.stop = stop;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Install the client phase adapter into `host`.
///
/// The `gate` is shared with the caller, who flips it through
/// [`ResolutionGate::resolve`] once hydration data has been applied.
/// Under [`HydrationPolicy::Merge`] the gate is not consulted; the
/// tree-wide [`Root::resolve`] is used instead.
pub fn client_plugin(host: &mut Host, gate: &ResolutionGate, options: ClientOptions) {
    match options.policy {
        HydrationPolicy::Merge => {
            host.mixin(MergeMixin);
            host.set_fetcher(FetcherKind::ClientMerge);
        }
        HydrationPolicy::Assign => {
            host.mixin(AssignMixin {
                gate: gate.clone(),
                stop: options.stop,
            });
            host.set_fetcher(FetcherKind::ClientAssign {
                gate: gate.clone(),
                message: Arc::from(options.message),
            });
        }
    }
}

/// The store key of `instance` on the client.
pub(crate) fn store_key(instance: &Instance) -> Identity {
    Identity::new(instance.native_id())
}

struct MergeMixin;

impl Mixin for MergeMixin {
    fn data(&self, instance: &Instance) -> Record {
        let Some(store) = instance.root().self_store() else {
            return Record::new();
        };
        let key = store_key(instance);
        let prefetched = store.snapshot(key);
        tracing::debug!(%key, ?prefetched, "prefetched data");
        prefetched.unwrap_or_default()
    }
}

struct AssignMixin {
    gate: ResolutionGate,
    stop: bool,
}

impl Mixin for AssignMixin {
    fn created(&self, instance: &Instance) {
        if self.gate.is_resolved() {
            return;
        }
        let Some(store) = instance.root().self_store() else {
            return;
        };
        let key = store_key(instance);
        if let Some(prefetched) = store.snapshot(key) {
            tracing::debug!(%key, ?prefetched, "assigning prefetched data");
            instance.data().assign(&prefetched);
        }
    }

    fn error_captured(&self, _instance: &Instance, error: &FetchError) -> Propagation {
        if self.stop && error.is_premature() {
            Propagation::Stop
        } else {
            Propagation::Continue
        }
    }
}

pub(crate) fn wrap_merge<P, T, F, Fut>(
    root: Root,
    key: Identity,
    fetch: F,
) -> impl Fn(P) -> FetchFuture<T> + Send + Sync + 'static
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    move |params| {
        if root.is_resolved() {
            return fetch(params).boxed();
        }
        let cached = root.self_store().and_then(|store| store.snapshot(key));
        future::ready(decode(key, cached)).boxed()
    }
}

fn decode<T: DeserializeOwned>(key: Identity, cached: Option<Record>) -> Result<T, FetchError> {
    let record = cached.ok_or(FetchError::NotPrefetched(key))?;
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub(crate) fn wrap_assign<P, T, F, Fut>(
    gate: ResolutionGate,
    message: Arc<str>,
    fetch: F,
) -> impl Fn(P) -> FetchFuture<T> + Send + Sync + 'static
where
    T: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    move |params| {
        if !gate.is_resolved() {
            tracing::warn!(%message, "fetch issued before the resolution gate was flipped");
            return future::ready(Err(FetchError::PrematureFetch(message.clone()))).boxed();
        }
        fetch(params).boxed()
    }
}
