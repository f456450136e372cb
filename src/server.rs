//! The server phase adapter.
//!
//! Once installed through [`server_plugin`], every instance constructed
//! by the host receives an [`Identity`](crate::identity::Identity) from
//! the shared [`IdentitySequence`], has its local data written into the
//! root's [`SelfStore`](crate::store::SelfStore) under that identity, and
//! has every fetch issued through its [`Fetcher`](crate::fetcher::Fetcher)
//! tracked, such that [`Host::server_prefetch`] only resolves once all of
//! them did.
//!
//! Fetches are spawned onto the current tokio runtime as they are issued,
//! so they make progress even before anything awaits them.  Outside of a
//! tokio runtime they are instead driven by whichever of the caller or
//! [`Host::server_prefetch`] polls them.

use std::future::Future;

use futures::{future::BoxFuture, FutureExt};
use tokio::runtime::Handle;

use crate::{
    data::Record,
    error::FetchError,
    fetcher::{FetchFuture, FetcherKind},
    host::{Host, Instance, Mixin},
    identity::IdentitySequence,
    tracker::PendingFetches,
};

/// Install the server phase adapter into `host`.
///
/// The `sequence` is shared with the caller, who is responsible for
/// calling [`IdentitySequence::reset`] between rendering passes.
pub fn server_plugin(host: &mut Host, sequence: &IdentitySequence) {
    host.mixin(ServerMixin {
        sequence: sequence.clone(),
    });
    host.set_fetcher(FetcherKind::Server);
}

struct ServerMixin {
    sequence: IdentitySequence,
}

impl Mixin for ServerMixin {
    fn before_init(&self, instance: &Instance) {
        instance.assign_identity(self.sequence.next());
    }

    fn data(&self, instance: &Instance) -> Record {
        instance.pending().reset();
        Record::new()
    }

    fn created(&self, instance: &Instance) {
        match instance.identity() {
            Some(identity) => {
                instance
                    .root()
                    .self_store_or_init()
                    .insert(identity, instance.data());
            }
            None => tracing::warn!(
                native_id = instance.native_id(),
                "instance constructed without identity, not stored"
            ),
        }
    }

    fn server_prefetch(
        &self,
        instance: &Instance,
    ) -> Option<BoxFuture<'static, Result<(), FetchError>>> {
        Some(instance.pending().join().boxed())
    }
}

pub(crate) fn wrap<P, T, F, Fut>(
    pending: PendingFetches,
    fetch: F,
) -> impl Fn(P) -> FetchFuture<T> + Send + Sync + 'static
where
    T: Clone + Send + Sync + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    move |params| {
        let work = fetch(params);
        // Without a runtime the fetch is left for whoever polls it first,
        // be it the caller or the join of the pending set.
        let shared = match Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(work);
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(error) => Err(FetchError::from(error)),
                    }
                }
                .boxed()
                .shared()
            }
            Err(_) => {
                tracing::trace!("no tokio runtime, fetch driven by its awaiters");
                work.boxed().shared()
            }
        };
        pending.track(shared.clone());
        shared.boxed()
    }
}
