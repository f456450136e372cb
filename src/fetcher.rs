use std::{fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use serde::de::DeserializeOwned;

use crate::{client, error::FetchError, gate::ResolutionGate, host::Instance};

/// The pending result of a wrapped fetch.
pub type FetchFuture<T> = BoxFuture<'static, Result<T, FetchError>>;

/// A fetch function wrapped by [`Instance::create_fetcher`].
pub struct Fetcher<P, T> {
    inner: Arc<dyn Fn(P) -> FetchFuture<T> + Send + Sync>,
}

impl<P, T> Fetcher<P, T> {
    pub(crate) fn new(f: impl Fn(P) -> FetchFuture<T> + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    /// Issue the fetch with `params`.
    pub fn fetch(&self, params: P) -> FetchFuture<T> {
        (self.inner)(params)
    }
}

impl<P, T> Clone for Fetcher<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P, T> fmt::Debug for Fetcher<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}

/// Which wrapper the installed phase adapter calls for.
#[derive(Clone, Default)]
pub(crate) enum FetcherKind {
    #[default]
    Passthrough,
    #[cfg(feature = "ssr")]
    Server,
    ClientMerge,
    ClientAssign {
        gate: ResolutionGate,
        message: Arc<str>,
    },
}

impl fmt::Debug for FetcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passthrough => f.write_str("Passthrough"),
            #[cfg(feature = "ssr")]
            Self::Server => f.write_str("Server"),
            Self::ClientMerge => f.write_str("ClientMerge"),
            Self::ClientAssign { gate, .. } => f
                .debug_struct("ClientAssign")
                .field("resolved", &gate.is_resolved())
                .finish(),
        }
    }
}

pub(crate) fn create<P, T, F, Fut>(instance: &Instance, kind: &FetcherKind, fetch: F) -> Fetcher<P, T>
where
    P: 'static,
    T: Clone + DeserializeOwned + Send + Sync + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    match kind {
        FetcherKind::Passthrough => Fetcher::new(move |params| fetch(params).boxed()),
        #[cfg(feature = "ssr")]
        FetcherKind::Server => Fetcher::new(crate::server::wrap(instance.pending().clone(), fetch)),
        FetcherKind::ClientMerge => Fetcher::new(client::wrap_merge(
            instance.root().clone(),
            client::store_key(instance),
            fetch,
        )),
        FetcherKind::ClientAssign { gate, message } => {
            Fetcher::new(client::wrap_assign(gate.clone(), message.clone(), fetch))
        }
    }
}
