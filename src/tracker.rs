use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{
    future::{try_join_all, BoxFuture, Shared},
    FutureExt,
};

use crate::error::FetchError;

type Tracked = Shared<BoxFuture<'static, Result<(), FetchError>>>;

/// The set of fetches an instance issued during server rendering.
///
/// Every wrapped fetch appends to this set in call order; the
/// [`join`](Self::join) of the set is what the host awaits before it
/// treats the instance's subtree as rendered.  Joining does not drain
/// the set, so it may be joined again with the same result.
#[derive(Clone, Default)]
pub struct PendingFetches {
    inner: Arc<Mutex<Vec<Tracked>>>,
}

impl PendingFetches {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Tracked>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a pending fetch.  Only its success or failure is kept.
    pub fn track<T>(&self, pending: Shared<BoxFuture<'static, Result<T, FetchError>>>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let tracked = pending.map(|result| result.map(|_| ())).boxed().shared();
        let mut inner = self.lock();
        inner.push(tracked);
        tracing::trace!(pending = inner.len(), "tracking fetch");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every tracked fetch.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Wait for every fetch tracked so far.
    ///
    /// The returned future resolves once all of them succeed, or fails
    /// with the first error to arrive.  In the latter case the remaining
    /// fetches are not cancelled, they are merely no longer waited on.
    /// Fetches tracked after this call are not part of the join.
    pub fn join(&self) -> impl Future<Output = Result<(), FetchError>> + Send + 'static {
        let tracked = self.lock().clone();
        async move { try_join_all(tracked).await.map(|_| ()) }
    }
}

impl fmt::Debug for PendingFetches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetches")
            .field("len", &self.len())
            .finish()
    }
}

