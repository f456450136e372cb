//! The registration surface the phase adapters install themselves into.
//!
//! A [`Host`] stands in for the root registration mechanism of the UI
//! framework: it holds the installed [`Mixin`]s, which fetch wrapper
//! [`Instance::create_fetcher`] hands out, and the counter issuing the
//! native id of every instance.  The framework drives it by calling
//! [`Host::construct`] for every component it builds, in tree order,
//! followed by [`Host::server_prefetch`] when rendering on the server.

use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, OnceLock, PoisonError, RwLock,
    },
};

use futures::{
    future::{try_join_all, BoxFuture},
    FutureExt,
};
use serde::de::DeserializeOwned;

use crate::{
    data::{LocalData, Record},
    error::FetchError,
    fetcher::{self, Fetcher, FetcherKind},
    identity::Identity,
    store::SelfStore,
    tracker::PendingFetches,
};

/// Lifecycle hooks a phase adapter installs into the [`Host`].
///
/// Every hook has a no-op default, so an adapter only implements the
/// ones it needs.  Hooks of different mixins run in installation order.
pub trait Mixin: Send + Sync + 'static {
    /// Runs as the instance is created, before any other hook.
    fn before_init(&self, _instance: &Instance) {}

    /// Contributes to the initial local data of the instance.  Fields
    /// returned here take precedence over the declared defaults.
    fn data(&self, _instance: &Instance) -> Record {
        Record::new()
    }

    /// Runs once the instance is fully constructed.
    fn created(&self, _instance: &Instance) {}

    /// The work that must complete before the subtree of this instance
    /// may be considered rendered on the server.
    fn server_prefetch(
        &self,
        _instance: &Instance,
    ) -> Option<BoxFuture<'static, Result<(), FetchError>>> {
        None
    }

    /// Decide whether an error raised within the instance should stop
    /// at its boundary.
    fn error_captured(&self, _instance: &Instance, _error: &FetchError) -> Propagation {
        Propagation::Continue
    }
}

/// Whether an error captured at a component boundary continues upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

#[derive(Default)]
pub struct Host {
    mixins: Vec<Arc<dyn Mixin>>,
    fetcher: FetcherKind,
    native_ids: AtomicU64,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a mixin; it applies to every instance constructed after.
    pub fn mixin(&mut self, mixin: impl Mixin) {
        self.mixins.push(Arc::new(mixin));
    }

    pub(crate) fn set_fetcher(&mut self, fetcher: FetcherKind) {
        self.fetcher = fetcher;
    }

    /// Construct an instance under `root` with the component's declared
    /// local data.
    ///
    /// The native id is taken from the construction order within this
    /// host, so a fresh host replaying the same tree on the client hands
    /// out the same ids in the same order.
    ///
    /// Records contributed by [`Mixin::data`] are merged over `declared`,
    /// so a prefetched field replaces the declared default of that name.
    pub fn construct(&self, root: &Root, declared: Record) -> Instance {
        let native_id = self.native_ids.fetch_add(1, Ordering::Relaxed);
        let instance = Instance {
            inner: Arc::new(InstanceInner {
                native_id,
                identity: OnceLock::new(),
                root: root.clone(),
                data: RwLock::new(LocalData::new()),
                pending: PendingFetches::new(),
                fetcher: self.fetcher.clone(),
            }),
        };

        for mixin in &self.mixins {
            mixin.before_init(&instance);
        }

        let mut data = declared;
        for mixin in &self.mixins {
            data.extend(mixin.data(&instance));
        }
        instance.replace_data(data);

        for mixin in &self.mixins {
            mixin.created(&instance);
        }

        tracing::trace!(native_id, identity = ?instance.identity(), "constructed instance");
        instance
    }

    /// The combined server prefetch of every mixin for `instance`.
    ///
    /// Fails as soon as any of them fails.
    pub fn server_prefetch(
        &self,
        instance: &Instance,
    ) -> impl Future<Output = Result<(), FetchError>> + Send + 'static {
        let prefetches = self
            .mixins
            .iter()
            .filter_map(|mixin| mixin.server_prefetch(instance))
            .collect::<Vec<_>>();
        try_join_all(prefetches).map(|result| result.map(|_| ()))
    }

    /// Await `work` as a component boundary of `instance` would.
    ///
    /// An error is offered to every mixin; if any of them stops it, the
    /// error is swallowed and `Ok(None)` is returned, otherwise the error
    /// propagates to the caller.
    pub async fn guard<T>(
        &self,
        instance: &Instance,
        work: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<Option<T>, FetchError> {
        match work.await {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                let stopped = self
                    .mixins
                    .iter()
                    .any(|mixin| mixin.error_captured(instance, &error) == Propagation::Stop);
                if stopped {
                    tracing::warn!(
                        %error,
                        native_id = instance.native_id(),
                        "error stopped at component boundary"
                    );
                    Ok(None)
                } else {
                    Err(error)
                }
            }
        }
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("mixins", &self.mixins.len())
            .field("fetcher", &self.fetcher)
            .field("native_ids", &self.native_ids.load(Ordering::Relaxed))
            .finish()
    }
}

/// The root of a component tree.
///
/// Every instance of the tree refers to the same root, which owns the
/// [`SelfStore`] and the per-tree resolved flag.  Clones share state.
#[derive(Clone, Default)]
pub struct Root {
    inner: Arc<RootInner>,
}

#[derive(Default)]
struct RootInner {
    store: RwLock<Option<SelfStore>>,
    resolved: AtomicBool,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    /// A root with the store transported from the server attached.
    pub fn with_store(store: SelfStore) -> Self {
        let root = Self::new();
        root.attach_store(store);
        root
    }

    /// Attach a store, replacing any previous one.
    pub fn attach_store(&self, store: SelfStore) {
        *self.inner.store.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
    }

    pub fn self_store(&self) -> Option<SelfStore> {
        self.inner
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The store of this root, created on first use.
    pub fn self_store_or_init(&self) -> SelfStore {
        self.inner
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(SelfStore::new)
            .clone()
    }

    /// Whether the tree-wide resolution event has fired.
    pub fn is_resolved(&self) -> bool {
        self.inner.resolved.load(Ordering::Acquire)
    }

    /// Fire the tree-wide resolution event; only the first call has an
    /// effect, which is reported by returning `true`.
    pub fn resolve(&self) -> bool {
        let flipped = !self.inner.resolved.swap(true, Ordering::AcqRel);
        if flipped {
            tracing::debug!("root resolved, serving live fetches");
        }
        flipped
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("store", &self.self_store())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// A handle to a component instance constructed by a [`Host`].
///
/// Clones refer to the same instance.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

struct InstanceInner {
    native_id: u64,
    identity: OnceLock<Identity>,
    root: Root,
    data: RwLock<LocalData>,
    pending: PendingFetches,
    fetcher: FetcherKind,
}

impl Instance {
    /// The id the host assigned, in construction order.
    pub fn native_id(&self) -> u64 {
        self.inner.native_id
    }

    /// The stable identity, only present under the server adapter.
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.get().copied()
    }

    pub(crate) fn assign_identity(&self, identity: Identity) {
        if let Err(rejected) = self.inner.identity.set(identity) {
            tracing::warn!(
                assigned = ?self.identity(),
                %rejected,
                "instance already has an identity"
            );
        }
    }

    pub fn root(&self) -> &Root {
        &self.inner.root
    }

    /// The local data of this instance.
    pub fn data(&self) -> LocalData {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the local data outright.  Earlier holders of [`data`](Self::data)
    /// keep the previous record.
    pub fn replace_data(&self, record: Record) {
        *self.inner.data.write().unwrap_or_else(PoisonError::into_inner) =
            LocalData::from_record(record);
    }

    pub fn pending(&self) -> &PendingFetches {
        &self.inner.pending
    }

    /// Wrap `fetch` according to the phase adapter installed in the host
    /// that constructed this instance.
    ///
    /// Without any adapter the fetch is called as is.
    pub fn create_fetcher<P, T, F, Fut>(&self, fetch: F) -> Fetcher<P, T>
    where
        P: 'static,
        T: Clone + DeserializeOwned + Send + Sync + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        fetcher::create(self, &self.inner.fetcher, fetch)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("native_id", &self.native_id())
            .field("identity", &self.identity())
            .field("data", &self.data())
            .field("pending", self.pending())
            .finish()
    }
}
