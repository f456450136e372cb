//! Leptos integration.
//!
//! The [`PrefetchCtx`] is provided once near the top of the view tree,
//! after which components call [`use_instance`] at their top level to be
//! constructed by the [`Host`] held within.  As components run in view
//! tree order under both SSR and hydration, the instances are constructed
//! in the same order in both phases, which is what keeps the identities
//! assigned on the server and the native ids used on the client in step.

use std::sync::Arc;

use leptos::prelude::{provide_context, use_context};

use crate::{
    data::Record,
    host::{Host, Instance, Root},
};

/// The host and root of the current view tree, provided as a context.
#[derive(Clone, Debug)]
pub struct PrefetchCtx {
    host: Arc<Host>,
    root: Root,
}

impl PrefetchCtx {
    pub fn new(host: Arc<Host>, root: Root) -> Self {
        Self { host, root }
    }

    /// Provide the context for the current owner and its children.
    pub fn provide(host: Arc<Host>, root: Root) -> Self {
        let ctx = Self::new(host, root);
        provide_context(ctx.clone());
        ctx
    }

    /// Acquire the context if one was provided.
    ///
    /// This makes use of [`use_context`], so it should be called at the
    /// component's top level.  The lack of a provider is not an error,
    /// it simply means the component renders without prefetching.
    pub fn handle() -> Option<Self> {
        use_context::<Self>()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn construct(&self, declared: Record) -> Instance {
        self.host.construct(&self.root, declared)
    }
}

/// Construct an instance for the calling component with its declared
/// local data, if a [`PrefetchCtx`] is available.
pub fn use_instance(declared: Record) -> Option<Instance> {
    PrefetchCtx::handle().map(|ctx| ctx.construct(declared))
}
