//! This crate provides helpers to reuse data prefetched during server-side
//! rendering (SSR) when the same view tree is hydrated on the client within
//! the Leptos frameworks.  A component declares its asynchronous fetch once;
//! under SSR that fetch is executed and awaited before the component is
//! considered rendered, its result is captured alongside the component's
//! local data, and the captured data is shipped to the client where it is
//! used in place of fetching again.
//!
//! ## Use case
//!
//! Without coordination, a component that fetches its data would do so
//! twice: once on the server to produce the markup, and once more on the
//! client as it hydrates.  Worse, the client would start out with its
//! default data until the second fetch completes, which results in content
//! flashing empty, or even in a hydration mismatch against the server
//! markup.
//!
//! The solution provided here consists of a pair of phase adapters, each
//! installed into a [`Host`](host::Host) once:
//!
//! - [`server_plugin`](server::server_plugin) assigns every instance a
//!   stable [`Identity`](identity::Identity), records its local data into
//!   the [`SelfStore`](store::SelfStore) of the tree, and tracks every
//!   fetch issued through [`Instance::create_fetcher`](host::Instance::create_fetcher)
//!   so that [`Host::server_prefetch`](host::Host::server_prefetch) only
//!   resolves once all of them did.
//! - [`client_plugin`](client::client_plugin) reads the transported store
//!   back into each instance, and holds off live fetching until the host
//!   application flips the [`ResolutionGate`](gate::ResolutionGate).
//!
//! # Example
//!
//! On the client, with the store received from the server attached to
//! the root, the first instance constructed picks up the data the server
//! captured for it:
//!
//! ```
//! use leptos_prefetch_ssr::{
//!     client::{client_plugin, ClientOptions},
//!     gate::ResolutionGate,
//!     host::{Host, Root},
//!     store::SelfStore,
//!     FetchError, Record,
//! };
//!
//! let store = SelfStore::from_json(r#"{"0": {"title": "Hello world!"}}"#)?;
//! let gate = ResolutionGate::new();
//! let mut host = Host::new();
//! client_plugin(&mut host, &gate, ClientOptions::default());
//!
//! let root = Root::with_store(store);
//! let instance = host.construct(&root, Record::new());
//! assert_eq!(instance.data().get("title"), Some("Hello world!".into()));
//!
//! // Live fetching is refused until hydration is complete...
//! let fetcher = instance.create_fetcher(|id: u32| async move {
//!     Ok::<_, FetchError>(format!("post {id}"))
//! });
//! let result = futures::executor::block_on(fetcher.fetch(1));
//! assert!(matches!(result, Err(FetchError::PrematureFetch(_))));
//!
//! // ... and goes through once the gate is flipped.
//! gate.resolve();
//! let result = futures::executor::block_on(fetcher.fetch(1))?;
//! assert_eq!(result, "post 1");
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! Under Leptos, the [`PrefetchCtx`](context::PrefetchCtx) makes the host
//! and root available to every component in the view tree.
//!
//! # Feature Flags
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!())
)]

pub mod client;
pub mod context;
mod data;
mod error;
pub mod fetcher;
pub mod gate;
pub mod host;
pub mod identity;
#[cfg(feature = "ssr")]
pub mod server;
pub mod store;
mod tracker;

#[cfg(test)]
mod tests;

pub use data::{LocalData, Record};
pub use error::{FetchError, StoreError};
pub use tracker::PendingFetches;
