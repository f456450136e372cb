use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

/// The stable identity of a component instance within one rendering pass.
///
/// Identities are handed out in construction order, starting from `0`.
/// Unlike the native id the host gives to every instance, an identity
/// is tied to the rendering pass rather than the lifetime of the
/// process, which is what allows the server and client to agree on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(u64);

impl Identity {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Identity {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The sequence issuing [`Identity`] values.
///
/// This is owned by whatever orchestrates server-side rendering and is
/// passed by reference into [`server_plugin`](crate::server::server_plugin).
/// All clones share the same counter, so the orchestrator may keep one
/// to [`reset`](Self::reset) it between independent rendering passes
/// (typically once per request).  Forgetting to do so is not incorrect
/// within a single pass, but the identities (and thus the keys in the
/// transported store) will keep on growing.
#[derive(Clone, Default)]
pub struct IdentitySequence {
    next: Arc<AtomicU64>,
}

impl IdentitySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next identity.
    pub fn next(&self) -> Identity {
        let identity = Identity(self.next.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(%identity, "issued identity");
        identity
    }

    /// The value the next call to [`next`](Self::next) would return.
    pub fn peek(&self) -> Identity {
        Identity(self.next.load(Ordering::Relaxed))
    }

    /// Restart the sequence from `0`.
    pub fn reset(&self) {
        let issued = self.next.swap(0, Ordering::Relaxed);
        tracing::debug!(issued, "identity sequence reset");
    }
}

impl fmt::Debug for IdentitySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySequence")
            .field("next", &self.next.load(Ordering::Relaxed))
            .finish()
    }
}
