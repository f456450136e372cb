use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// The client-side flag marking that hydration data has been consumed
/// and live fetching may begin.
///
/// This starts out as not resolved and may only be flipped once, by the
/// host application, through [`resolve`](Self::resolve).  Wrapped fetches
/// consult the gate every time they are called rather than when they are
/// created, so a fetcher created before resolution behaves as a live
/// fetcher afterwards.
///
/// All clones share the same flag; the client bootstrap routine owns the
/// gate and passes it into [`client_plugin`](crate::client::client_plugin).
#[derive(Clone, Default)]
pub struct ResolutionGate {
    resolved: Arc<AtomicBool>,
}

impl ResolutionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Flip the gate to resolved.
    ///
    /// Returns `true` if this call performed the transition; subsequent
    /// calls have no effect and return `false`.
    pub fn resolve(&self) -> bool {
        let flipped = !self.resolved.swap(true, Ordering::AcqRel);
        if flipped {
            tracing::debug!("resolution gate flipped, live fetching enabled");
        }
        flipped
    }
}

impl fmt::Debug for ResolutionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionGate")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
