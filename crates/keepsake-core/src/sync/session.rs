//! Sync session context and connectivity signal

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifies whose data a sync operation acts on.
///
/// Passed explicitly into every remote operation instead of living in
/// module-level mutable state, so concurrent engines (and test harnesses)
/// never share hidden globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    /// Remote owner id all replicated records are keyed under
    pub owner_id: String,
}

impl SyncSession {
    #[must_use]
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

/// Shared handle to the platform's "is online" signal.
///
/// The platform flips this on connectivity changes; the engine only reads
/// it to decide whether a replication attempt is worth starting.
#[derive(Debug, Clone)]
pub struct Connectivity(Arc<AtomicBool>);

impl Connectivity {
    /// Create a handle in the given initial state
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    /// Whether the device currently believes it is online
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Update the signal
    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::Relaxed);
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_shared_between_clones() {
        let connectivity = Connectivity::default();
        let clone = connectivity.clone();

        assert!(clone.is_online());
        connectivity.set_online(false);
        assert!(!clone.is_online());
    }
}
