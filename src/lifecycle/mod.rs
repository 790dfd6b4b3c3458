//! Node lifecycle and graceful shutdown.
//!
//! # Design Decisions
//! - Reactors consult the node state on stop: a stopped node means no
//!   draining, an anticipated shutdown drains in-flight requests first
//! - Long-running tasks subscribe to one broadcast channel

pub mod shutdown;

use std::sync::atomic::{AtomicBool, Ordering};

pub use shutdown::Shutdown;

/// Lifecycle state of the gateway process.
#[derive(Debug, Default)]
pub struct NodeState {
    started: AtomicBool,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_started(&self, started: bool) {
        self.started.store(started, Ordering::SeqCst);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_starts_stopped() {
        let node = NodeState::new();
        assert!(!node.is_started());
        node.set_started(true);
        assert!(node.is_started());
    }
}
