//! Connectivity tracking.
//!
//! The platform layer reports online/offline transitions through
//! [`ConnectivityMonitor::set_online`]; everything else reads the last
//! observed state or subscribes to changes. No polling happens here.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Holds the last observed connectivity state.
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self {
            state: Arc::new(state),
        }
    }

    /// The last observed state.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Records a platform connectivity event. Returns whether the state
    /// actually changed; repeated events for the same state are ignored.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                info!("Connection restored");
            } else {
                info!("Connection lost, switching to offline mode");
            }
        }
        changed
    }

    /// Receives every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    /// Starts offline until the platform reports otherwise.
    fn default() -> Self {
        Self::new(false)
    }
}
