//! Cancellation tracking for in-flight tool calls
//!
//! One process-wide table of pending operations keyed by request id.
//! Cancellation is cooperative: a tool polls its handle and winds down on
//! its own; nothing is preempted.


use crate::protocol::RequestId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Shared flag handed to a running tool. Cloning is cheap; all clones
/// observe the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested for this operation.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Registry of in-flight, cancellable operations.
///
/// The table lives behind a single mutex, which serializes registration
/// traffic process-wide. Fine at low request volume; shard the table if that
/// ever shows up in a profile.
#[derive(Debug, Default)]
pub struct CancellationTracker {
    pending: Mutex<HashMap<RequestId, CancelHandle>>,
}

impl CancellationTracker {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation and hand back its cancellation handle.
    ///
    /// Re-registering an id replaces the entry. The displaced handle is
    /// cancelled at that point so any tool still holding it observes the
    /// flag and unwinds instead of running detached forever.
    #[inline]
    pub fn register(&self, request_id: &RequestId) -> CancelHandle {
        let handle = CancelHandle::new();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.insert(request_id.clone(), handle.clone()) {
            warn!("Request id {request_id} re-registered; cancelling displaced operation");
            previous.cancel();
        }
        handle
    }

    /// Request cancellation of an operation. Returns whether a pending
    /// operation was found; the result is observability only and never
    /// surfaces as an error to the client.
    #[inline]
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        match pending.get(request_id) {
            Some(handle) => {
                debug!("Cancelling operation {request_id}");
                handle.cancel();
                true
            }
            None => {
                debug!("Cancellation for unknown request id {request_id}");
                false
            }
        }
    }

    /// Remove an operation from the table. Must run on both normal
    /// completion and cancellation; a dangling entry is a leak.
    #[inline]
    pub fn unregister(&self, request_id: &RequestId) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(request_id);
    }

    /// Number of operations currently registered.
    #[inline]
    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.len()
    }
}
