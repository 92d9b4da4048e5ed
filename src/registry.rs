//! Registry of active request streams.
//!
//! [`ActiveStreams`] maps stream identifiers to the [`FrameHandler`] that owns
//! each stream so inbound REQUEST_N, CANCEL and follow-up fragments can be
//! routed. Stream state machines only ever remove themselves, through the
//! [`StreamRegistry`] seam, and removal is idempotent.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{frame::StreamId, metrics, responder::FrameHandler};

/// Removal side of a stream registry, as seen by a stream state machine.
pub trait StreamRegistry: Send + Sync {
    /// Remove `id` if it is still mapped to `handler`.
    ///
    /// Returns `true` when an entry was removed. Calling this repeatedly, or
    /// after the entry is gone, is harmless.
    fn remove(&self, id: StreamId, handler: &dyn FrameHandler) -> bool;
}

/// Concurrent map of live stream handlers keyed by [`StreamId`].
#[derive(Default)]
pub struct ActiveStreams(DashMap<StreamId, Arc<dyn FrameHandler>>);

impl ActiveStreams {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` for `id`.
    ///
    /// Returns `false` without replacing anything when `id` is already in use.
    pub fn insert(&self, id: StreamId, handler: Arc<dyn FrameHandler>) -> bool {
        match self.0.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(handler);
                metrics::inc_streams();
                true
            }
        }
    }

    /// Look up the handler registered for `id`.
    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<Arc<dyn FrameHandler>> {
        self.0.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: StreamId) -> bool { self.0.contains_key(&id) }

    /// Number of registered streams.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no streams are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Identifiers of the registered streams.
    #[must_use]
    pub fn active_ids(&self) -> Vec<StreamId> { self.0.iter().map(|entry| *entry.key()).collect() }

    /// Snapshot of the registered handlers.
    ///
    /// The map is not locked while the caller uses the handlers, so they may
    /// remove themselves freely.
    #[must_use]
    pub fn handlers(&self) -> Vec<(StreamId, Arc<dyn FrameHandler>)> {
        self.0
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }
}

impl StreamRegistry for ActiveStreams {
    fn remove(&self, id: StreamId, handler: &dyn FrameHandler) -> bool {
        let removed = self
            .0
            .remove_if(&id, |_, registered| same_handler(registered, handler))
            .is_some();
        if removed {
            metrics::dec_streams();
        }
        removed
    }
}

fn same_handler(registered: &Arc<dyn FrameHandler>, handler: &dyn FrameHandler) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(registered), std::ptr::from_ref(handler))
}
