//! Per-document write locks
//!
//! Mutating operations on one document are serialized; operations on
//! different documents run in parallel. Entries are dropped from the table
//! once no guard or waiter references them.

use dashmap::DashMap;
use docver_core::{Context, DocumentId, Result};
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::sync::Arc;
use std::time::Duration;

/// How often a blocked caller re-checks its context
const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: DashMap<DocumentId, Arc<Mutex<()>>>,
}

/// Exclusive access to one document until dropped
pub struct DocumentGuard<'a> {
    locks: &'a DashMap<DocumentId, Arc<Mutex<()>>>,
    id: DocumentId,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the document is free
    ///
    /// Fails with `Cancelled` if the context is cancelled or its deadline
    /// passes while waiting.
    pub fn lock(&self, ctx: &Context, id: DocumentId) -> Result<DocumentGuard<'_>> {
        let mutex = self.locks.entry(id).or_default().clone();
        let guard = loop {
            ctx.check()?;
            if let Some(guard) = mutex.try_lock_arc_for(POLL_INTERVAL) {
                break guard;
            }
            tracing::trace!("Waiting for write lock of document {id}");
        };
        Ok(DocumentGuard {
            locks: &self.locks,
            id,
            guard: Some(guard),
        })
    }

    /// Number of documents with a live lock entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl DocumentGuard<'_> {
    pub fn document_id(&self) -> DocumentId {
        self.id
    }
}

impl Drop for DocumentGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table still holds the mutex: nobody waits for it
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
