//! Docver Store - versioned document storage
//!
//! This crate provides the document protocols on top of pluggable storage:
//! - The [`DocumentBackend`] contract
//! - Atomic version commits with compensating cleanup
//! - Exclusive checkout / check-in with workspaces
//! - Per-document write locks
//! - Filesystem ([`LocalStorage`]) and in-memory ([`MemoryStorage`]) storage

pub mod backend;
mod checkout;
mod commit;
mod delete;
pub mod local;
pub mod locks;
pub mod memory;
pub mod storage;
mod store;

// Re-export main types for convenience
pub use backend::{CreateVersionFn, DocumentBackend, DocumentIdFn, NewVersion};
pub use local::{atomic_write, LocalStorage};
pub use locks::{DocumentGuard, DocumentLocks};
pub use memory::MemoryStorage;
pub use storage::VersionStorage;
pub use store::DocumentStore;

pub use docver_core::{Error, Result};
