//! Common utilities for integration tests

pub mod fixtures;

// Re-export commonly used items
pub use faulty::{FaultyStorage, Step};
pub use fixtures::{ctx_at, mem, random_files, TestStore};
