//! Docver Core - content addressing and version primitives
//!
//! This crate provides the leaves of the document store:
//! - BLAKE3 content hashing
//! - Millisecond version timestamps with sortable text form
//! - Composable read-only file set views
//! - File set diffing and version metadata
//! - Read-back integrity verification
//! - Operation context (cancellation, deadline, pinned clock)

pub mod context;
pub mod diff;
pub mod error;
pub mod hash;
pub mod id;
pub mod info;
pub mod provider;
pub mod verify;
pub mod version;

// Re-export main types for convenience
pub use context::Context;
pub use diff::{build_version_info, read_file_info, read_file_infos, FileDiff, VersionHeader};
pub use error::{Error, Result};
pub use hash::{hash_bytes, hash_file, hash_reader, ContentHash, IncrementalHasher};
pub use id::{validate_file_name, CompanyId, DocumentId, UserId};
pub use info::{CheckOutStatus, FileInfo, VersionInfo};
pub use provider::{
    overlay, read_all, with_removed, DirFileProvider, EmptyProvider, FileProvider, FileReader,
    FileSetProvider, LocalFile, MemFile,
};
pub use verify::{verify_file_data, verify_version_files, VerifiedFileProvider};
pub use version::VersionTime;
