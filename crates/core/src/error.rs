//! Error taxonomy shared by every docver crate

use crate::id::DocumentId;
use crate::info::CheckOutStatus;
use crate::version::VersionTime;
use std::fmt;
use thiserror::Error;

/// Result type used throughout docver-core
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by document store operations
///
/// `NotFound`, `AlreadyExists`, `CheckedOut` and `NoChanges` style variants are
/// expected outcomes callers branch on. `Corruption` and `Io` are never
/// swallowed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("version {version} of document {id} not found")]
    VersionNotFound { id: DocumentId, version: VersionTime },

    #[error("file {0:?} not found")]
    FileNotFound(String),

    #[error("document {0} already exists")]
    DocumentAlreadyExists(DocumentId),

    #[error("version {version} of document {id} already exists")]
    VersionAlreadyExists { id: DocumentId, version: VersionTime },

    /// Carries the status of the current holder
    #[error(
        "document {} is checked out by user {} since {}: {:?}",
        .0.document_id, .0.user_id, .0.started_at, .0.reason
    )]
    CheckedOut(Box<CheckOutStatus>),

    #[error("document {0} is not checked out")]
    NotCheckedOut(DocumentId),

    #[error("document {0} has no committed version")]
    NoCommittedVersion(DocumentId),

    #[error("no changes compared to version {version} of document {id}")]
    NoChanges { id: DocumentId, version: VersionTime },

    #[error("invalid {0}")]
    Invalid(String),

    #[error("corrupted {context}: {reason}")]
    Corruption { context: String, reason: String },

    #[error("I/O error at {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("commit function panicked: {0}")]
    CallbackPanicked(String),

    /// An original error followed by the cleanup failures it caused
    #[error("{}", format_multiple(.0))]
    Multiple(Vec<Error>),
}

fn format_multiple(errors: &[Error]) -> String {
    let parts: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    parts.join("; ")
}

impl Error {
    /// Create an I/O error with location context
    pub fn io(context: impl fmt::Display, source: std::io::Error) -> Self {
        Error::Io {
            context: context.to_string(),
            source,
        }
    }

    /// Create an invalid-input error
    pub fn invalid(what: impl fmt::Display) -> Self {
        Error::Invalid(what.to_string())
    }

    /// Create a corruption error
    pub fn corruption(context: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Error::Corruption {
            context: context.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Merge cleanup failures into this error
    ///
    /// The receiver stays first so [`Error::root`] keeps returning it.
    pub fn with_cleanup_errors(self, cleanup: Vec<Error>) -> Self {
        if cleanup.is_empty() {
            return self;
        }
        let mut all = match self {
            Error::Multiple(errors) => errors,
            other => vec![other],
        };
        all.extend(cleanup);
        Error::Multiple(all)
    }

    /// Merge the error of a cleanup step, if it failed
    pub fn with_cleanup(self, cleanup: Result<()>) -> Self {
        match cleanup {
            Ok(()) => self,
            Err(e) => self.with_cleanup_errors(vec![e]),
        }
    }

    /// Combine a list of errors into one, `None` if the list is empty
    pub fn combine(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Multiple(errors)),
        }
    }

    /// The original error, looking through merged cleanup failures
    pub fn root(&self) -> &Error {
        match self {
            Error::Multiple(errors) => errors.first().map(Error::root).unwrap_or(self),
            other => other,
        }
    }

    /// Document, version or file does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            Error::DocumentNotFound(_) | Error::VersionNotFound { .. } | Error::FileNotFound(_)
        )
    }

    /// Document or version already exists
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self.root(),
            Error::DocumentAlreadyExists(_) | Error::VersionAlreadyExists { .. }
        )
    }

    pub fn is_no_changes(&self) -> bool {
        matches!(self.root(), Error::NoChanges { .. })
    }

    pub fn is_checked_out(&self) -> bool {
        matches!(self.root(), Error::CheckedOut(_))
    }

    pub fn is_not_checked_out(&self) -> bool {
        matches!(self.root(), Error::NotCheckedOut(_))
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self.root(), Error::Corruption { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }
}
