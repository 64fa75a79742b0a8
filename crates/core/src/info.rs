//! Version metadata and checkout status records

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::id::{CompanyId, DocumentId, UserId};
use crate::version::VersionTime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Size and content hash of one file of a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub hash: ContentHash,
}

/// Immutable commit metadata of one document version
///
/// `files` is the complete file set of the version, not a delta. The three
/// change lists are sorted and partition the symmetric difference against
/// `prev_version`'s file set; unchanged files appear in none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub document_id: DocumentId,
    pub version: VersionTime,
    /// Null for the first version
    pub prev_version: VersionTime,
    pub committed_by: UserId,
    pub reason: String,
    pub files: BTreeMap<String, FileInfo>,
    pub added_files: Vec<String>,
    pub removed_files: Vec<String>,
    pub modified_files: Vec<String>,
}

impl VersionInfo {
    /// Whether the version differs from its predecessor
    pub fn has_changes(&self) -> bool {
        !self.added_files.is_empty()
            || !self.removed_files.is_empty()
            || !self.modified_files.is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Same names with the same hashes
    pub fn equal_files(&self, other: &VersionInfo) -> bool {
        self.files.len() == other.files.len()
            && self
                .files
                .iter()
                .all(|(name, info)| other.files.get(name).map(|o| o.hash) == Some(info.hash))
    }

    /// Names whose content changed, were added or were removed
    pub fn changed_files(&self) -> Vec<String> {
        let all: BTreeSet<&String> = self
            .added_files
            .iter()
            .chain(&self.removed_files)
            .chain(&self.modified_files)
            .collect();
        all.into_iter().cloned().collect()
    }

    /// Check the structural invariants of the record
    pub fn validate(&self) -> Result<()> {
        self.document_id.validate()?;
        self.committed_by.validate()?;
        if self.version.is_null() {
            return Err(Error::invalid("version info: null version"));
        }
        if !self.prev_version.is_null() && !self.prev_version.before(&self.version) {
            return Err(Error::invalid(format!(
                "version info: previous version {} not before {}",
                self.prev_version, self.version
            )));
        }
        for (name, info) in &self.files {
            if name != &info.name {
                return Err(Error::invalid(format!(
                    "version info: file key {name:?} holds info for {:?}",
                    info.name
                )));
            }
        }
        for list in [&self.added_files, &self.removed_files, &self.modified_files] {
            if !list.windows(2).all(|w| w[0] < w[1]) {
                return Err(Error::invalid("version info: change list not sorted"));
            }
        }
        for name in self.added_files.iter().chain(&self.modified_files) {
            if !self.files.contains_key(name) {
                return Err(Error::invalid(format!(
                    "version info: changed file {name:?} missing from files"
                )));
            }
        }
        for name in &self.removed_files {
            if self.files.contains_key(name) {
                return Err(Error::invalid(format!(
                    "version info: removed file {name:?} still in files"
                )));
            }
        }
        let total = self.added_files.len() + self.removed_files.len() + self.modified_files.len();
        if self.changed_files().len() != total {
            return Err(Error::invalid("version info: change lists overlap"));
        }
        if self.prev_version.is_null() {
            if !self.removed_files.is_empty() || !self.modified_files.is_empty() {
                return Err(Error::invalid(
                    "version info: first version can only add files",
                ));
            }
            if self.added_files.len() != self.files.len() {
                return Err(Error::invalid(
                    "version info: first version must list every file as added",
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }
}

/// Exclusive editing session of a document
///
/// Exists only while the document is checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutStatus {
    pub document_id: DocumentId,
    /// Null if the document was created by the checkout and never committed
    pub version: VersionTime,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub reason: String,
    pub started_at: DateTime<Utc>,
    /// Backend-specific location of the workspace (directory path or URI)
    pub workspace: String,
}

impl CheckOutStatus {
    pub fn is_new_document(&self) -> bool {
        self.version.is_null()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }
}
