//! Storage primitives underneath the document protocols
//!
//! A [`VersionStorage`] knows how to persist documents, staged files, version
//! metadata and checkout state. It does no locking and enforces no protocol;
//! [`DocumentStore`](crate::DocumentStore) sequences these primitives so that a
//! crash or error at any step leaves no partially visible version.
//!
//! A version becomes visible only when [`VersionStorage::commit_version`]
//! writes its metadata. Staged files of a version without metadata must never
//! show up in [`VersionStorage::versions`].

use docver_core::{
    CheckOutStatus, CompanyId, DocumentId, FileProvider, Result, VersionInfo, VersionTime,
};
use std::fmt;
use std::sync::Arc;

pub trait VersionStorage: Send + Sync + fmt::Debug {
    fn document_exists(&self, id: DocumentId) -> Result<bool>;

    /// All documents, sorted
    fn document_ids(&self) -> Result<Vec<DocumentId>>;

    /// Documents currently owned by `company`, sorted
    fn company_document_ids(&self, company: CompanyId) -> Result<Vec<DocumentId>>;

    /// Register a document without versions
    ///
    /// Fails with `DocumentAlreadyExists` if the ID is taken.
    fn create_document(&self, id: DocumentId, company: CompanyId) -> Result<()>;

    fn document_company_id(&self, id: DocumentId) -> Result<CompanyId>;

    fn set_document_company_id(&self, id: DocumentId, company: CompanyId) -> Result<()>;

    /// Remove everything stored for a document
    ///
    /// Best effort: keeps going after a failed step and reports all failures.
    /// A document that does not exist is not an error.
    fn remove_document(&self, id: DocumentId) -> Result<()>;

    /// Committed versions, ascending
    fn versions(&self, id: DocumentId) -> Result<Vec<VersionTime>>;

    fn read_version_info(&self, id: DocumentId, version: VersionTime) -> Result<VersionInfo>;

    /// Raw stored files of a version, committed or staged, without integrity checks
    fn version_files(&self, id: DocumentId, version: VersionTime) -> Result<Arc<dyn FileProvider>>;

    /// Write one file of a version that is not committed yet
    fn stage_file(
        &self,
        id: DocumentId,
        version: VersionTime,
        name: &str,
        data: &[u8],
    ) -> Result<()>;

    /// Publish the metadata of a staged version
    ///
    /// Fails with `VersionAlreadyExists` if the version is already committed.
    fn commit_version(&self, info: &VersionInfo) -> Result<()>;

    /// Remove metadata and files of a version, committed or only staged
    fn remove_version(&self, id: DocumentId, version: VersionTime) -> Result<()>;

    fn read_checkout(&self, id: DocumentId) -> Result<Option<CheckOutStatus>>;

    fn write_checkout(&self, status: &CheckOutStatus) -> Result<()>;

    fn remove_checkout(&self, id: DocumentId) -> Result<()>;

    /// Documents with a checkout marker, sorted
    fn checked_out_ids(&self) -> Result<Vec<DocumentId>>;

    /// Location recorded in [`CheckOutStatus::workspace`]
    fn workspace_location(&self, id: DocumentId) -> String;

    /// Create an empty workspace, replacing any leftover one
    fn create_workspace(&self, id: DocumentId) -> Result<()>;

    /// The workspace as the complete proposed file set
    ///
    /// A missing workspace is an error, never an empty set, and so is any
    /// entry the provider cannot represent as a document file.
    fn workspace_files(&self, id: DocumentId) -> Result<Arc<dyn FileProvider>>;

    fn write_workspace_file(&self, id: DocumentId, name: &str, data: &[u8]) -> Result<()>;

    /// Fails with `FileNotFound` if the workspace has no such file
    fn remove_workspace_file(&self, id: DocumentId, name: &str) -> Result<()>;

    /// Remove the workspace; a missing workspace is not an error
    fn remove_workspace(&self, id: DocumentId) -> Result<()>;
}

/// Forward every primitive through a shared pointer
impl<S: VersionStorage + ?Sized> VersionStorage for Arc<S> {
    fn document_exists(&self, id: DocumentId) -> Result<bool> {
        (**self).document_exists(id)
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>> {
        (**self).document_ids()
    }

    fn company_document_ids(&self, company: CompanyId) -> Result<Vec<DocumentId>> {
        (**self).company_document_ids(company)
    }

    fn create_document(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        (**self).create_document(id, company)
    }

    fn document_company_id(&self, id: DocumentId) -> Result<CompanyId> {
        (**self).document_company_id(id)
    }

    fn set_document_company_id(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        (**self).set_document_company_id(id, company)
    }

    fn remove_document(&self, id: DocumentId) -> Result<()> {
        (**self).remove_document(id)
    }

    fn versions(&self, id: DocumentId) -> Result<Vec<VersionTime>> {
        (**self).versions(id)
    }

    fn read_version_info(&self, id: DocumentId, version: VersionTime) -> Result<VersionInfo> {
        (**self).read_version_info(id, version)
    }

    fn version_files(&self, id: DocumentId, version: VersionTime) -> Result<Arc<dyn FileProvider>> {
        (**self).version_files(id, version)
    }

    fn stage_file(
        &self,
        id: DocumentId,
        version: VersionTime,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        (**self).stage_file(id, version, name, data)
    }

    fn commit_version(&self, info: &VersionInfo) -> Result<()> {
        (**self).commit_version(info)
    }

    fn remove_version(&self, id: DocumentId, version: VersionTime) -> Result<()> {
        (**self).remove_version(id, version)
    }

    fn read_checkout(&self, id: DocumentId) -> Result<Option<CheckOutStatus>> {
        (**self).read_checkout(id)
    }

    fn write_checkout(&self, status: &CheckOutStatus) -> Result<()> {
        (**self).write_checkout(status)
    }

    fn remove_checkout(&self, id: DocumentId) -> Result<()> {
        (**self).remove_checkout(id)
    }

    fn checked_out_ids(&self) -> Result<Vec<DocumentId>> {
        (**self).checked_out_ids()
    }

    fn workspace_location(&self, id: DocumentId) -> String {
        (**self).workspace_location(id)
    }

    fn create_workspace(&self, id: DocumentId) -> Result<()> {
        (**self).create_workspace(id)
    }

    fn workspace_files(&self, id: DocumentId) -> Result<Arc<dyn FileProvider>> {
        (**self).workspace_files(id)
    }

    fn write_workspace_file(&self, id: DocumentId, name: &str, data: &[u8]) -> Result<()> {
        (**self).write_workspace_file(id, name, data)
    }

    fn remove_workspace_file(&self, id: DocumentId, name: &str) -> Result<()> {
        (**self).remove_workspace_file(id, name)
    }

    fn remove_workspace(&self, id: DocumentId) -> Result<()> {
        (**self).remove_workspace(id)
    }
}
