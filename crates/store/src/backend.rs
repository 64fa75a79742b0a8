//! The document backend contract
//!
//! Every operation takes a [`Context`]; cancellation is checked before each
//! blocking step. Mutating operations on one document are mutually exclusive
//! within the process, reads are not serialized against them.

use docver_core::{
    CheckOutStatus, CompanyId, Context, DocumentId, FileProvider, FileReader, Result, UserId,
    VersionInfo, VersionTime,
};
use std::fmt;
use std::sync::Arc;

/// Changes proposed by a commit function for the next version
///
/// Files of the previous version that are neither written nor deleted are
/// carried forward unchanged.
#[derive(Default)]
pub struct NewVersion {
    /// Must be strictly after the previous version
    pub version: VersionTime,
    pub write_files: Vec<Arc<dyn FileReader>>,
    pub delete_files: Vec<String>,
    /// Applied only once the version is committed
    pub new_company_id: Option<CompanyId>,
}

impl NewVersion {
    pub fn new(version: VersionTime) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn write(mut self, file: impl FileReader + 'static) -> Self {
        self.write_files.push(Arc::new(file));
        self
    }

    pub fn delete(mut self, name: impl Into<String>) -> Self {
        self.delete_files.push(name.into());
        self
    }

    pub fn company(mut self, company: CompanyId) -> Self {
        self.new_company_id = Some(company);
        self
    }
}

impl fmt::Debug for NewVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let writes: Vec<&str> = self.write_files.iter().map(|f| f.name()).collect();
        f.debug_struct("NewVersion")
            .field("version", &self.version)
            .field("write_files", &writes)
            .field("delete_files", &self.delete_files)
            .field("new_company_id", &self.new_company_id)
            .finish()
    }
}

/// Computes the next version from the latest committed one
///
/// Receives the latest [`VersionInfo`] and a verified view of its files. A
/// panic inside the function is reported as `CallbackPanicked`.
pub type CreateVersionFn<'a> =
    dyn FnMut(&Context, &VersionInfo, Arc<dyn FileProvider>) -> Result<NewVersion> + 'a;

/// Push enumeration callback; an error aborts the enumeration and is returned
pub type DocumentIdFn<'a> = dyn FnMut(DocumentId) -> Result<()> + 'a;

pub trait DocumentBackend: Send + Sync {
    fn document_exists(&self, ctx: &Context, id: DocumentId) -> Result<bool>;

    /// Call `callback` for every document ID in ascending order
    fn enum_document_ids(&self, ctx: &Context, callback: &mut DocumentIdFn<'_>) -> Result<()>;

    /// Call `callback` for every document currently owned by `company`
    fn enum_company_document_ids(
        &self,
        ctx: &Context,
        company: CompanyId,
        callback: &mut DocumentIdFn<'_>,
    ) -> Result<()>;

    fn document_company_id(&self, ctx: &Context, id: DocumentId) -> Result<CompanyId>;

    fn set_document_company_id(
        &self,
        ctx: &Context,
        id: DocumentId,
        company: CompanyId,
    ) -> Result<()>;

    /// Committed versions, ascending; empty while a new document is checked out
    fn document_versions(&self, ctx: &Context, id: DocumentId) -> Result<Vec<VersionTime>>;

    fn document_version_info(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<VersionInfo>;

    /// Fails with `NoCommittedVersion` for a document without versions
    fn latest_document_version_info(&self, ctx: &Context, id: DocumentId) -> Result<VersionInfo>;

    /// Files of a committed version; every read is checked against its `FileInfo`
    fn document_version_file_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<Arc<dyn FileProvider>>;

    /// Files of the latest committed version
    fn document_file_provider(&self, ctx: &Context, id: DocumentId)
        -> Result<Arc<dyn FileProvider>>;

    fn read_document_version_file(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
        name: &str,
    ) -> Result<Vec<u8>>;

    /// Re-read and re-hash every stored file of a version
    ///
    /// Fails with `Corruption` on a size or hash mismatch and on files that
    /// are stored but not recorded, or recorded but not stored.
    fn verify_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<VersionInfo>;

    /// Create a document with its first version
    fn create_document(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
        files: Vec<Arc<dyn FileReader>>,
    ) -> Result<VersionInfo>;

    /// Commit the version computed by `create_version` on top of the latest one
    ///
    /// Fails with `NoChanges` if the resulting file set equals the latest
    /// version's, leaving the document untouched.
    fn add_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
        create_version: &mut CreateVersionFn<'_>,
    ) -> Result<VersionInfo>;

    /// Commit a new version with the files of an older one
    fn restore_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
        user: UserId,
        reason: &str,
    ) -> Result<VersionInfo>;

    fn check_out_status(&self, ctx: &Context, id: DocumentId) -> Result<Option<CheckOutStatus>>;

    fn checked_out_documents(&self, ctx: &Context) -> Result<Vec<CheckOutStatus>>;

    /// Copy the latest version into a fresh workspace and lock the document
    fn check_out_document(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus>;

    /// Create a document without versions, checked out with an empty workspace
    fn check_out_new_document(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus>;

    /// Commit the workspace as a new version and end the checkout
    fn check_in_document(&self, ctx: &Context, id: DocumentId) -> Result<VersionInfo>;

    /// End a checkout without committing; deletes a never committed document
    fn cancel_check_out_document(&self, ctx: &Context, id: DocumentId) -> Result<()>;

    fn checkout_workspace_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
    ) -> Result<Arc<dyn FileProvider>>;

    fn write_checkout_file(&self, ctx: &Context, id: DocumentId, file: &dyn FileReader)
        -> Result<()>;

    fn remove_checkout_file(&self, ctx: &Context, id: DocumentId, name: &str) -> Result<()>;

    /// Delete one version and return the remaining ones
    ///
    /// Deleting the only version deletes the document.
    fn delete_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<Vec<VersionTime>>;

    /// Delete a document with all versions, its checkout and workspace
    fn delete_document(&self, ctx: &Context, id: DocumentId) -> Result<()>;
}
