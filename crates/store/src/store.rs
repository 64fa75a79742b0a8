//! Document store: protocol layer over a [`VersionStorage`]

use crate::backend::{CreateVersionFn, DocumentBackend, DocumentIdFn};
use crate::local::LocalStorage;
use crate::locks::{DocumentGuard, DocumentLocks};
use crate::memory::MemoryStorage;
use crate::storage::VersionStorage;
use docver_core::{
    validate_file_name, verify_version_files, CheckOutStatus, CompanyId, Context, DocumentId,
    Error, FileProvider, FileReader, Result, UserId, VerifiedFileProvider, VersionInfo,
    VersionTime,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Versioned document store
///
/// Implements [`DocumentBackend`] on top of any [`VersionStorage`]. Mutations
/// of one document are serialized through a process-local lock table; two
/// stores opened on the same directory do not exclude each other.
#[derive(Debug)]
pub struct DocumentStore<S> {
    pub(crate) storage: S,
    locks: DocumentLocks,
}

impl<S: VersionStorage> DocumentStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            locks: DocumentLocks::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn lock(&self, ctx: &Context, id: DocumentId) -> Result<DocumentGuard<'_>> {
        ctx.check()?;
        self.locks.lock(ctx, id)
    }

    pub(crate) fn require_document(&self, id: DocumentId) -> Result<()> {
        if !self.storage.document_exists(id)? {
            return Err(Error::DocumentNotFound(id));
        }
        Ok(())
    }

    /// Fails with `CheckedOut` while a checkout exists
    pub(crate) fn require_not_checked_out(&self, id: DocumentId) -> Result<()> {
        match self.storage.read_checkout(id)? {
            Some(status) => Err(Error::CheckedOut(Box::new(status))),
            None => Ok(()),
        }
    }

    pub(crate) fn latest_info(&self, id: DocumentId) -> Result<VersionInfo> {
        let versions = self.storage.versions(id)?;
        let latest = versions.last().ok_or(Error::NoCommittedVersion(id))?;
        self.storage.read_version_info(id, *latest)
    }

    pub(crate) fn version_info(&self, id: DocumentId, version: VersionTime) -> Result<VersionInfo> {
        if version.is_null() {
            return Err(Error::invalid(format!("null version of document {id}")));
        }
        self.require_document(id)?;
        self.storage.read_version_info(id, version)
    }

    /// Stored files of a committed version behind read-back verification
    pub(crate) fn verified_files(&self, info: &VersionInfo) -> Result<Arc<dyn FileProvider>> {
        let raw = self.storage.version_files(info.document_id, info.version)?;
        Ok(Arc::new(VerifiedFileProvider::for_version(raw, info)))
    }
}

impl DocumentStore<LocalStorage> {
    /// Open a filesystem store, creating its directory layout if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(LocalStorage::open(root)?))
    }
}

impl DocumentStore<MemoryStorage> {
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl<S: VersionStorage> DocumentBackend for DocumentStore<S> {
    fn document_exists(&self, ctx: &Context, id: DocumentId) -> Result<bool> {
        id.validate()?;
        ctx.check()?;
        self.storage.document_exists(id)
    }

    fn enum_document_ids(&self, ctx: &Context, callback: &mut DocumentIdFn<'_>) -> Result<()> {
        ctx.check()?;
        for id in self.storage.document_ids()? {
            ctx.check()?;
            callback(id)?;
        }
        Ok(())
    }

    fn enum_company_document_ids(
        &self,
        ctx: &Context,
        company: CompanyId,
        callback: &mut DocumentIdFn<'_>,
    ) -> Result<()> {
        company.validate()?;
        ctx.check()?;
        for id in self.storage.company_document_ids(company)? {
            ctx.check()?;
            callback(id)?;
        }
        Ok(())
    }

    fn document_company_id(&self, ctx: &Context, id: DocumentId) -> Result<CompanyId> {
        id.validate()?;
        ctx.check()?;
        self.storage.document_company_id(id)
    }

    fn set_document_company_id(
        &self,
        ctx: &Context,
        id: DocumentId,
        company: CompanyId,
    ) -> Result<()> {
        id.validate()?;
        company.validate()?;
        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        let old = self.storage.document_company_id(id)?;
        if old == company {
            return Ok(());
        }
        self.storage.set_document_company_id(id, company)?;
        info!("Moved document {id} from company {old} to {company}");
        Ok(())
    }

    fn document_versions(&self, ctx: &Context, id: DocumentId) -> Result<Vec<VersionTime>> {
        id.validate()?;
        ctx.check()?;
        self.storage.versions(id)
    }

    fn document_version_info(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<VersionInfo> {
        id.validate()?;
        ctx.check()?;
        self.version_info(id, version)
    }

    fn latest_document_version_info(&self, ctx: &Context, id: DocumentId) -> Result<VersionInfo> {
        id.validate()?;
        ctx.check()?;
        self.latest_info(id)
    }

    fn document_version_file_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<Arc<dyn FileProvider>> {
        id.validate()?;
        ctx.check()?;
        let info = self.version_info(id, version)?;
        self.verified_files(&info)
    }

    fn document_file_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
    ) -> Result<Arc<dyn FileProvider>> {
        id.validate()?;
        ctx.check()?;
        let info = self.latest_info(id)?;
        self.verified_files(&info)
    }

    fn read_document_version_file(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
        name: &str,
    ) -> Result<Vec<u8>> {
        id.validate()?;
        validate_file_name(name)?;
        ctx.check()?;
        let info = self.version_info(id, version)?;
        self.verified_files(&info)?.read_file(name)
    }

    fn verify_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<VersionInfo> {
        id.validate()?;
        ctx.check()?;
        let info = self.version_info(id, version)?;
        let stored = self.storage.version_files(id, version)?;
        verify_version_files(ctx, stored.as_ref(), &info)?;
        info!(
            "Verified {} files of document {id} version {version}",
            info.files.len()
        );
        Ok(info)
    }

    fn create_document(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
        files: Vec<Arc<dyn FileReader>>,
    ) -> Result<VersionInfo> {
        self.create(ctx, company, id, user, reason, files)
    }

    fn add_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
        create_version: &mut CreateVersionFn<'_>,
    ) -> Result<VersionInfo> {
        self.add_version(ctx, id, user, reason, create_version)
    }

    fn restore_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
        user: UserId,
        reason: &str,
    ) -> Result<VersionInfo> {
        self.restore(ctx, id, version, user, reason)
    }

    fn check_out_status(&self, ctx: &Context, id: DocumentId) -> Result<Option<CheckOutStatus>> {
        id.validate()?;
        ctx.check()?;
        self.require_document(id)?;
        self.storage.read_checkout(id)
    }

    fn checked_out_documents(&self, ctx: &Context) -> Result<Vec<CheckOutStatus>> {
        ctx.check()?;
        let mut statuses = Vec::new();
        for id in self.storage.checked_out_ids()? {
            ctx.check()?;
            // A checkout may end between listing and reading
            if let Some(status) = self.storage.read_checkout(id)? {
                statuses.push(status);
            }
        }
        Ok(statuses)
    }

    fn check_out_document(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus> {
        self.check_out(ctx, id, user, reason)
    }

    fn check_out_new_document(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus> {
        self.check_out_new(ctx, company, id, user, reason)
    }

    fn check_in_document(&self, ctx: &Context, id: DocumentId) -> Result<VersionInfo> {
        self.check_in(ctx, id)
    }

    fn cancel_check_out_document(&self, ctx: &Context, id: DocumentId) -> Result<()> {
        self.cancel_check_out(ctx, id)
    }

    fn checkout_workspace_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
    ) -> Result<Arc<dyn FileProvider>> {
        self.workspace_provider(ctx, id)
    }

    fn write_checkout_file(
        &self,
        ctx: &Context,
        id: DocumentId,
        file: &dyn FileReader,
    ) -> Result<()> {
        self.write_workspace_file(ctx, id, file)
    }

    fn remove_checkout_file(&self, ctx: &Context, id: DocumentId, name: &str) -> Result<()> {
        self.remove_workspace_file(ctx, id, name)
    }

    fn delete_document_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<Vec<VersionTime>> {
        self.delete_version(ctx, id, version)
    }

    fn delete_document(&self, ctx: &Context, id: DocumentId) -> Result<()> {
        self.delete(ctx, id)
    }
}
