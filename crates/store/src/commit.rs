//! Version-commit protocol
//!
//! Every commit runs the same sequence under the document lock: stage all
//! files of the new version, build its metadata from the staged bytes, then
//! publish the metadata. Any failure before publication removes what was
//! staged, so a failed commit is indistinguishable from one never attempted.

use crate::backend::{CreateVersionFn, NewVersion};
use crate::storage::VersionStorage;
use crate::store::DocumentStore;
use docver_core::{
    build_version_info, overlay, validate_file_name, with_removed, CompanyId, Context,
    DocumentId, Error, FileProvider, FileReader, FileSetProvider, MemFile, Result, UserId,
    VersionHeader, VersionInfo, VersionTime,
};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl<S: VersionStorage> DocumentStore<S> {
    pub(crate) fn create(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
        files: Vec<Arc<dyn FileReader>>,
    ) -> Result<VersionInfo> {
        id.validate()?;
        company.validate()?;
        user.validate()?;
        let mut names = BTreeSet::new();
        for file in &files {
            validate_file_name(file.name())?;
            if !names.insert(file.name()) {
                return Err(Error::invalid(format!("duplicate file {:?}", file.name())));
            }
        }

        let _guard = self.lock(ctx, id)?;
        if self.storage.document_exists(id)? {
            return Err(Error::DocumentAlreadyExists(id));
        }
        let version = VersionTime::now(ctx);
        if version.is_null() {
            return Err(Error::invalid("null version for new document"));
        }

        self.storage.create_document(id, company)?;
        let header = VersionHeader {
            document_id: id,
            version,
            prev_version: VersionTime::null(),
            committed_by: user,
            reason: reason.to_string(),
        };
        let target = FileSetProvider::new(files);
        match self.stage_and_commit(ctx, header, &target, None) {
            Ok(info) => {
                info!(
                    "Created document {id} for company {company} with {} files at version {version}",
                    info.files.len()
                );
                Ok(info)
            }
            Err(err) => {
                let cleanup = self.storage.remove_document(id);
                if let Err(e) = &cleanup {
                    warn!("Failed to remove document {id} after failed create: {e}");
                }
                Err(err.with_cleanup(cleanup))
            }
        }
    }

    pub(crate) fn add_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
        create_version: &mut CreateVersionFn<'_>,
    ) -> Result<VersionInfo> {
        id.validate()?;
        user.validate()?;

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        self.require_not_checked_out(id)?;
        let prev_info = self.latest_info(id)?;
        let prev_files = self.verified_files(&prev_info)?;

        ctx.check()?;
        let proposal =
            call_create_version(create_version, ctx, &prev_info, Arc::clone(&prev_files))?;
        debug!("Commit function for document {id} proposed {proposal:?}");
        self.commit_proposal(ctx, &prev_info, prev_files, user, reason, proposal)
    }

    pub(crate) fn restore(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
        user: UserId,
        reason: &str,
    ) -> Result<VersionInfo> {
        id.validate()?;
        user.validate()?;
        if version.is_null() {
            return Err(Error::invalid(format!("null version of document {id}")));
        }

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        self.require_not_checked_out(id)?;
        let prev_info = self.latest_info(id)?;
        let prev_files = self.verified_files(&prev_info)?;
        let source_info = self.storage.read_version_info(id, version)?;
        let source = self.verified_files(&source_info)?;

        let header = VersionHeader {
            document_id: id,
            version: VersionTime::next_after(ctx, prev_info.version),
            prev_version: prev_info.version,
            committed_by: user,
            reason: reason.to_string(),
        };
        let info = self.stage_and_commit(ctx, header, source.as_ref(), Some(prev_files.as_ref()))?;
        info!(
            "Restored document {id} version {version} as version {}",
            info.version
        );
        Ok(info)
    }

    fn commit_proposal(
        &self,
        ctx: &Context,
        prev_info: &VersionInfo,
        prev_files: Arc<dyn FileProvider>,
        user: UserId,
        reason: &str,
        proposal: NewVersion,
    ) -> Result<VersionInfo> {
        let id = prev_info.document_id;
        check_successor(id, prev_info.version, proposal.version)?;
        let old_company = match proposal.new_company_id {
            Some(company) => {
                company.validate()?;
                Some(self.storage.document_company_id(id)?)
            }
            None => None,
        };

        // Reading every write file up front proves it readable before staging
        let mut written = BTreeSet::new();
        let mut writes: Vec<Arc<dyn FileReader>> = Vec::with_capacity(proposal.write_files.len());
        for file in &proposal.write_files {
            ctx.check()?;
            let name = file.name().to_string();
            validate_file_name(&name)?;
            if !written.insert(name.clone()) {
                return Err(Error::invalid(format!("file {name:?} written twice")));
            }
            let data = file.read()?;
            writes.push(Arc::new(MemFile::new(name, data)));
        }
        for name in &proposal.delete_files {
            validate_file_name(name)?;
            if written.contains(name) {
                return Err(Error::invalid(format!(
                    "file {name:?} both written and deleted"
                )));
            }
            if !prev_info.files.contains_key(name) {
                debug!(
                    "Deleted file {name:?} is not part of document {id} version {}",
                    prev_info.version
                );
            }
        }

        let target = overlay(
            with_removed(Arc::clone(&prev_files), proposal.delete_files.iter().cloned()),
            [Arc::new(FileSetProvider::new(writes)) as Arc<dyn FileProvider>],
        );
        let header = VersionHeader {
            document_id: id,
            version: proposal.version,
            prev_version: prev_info.version,
            committed_by: user,
            reason: reason.to_string(),
        };
        let committed =
            self.stage_and_commit(ctx, header, target.as_ref(), Some(prev_files.as_ref()));
        let info = match committed {
            Ok(info) => info,
            Err(err) => {
                if err.is_no_changes() && proposal.new_company_id.is_some() {
                    warn!("Dropping company change of document {id}: no file changes to commit");
                }
                return Err(err);
            }
        };

        if let (Some(company), Some(old)) = (proposal.new_company_id, old_company) {
            if old != company {
                if let Err(err) = self.storage.set_document_company_id(id, company) {
                    let cleanup = self.discard_company_change(id, info.version, old);
                    return Err(err.with_cleanup(cleanup));
                }
                info!("Moved document {id} from company {old} to {company}");
            }
        }

        info!(
            "Committed document {id} version {} (+{} -{} ~{})",
            info.version,
            info.added_files.len(),
            info.removed_files.len(),
            info.modified_files.len()
        );
        Ok(info)
    }

    /// Undo a committed version whose company change failed
    ///
    /// The storage may have switched the company before failing, so the old
    /// owner is written back if it no longer matches.
    fn discard_company_change(
        &self,
        id: DocumentId,
        version: VersionTime,
        old: CompanyId,
    ) -> Result<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.storage.remove_version(id, version) {
            warn!("Failed to remove version {version} of document {id}: {e}");
            errors.push(e);
        }
        let restored = self.storage.document_company_id(id).and_then(|current| {
            if current == old {
                return Ok(());
            }
            self.storage.set_document_company_id(id, old)
        });
        if let Err(e) = restored {
            warn!("Failed to restore company {old} of document {id}: {e}");
            errors.push(e);
        }
        match Error::combine(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stage `target` as `header.version` and publish its metadata
    ///
    /// With `prev`, an empty diff fails with `NoChanges`. On failure the
    /// staged version is removed and cleanup errors are merged in.
    pub(crate) fn stage_and_commit(
        &self,
        ctx: &Context,
        header: VersionHeader,
        target: &dyn FileProvider,
        prev: Option<&dyn FileProvider>,
    ) -> Result<VersionInfo> {
        let (id, version) = (header.document_id, header.version);
        if self.storage.versions(id)?.contains(&version) {
            return Err(Error::VersionAlreadyExists { id, version });
        }

        match self.stage_version(ctx, header, target, prev) {
            Ok(info) => Ok(info),
            Err(err) => {
                debug!("Discarding staged version {version} of document {id}: {err}");
                let cleanup = self.storage.remove_version(id, version);
                if let Err(e) = &cleanup {
                    warn!("Failed to remove staged version {version} of document {id}: {e}");
                }
                Err(err.with_cleanup(cleanup))
            }
        }
    }

    fn stage_version(
        &self,
        ctx: &Context,
        header: VersionHeader,
        target: &dyn FileProvider,
        prev: Option<&dyn FileProvider>,
    ) -> Result<VersionInfo> {
        let (id, version) = (header.document_id, header.version);
        for name in target.list_files()? {
            ctx.check()?;
            let data = target.read_file(&name)?;
            self.storage.stage_file(id, version, &name, &data)?;
            debug!(
                "Staged {name:?} ({} bytes) for document {id} version {version}",
                data.len()
            );
        }

        ctx.check()?;
        let staged = self.storage.version_files(id, version)?;
        let info = build_version_info(ctx, header, staged.as_ref(), prev)?;
        if prev.is_some() && !info.has_changes() {
            return Err(Error::NoChanges {
                id,
                version: info.prev_version,
            });
        }
        info.validate()?;

        ctx.check()?;
        self.storage.commit_version(&info)?;
        Ok(info)
    }
}

/// A proposed version must be strictly after the previous one
fn check_successor(id: DocumentId, prev: VersionTime, next: VersionTime) -> Result<()> {
    if next.is_null() {
        return Err(Error::invalid(format!("null version proposed for document {id}")));
    }
    if next.equal(&prev) {
        return Err(Error::VersionAlreadyExists { id, version: next });
    }
    if next.before(&prev) {
        return Err(Error::invalid(format!(
            "version {next} of document {id} is before latest version {prev}"
        )));
    }
    Ok(())
}

/// Run the caller's commit function, turning a panic into an error
fn call_create_version(
    create_version: &mut CreateVersionFn<'_>,
    ctx: &Context,
    prev_info: &VersionInfo,
    prev_files: Arc<dyn FileProvider>,
) -> Result<NewVersion> {
    match panic::catch_unwind(AssertUnwindSafe(|| create_version(ctx, prev_info, prev_files))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                "Commit function for document {} panicked: {message}",
                prev_info.document_id
            );
            Err(Error::CallbackPanicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
