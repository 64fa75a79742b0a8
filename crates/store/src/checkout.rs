//! Checkout / check-in protocol
//!
//! A checkout copies the latest version into a workspace and writes a status
//! marker; the marker is what locks the document against other checkouts and
//! commits. Check-in commits the workspace through the regular commit path.

use crate::storage::VersionStorage;
use crate::store::DocumentStore;
use chrono::Utc;
use docver_core::{
    validate_file_name, CheckOutStatus, CompanyId, Context, DocumentId, Error, FileProvider,
    FileReader, Result, UserId, VersionHeader, VersionInfo, VersionTime,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl<S: VersionStorage> DocumentStore<S> {
    pub(crate) fn check_out(
        &self,
        ctx: &Context,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus> {
        id.validate()?;
        user.validate()?;

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        self.require_not_checked_out(id)?;
        let info = self.latest_info(id)?;
        let company = self.storage.document_company_id(id)?;
        let status = CheckOutStatus {
            document_id: id,
            version: info.version,
            company_id: company,
            user_id: user,
            reason: reason.to_string(),
            started_at: Utc::now(),
            workspace: self.storage.workspace_location(id),
        };

        if let Err(err) = self.populate_workspace(ctx, &info, &status) {
            let cleanup = self.storage.remove_workspace(id);
            if let Err(e) = &cleanup {
                warn!("Failed to remove workspace of document {id}: {e}");
            }
            return Err(err.with_cleanup(cleanup));
        }
        info!(
            "Checked out document {id} version {} by user {user} into {}",
            info.version, status.workspace
        );
        Ok(status)
    }

    /// Copy the files of `info` into a fresh workspace, then write the marker
    fn populate_workspace(
        &self,
        ctx: &Context,
        info: &VersionInfo,
        status: &CheckOutStatus,
    ) -> Result<()> {
        let id = info.document_id;
        let files = self.verified_files(info)?;
        self.storage.create_workspace(id)?;
        for name in files.list_files()? {
            ctx.check()?;
            let data = files.read_file(&name)?;
            self.storage.write_workspace_file(id, &name, &data)?;
            debug!("Copied {name:?} into workspace of document {id}");
        }
        ctx.check()?;
        self.storage.write_checkout(status)
    }

    pub(crate) fn check_out_new(
        &self,
        ctx: &Context,
        company: CompanyId,
        id: DocumentId,
        user: UserId,
        reason: &str,
    ) -> Result<CheckOutStatus> {
        id.validate()?;
        company.validate()?;
        user.validate()?;

        let _guard = self.lock(ctx, id)?;
        if self.storage.document_exists(id)? {
            return Err(Error::DocumentAlreadyExists(id));
        }
        let status = CheckOutStatus {
            document_id: id,
            version: VersionTime::null(),
            company_id: company,
            user_id: user,
            reason: reason.to_string(),
            started_at: Utc::now(),
            workspace: self.storage.workspace_location(id),
        };

        self.storage.create_document(id, company)?;
        let result = self
            .storage
            .create_workspace(id)
            .and_then(|()| ctx.check())
            .and_then(|()| self.storage.write_checkout(&status));
        if let Err(err) = result {
            let cleanup = self.storage.remove_document(id);
            if let Err(e) = &cleanup {
                warn!("Failed to remove new document {id} after failed checkout: {e}");
            }
            return Err(err.with_cleanup(cleanup));
        }
        info!(
            "Checked out new document {id} for company {company} by user {user} into {}",
            status.workspace
        );
        Ok(status)
    }

    pub(crate) fn check_in(&self, ctx: &Context, id: DocumentId) -> Result<VersionInfo> {
        id.validate()?;

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        let status = self
            .storage
            .read_checkout(id)?
            .ok_or(Error::NotCheckedOut(id))?;

        let prev_files = if status.is_new_document() {
            None
        } else {
            let base = self.storage.read_version_info(id, status.version)?;
            Some(self.verified_files(&base)?)
        };
        // Versions committed after the base cannot exist while checked out,
        // but the new version must still sort after every committed one
        let latest = self
            .storage
            .versions(id)?
            .last()
            .copied()
            .unwrap_or(status.version);
        let header = VersionHeader {
            document_id: id,
            version: VersionTime::next_after(ctx, latest),
            prev_version: status.version,
            committed_by: status.user_id,
            reason: status.reason.clone(),
        };
        let workspace = self.storage.workspace_files(id)?;
        let info = self.stage_and_commit(ctx, header, workspace.as_ref(), prev_files.as_deref())?;
        info!(
            "Checked in document {id} version {} (+{} -{} ~{})",
            info.version,
            info.added_files.len(),
            info.removed_files.len(),
            info.modified_files.len()
        );

        // The commit stands even if the checkout cannot be cleared
        self.end_check_out(id)?;
        Ok(info)
    }

    pub(crate) fn cancel_check_out(&self, ctx: &Context, id: DocumentId) -> Result<()> {
        id.validate()?;

        let _guard = self.lock(ctx, id)?;
        let Some(status) = self.storage.read_checkout(id)? else {
            debug!("Document {id} is not checked out, nothing to cancel");
            return Ok(());
        };
        if status.is_new_document() {
            self.storage.remove_document(id)?;
            info!("Cancelled checkout of new document {id}, document removed");
        } else {
            self.end_check_out(id)?;
            info!("Cancelled checkout of document {id} version {}", status.version);
        }
        Ok(())
    }

    /// Remove marker then workspace
    ///
    /// The marker goes first: a leftover workspace without marker is
    /// replaced by the next checkout, a marker without workspace is not.
    fn end_check_out(&self, id: DocumentId) -> Result<()> {
        self.storage.remove_checkout(id)?;
        if let Err(e) = self.storage.remove_workspace(id) {
            warn!("Failed to remove workspace of document {id}: {e}");
            return Err(e);
        }
        Ok(())
    }

    fn require_check_out(&self, id: DocumentId) -> Result<CheckOutStatus> {
        self.require_document(id)?;
        self.storage
            .read_checkout(id)?
            .ok_or(Error::NotCheckedOut(id))
    }

    pub(crate) fn workspace_provider(
        &self,
        ctx: &Context,
        id: DocumentId,
    ) -> Result<Arc<dyn FileProvider>> {
        id.validate()?;
        ctx.check()?;
        self.require_check_out(id)?;
        self.storage.workspace_files(id)
    }

    pub(crate) fn write_workspace_file(
        &self,
        ctx: &Context,
        id: DocumentId,
        file: &dyn FileReader,
    ) -> Result<()> {
        id.validate()?;
        validate_file_name(file.name())?;

        let _guard = self.lock(ctx, id)?;
        self.require_check_out(id)?;
        let data = file.read()?;
        ctx.check()?;
        self.storage.write_workspace_file(id, file.name(), &data)?;
        debug!(
            "Wrote {:?} ({} bytes) into workspace of document {id}",
            file.name(),
            data.len()
        );
        Ok(())
    }

    pub(crate) fn remove_workspace_file(
        &self,
        ctx: &Context,
        id: DocumentId,
        name: &str,
    ) -> Result<()> {
        id.validate()?;
        validate_file_name(name)?;

        let _guard = self.lock(ctx, id)?;
        self.require_check_out(id)?;
        self.storage.remove_workspace_file(id, name)?;
        debug!("Removed {name:?} from workspace of document {id}");
        Ok(())
    }
}
