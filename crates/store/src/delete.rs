//! Version and document deletion

use crate::storage::VersionStorage;
use crate::store::DocumentStore;
use docver_core::{Context, DocumentId, Error, Result, VersionTime};
use tracing::info;

impl<S: VersionStorage> DocumentStore<S> {
    pub(crate) fn delete_version(
        &self,
        ctx: &Context,
        id: DocumentId,
        version: VersionTime,
    ) -> Result<Vec<VersionTime>> {
        id.validate()?;
        if version.is_null() {
            return Err(Error::invalid(format!("null version of document {id}")));
        }

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        if let Some(status) = self.storage.read_checkout(id)? {
            if status.version == version {
                return Err(Error::CheckedOut(Box::new(status)));
            }
        }
        let mut versions = self.storage.versions(id)?;
        let Some(pos) = versions.iter().position(|v| *v == version) else {
            return Err(Error::VersionNotFound { id, version });
        };

        ctx.check()?;
        // A document without versions is not a valid persistent state
        if versions.len() == 1 {
            self.storage.remove_document(id)?;
            info!("Deleted only version {version} of document {id}, document removed");
            return Ok(Vec::new());
        }
        self.storage.remove_version(id, version)?;
        versions.remove(pos);
        info!(
            "Deleted version {version} of document {id}, {} versions remain",
            versions.len()
        );
        Ok(versions)
    }

    pub(crate) fn delete(&self, ctx: &Context, id: DocumentId) -> Result<()> {
        id.validate()?;

        let _guard = self.lock(ctx, id)?;
        self.require_document(id)?;
        self.storage.remove_document(id)?;
        info!("Deleted document {id}");
        Ok(())
    }
}
