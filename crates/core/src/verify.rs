//! Read-back integrity checks against recorded file metadata

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hash::hash_bytes;
use crate::info::{FileInfo, VersionInfo};
use crate::provider::FileProvider;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Compare read-back bytes with their recorded size and hash
pub fn verify_file_data(info: &FileInfo, data: &[u8], context: &str) -> Result<()> {
    if data.len() as u64 != info.size {
        let err = Error::corruption(
            format!("{context} file {:?}", info.name),
            format!("size {} does not match recorded size {}", data.len(), info.size),
        );
        tracing::error!("{err}");
        return Err(err);
    }
    let hash = hash_bytes(data);
    if hash != info.hash {
        let err = Error::corruption(
            format!("{context} file {:?}", info.name),
            format!("hash {hash} does not match recorded hash {}", info.hash),
        );
        tracing::error!("{err}");
        return Err(err);
    }
    Ok(())
}

/// Provider that checks every read against recorded [`FileInfo`]s
///
/// Listing returns the recorded names. A recorded file missing from the
/// underlying storage is reported as corruption, not as not-found.
#[derive(Debug, Clone)]
pub struct VerifiedFileProvider {
    inner: Arc<dyn FileProvider>,
    files: BTreeMap<String, FileInfo>,
    context: String,
}

impl VerifiedFileProvider {
    /// `context` names the version in error messages, e.g. `document X version Y`
    pub fn new(
        inner: Arc<dyn FileProvider>,
        files: BTreeMap<String, FileInfo>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            files,
            context: context.into(),
        }
    }

    pub fn for_version(inner: Arc<dyn FileProvider>, info: &VersionInfo) -> Self {
        Self::new(
            inner,
            info.files.clone(),
            format!("document {} version {}", info.document_id, info.version),
        )
    }
}

impl FileProvider for VerifiedFileProvider {
    fn list_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn has_file(&self, name: &str) -> Result<bool> {
        Ok(self.files.contains_key(name))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let info = self
            .files
            .get(name)
            .ok_or_else(|| Error::FileNotFound(name.to_string()))?;
        let data = match self.inner.read_file(name) {
            Ok(data) => data,
            Err(Error::FileNotFound(_)) => {
                let err = Error::corruption(
                    format!("{} file {name:?}", self.context),
                    "recorded file missing from storage",
                );
                tracing::error!("{err}");
                return Err(err);
            }
            Err(e) => return Err(e),
        };
        verify_file_data(info, &data, &self.context)?;
        Ok(data)
    }
}

/// Re-read every file of a stored version and compare with its metadata
///
/// Also reports files present in storage but absent from the metadata.
pub fn verify_version_files(
    ctx: &Context,
    stored: &dyn FileProvider,
    info: &VersionInfo,
) -> Result<()> {
    let context = format!("document {} version {}", info.document_id, info.version);
    let stored_names = stored.list_files()?;
    for name in &stored_names {
        if !info.files.contains_key(name) {
            let err = Error::corruption(
                format!("{context} file {name:?}"),
                "stored file not recorded in version metadata",
            );
            tracing::error!("{err}");
            return Err(err);
        }
    }
    for (name, file_info) in &info.files {
        ctx.check()?;
        if stored_names.binary_search(name).is_err() {
            let err = Error::corruption(
                format!("{context} file {name:?}"),
                "recorded file missing from storage",
            );
            tracing::error!("{err}");
            return Err(err);
        }
        let data = stored.read_file(name)?;
        verify_file_data(file_info, &data, &context)?;
    }
    Ok(())
}
