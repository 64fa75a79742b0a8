//! File set diffing and version metadata construction

use crate::context::Context;
use crate::error::Result;
use crate::hash::hash_bytes;
use crate::id::{DocumentId, UserId};
use crate::info::{FileInfo, VersionInfo};
use crate::provider::FileProvider;
use crate::version::VersionTime;
use std::collections::BTreeMap;

/// Read a file of a provider and compute its [`FileInfo`]
pub fn read_file_info(provider: &dyn FileProvider, name: &str) -> Result<FileInfo> {
    let data = provider.read_file(name)?;
    Ok(FileInfo {
        name: name.to_string(),
        size: data.len() as u64,
        hash: hash_bytes(&data),
    })
}

/// Hash every file of a provider
///
/// The context is checked before each file.
pub fn read_file_infos(
    ctx: &Context,
    provider: &dyn FileProvider,
) -> Result<BTreeMap<String, FileInfo>> {
    let mut infos = BTreeMap::new();
    for name in provider.list_files()? {
        ctx.check()?;
        let info = read_file_info(provider, &name)?;
        infos.insert(name, info);
    }
    Ok(infos)
}

/// Differences between two file sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// Names only in the new set
    pub added: Vec<String>,
    /// Names only in the old set
    pub removed: Vec<String>,
    /// Names in both sets with different content
    pub modified: Vec<String>,
    /// Names in both sets with equal content
    pub unchanged: Vec<String>,
}

impl FileDiff {
    /// Compare `new` against `old`; without `old` every file is added
    ///
    /// All lists come out sorted because both maps iterate in name order.
    pub fn compute(
        new: &BTreeMap<String, FileInfo>,
        old: Option<&BTreeMap<String, FileInfo>>,
    ) -> Self {
        let mut diff = FileDiff::default();
        let Some(old) = old else {
            diff.added = new.keys().cloned().collect();
            return diff;
        };

        for (name, info) in new {
            match old.get(name) {
                None => diff.added.push(name.clone()),
                Some(prev) if prev.hash != info.hash => diff.modified.push(name.clone()),
                Some(_) => diff.unchanged.push(name.clone()),
            }
        }
        diff.removed = old
            .keys()
            .filter(|name| !new.contains_key(*name))
            .cloned()
            .collect();
        diff
    }

    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

/// Commit attributes of a version about to be built
#[derive(Debug, Clone)]
pub struct VersionHeader {
    pub document_id: DocumentId,
    pub version: VersionTime,
    pub prev_version: VersionTime,
    pub committed_by: UserId,
    pub reason: String,
}

/// Build the metadata of a new version from its file set
///
/// `prev` is the file set of `header.prev_version`, or `None` for a first
/// version. An empty diff is not an error here; callers decide whether that
/// means there was nothing to commit.
pub fn build_version_info(
    ctx: &Context,
    header: VersionHeader,
    target: &dyn FileProvider,
    prev: Option<&dyn FileProvider>,
) -> Result<VersionInfo> {
    let files = read_file_infos(ctx, target)?;
    let prev_files = match prev {
        Some(prev) => Some(read_file_infos(ctx, prev)?),
        None => None,
    };
    let diff = FileDiff::compute(&files, prev_files.as_ref());

    Ok(VersionInfo {
        document_id: header.document_id,
        version: header.version,
        prev_version: header.prev_version,
        committed_by: header.committed_by,
        reason: header.reason,
        files,
        added_files: diff.added,
        removed_files: diff.removed,
        modified_files: diff.modified,
    })
}
