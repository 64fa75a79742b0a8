//! Filesystem storage
//!
//! Layout under the root directory:
//!
//! ```text
//! documents/<document-id>/company             owning company ID
//! documents/<document-id>/<version>/          files of a version
//! documents/<document-id>/<version>.json      metadata, written last
//! documents/<document-id>/checkout.json       present while checked out
//! companies/<company-id>/<document-id>        company index marker
//! workspaces/<document-id>/                   checkout workspace
//! tmp/                                        atomic write staging
//! ```
//!
//! Metadata files are written with [`atomic_write`], so a version directory
//! without its `.json` sibling is an uncommitted leftover and never listed.

use crate::storage::VersionStorage;
use docver_core::{
    validate_file_name, CheckOutStatus, CompanyId, DirFileProvider, DocumentId, Error,
    FileProvider, Result, VersionInfo, VersionTime,
};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPANY_FILE: &str = "company";
const CHECKOUT_FILE: &str = "checkout.json";
const METADATA_EXT: &str = "json";

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open a store rooted at `root`, creating the directory layout if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["documents", "companies", "workspaces", "tmp"] {
            let path = root.join(dir);
            fs::create_dir_all(&path).map_err(|e| Error::io(path.display(), e))?;
        }
        debug!("Opened local storage at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    fn document_dir(&self, id: DocumentId) -> PathBuf {
        self.root.join("documents").join(id.to_string())
    }

    fn company_file(&self, id: DocumentId) -> PathBuf {
        self.document_dir(id).join(COMPANY_FILE)
    }

    fn checkout_file(&self, id: DocumentId) -> PathBuf {
        self.document_dir(id).join(CHECKOUT_FILE)
    }

    fn version_dir(&self, id: DocumentId, version: VersionTime) -> Result<PathBuf> {
        if version.is_null() {
            return Err(Error::invalid(format!("null version of document {id}")));
        }
        Ok(self.document_dir(id).join(version.to_string()))
    }

    fn metadata_file(&self, id: DocumentId, version: VersionTime) -> Result<PathBuf> {
        if version.is_null() {
            return Err(Error::invalid(format!("null version of document {id}")));
        }
        Ok(self
            .document_dir(id)
            .join(format!("{version}.{METADATA_EXT}")))
    }

    fn company_dir(&self, company: CompanyId) -> PathBuf {
        self.root.join("companies").join(company.to_string())
    }

    fn index_marker(&self, company: CompanyId, id: DocumentId) -> PathBuf {
        self.company_dir(company).join(id.to_string())
    }

    fn workspace_dir(&self, id: DocumentId) -> PathBuf {
        self.root.join("workspaces").join(id.to_string())
    }

    fn add_index_marker(&self, company: CompanyId, id: DocumentId) -> Result<()> {
        let dir = self.company_dir(company);
        let marker = self.index_marker(company, id);
        // An emptied company directory can vanish between the two steps
        let mut retried = false;
        loop {
            fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display(), e))?;
            match File::create(&marker) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound && !retried => retried = true,
                Err(e) => return Err(Error::io(marker.display(), e)),
            }
        }
    }

    /// Remove the marker, and the company directory once it is empty
    fn remove_index_marker(&self, company: CompanyId, id: DocumentId) -> Result<()> {
        remove_file_if_exists(&self.index_marker(company, id))?;
        let dir = self.company_dir(company);
        if let Err(e) = fs::remove_dir(&dir) {
            debug!("Keeping company directory {}: {e}", dir.display());
        }
        Ok(())
    }
}

impl VersionStorage for LocalStorage {
    fn document_exists(&self, id: DocumentId) -> Result<bool> {
        let path = self.company_file(id);
        path.try_exists().map_err(|e| Error::io(path.display(), e))
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        for name in dir_entry_names(&self.root.join("documents"))? {
            match name.parse::<DocumentId>() {
                Ok(id) if self.document_exists(id)? => ids.push(id),
                Ok(_) => debug!("Skipping incomplete document directory {name}"),
                Err(_) => warn!("Skipping unexpected entry {name:?} in documents directory"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn company_document_ids(&self, company: CompanyId) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        for name in dir_entry_names(&self.company_dir(company))? {
            let Ok(id) = name.parse::<DocumentId>() else {
                warn!("Skipping unexpected entry {name:?} in index of company {company}");
                continue;
            };
            // The company file is authoritative; a marker can outlive a move
            match self.document_company_id(id) {
                Ok(owner) if owner == company => ids.push(id),
                Ok(owner) => debug!("Skipping stale index marker of document {id} now in {owner}"),
                Err(Error::DocumentNotFound(_)) => {
                    debug!("Skipping index marker of missing document {id}")
                }
                Err(e) => return Err(e),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn create_document(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        let dir = self.document_dir(id);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if self.document_exists(id)? {
                    return Err(Error::DocumentAlreadyExists(id));
                }
                warn!("Replacing leftover directory of incomplete document {id}");
                fs::remove_dir_all(&dir).map_err(|e| Error::io(dir.display(), e))?;
                fs::create_dir(&dir).map_err(|e| Error::io(dir.display(), e))?;
            }
            Err(e) => return Err(Error::io(dir.display(), e)),
        }

        // The company file marks the document as existing, so it goes last
        let result = self.add_index_marker(company, id).and_then(|()| {
            atomic_write(
                &self.tmp_dir(),
                &self.company_file(id),
                company.to_string().as_bytes(),
            )
        });
        if let Err(err) = result {
            let cleanup = self
                .remove_index_marker(company, id)
                .and_then(|()| remove_dir_if_exists(&dir));
            return Err(err.with_cleanup(cleanup));
        }
        Ok(())
    }

    fn document_company_id(&self, id: DocumentId) -> Result<CompanyId> {
        let path = self.company_file(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::DocumentNotFound(id)),
            Err(e) => return Err(Error::io(path.display(), e)),
        };
        text.parse().map_err(|e: Error| {
            Error::corruption(format!("company ID of document {id}"), e)
        })
    }

    fn set_document_company_id(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        let old = self.document_company_id(id)?;
        if old == company {
            return Ok(());
        }
        self.add_index_marker(company, id)?;
        if let Err(err) = atomic_write(
            &self.tmp_dir(),
            &self.company_file(id),
            company.to_string().as_bytes(),
        ) {
            return Err(err.with_cleanup(self.remove_index_marker(company, id)));
        }
        // The move is done once the company file is written
        if let Err(e) = self.remove_index_marker(old, id) {
            warn!("Failed to remove stale index marker of document {id} in company {old}: {e}");
        }
        Ok(())
    }

    fn remove_document(&self, id: DocumentId) -> Result<()> {
        let company = match self.document_company_id(id) {
            Ok(company) => Some(company),
            Err(Error::DocumentNotFound(_)) => None,
            Err(e) => {
                warn!("Removing document {id} with unreadable company ID: {e}");
                None
            }
        };

        let mut errors = Vec::new();
        // Removing the company file first makes the document invisible
        if let Err(e) = remove_file_if_exists(&self.company_file(id)) {
            errors.push(e);
        }
        if let Some(company) = company {
            if let Err(e) = self.remove_index_marker(company, id) {
                errors.push(e);
            }
        }
        if let Err(e) = remove_dir_if_exists(&self.workspace_dir(id)) {
            errors.push(e);
        }
        if let Err(e) = remove_dir_if_exists(&self.document_dir(id)) {
            errors.push(e);
        }
        match Error::combine(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn versions(&self, id: DocumentId) -> Result<Vec<VersionTime>> {
        if !self.document_exists(id)? {
            return Err(Error::DocumentNotFound(id));
        }
        let mut versions = Vec::new();
        for name in dir_entry_names(&self.document_dir(id))? {
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if name == CHECKOUT_FILE {
                continue;
            }
            match stem.parse::<VersionTime>() {
                Ok(version) if !version.is_null() => versions.push(version),
                _ => warn!("Skipping unexpected metadata file {name:?} of document {id}"),
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn read_version_info(&self, id: DocumentId, version: VersionTime) -> Result<VersionInfo> {
        let path = self.metadata_file(id, version)?;
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::VersionNotFound { id, version })
            }
            Err(e) => return Err(Error::io(path.display(), e)),
        };
        let context = format!("metadata of document {id} version {version}");
        let info = VersionInfo::from_json(&data).map_err(|e| Error::corruption(&context, e))?;
        if info.document_id != id || info.version != version {
            return Err(Error::corruption(
                &context,
                format!(
                    "records document {} version {}",
                    info.document_id, info.version
                ),
            ));
        }
        Ok(info)
    }

    fn version_files(&self, id: DocumentId, version: VersionTime) -> Result<Arc<dyn FileProvider>> {
        Ok(Arc::new(DirFileProvider::new(self.version_dir(id, version)?)))
    }

    fn stage_file(
        &self,
        id: DocumentId,
        version: VersionTime,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        validate_file_name(name)?;
        let dir = self.version_dir(id, version)?;
        fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display(), e))?;
        write_synced(&dir.join(name), data)
    }

    fn commit_version(&self, info: &VersionInfo) -> Result<()> {
        let path = self.metadata_file(info.document_id, info.version)?;
        if path.try_exists().map_err(|e| Error::io(path.display(), e))? {
            return Err(Error::VersionAlreadyExists {
                id: info.document_id,
                version: info.version,
            });
        }
        atomic_write(&self.tmp_dir(), &path, info.to_json()?.as_bytes())
    }

    fn remove_version(&self, id: DocumentId, version: VersionTime) -> Result<()> {
        let mut errors = Vec::new();
        // Metadata first so the version disappears before its files
        if let Err(e) = remove_file_if_exists(&self.metadata_file(id, version)?) {
            errors.push(e);
        }
        if let Err(e) = remove_dir_if_exists(&self.version_dir(id, version)?) {
            errors.push(e);
        }
        match Error::combine(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read_checkout(&self, id: DocumentId) -> Result<Option<CheckOutStatus>> {
        let path = self.checkout_file(id);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(path.display(), e)),
        };
        let status = CheckOutStatus::from_json(&data)
            .map_err(|e| Error::corruption(format!("checkout status of document {id}"), e))?;
        Ok(Some(status))
    }

    fn write_checkout(&self, status: &CheckOutStatus) -> Result<()> {
        atomic_write(
            &self.tmp_dir(),
            &self.checkout_file(status.document_id),
            status.to_json()?.as_bytes(),
        )
    }

    fn remove_checkout(&self, id: DocumentId) -> Result<()> {
        remove_file_if_exists(&self.checkout_file(id))
    }

    fn checked_out_ids(&self) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::new();
        for id in self.document_ids()? {
            let path = self.checkout_file(id);
            if path.try_exists().map_err(|e| Error::io(path.display(), e))? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn workspace_location(&self, id: DocumentId) -> String {
        self.workspace_dir(id).display().to_string()
    }

    fn create_workspace(&self, id: DocumentId) -> Result<()> {
        let dir = self.workspace_dir(id);
        remove_dir_if_exists(&dir)?;
        fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display(), e))
    }

    fn workspace_files(&self, id: DocumentId) -> Result<Arc<dyn FileProvider>> {
        Ok(Arc::new(DirFileProvider::strict(self.workspace_dir(id))))
    }

    fn write_workspace_file(&self, id: DocumentId, name: &str, data: &[u8]) -> Result<()> {
        validate_file_name(name)?;
        let dir = self.workspace_dir(id);
        fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display(), e))?;
        write_synced(&dir.join(name), data)
    }

    fn remove_workspace_file(&self, id: DocumentId, name: &str) -> Result<()> {
        validate_file_name(name)?;
        let path = self.workspace_dir(id).join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::FileNotFound(name.to_string())),
            Err(e) => Err(Error::io(path.display(), e)),
        }
    }

    fn remove_workspace(&self, id: DocumentId) -> Result<()> {
        remove_dir_if_exists(&self.workspace_dir(id))
    }
}

/// Atomically replace `target` with `data`
///
/// Writes to a temp file in `tmp_dir`, fsyncs it, renames it over the target
/// and fsyncs the target's directory. `tmp_dir` must be on the same
/// filesystem as the target.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = tmp_dir.join(format!("{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    if let Err(err) = write_synced(&tmp_path, data) {
        return Err(err.with_cleanup(remove_file_if_exists(&tmp_path)));
    }
    if let Err(e) = fs::rename(&tmp_path, target) {
        let err = Error::io(target.display(), e);
        return Err(err.with_cleanup(remove_file_if_exists(&tmp_path)));
    }
    if let Some(parent) = target.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| Error::io(path.display(), e))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .map_err(|e| Error::io(path.display(), e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::io(dir.display(), e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path.display(), e)),
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path.display(), e)),
    }
}

/// Names of the entries of a directory; a missing directory has none
fn dir_entry_names(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(dir.display(), e)),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir.display(), e))?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!("Skipping non UTF-8 entry {name:?} in {}", dir.display()),
        }
    }
    Ok(names)
}
