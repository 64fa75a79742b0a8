//! In-memory storage for tests and ephemeral stores

use crate::storage::VersionStorage;
use docver_core::{
    validate_file_name, CheckOutStatus, CompanyId, DocumentId, Error, FileProvider, FileReader,
    FileSetProvider, MemFile, Result, VersionInfo, VersionTime,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type Files = BTreeMap<String, Arc<[u8]>>;

#[derive(Debug, Default)]
struct MemVersion {
    files: Files,
    /// `None` while the version is only staged
    info: Option<VersionInfo>,
}

#[derive(Debug)]
struct MemDocument {
    company: CompanyId,
    versions: BTreeMap<VersionTime, MemVersion>,
    checkout: Option<CheckOutStatus>,
}

#[derive(Debug, Default)]
struct MemState {
    documents: HashMap<DocumentId, MemDocument>,
    workspaces: HashMap<DocumentId, Files>,
}

/// Storage keeping everything in process memory
///
/// Providers returned by this storage are snapshots taken at call time.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<MemState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn snapshot(files: &Files) -> Arc<dyn FileProvider> {
    let readers = files
        .iter()
        .map(|(name, data)| {
            Arc::new(MemFile::new(name.clone(), data.to_vec())) as Arc<dyn FileReader>
        })
        .collect();
    Arc::new(FileSetProvider::new(readers))
}

fn require_version(version: VersionTime, id: DocumentId) -> Result<()> {
    if version.is_null() {
        return Err(Error::invalid(format!("null version of document {id}")));
    }
    Ok(())
}

impl VersionStorage for MemoryStorage {
    fn document_exists(&self, id: DocumentId) -> Result<bool> {
        Ok(self.state.read().documents.contains_key(&id))
    }

    fn document_ids(&self) -> Result<Vec<DocumentId>> {
        let mut ids: Vec<_> = self.state.read().documents.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn company_document_ids(&self, company: CompanyId) -> Result<Vec<DocumentId>> {
        let state = self.state.read();
        let mut ids: Vec<_> = state
            .documents
            .iter()
            .filter(|(_, doc)| doc.company == company)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn create_document(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        let mut state = self.state.write();
        if state.documents.contains_key(&id) {
            return Err(Error::DocumentAlreadyExists(id));
        }
        state.documents.insert(
            id,
            MemDocument {
                company,
                versions: BTreeMap::new(),
                checkout: None,
            },
        );
        Ok(())
    }

    fn document_company_id(&self, id: DocumentId) -> Result<CompanyId> {
        self.state
            .read()
            .documents
            .get(&id)
            .map(|doc| doc.company)
            .ok_or(Error::DocumentNotFound(id))
    }

    fn set_document_company_id(&self, id: DocumentId, company: CompanyId) -> Result<()> {
        let mut state = self.state.write();
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        doc.company = company;
        Ok(())
    }

    fn remove_document(&self, id: DocumentId) -> Result<()> {
        let mut state = self.state.write();
        state.documents.remove(&id);
        state.workspaces.remove(&id);
        Ok(())
    }

    fn versions(&self, id: DocumentId) -> Result<Vec<VersionTime>> {
        let state = self.state.read();
        let doc = state
            .documents
            .get(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        Ok(doc
            .versions
            .iter()
            .filter(|(_, v)| v.info.is_some())
            .map(|(version, _)| *version)
            .collect())
    }

    fn read_version_info(&self, id: DocumentId, version: VersionTime) -> Result<VersionInfo> {
        let state = self.state.read();
        state
            .documents
            .get(&id)
            .and_then(|doc| doc.versions.get(&version))
            .and_then(|v| v.info.clone())
            .ok_or(Error::VersionNotFound { id, version })
    }

    fn version_files(&self, id: DocumentId, version: VersionTime) -> Result<Arc<dyn FileProvider>> {
        require_version(version, id)?;
        let state = self.state.read();
        let files = state
            .documents
            .get(&id)
            .and_then(|doc| doc.versions.get(&version))
            .map(|v| snapshot(&v.files));
        Ok(files.unwrap_or_else(|| snapshot(&Files::new())))
    }

    fn stage_file(
        &self,
        id: DocumentId,
        version: VersionTime,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        require_version(version, id)?;
        validate_file_name(name)?;
        let mut state = self.state.write();
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        let entry = doc.versions.entry(version).or_default();
        if entry.info.is_some() {
            return Err(Error::VersionAlreadyExists { id, version });
        }
        entry.files.insert(name.to_string(), Arc::from(data));
        Ok(())
    }

    fn commit_version(&self, info: &VersionInfo) -> Result<()> {
        let (id, version) = (info.document_id, info.version);
        require_version(version, id)?;
        let mut state = self.state.write();
        let doc = state
            .documents
            .get_mut(&id)
            .ok_or(Error::DocumentNotFound(id))?;
        let entry = doc.versions.entry(version).or_default();
        if entry.info.is_some() {
            return Err(Error::VersionAlreadyExists { id, version });
        }
        entry.info = Some(info.clone());
        Ok(())
    }

    fn remove_version(&self, id: DocumentId, version: VersionTime) -> Result<()> {
        let mut state = self.state.write();
        if let Some(doc) = state.documents.get_mut(&id) {
            doc.versions.remove(&version);
        }
        Ok(())
    }

    fn read_checkout(&self, id: DocumentId) -> Result<Option<CheckOutStatus>> {
        Ok(self
            .state
            .read()
            .documents
            .get(&id)
            .and_then(|doc| doc.checkout.clone()))
    }

    fn write_checkout(&self, status: &CheckOutStatus) -> Result<()> {
        let mut state = self.state.write();
        let doc = state
            .documents
            .get_mut(&status.document_id)
            .ok_or(Error::DocumentNotFound(status.document_id))?;
        doc.checkout = Some(status.clone());
        Ok(())
    }

    fn remove_checkout(&self, id: DocumentId) -> Result<()> {
        if let Some(doc) = self.state.write().documents.get_mut(&id) {
            doc.checkout = None;
        }
        Ok(())
    }

    fn checked_out_ids(&self) -> Result<Vec<DocumentId>> {
        let state = self.state.read();
        let mut ids: Vec<_> = state
            .documents
            .iter()
            .filter(|(_, doc)| doc.checkout.is_some())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn workspace_location(&self, id: DocumentId) -> String {
        format!("memory://workspaces/{id}")
    }

    fn create_workspace(&self, id: DocumentId) -> Result<()> {
        self.state.write().workspaces.insert(id, Files::new());
        Ok(())
    }

    fn workspace_files(&self, id: DocumentId) -> Result<Arc<dyn FileProvider>> {
        let state = self.state.read();
        state
            .workspaces
            .get(&id)
            .map(snapshot)
            .ok_or_else(|| Error::corruption(format!("workspace of document {id}"), "missing"))
    }

    fn write_workspace_file(&self, id: DocumentId, name: &str, data: &[u8]) -> Result<()> {
        validate_file_name(name)?;
        self.state
            .write()
            .workspaces
            .entry(id)
            .or_default()
            .insert(name.to_string(), Arc::from(data));
        Ok(())
    }

    fn remove_workspace_file(&self, id: DocumentId, name: &str) -> Result<()> {
        let mut state = self.state.write();
        state
            .workspaces
            .get_mut(&id)
            .and_then(|files| files.remove(name))
            .map(|_| ())
            .ok_or_else(|| Error::FileNotFound(name.to_string()))
    }

    fn remove_workspace(&self, id: DocumentId) -> Result<()> {
        self.state.write().workspaces.remove(&id);
        Ok(())
    }
}
