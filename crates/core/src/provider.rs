//! Read-only views over named file sets
//!
//! Views compose by delegation: [`overlay`] layers providers over a base and
//! [`with_removed`] hides names of a base. Nothing is materialized, so a
//! previous version can be viewed with proposed writes and deletes on top.
//!
//! Every `list_files` result is sorted ascending with duplicates removed.

use crate::error::{Error, Result};
use crate::id::validate_file_name;
use std::collections::BTreeSet;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A single named file that can be read
pub trait FileReader: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn read(&self) -> Result<Vec<u8>>;
}

/// A read-only named file set
pub trait FileProvider: Send + Sync + fmt::Debug {
    /// Sorted ascending, without duplicates
    fn list_files(&self) -> Result<Vec<String>>;

    fn has_file(&self, name: &str) -> Result<bool>;

    /// Fails with `FileNotFound` if the file is not part of the set
    fn read_file(&self, name: &str) -> Result<Vec<u8>>;
}

/// In-memory file
#[derive(Clone)]
pub struct MemFile {
    name: String,
    data: Arc<[u8]>,
}

impl MemFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: Arc::from(data.into()),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for MemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemFile")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FileReader for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}

/// File on the local filesystem, stored under its own or an explicit name
#[derive(Debug, Clone)]
pub struct LocalFile {
    name: String,
    path: PathBuf,
}

impl LocalFile {
    /// Uses the last path component as name
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::invalid(format!("file path {}", path.display())))?
            .to_string();
        Ok(Self { name, path })
    }

    pub fn with_name(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileReader for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(self.name.clone())
            } else {
                Error::io(self.path.display(), e)
            }
        })
    }
}

/// Provider with no files
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProvider;

impl FileProvider for EmptyProvider {
    fn list_files(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn has_file(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        Err(Error::FileNotFound(name.to_string()))
    }
}

/// Provider over a list of readers; the first reader wins on a name collision
#[derive(Debug, Clone, Default)]
pub struct FileSetProvider {
    files: Vec<Arc<dyn FileReader>>,
}

impl FileSetProvider {
    pub fn new(files: Vec<Arc<dyn FileReader>>) -> Self {
        Self { files }
    }

    /// Convenience constructor for in-memory content
    pub fn from_mem<I, N, D>(files: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<Vec<u8>>,
    {
        let files = files
            .into_iter()
            .map(|(name, data)| Arc::new(MemFile::new(name, data)) as Arc<dyn FileReader>)
            .collect();
        Self { files }
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn FileReader>> {
        self.files.iter().find(|f| f.name() == name)
    }
}

impl FileProvider for FileSetProvider {
    fn list_files(&self) -> Result<Vec<String>> {
        let names: BTreeSet<String> = self.files.iter().map(|f| f.name().to_string()).collect();
        Ok(names.into_iter().collect())
    }

    fn has_file(&self, name: &str) -> Result<bool> {
        Ok(self.find(name).is_some())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        match self.find(name) {
            Some(file) => file.read(),
            None => Err(Error::FileNotFound(name.to_string())),
        }
    }
}

/// Regular files directly inside a directory
///
/// A lenient provider reads a missing directory as an empty set and ignores
/// entries that are not regular files. A strict one treats the directory as
/// the complete file set: a missing directory, a subdirectory, a symlink or a
/// name that is not a valid file name fails the listing.
#[derive(Debug, Clone)]
pub struct DirFileProvider {
    dir: PathBuf,
    strict: bool,
}

impl DirFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strict: false,
        }
    }

    pub fn strict(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            strict: true,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn reject(&self, entry: impl fmt::Debug, why: &str) -> Error {
        Error::invalid(format!("entry {entry:?} in {}: {why}", self.dir.display()))
    }
}

impl FileProvider for DirFileProvider {
    fn list_files(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound && !self.strict => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(self.dir.display(), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(self.dir.display(), e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| Error::io(entry.path().display(), e))?;
            let name = entry.file_name();
            if !file_type.is_file() {
                if self.strict {
                    return Err(self.reject(name, "not a regular file"));
                }
                continue;
            }
            match name.into_string() {
                Ok(name) => {
                    if self.strict {
                        validate_file_name(&name)?;
                    }
                    names.push(name);
                }
                Err(name) if self.strict => {
                    return Err(self.reject(name, "name is not valid UTF-8"));
                }
                Err(_) => {}
            }
        }
        names.sort();
        Ok(names)
    }

    fn has_file(&self, name: &str) -> Result<bool> {
        Ok(self.dir.join(name).is_file())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        std::fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(name.to_string())
            } else {
                Error::io(path.display(), e)
            }
        })
    }
}

/// Layered view: overlays are checked in order before the base
#[derive(Debug, Clone)]
pub struct Overlay {
    base: Arc<dyn FileProvider>,
    overlays: Vec<Arc<dyn FileProvider>>,
}

impl Overlay {
    fn layers(&self) -> impl Iterator<Item = &Arc<dyn FileProvider>> {
        self.overlays.iter().chain(std::iter::once(&self.base))
    }
}

impl FileProvider for Overlay {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();
        for layer in self.layers() {
            names.extend(layer.list_files()?);
        }
        Ok(names.into_iter().collect())
    }

    fn has_file(&self, name: &str) -> Result<bool> {
        for layer in self.layers() {
            if layer.has_file(name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        for layer in self.layers() {
            if layer.has_file(name)? {
                return layer.read_file(name);
            }
        }
        Err(Error::FileNotFound(name.to_string()))
    }
}

/// Base view with some names hidden
#[derive(Debug, Clone)]
pub struct WithRemoved {
    base: Arc<dyn FileProvider>,
    removed: BTreeSet<String>,
}

impl FileProvider for WithRemoved {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = self.base.list_files()?;
        names.retain(|name| !self.removed.contains(name));
        Ok(names)
    }

    fn has_file(&self, name: &str) -> Result<bool> {
        if self.removed.contains(name) {
            return Ok(false);
        }
        self.base.has_file(name)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        if self.removed.contains(name) {
            return Err(Error::FileNotFound(name.to_string()));
        }
        self.base.read_file(name)
    }
}

/// View of `base` with `overlays` on top, the first overlay winning
pub fn overlay(
    base: Arc<dyn FileProvider>,
    overlays: impl IntoIterator<Item = Arc<dyn FileProvider>>,
) -> Arc<dyn FileProvider> {
    let overlays: Vec<_> = overlays.into_iter().collect();
    if overlays.is_empty() {
        return base;
    }
    Arc::new(Overlay { base, overlays })
}

/// View of `base` without `names`
pub fn with_removed<I, S>(base: Arc<dyn FileProvider>, names: I) -> Arc<dyn FileProvider>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let removed: BTreeSet<String> = names.into_iter().map(Into::into).collect();
    if removed.is_empty() {
        return base;
    }
    Arc::new(WithRemoved { base, removed })
}

/// Read every file of a provider into memory, in name order
pub fn read_all(provider: &dyn FileProvider) -> Result<Vec<(String, Vec<u8>)>> {
    provider
        .list_files()?
        .into_iter()
        .map(|name| {
            let data = provider.read_file(&name)?;
            Ok((name, data))
        })
        .collect()
}
