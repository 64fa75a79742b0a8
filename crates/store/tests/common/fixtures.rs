//! Test stores and document contents

use super::faulty::FaultyStorage;
use docver_core::{Context, FileReader, MemFile, VersionTime};
use docver_store::{DocumentStore, LocalStorage};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Filesystem store in a temp directory, wrapped for fault injection
pub struct TestStore {
    _temp: TempDir,
    pub root: PathBuf,
    pub store: DocumentStore<FaultyStorage<LocalStorage>>,
}

impl TestStore {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("store");
        let storage = LocalStorage::open(&root).unwrap();
        Self {
            _temp: temp,
            root,
            store: DocumentStore::new(FaultyStorage::new(storage)),
        }
    }

    pub fn faults(&self) -> &FaultyStorage<LocalStorage> {
        self.store.storage()
    }

    /// Every file with its content and every directory below the root
    pub fn snapshot(&self) -> BTreeMap<String, Option<Vec<u8>>> {
        snapshot_dir(&self.root)
    }
}

pub fn snapshot_dir(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    let mut entries = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        if entry.file_type().is_dir() {
            entries.insert(rel, None);
        } else {
            entries.insert(rel, Some(std::fs::read(entry.path()).unwrap()));
        }
    }
    entries
}

/// Context whose clock is pinned at `millis`
pub fn ctx_at(millis: i64) -> Context {
    Context::new().with_pinned_time(VersionTime::from_unix_millis(millis))
}

pub fn mem(name: &str, data: impl Into<Vec<u8>>) -> Arc<dyn FileReader> {
    Arc::new(MemFile::new(name, data))
}

/// Deterministic pseudo-random file set
pub fn random_files(seed: u64, count: usize) -> Vec<Arc<dyn FileReader>> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let len = rng.gen_range(0..4096);
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            mem(&format!("file-{i:02}.bin"), data)
        })
        .collect()
}
