//! Shared utilities for CLI commands

use anyhow::{Context as _, Result};
use docver_core::{CompanyId, Context, DocumentId, FileReader, LocalFile, UserId, VersionTime};
use docver_store::{DocumentBackend, DocumentStore, LocalStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: the opened store and who is acting
pub struct Session {
    pub store: DocumentStore<LocalStorage>,
    user: Option<String>,
}

impl Session {
    pub fn open(root: &Path, user: Option<String>) -> Result<Self> {
        let store = DocumentStore::open(root)
            .with_context(|| format!("Failed to open document store at {}", root.display()))?;
        debug!("Using document store at {}", root.display());
        Ok(Self { store, user })
    }

    /// User for operations that record one
    pub fn user(&self) -> Result<UserId> {
        let text = self.user.as_deref().context(
            "No user configured: pass --user <uuid> or set [user] id in the config file",
        )?;
        parse_user(text)
    }
}

pub fn parse_document(text: &str) -> Result<DocumentId> {
    let id: DocumentId = text.parse()?;
    id.validate()?;
    Ok(id)
}

pub fn parse_company(text: &str) -> Result<CompanyId> {
    let id: CompanyId = text.parse()?;
    id.validate()?;
    Ok(id)
}

pub fn parse_user(text: &str) -> Result<UserId> {
    let id: UserId = text.parse()?;
    id.validate()?;
    Ok(id)
}

/// Resolve a version reference
///
/// Accepts the version text form, `latest`, or nothing (latest).
pub fn resolve_version(
    store: &dyn DocumentBackend,
    ctx: &Context,
    id: DocumentId,
    reference: Option<&str>,
) -> Result<VersionTime> {
    match reference {
        None | Some("latest") => Ok(store.latest_document_version_info(ctx, id)?.version),
        Some(text) => text
            .parse::<VersionTime>()
            .with_context(|| format!("Invalid version '{}'", text)),
    }
}

/// Readers for files given on the command line, named by their last path component
pub fn local_files(paths: &[PathBuf]) -> Result<Vec<Arc<dyn FileReader>>> {
    paths
        .iter()
        .map(|path| {
            if !path.is_file() {
                anyhow::bail!("Not a file: {}", path.display());
            }
            let file: Arc<dyn FileReader> = Arc::new(LocalFile::new(path.clone())?);
            Ok(file)
        })
        .collect()
}

/// Format a byte count for humans
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
