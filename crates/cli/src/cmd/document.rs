//! Create, edit, list and delete documents

use crate::util::{self, Session};
use anyhow::{Context as _, Result};
use docver_core::{Context, DocumentId, VersionInfo, VersionTime};
use docver_store::{DocumentBackend, NewVersion};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

pub fn create(
    session: &Session,
    company: &str,
    id: Option<&str>,
    reason: &str,
    files: &[PathBuf],
) -> Result<()> {
    let company = util::parse_company(company)?;
    let id = match id {
        Some(text) => util::parse_document(text)?,
        None => DocumentId::new(),
    };
    let user = session.user()?;
    let readers = util::local_files(files)?;

    let ctx = Context::new();
    let info = session
        .store
        .create_document(&ctx, company, id, user, reason, readers)
        .with_context(|| format!("Failed to create document {}", id))?;

    println!("{} {}", "Created document".green(), id.to_string().cyan());
    print_committed(&info);
    Ok(())
}

pub fn add(
    session: &Session,
    id: &str,
    reason: &str,
    write: &[PathBuf],
    delete: &[String],
    company: Option<&str>,
) -> Result<()> {
    let id = util::parse_document(id)?;
    let user = session.user()?;
    let company = company.map(util::parse_company).transpose()?;
    let writes = util::local_files(write)?;
    if writes.is_empty() && delete.is_empty() && company.is_none() {
        anyhow::bail!("Nothing to do: pass files to write, --delete or --company");
    }

    let ctx = Context::new();
    let result = session
        .store
        .add_document_version(&ctx, id, user, reason, &mut |ctx, prev, _| {
            let mut next = NewVersion::new(VersionTime::next_after(ctx, prev.version));
            for file in &writes {
                next.write_files.push(Arc::clone(file));
            }
            for name in delete {
                next = next.delete(name.clone());
            }
            if let Some(company) = company {
                next = next.company(company);
            }
            Ok(next)
        });

    match result {
        Ok(info) => {
            print_committed(&info);
            Ok(())
        }
        Err(err) if err.is_no_changes() => {
            println!("{}", "No changes: the latest version already has this content".yellow());
            Ok(())
        }
        Err(err) => {
            Err(anyhow::Error::new(err).context(format!("Failed to add a version to {}", id)))
        }
    }
}

pub fn list(session: &Session, company: Option<&str>) -> Result<()> {
    let ctx = Context::new();
    let mut ids = Vec::new();
    match company {
        Some(company) => {
            let company = util::parse_company(company)?;
            session.store.enum_company_document_ids(&ctx, company, &mut |id| {
                ids.push(id);
                Ok(())
            })?;
        }
        None => session.store.enum_document_ids(&ctx, &mut |id| {
            ids.push(id);
            Ok(())
        })?,
    }

    if ids.is_empty() {
        println!("{}", "No documents".dimmed());
        return Ok(());
    }
    for id in ids {
        let versions = session.store.document_versions(&ctx, id)?;
        let latest = versions
            .last()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(no committed version)".to_string());
        println!(
            "{}  {}  {}",
            id.to_string().cyan(),
            format!("{:>3} versions", versions.len()).dimmed(),
            latest
        );
    }
    Ok(())
}

pub fn set_company(session: &Session, id: &str, company: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let company = util::parse_company(company)?;
    let ctx = Context::new();
    session.store.set_document_company_id(&ctx, id, company)?;
    println!(
        "{} {} {} {}",
        "Moved".green(),
        id.to_string().cyan(),
        "to company".green(),
        company
    );
    Ok(())
}

pub fn delete(session: &Session, id: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    session.store.delete_document(&ctx, id)?;
    println!("{} {}", "Deleted document".green(), id.to_string().cyan());
    Ok(())
}

pub fn delete_version(session: &Session, id: &str, version: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let version = util::resolve_version(&session.store, &ctx, id, Some(version))?;
    let remaining = session.store.delete_document_version(&ctx, id, version)?;

    println!("{} {}", "Deleted version".green(), version);
    if remaining.is_empty() {
        println!("{}", "That was the only version; the document is gone".yellow());
    } else {
        println!("{} versions remain", remaining.len());
    }
    Ok(())
}

/// Summary lines printed after every commit
pub fn print_committed(info: &VersionInfo) {
    println!("{} {}", "Version".bold(), info.version.to_string().yellow());
    for name in &info.added_files {
        println!("  {} {}", "A".green(), name);
    }
    for name in &info.modified_files {
        println!("  {} {}", "M".yellow(), name);
    }
    for name in &info.removed_files {
        println!("  {} {}", "D".red(), name);
    }
}
