//! Inspect and restore the version history of a document

use crate::cmd::document::print_committed;
use crate::util::{self, Session};
use anyhow::Result;
use docver_core::Context;
use docver_store::DocumentBackend;
use owo_colors::OwoColorize;
use std::io::Write;

pub fn versions(session: &Session, id: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let versions = session.store.document_versions(&ctx, id)?;
    if versions.is_empty() {
        println!("{}", "No committed version".dimmed());
        return Ok(());
    }

    let latest = versions.len() - 1;
    for (index, version) in versions.iter().enumerate() {
        let info = session.store.document_version_info(&ctx, id, *version)?;
        let marker = if index == latest {
            "latest".green().to_string()
        } else {
            String::new()
        };
        println!(
            "{}  {}  {} {}",
            version.to_string().yellow(),
            format!("{:>3} files", info.files.len()).dimmed(),
            format_reason(&info.reason),
            marker
        );
    }
    Ok(())
}

pub fn info(session: &Session, id: &str, version: Option<&str>) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let version = util::resolve_version(&session.store, &ctx, id, version)?;
    let info = session.store.document_version_info(&ctx, id, version)?;
    let company = session.store.document_company_id(&ctx, id)?;

    println!("{} {}", "document".yellow().bold(), id.to_string().cyan());
    println!("{} {}", "Company:     ".dimmed(), company);
    println!("{} {}", "Version:     ".dimmed(), info.version.to_string().yellow());
    if info.prev_version.is_null() {
        println!("{} {}", "Previous:    ".dimmed(), "(none - first version)".dimmed());
    } else {
        println!("{} {}", "Previous:    ".dimmed(), info.prev_version);
    }
    println!("{} {}", "Committed by:".dimmed(), info.committed_by);
    println!("{} {}", "Reason:      ".dimmed(), format_reason(&info.reason));

    let total: u64 = info.files.values().map(|f| f.size).sum();
    println!(
        "\n{} ({} files, {})",
        "Files:".bold(),
        info.files.len(),
        util::format_bytes(total)
    );
    for file in info.files.values() {
        let hex = file.hash.to_hex();
        println!(
            "  {}  {:>10}  {}",
            hex[..12].to_string().dimmed(),
            util::format_bytes(file.size),
            file.name.cyan()
        );
    }

    if info.has_changes() {
        println!("\n{}", "Changes:".bold());
        print_committed(&info);
    }

    if let Some(status) = session.store.check_out_status(&ctx, id)? {
        println!(
            "\n{} by {} since {}",
            "Checked out".red().bold(),
            status.user_id,
            status.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}

/// Print the version metadata as JSON
pub fn show(session: &Session, id: &str, version: Option<&str>) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let version = util::resolve_version(&session.store, &ctx, id, version)?;
    let info = session.store.document_version_info(&ctx, id, version)?;
    println!("{}", info.to_json()?);
    Ok(())
}

/// Write one file of a version to stdout
pub fn cat(session: &Session, id: &str, name: &str, version: Option<&str>) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let version = util::resolve_version(&session.store, &ctx, id, version)?;
    let data = session
        .store
        .read_document_version_file(&ctx, id, version, name)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    stdout.flush()?;
    Ok(())
}

pub fn restore(session: &Session, id: &str, version: &str, reason: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let user = session.user()?;
    let ctx = Context::new();
    let version = util::resolve_version(&session.store, &ctx, id, Some(version))?;

    match session
        .store
        .restore_document_version(&ctx, id, version, user, reason)
    {
        Ok(info) => {
            println!("{} {}", "Restored".green(), version);
            print_committed(&info);
            Ok(())
        }
        Err(err) if err.is_no_changes() => {
            println!("{}", "No changes: the latest version already has this content".yellow());
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn format_reason(reason: &str) -> String {
    if reason.is_empty() {
        "(no reason)".dimmed().to_string()
    } else {
        format!("{:?}", reason)
    }
}
