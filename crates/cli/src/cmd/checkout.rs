//! Check documents out to a workspace directory and back in

use crate::cmd::document::print_committed;
use crate::util::{self, Session};
use anyhow::Result;
use docver_core::{CheckOutStatus, Context, DocumentId};
use docver_store::DocumentBackend;
use owo_colors::OwoColorize;

pub fn check_out(session: &Session, id: &str, reason: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let user = session.user()?;
    let ctx = Context::new();
    let status = session.store.check_out_document(&ctx, id, user, reason)?;

    println!("{} {}", "Checked out".green(), id.to_string().cyan());
    println!("{} {}", "Base version:".dimmed(), status.version);
    println!("{} {}", "Workspace:   ".dimmed(), status.workspace);
    Ok(())
}

pub fn check_out_new(
    session: &Session,
    company: &str,
    id: Option<&str>,
    reason: &str,
) -> Result<()> {
    let company = util::parse_company(company)?;
    let id = match id {
        Some(text) => util::parse_document(text)?,
        None => DocumentId::new(),
    };
    let user = session.user()?;
    let ctx = Context::new();
    let status = session
        .store
        .check_out_new_document(&ctx, company, id, user, reason)?;

    println!("{} {}", "Created and checked out".green(), id.to_string().cyan());
    println!("{} {}", "Workspace:   ".dimmed(), status.workspace);
    Ok(())
}

pub fn check_in(session: &Session, id: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    match session.store.check_in_document(&ctx, id) {
        Ok(info) => {
            println!("{} {}", "Checked in".green(), id.to_string().cyan());
            print_committed(&info);
            Ok(())
        }
        Err(err) if err.is_no_changes() => {
            println!(
                "{}",
                "No changes in the workspace; the checkout is still open (use `dv cancel`)"
                    .yellow()
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub fn cancel(session: &Session, id: &str) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    session.store.cancel_check_out_document(&ctx, id)?;
    println!("{} {}", "Cancelled checkout of".green(), id.to_string().cyan());
    Ok(())
}

pub fn list(session: &Session) -> Result<()> {
    let ctx = Context::new();
    let statuses = session.store.checked_out_documents(&ctx)?;
    if statuses.is_empty() {
        println!("{}", "No checked out documents".dimmed());
        return Ok(());
    }
    for status in &statuses {
        print_status(status);
    }
    Ok(())
}

fn print_status(status: &CheckOutStatus) {
    let base = if status.is_new_document() {
        "new document".to_string()
    } else {
        status.version.to_string()
    };
    println!(
        "{}  {}  {}  {}",
        status.document_id.to_string().cyan(),
        base.yellow(),
        status.user_id,
        status.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    println!("    {} {}", "workspace:".dimmed(), status.workspace);
    if !status.reason.is_empty() {
        println!("    {} {:?}", "reason:".dimmed(), status.reason);
    }
}
