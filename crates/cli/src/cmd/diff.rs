//! Show the changes between two versions of a document

use crate::diff_utils;
use crate::util::{self, Session};
use anyhow::Result;
use docver_core::{Context, FileDiff};
use docver_store::DocumentBackend;
use owo_colors::OwoColorize;

pub fn run(
    session: &Session,
    id: &str,
    from: &str,
    to: Option<&str>,
    patch: bool,
    context_lines: usize,
) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let from = util::resolve_version(&session.store, &ctx, id, Some(from))?;
    let to = util::resolve_version(&session.store, &ctx, id, to)?;

    let old_info = session.store.document_version_info(&ctx, id, from)?;
    let new_info = session.store.document_version_info(&ctx, id, to)?;
    let diff = FileDiff::compute(&new_info.files, Some(&old_info.files));

    println!("{}", "Diff Summary".bold());
    println!("From: {}", from.to_string().yellow());
    println!("To:   {}", to.to_string().yellow());
    println!();

    if diff.is_empty() {
        println!("{}", "No differences".dimmed());
        return Ok(());
    }

    if !patch {
        for name in &diff.added {
            println!("  {} {}", "A".green(), name);
        }
        for name in &diff.modified {
            println!("  {} {}", "M".yellow(), name);
        }
        for name in &diff.removed {
            println!("  {} {}", "D".red(), name);
        }
        println!(
            "\n{} added, {} modified, {} removed",
            diff.added.len(),
            diff.modified.len(),
            diff.removed.len()
        );
        return Ok(());
    }

    let old_files = session.store.document_version_file_provider(&ctx, id, from)?;
    let new_files = session.store.document_version_file_provider(&ctx, id, to)?;
    for name in &diff.added {
        let new = new_files.read_file(name)?;
        print!("{}", diff_utils::render_file_diff(name, None, Some(new.as_slice()), context_lines));
    }
    for name in &diff.modified {
        let old = old_files.read_file(name)?;
        let new = new_files.read_file(name)?;
        print!(
            "{}",
            diff_utils::render_file_diff(name, Some(old.as_slice()), Some(new.as_slice()), context_lines)
        );
    }
    for name in &diff.removed {
        let old = old_files.read_file(name)?;
        print!("{}", diff_utils::render_file_diff(name, Some(old.as_slice()), None, context_lines));
    }
    Ok(())
}
