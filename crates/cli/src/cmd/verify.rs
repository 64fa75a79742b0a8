//! Re-hash stored files and compare them with the recorded metadata

use crate::util::{self, Session};
use anyhow::Result;
use docver_core::Context;
use docver_store::DocumentBackend;
use owo_colors::OwoColorize;

/// Verify one version, or every version with `all`
pub fn run(session: &Session, id: &str, version: Option<&str>, all: bool) -> Result<()> {
    let id = util::parse_document(id)?;
    let ctx = Context::new();
    let versions = if all {
        session.store.document_versions(&ctx, id)?
    } else {
        vec![util::resolve_version(&session.store, &ctx, id, version)?]
    };

    let mut failed = 0;
    for version in &versions {
        match session.store.verify_document_version(&ctx, id, *version) {
            Ok(info) => println!(
                "{} {} ({} files)",
                "ok".green(),
                version,
                info.files.len()
            ),
            Err(err) if err.is_corruption() => {
                failed += 1;
                println!("{} {}: {}", "CORRUPT".red().bold(), version, err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} versions failed verification", failed, versions.len());
    }
    Ok(())
}
