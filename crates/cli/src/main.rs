//! Docver CLI - dv command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

mod cmd;
mod config;
mod diff_utils;
mod util;

/// Docver - versioned document store with checkout workspaces
#[derive(Parser)]
#[command(name = "dv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/docver/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store directory, overrides [store] root
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Acting user UUID, overrides [user] id
    #[arg(long, global = true)]
    user: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document from local files
    Create {
        /// Owning company UUID
        #[arg(long)]
        company: String,
        /// Document UUID (default: a new random one)
        #[arg(long)]
        id: Option<String>,
        #[arg(short, long, default_value = "")]
        reason: String,
        /// Files of the first version
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Commit a new version on top of the latest one
    Add {
        document: String,
        /// Files to write, replacing files with the same name
        files: Vec<PathBuf>,
        /// File names to remove
        #[arg(short, long)]
        delete: Vec<String>,
        /// Move the document to another company with this version
        #[arg(long)]
        company: Option<String>,
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// List committed versions of a document
    Versions { document: String },
    /// Show a version's files and changes (default: latest)
    Info {
        document: String,
        version: Option<String>,
    },
    /// Print a version's metadata as JSON (default: latest)
    Show {
        document: String,
        version: Option<String>,
    },
    /// Write a file of a version to stdout
    Cat {
        document: String,
        file: String,
        /// Version (default: latest)
        #[arg(long)]
        version: Option<String>,
    },
    /// Show changes between two versions
    Diff {
        document: String,
        /// Older version
        from: String,
        /// Newer version (default: latest)
        to: Option<String>,
        /// Show line-by-line diff (default: file list only)
        #[arg(short = 'p', long)]
        patch: bool,
        /// Number of context lines
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
    },
    /// Re-hash stored files against their metadata
    Verify {
        document: String,
        version: Option<String>,
        /// Verify every version
        #[arg(long, conflicts_with = "version")]
        all: bool,
    },
    /// Check a document out into a workspace directory
    Checkout {
        /// Document UUID; with --new, the ID for the new document
        document: Option<String>,
        /// Create a new document with an empty workspace
        #[arg(long, requires = "company")]
        new: bool,
        /// Owning company UUID for --new
        #[arg(long)]
        company: Option<String>,
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// Commit the workspace and end the checkout
    Checkin { document: String },
    /// End a checkout without committing
    Cancel { document: String },
    /// List checked out documents
    CheckedOut,
    /// Delete a document with all versions
    Delete { document: String },
    /// Delete one version of a document
    DeleteVersion { document: String, version: String },
    /// Move a document to another company
    SetCompany { document: String, company: String },
    /// Commit a new version with the files of an older one
    Restore {
        document: String,
        version: String,
        #[arg(short, long, default_value = "")]
        reason: String,
    },
    /// List documents
    List {
        /// Only documents of this company
        #[arg(long)]
        company: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

fn init_logging(level: &str, verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => level
            .parse::<LevelFilter>()
            .with_context(|| format!("Invalid log level '{}'", level))?,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, loaded_from) = config::load(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.store.root = root;
    }
    if let Some(user) = cli.user {
        config.user.id = Some(user);
    }
    config.validate()?;
    init_logging(&config.log.level, cli.verbose)?;

    if let Commands::Config = cli.command {
        return cmd::config::run(&config, loaded_from.as_deref());
    }

    let session = util::Session::open(&config.store.root, config.user.id.clone())?;
    match cli.command {
        Commands::Create { company, id, reason, files } => {
            cmd::document::create(&session, &company, id.as_deref(), &reason, &files)
        }
        Commands::Add { document, files, delete, company, reason } => {
            cmd::document::add(&session, &document, &reason, &files, &delete, company.as_deref())
        }
        Commands::Versions { document } => cmd::history::versions(&session, &document),
        Commands::Info { document, version } => {
            cmd::history::info(&session, &document, version.as_deref())
        }
        Commands::Show { document, version } => {
            cmd::history::show(&session, &document, version.as_deref())
        }
        Commands::Cat { document, file, version } => {
            cmd::history::cat(&session, &document, &file, version.as_deref())
        }
        Commands::Diff { document, from, to, patch, context } => {
            cmd::diff::run(&session, &document, &from, to.as_deref(), patch, context)
        }
        Commands::Verify { document, version, all } => {
            cmd::verify::run(&session, &document, version.as_deref(), all)
        }
        Commands::Checkout { document, new, company, reason } => {
            if new {
                let company = company.context("--new requires --company")?;
                cmd::checkout::check_out_new(&session, &company, document.as_deref(), &reason)
            } else {
                let document = document.context("Missing document ID")?;
                cmd::checkout::check_out(&session, &document, &reason)
            }
        }
        Commands::Checkin { document } => cmd::checkout::check_in(&session, &document),
        Commands::Cancel { document } => cmd::checkout::cancel(&session, &document),
        Commands::CheckedOut => cmd::checkout::list(&session),
        Commands::Delete { document } => cmd::document::delete(&session, &document),
        Commands::DeleteVersion { document, version } => {
            cmd::document::delete_version(&session, &document, &version)
        }
        Commands::SetCompany { document, company } => {
            cmd::document::set_company(&session, &document, &company)
        }
        Commands::Restore { document, version, reason } => {
            cmd::history::restore(&session, &document, &version, &reason)
        }
        Commands::List { company } => cmd::document::list(&session, company.as_deref()),
        Commands::Config => Ok(()),
    }
}
