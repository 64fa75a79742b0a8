//! Print the effective configuration

use crate::config::{self, Config};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(config: &Config, loaded_from: Option<&Path>) -> Result<()> {
    println!("{}", "Effective Configuration".bold());
    match loaded_from {
        Some(path) => println!("{}: {}\n", "Location".dimmed(), path.display()),
        None => {
            let default = config::default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory)".to_string());
            println!(
                "{}: {} {}\n",
                "Location".dimmed(),
                default,
                "(not found, using defaults)".dimmed()
            );
        }
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
