//! Scratch environment for running `dv` against a fresh store

use super::cli::DvCommand;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const USER: &str = "5f0c8a2e-3b1d-4c6e-9a7f-2d4b6c8e0a1f";
pub const OTHER_USER: &str = "a7e3c1f9-5d2b-4086-b4e2-9c1a3f5d7b0e";
pub const COMPANY: &str = "1c9e7a5b-3f1d-4b2c-8e6a-0d4f2b8c6a3e";
pub const OTHER_COMPANY: &str = "e4b2d6f8-0a1c-4e3d-a5b7-c9d1e3f5a7b9";

/// Temp dir holding the store, the input files, and an empty config home
pub struct TestEnv {
    temp: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        fs::create_dir_all(temp.path().join("input")).expect("create input dir");
        fs::create_dir_all(temp.path().join("config-home")).expect("create config home");
        Self { temp }
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn store_root(&self) -> PathBuf {
        self.temp.path().join("store")
    }

    /// `dv` bound to this store and acting as [`USER`]
    pub fn dv(&self, args: &[&str]) -> DvCommand {
        let mut cmd = self.dv_anonymous(args);
        cmd.args(&["--user", USER]);
        cmd
    }

    /// `dv` bound to this store without a user
    pub fn dv_anonymous(&self, args: &[&str]) -> DvCommand {
        let config_home = self.temp.path().join("config-home");
        let mut cmd = DvCommand::new(self.temp.path());
        cmd.env("XDG_CONFIG_HOME", config_home.to_string_lossy())
            .env("HOME", config_home.to_string_lossy())
            .args(args)
            .arg("--root")
            .arg(self.store_root().to_string_lossy());
        cmd
    }

    /// Write an input file and return its path
    pub fn write_input(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp.path().join("input").join(name);
        fs::write(&path, content).expect("write input file");
        path
    }

    /// Create a document from input files and return its ID
    pub fn create_document(&self, files: &[(&str, &str)]) -> String {
        let paths: Vec<String> = files
            .iter()
            .map(|(name, content)| self.write_input(name, content).to_string_lossy().into_owned())
            .collect();
        let mut args = vec!["create", "--company", COMPANY];
        args.extend(paths.iter().map(String::as_str));
        let result = self.dv(&args).assert_success().expect("create document");
        result.parse_uuid().expect("document id in output")
    }
}
