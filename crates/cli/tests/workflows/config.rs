//! Configuration file handling

use crate::common::fixtures::COMPANY;
use crate::common::TestEnv;
use anyhow::Result;
use std::fs;

#[test]
fn test_defaults_without_config_file() -> Result<()> {
    let env = TestEnv::new();
    let result = env.dv_anonymous(&["config"]).assert_success()?;
    assert!(result.contains_stdout("not found, using defaults"));
    assert!(result.contains_stdout("backend = \"local\""));
    assert!(result.contains_stdout("level = \"info\""));
    Ok(())
}

#[test]
fn test_config_file_supplies_user_and_root() -> Result<()> {
    let env = TestEnv::new();
    let root = env.path().join("configured-store");
    let config = env.path().join("dv.toml");
    fs::write(
        &config,
        format!(
            "[store]\nroot = {:?}\n\n[log]\nlevel = \"warn\"\n\n[user]\nid = \"{}\"\n",
            root.to_string_lossy(),
            crate::common::fixtures::USER
        ),
    )?;
    let file = env.write_input("a.txt", "a");

    // no --root and no --user on this command line
    let mut cmd = crate::common::DvCommand::new(env.path());
    cmd.env("XDG_CONFIG_HOME", env.path().join("config-home").to_string_lossy())
        .args(&["--config", &config.to_string_lossy(), "create", "--company", COMPANY])
        .arg(file.to_string_lossy());
    cmd.assert_success()?;
    assert!(root.join("documents").is_dir());

    let shown = crate::common::DvCommand::new(env.path())
        .args(&["--config", &config.to_string_lossy(), "config"])
        .assert_success()?;
    assert!(shown.contains_stdout("level = \"warn\""));
    Ok(())
}

#[test]
fn test_config_in_default_location_is_read() -> Result<()> {
    let env = TestEnv::new();
    let dir = env.path().join("config-home").join("docver");
    fs::create_dir_all(&dir)?;
    fs::write(dir.join("config.toml"), "[log]\nlevel = \"error\"\n")?;

    let result = env.dv_anonymous(&["config"]).assert_success()?;
    assert!(result.contains_stdout("level = \"error\""));
    assert!(result.contains_stdout("config.toml"));
    Ok(())
}

#[test]
fn test_bad_config_is_rejected() -> Result<()> {
    let env = TestEnv::new();
    let config = env.path().join("bad.toml");

    fs::write(&config, "[store]\nbackend = \"s3\"\n")?;
    let result = env
        .dv_anonymous(&["--config", &config.to_string_lossy(), "list"])
        .assert_failure()?;
    assert!(result.contains_stderr("Unsupported store backend"));

    let missing = env.path().join("absent.toml");
    env.dv_anonymous(&["--config", &missing.to_string_lossy(), "list"])
        .assert_failure()?;
    Ok(())
}
