// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "RPCDECK_LOG";
const LOG_FILE_NAME: &str = "rpcdeck.log";

/// Routes tracing output to a file under `dir` so the terminal UI is never written over.
pub fn init(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create log directory {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow::anyhow!("install log subscriber: {error}"))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{LOG_FILE_NAME, init};

    #[test]
    fn log_file_is_created_in_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path().join("nested").join("rpcdeck");
        let path = init(&dir)?;
        assert_eq!(path, dir.join(LOG_FILE_NAME));
        assert!(path.exists());

        // only one global subscriber per process
        assert!(init(&dir).is_err());
        Ok(())
    }
}
