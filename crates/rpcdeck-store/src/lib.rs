// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use rpcdeck_app::PayloadHistory;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const APP_NAME: &str = "rpcdeck";

#[derive(Debug, Default)]
struct Entries {
    payloads: BTreeMap<String, String>,
    dirty: bool,
}

/// Last payload sent to each method of one target, persisted as a JSON object.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl Store {
    /// Opens the cache file for `target` under the user cache directory.
    pub fn open(target: &str) -> Result<Self> {
        let dir = payload_cache_dir()?;
        Ok(Self::load(dir.join(cache_file_name(target))))
    }

    /// Loads `path`, starting empty when it is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let payloads = match read_payloads(&path) {
            Ok(payloads) => payloads,
            Err(error) => {
                tracing::warn!(path = %path.display(), "ignoring payload cache: {error:#}");
                BTreeMap::new()
            }
        };
        tracing::debug!(path = %path.display(), entries = payloads.len(), "payload cache loaded");
        Self {
            path,
            entries: RwLock::new(Entries {
                payloads,
                dirty: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, method: &str) -> Option<String> {
        self.read().payloads.get(method).cloned()
    }

    pub fn set(&self, method: &str, payload: &str) {
        let mut entries = self.write();
        let previous = entries
            .payloads
            .insert(method.to_owned(), payload.to_owned());
        if previous.as_deref() != Some(payload) {
            entries.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.read().payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the cache back to disk if anything changed since the last flush.
    pub fn flush(&self) -> Result<()> {
        let mut entries = self.write();
        if !entries.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create cache directory {}", parent.display()))?;
        }
        let encoded =
            serde_json::to_string_pretty(&entries.payloads).context("encode payload cache")?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, encoded)
            .with_context(|| format!("write payload cache {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("replace payload cache {}", self.path.display()))?;
        entries.dirty = false;
        tracing::debug!(path = %self.path.display(), "payload cache flushed");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl PayloadHistory for Store {
    fn recall(&self, method: &str) -> Option<String> {
        self.get(method)
    }

    fn remember(&self, method: &str, payload: &str) {
        self.set(method, payload);
    }
}

fn read_payloads(path: &Path) -> Result<BTreeMap<String, String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(error) => {
            return Err(error).with_context(|| format!("read cache file {}", path.display()));
        }
    };
    serde_json::from_str(&raw).with_context(|| format!("decode cache file {}", path.display()))
}

/// Cache file name for `target`: its SHA-256 digest in hex.
pub fn cache_file_name(target: &str) -> String {
    format!("{}.json", checksum_sha256(target.as_bytes()))
}

pub fn payload_cache_dir() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().ok_or_else(|| {
        anyhow!("cannot resolve cache directory; set XDG_CACHE_HOME or platform equivalent")
    })?;
    let dir = cache_root.join(APP_NAME);
    fs::create_dir_all(&dir)
        .with_context(|| format!("create cache directory {}", dir.display()))?;
    Ok(dir)
}

fn checksum_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
