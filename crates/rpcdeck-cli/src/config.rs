// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use rpcdeck_grpc::{ConnectOptions, DEFAULT_CONNECT_TIMEOUT};
use rpcdeck_tui::{KeyBinding, KeyMap};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
pub const CONFIG_PATH_ENV: &str = "RPCDECK_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub keys: Keys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            connection: Connection::default(),
            ui: Ui::default(),
            keys: Keys::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Connection {
    pub connect_timeout: Option<String>,
    pub keepalive: Option<String>,
    pub max_message_size: Option<i64>,
    pub insecure: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub remember_payloads: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            remember_payloads: Some(true),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keys {
    pub send: Option<String>,
    pub format: Option<String>,
    pub toggle_description: Option<String>,
    pub resend: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join("rpcdeck").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = {CONFIG_VERSION}` at the top",
                    path.display()
                )
            })?;
        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {version} in {}; expected version = {CONFIG_VERSION}",
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.connect_timeout()?;
        self.keepalive()?;
        self.max_message_size()?;
        self.keymap()?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Result<Duration> {
        match &self.connection.connect_timeout {
            Some(raw) => positive_duration("connection.connect_timeout", raw),
            None => Ok(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    pub fn keepalive(&self) -> Result<Option<Duration>> {
        self.connection
            .keepalive
            .as_deref()
            .map(|raw| positive_duration("connection.keepalive", raw))
            .transpose()
    }

    pub fn max_message_size(&self) -> Result<Option<usize>> {
        let Some(size) = self.connection.max_message_size else {
            return Ok(None);
        };
        if size <= 0 {
            bail!("connection.max_message_size must be positive, got {size}");
        }
        let size = usize::try_from(size)
            .with_context(|| format!("connection.max_message_size {size} is too large"))?;
        Ok(Some(size))
    }

    pub fn insecure(&self) -> bool {
        self.connection.insecure.unwrap_or(false)
    }

    pub fn remember_payloads(&self) -> bool {
        self.ui.remember_payloads.unwrap_or(true)
    }

    pub fn keymap(&self) -> Result<KeyMap> {
        let mut keys = KeyMap::default();
        let overrides = [
            ("keys.send", &self.keys.send, &mut keys.send),
            ("keys.format", &self.keys.format, &mut keys.format),
            (
                "keys.toggle_description",
                &self.keys.toggle_description,
                &mut keys.toggle_description,
            ),
            ("keys.resend", &self.keys.resend, &mut keys.resend),
        ];
        for (name, raw, slot) in overrides {
            if let Some(raw) = raw {
                *slot = KeyBinding::parse(raw).with_context(|| format!("{name} = {raw:?}"))?;
            }
        }
        Ok(keys)
    }

    /// Connection settings from the file, with CLI overrides applied on top.
    pub fn connect_options(
        &self,
        insecure: bool,
        connect_timeout: Option<Duration>,
    ) -> Result<ConnectOptions> {
        Ok(ConnectOptions {
            connect_timeout: match connect_timeout {
                Some(timeout) => timeout,
                None => self.connect_timeout()?,
            },
            keepalive: self.keepalive()?,
            max_message_size: self.max_message_size()?,
            insecure: insecure || self.insecure(),
        })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# rpcdeck config\n# Place this file at: {}\n\nversion = {CONFIG_VERSION}\n\n[connection]\n# <N>ms, <N>s or <N>m\nconnect_timeout = \"10s\"\n# keepalive = \"30s\"\n# Largest message accepted or sent, in bytes.\n# max_message_size = 4194304\n# Plaintext HTTP/2 instead of TLS.\ninsecure = false\n\n[ui]\n# Reopen each method with the payload last sent to it.\nremember_payloads = true\n\n[keys]\nsend = \"ctrl+s\"\nformat = \"ctrl+f\"\ntoggle_description = \"tab\"\nresend = \"ctrl+r\"\n",
            path.display(),
        )
    }
}

pub fn positive_duration(name: &str, raw: &str) -> Result<Duration> {
    let parsed = parse_duration(raw)?;
    if parsed.is_zero() {
        bail!("{name} must be positive, got {raw}");
    }
    Ok(parsed)
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use rpcdeck_tui::{KeyBinding, KeyMap};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.connect_timeout()?, Duration::from_secs(10));
        assert_eq!(config.keepalive()?, None);
        assert!(config.remember_payloads());
        assert!(!config.insecure());
        assert_eq!(config.keymap()?, KeyMap::default());
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[connection]\nconnect_timeout = \"2s\"\nkeepalive = \"30s\"\nmax_message_size = 1024\ninsecure = true\n[ui]\nremember_payloads = false\n[keys]\nsend = \"f5\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.connect_timeout()?, Duration::from_secs(2));
        assert_eq!(config.keepalive()?, Some(Duration::from_secs(30)));
        assert_eq!(config.max_message_size()?, Some(1024));
        assert!(config.insecure());
        assert!(!config.remember_payloads());
        assert_eq!(config.keymap()?.send, KeyBinding::parse("f5")?);
        assert_eq!(config.keymap()?.resend, KeyBinding::ctrl('r'));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nremember_payloads = false\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        assert!(error.to_string().contains("version = 1"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 7\n")?;
        let error = Config::load(&path).expect_err("v7 config should fail");
        assert!(error.to_string().contains("unsupported config version 7"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn non_positive_values_are_rejected() -> Result<()> {
        for body in [
            "[connection]\nconnect_timeout = \"0s\"\n",
            "[connection]\nkeepalive = \"0ms\"\n",
            "[connection]\nmax_message_size = 0\n",
        ] {
            let (_temp, path) = write_config(&format!("version = 1\n{body}"))?;
            let error = Config::load(&path).expect_err("non-positive value should fail");
            assert!(
                format!("{error:#}").contains("must be positive"),
                "unexpected message: {error:#}"
            );
        }
        Ok(())
    }

    #[test]
    fn bad_key_chord_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[keys]\nresend = \"hyper+r\"\n")?;
        let error = Config::load(&path).expect_err("bad chord should fail");
        assert!(format!("{error:#}").contains("keys.resend"), "{error:#}");
        Ok(())
    }

    #[test]
    fn cli_flags_override_file_values() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[connection]\nconnect_timeout = \"2s\"\n")?;
        let config = Config::load(&path)?;

        let options = config.connect_options(false, None)?;
        assert_eq!(options.connect_timeout, Duration::from_secs(2));
        assert!(!options.insecure);

        let options = config.connect_options(true, Some(Duration::from_millis(250)))?;
        assert_eq!(options.connect_timeout, Duration::from_millis(250));
        assert!(options.insecure);
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        assert!(parse_duration("5h").is_err());
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.keymap()?, KeyMap::default());
        assert!(config.remember_payloads());
        Ok(())
    }
}
