//! Configuration loading and validation for the listener host.
//!
//! Host settings come from environment variables. Endpoint declarations come
//! from an optional settings file, overridable through `SERVER__...`
//! variables (e.g. `SERVER__ENDPOINTS__DEMO__URL`).

use std::path::{Path, PathBuf};

use address_binder::ConfigSection;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix of environment variables that override the settings file.
const SERVER_ENV_PREFIX: &str = "SERVER";

/// Validated listener-host configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Hosting addresses, `;`-separated (e.g. `"http://*:80;https://*:443"`).
    #[serde(default)]
    pub urls: String,

    /// Let `URLS` override endpoints configured in code.
    #[serde(default)]
    pub prefer_hosting_urls: bool,

    /// JSON or TOML file holding the `Endpoints` section.
    #[serde(default)]
    pub settings_file: Option<String>,

    /// Directory of development certificates (`<name>.crt` + `<name>.key`).
    #[serde(default)]
    pub dev_cert_dir: Option<String>,

    /// Tracing log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build listener-host configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise listener-host configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        if self.settings_file.as_deref().is_some_and(|f| f.trim().is_empty()) {
            anyhow::bail!("SETTINGS_FILE must not be empty when set");
        }
        Ok(())
    }

    /// Hosting addresses from `URLS`, blanks dropped.
    pub fn addresses(&self) -> Vec<String> {
        self.urls
            .split(';')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Development certificate directory, defaulting to `~/.dev-certs/https`.
    pub fn dev_cert_dir(&self) -> PathBuf {
        match &self.dev_cert_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".dev-certs")
                .join("https"),
        }
    }

    /// Server settings: the settings file (if any) with `SERVER__` overrides.
    ///
    /// The file is parsed directly so endpoint names keep their declared
    /// casing. Environment overrides match those names case-insensitively.
    pub fn server_settings(&self) -> Result<ConfigSection> {
        let mut settings = match &self.settings_file {
            Some(file) => ConfigSection::from_file(Path::new(file))
                .with_context(|| format!("failed to load server settings from {file}"))?,
            None => ConfigSection::default(),
        };

        let overrides = config::Config::builder()
            .add_source(config::Environment::with_prefix(SERVER_ENV_PREFIX).separator("__"))
            .build()
            .context("failed to read SERVER__ environment overrides")?;
        settings.merge(
            ConfigSection::from_config(&overrides)
                .context("failed to read SERVER__ environment overrides")?,
        );

        Ok(settings)
    }
}
