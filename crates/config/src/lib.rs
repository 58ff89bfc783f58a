//! Configuration for litevault.
//!
//! A [`Config`] is assembled once per process from, in increasing priority:
//!
//! 1. built-in defaults,
//! 2. an optional file (`.toml`, `.yaml`/`.yml` or `.json`),
//! 3. environment variables prefixed with `LITEVAULT_`, nested keys separated
//!    by a double underscore (`LITEVAULT_PROGRESS__PAUSE_MS=0`).
//!
//! It is then passed by reference into every backup run.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use litevault_compress::Compression;
use litevault_snapshot::Strategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "LITEVAULT_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The live database to back up.
    pub source: PathBuf,
    /// Root under which the backup layout is created.
    pub backup_dir: PathBuf,
    /// Where incremental runs place their temporary snapshot.
    pub temp_dir: PathBuf,
    /// Overrides the machine's host name in the backup layout.
    pub host_name: Option<String>,
    pub layout: Layout,
    pub full: FullConfig,
    pub incremental: IncrementalConfig,
    pub progress: ProgressConfig,
}

/// Which optional directories are inserted between the backup root and the
/// `full backups`/`incremental backups` folder. Their order is fixed: year,
/// then host name, then database name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub include_year: bool,
    pub include_host_name: bool,
    pub include_database_name: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullConfig {
    /// Format used when a full backup asks for compression without naming one.
    pub compression: Compression,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalConfig {
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Number of progress lines between the start and finish lines.
    pub steps: u32,
    /// Pause before each progress line, in milliseconds.
    pub pause_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            backup_dir: PathBuf::new(),
            temp_dir: std::env::temp_dir().join("litevault").join("incremental"),
            host_name: None,
            layout: Layout::default(),
            full: FullConfig::default(),
            incremental: IncrementalConfig::default(),
            progress: ProgressConfig::default(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            include_year: true,
            include_host_name: true,
            include_database_name: true,
        }
    }
}

impl Default for FullConfig {
    fn default() -> Self {
        Self {
            compression: Compression::Lz4,
            strategy: Strategy::VacuumInto,
        }
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::OnlineBackup,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self { steps: 10, pause_ms: 200 }
    }
}

impl ProgressConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Config {
    /// `config.toml` in the platform's configuration directory, if one can be
    /// determined for the current user.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "litevault").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load and validate configuration.
    ///
    /// An explicit `path` must exist. Without one, the [default
    /// path](Self::default_path) is used only if a file is present there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };
        let config: Self = Self::figment(file.as_deref())?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(file = ?file, "configuration loaded");
        Ok(config)
    }

    /// The layered provider, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            let extension = file.extension().and_then(|e| e.to_str()).unwrap_or_default();
            figment = match extension.to_lowercase().as_str() {
                "toml" => figment.merge(Toml::file_exact(file)),
                "yaml" | "yml" => figment.merge(Yaml::file_exact(file)),
                "json" => figment.merge(Json::file_exact(file)),
                _ => exn::bail!(ErrorKind::UnsupportedFile(file.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("source"));
        }
        if self.backup_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("backup_dir"));
        }
        if self.temp_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("temp_dir"));
        }
        if self.progress.steps == 0 {
            exn::bail!(ErrorKind::Invalid("progress.steps"));
        }
        Ok(())
    }
}
