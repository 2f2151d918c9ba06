//! pamdash: the data core of a privileged-access-management analytics
//! dashboard.
//!
//! pamdash provides:
//! - A plugin registry for data-source loaders, data processors, exporters and
//!   UI component descriptors, with lifecycle management and hook dispatch
//! - A module-based state store: features register a reducer and an initial
//!   slice, and every dispatch produces a new immutable snapshot
//! - A data-source module that loads datasets through plugins, validates them
//!   and tracks whether they are in sync with their configuration
//! - Memoization helpers and performance telemetry for the dashboard views

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  CLI (main.rs)                                      │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Context (context)                      │  ← Owns everything
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Plugins       │   │ Store         │   │ Data Sources  │
//! │ (plugin/)     │   │ (store/)      │   │ (datasource/) │
//! │ - Registry    │   │ - Modules     │   │ - Load        │
//! │ - Hooks       │   │ - Dispatch    │   │ - Validate    │
//! │ - Built-ins   │   │ - app module  │   │ - Sync status │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │                    │                    │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain & Infrastructure                            │
//! │  - Error types, data source model (domain/)         │
//! │  - Config-relative paths (infrastructure/)          │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/), memo               │
//! │  - tracing subscriber, rotating log file            │
//! │  - render/API/load timings                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Control Flow
//!
//! 1. The caller asks the data-source module to load a source
//! 2. The module resolves the source's plugin in the registry
//! 3. The plugin's loader returns rows
//! 4. The reducer stores them; subscribers observe the new snapshot
//!
//! # Configuration
//!
//! ```toml
//! trace_level = "debug"
//! log_file = "logs/pamdash.log"
//! theme = "dark"
//!
//! [performance]
//! slow_load_ms = 2000
//!
//! [[sources]]
//! id = "accounts"
//! plugin_id = "csv"
//! data = { path = "data/accounts.csv" }
//! config = { inferTypes = true, requiredFields = ["userName", "safeName"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> pamdash::Result<()> {
//! use pamdash::{AppContext, Config};
//!
//! let config = Config::from_toml_str(r#"
//!     [[sources]]
//!     id = "safes"
//!     plugin_id = "csv"
//!     data = { text = "safeName,members\nBackups,3\n" }
//! "#)?;
//!
//! let mut context = AppContext::new(config);
//! context.initialize();
//! let loaded = context.load_source("safes", &serde_json::Value::Null).await?;
//! assert_eq!(loaded.metadata.row_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod datasource;
pub mod domain;
pub mod infrastructure;
pub mod memo;
pub mod plugin;
pub mod store;

pub mod observability;

pub use context::{AppContext, DashboardSummary, LoadSummary, SourceSummary};
pub use domain::{DashboardError, DataSource, LoadedData, Result, SourceMetadata, SyncStatus, ValidationResult};
pub use plugin::{Capability, HookName, Plugin, PluginRegistry, PluginType};
pub use store::{Action, Store};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use observability::PerformanceThresholds;

/// A data source declared in the configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default, rename = "type")]
    pub source_type: Option<String>,
    /// Plugin input: a file path, `{ path = ... }`, `{ text = ... }`, ...
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl SourceConfig {
    /// Builds the data source, resolving file paths in `data` against
    /// `base_dir`.
    #[must_use]
    pub fn to_source(&self, base_dir: Option<&Path>) -> DataSource {
        let resolve = |path: &str| {
            Value::String(
                infrastructure::resolve_path(path, base_dir)
                    .to_string_lossy()
                    .into_owned(),
            )
        };

        let data = match &self.data {
            Value::String(path) => resolve(path),
            Value::Object(input) => {
                let mut input = input.clone();
                if let Some(Value::String(path)) = input.get("path") {
                    let resolved = resolve(path);
                    input.insert("path".to_string(), resolved);
                }
                Value::Object(input)
            }
            other => other.clone(),
        };

        DataSource {
            id: self.id.clone(),
            plugin_id: self.plugin_id.clone(),
            source_type: self.source_type.clone(),
            data,
            config: self.config.clone(),
            created_at: None,
        }
    }
}

/// Dashboard configuration, usually loaded from a TOML file.
///
/// # Example
///
/// ```toml
/// trace_level = "debug"
/// theme = "dark"
///
/// [[sources]]
/// id = "accounts"
/// plugin_id = "csv"
/// data = "accounts.csv"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracing level filter.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`, or any `EnvFilter`
    /// directive. Default: `"info"`
    pub trace_level: Option<String>,

    /// Log file; stderr when unset.
    ///
    /// Relative paths are resolved against the configuration file's directory.
    pub log_file: Option<PathBuf>,

    /// Initial theme of the `app` module. Default: `"light"`
    pub theme: String,

    /// Slow-operation thresholds for performance telemetry.
    pub performance: PerformanceThresholds,

    /// Data sources registered at startup.
    pub sources: Vec<SourceConfig>,

    /// Directory of the configuration file, set by [`Config::from_file`].
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace_level: None,
            log_file: None,
            theme: store::app::DEFAULT_THEME.to_string(),
            performance: PerformanceThresholds::default(),
            sources: Vec::new(),
            base_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid TOML, or declares
    /// invalid sources.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        if let Some(log_file) = config.log_file.take() {
            config.log_file = Some(infrastructure::resolve_path(
                &log_file.to_string_lossy(),
                base_dir.as_deref(),
            ));
        }
        config.base_dir = base_dir;

        tracing::debug!(path = %path.display(), sources = config.sources.len(), "configuration loaded");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Fails on invalid TOML, a source without an id, or a duplicate source
    /// id.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(DashboardError::Config("source id must not be empty".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(DashboardError::Config(format!("duplicate source id: {}", source.id)));
            }
        }
        Ok(())
    }

    /// Builds a configuration from flat string settings, e.g. environment
    /// or command-line overrides.
    ///
    /// # Parsing Rules
    ///
    /// - `trace_level`, `theme`: taken as-is
    /// - `log_file`: path with `~` expansion
    /// - `slow_render_ms`, `slow_api_ms`, `slow_load_ms`: `u64` (falls back to
    ///   the default threshold on parse error)
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use pamdash::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("theme".to_string(), "dark".to_string());
    /// map.insert("slow_load_ms".to_string(), "500".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.theme, "dark");
    /// assert_eq!(config.performance.slow_load_ms, 500);
    /// ```
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        let defaults = PerformanceThresholds::default();
        let threshold = |key: &str, fallback: u64| {
            config
                .get(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(fallback)
        };

        Self {
            trace_level: config.get("trace_level").cloned(),
            log_file: config
                .get("log_file")
                .filter(|s| !s.is_empty())
                .map(|s| infrastructure::expand_tilde(s)),
            theme: config
                .get("theme")
                .filter(|s| !s.is_empty())
                .cloned()
                .unwrap_or_else(|| store::app::DEFAULT_THEME.to_string()),
            performance: PerformanceThresholds {
                slow_render_ms: threshold("slow_render_ms", defaults.slow_render_ms),
                slow_api_ms: threshold("slow_api_ms", defaults.slow_api_ms),
                slow_load_ms: threshold("slow_load_ms", defaults.slow_load_ms),
            },
            sources: Vec::new(),
            base_dir: None,
        }
    }

    /// Configured sources as data sources, paths resolved.
    #[must_use]
    pub fn data_sources(&self) -> Vec<DataSource> {
        self.sources
            .iter()
            .map(|source| source.to_source(self.base_dir.as_deref()))
            .collect()
    }
}

/// Builds the application context for `config`.
///
/// Equivalent to [`AppContext::new`]; kept as the library's front door.
#[must_use]
pub fn initialize(config: Config) -> AppContext {
    tracing::debug!("initializing dashboard context");
    AppContext::new(config)
}
