//! Error types for the dashboard core.
//!
//! This module defines the centralized error type [`DashboardError`] and a type alias
//! [`Result`] used throughout the crate. Registry and store operations that the
//! dashboard treats as "log and continue" never surface these errors; they are
//! returned by data loading, plugin capabilities, and configuration parsing.

use thiserror::Error;

/// The main error type for dashboard operations.
///
/// # Examples
///
/// ```
/// use pamdash::DashboardError;
///
/// fn lookup(id: &str) -> Result<(), DashboardError> {
///     Err(DashboardError::SourceNotFound(id.to_string()))
/// }
///
/// assert_eq!(
///     lookup("accounts").unwrap_err().to_string(),
///     "Data source not found: accounts"
/// );
/// ```
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A plugin failed structural validation at registration time.
    #[error("Invalid plugin '{plugin_id}': {reason}")]
    PluginValidation {
        /// Identifier of the rejected plugin (may be empty).
        plugin_id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A plugin with the same identifier is already registered.
    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),

    /// No plugin is registered under the given identifier.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// A plugin's `initialize` or `cleanup` step failed.
    #[error("Plugin '{plugin_id}' lifecycle failure: {message}")]
    Lifecycle {
        /// Plugin whose lifecycle step failed.
        plugin_id: String,
        /// Failure description.
        message: String,
    },

    /// A hook function returned an error.
    #[error("Hook '{hook}' failed in plugin '{plugin_id}': {message}")]
    Hook {
        /// Hook name, e.g. `onDataLoad`.
        hook: String,
        /// Plugin whose hook failed.
        plugin_id: String,
        /// Failure description.
        message: String,
    },

    /// The data source is not registered in the store.
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    /// No enabled data-source plugin matches the source's plugin id or type.
    #[error("No data source plugin found for: {0}")]
    NoPluginForSource(String),

    /// A data-source plugin returned nothing.
    #[error("Plugin '{0}' returned no data")]
    EmptyLoadResult(String),

    /// A data-source plugin failed while loading.
    #[error("Load error: {0}")]
    Load(String),

    /// A processor or exporter capability failed.
    #[error("Capability error: {0}")]
    Capability(String),

    /// The plugin exists but does not provide the requested capability.
    #[error("Plugin '{plugin_id}' does not provide {capability}")]
    MissingCapability {
        /// Plugin that was asked.
        plugin_id: String,
        /// Capability that was requested.
        capability: String,
    },

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV input could not be read or rows could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A specialized `Result` type for dashboard operations.
pub type Result<T> = std::result::Result<T, DashboardError>;
