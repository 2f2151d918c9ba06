//! Domain layer for the dashboard core.
//!
//! Core types shared by the plugin registry, the store and the data-source
//! module, independent of how they are wired together.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`source`]: Data source model, per-source bookkeeping and load-result
//!   normalization
//!
//! # Examples
//!
//! ```
//! use pamdash::domain::{DataSource, Result};
//!
//! fn accounts_source() -> Result<DataSource> {
//!     Ok(DataSource::new("accounts", "csv"))
//! }
//! ```

pub mod error;
pub mod source;

pub use error::{DashboardError, Result};
pub use source::{
    merge_json, normalize_load_result, DataSource, LoadedData, SourceMetadata, SyncStatus,
    ValidationResult,
};
