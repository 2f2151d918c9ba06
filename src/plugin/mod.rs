//! Plugin layer: capability model, registry and built-in plugins.
//!
//! # Modules
//!
//! - [`types`]: [`Plugin`], [`Capability`], hooks and lifecycle closures
//! - [`registry`]: [`PluginRegistry`] with lifecycle and hook dispatch
//! - [`builtin`]: CSV/JSON loaders, aggregation processors, exporters and
//!   dashboard widget descriptors
//!
//! # Example
//!
//! ```
//! use pamdash::plugin::{loader_fn, Plugin, PluginRegistry};
//! use serde_json::json;
//!
//! let mut registry = PluginRegistry::new();
//! let csv = Plugin::data_source("csv1", "CSV", "1.0", loader_fn(|_, _| async {
//!     Ok(json!([{"a": 1}]))
//! }));
//! assert!(registry.register_plugin(csv));
//! assert!(registry.enable_plugin("csv1"));
//! ```

pub mod builtin;
pub mod registry;
pub mod types;

pub use registry::{HookOutcome, PluginRegistry};
pub use types::{
    loader_fn, Capability, DataLoader, Exporter, HookFn, HookName, LifecycleFn, Plugin, PluginInfo,
    PluginType, ProcessorFn,
};
