//! Data-source module.
//!
//! Registers the `dataSources` slice into the [`Store`](crate::store::Store)
//! and provides the operations that load data through data-source plugins,
//! validate it, and track whether stored rows still match the source config.
//!
//! # Flow
//!
//! 1. [`add_source`] registers a source (initially `dirty`)
//! 2. [`load_data`] resolves the source's plugin in the
//!    [`PluginRegistry`](crate::plugin::PluginRegistry), awaits its loader and
//!    stores the normalized rows (`synced`)
//! 3. [`validate_source`] checks the stored rows
//! 4. [`update_source`] merges new config and marks the source `dirty` again

pub mod actions;
pub mod reducer;
pub mod thunks;

pub use actions::DataSourceAction;
pub use reducer::{module, DataSourceState, MODULE_NAME};
pub use thunks::{
    add_source, load_data, remove_source, set_dirty, set_synced, update_source, validate_source,
};
