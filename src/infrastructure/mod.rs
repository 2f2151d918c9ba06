//! Infrastructure layer for filesystem interactions.

pub mod paths;

pub use paths::{expand_tilde, resolve_path};
