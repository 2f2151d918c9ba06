//! Plugins shipped with the dashboard.

pub mod aggregations;
pub mod csv;
pub mod export;
pub mod json;
pub mod widgets;

use super::Plugin;

/// Every built-in plugin, in registration order.
#[must_use]
pub fn all() -> Vec<Plugin> {
    vec![
        csv::plugin(),
        json::plugin(),
        aggregations::plugin(),
        export::json_plugin(),
        export::csv_plugin(),
        widgets::plugin(),
    ]
}
