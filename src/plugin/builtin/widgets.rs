//! Dashboard widget descriptors.
//!
//! Describes the KPI cards and charts of the overview page so a front end can
//! render them from data-source ids and processor names.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::plugin::{Capability, Plugin};

pub const PLUGIN_ID: &str = "dashboard-widgets";

#[must_use]
pub fn plugin() -> Plugin {
    let components: BTreeMap<String, Value> = [
        (
            "accountsKpi",
            json!({
                "kind": "kpi",
                "title": "Privileged Accounts",
                "source": "accounts",
                "metric": "rowCount",
            }),
        ),
        (
            "platformBreakdown",
            json!({
                "kind": "pie",
                "title": "Accounts by Platform",
                "source": "accounts",
                "processor": {"plugin": "aggregations", "name": "countBy", "options": {"field": "platformId"}},
            }),
        ),
        (
            "safeSizes",
            json!({
                "kind": "bar",
                "title": "Accounts per Safe",
                "source": "accounts",
                "processor": {"plugin": "aggregations", "name": "countBy", "options": {"field": "safeName"}},
            }),
        ),
        (
            "systemHealth",
            json!({
                "kind": "status",
                "title": "Component Health",
                "source": "systemHealth",
            }),
        ),
    ]
    .into_iter()
    .map(|(name, descriptor)| (name.to_string(), descriptor))
    .collect();

    Plugin::new(
        PLUGIN_ID,
        "Dashboard Widgets",
        env!("CARGO_PKG_VERSION"),
        Capability::UiComponent(components),
    )
}
