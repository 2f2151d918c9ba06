mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pamdash::plugin::builtin;
use pamdash::plugin::{Capability, HookName, Plugin, PluginRegistry, PluginType};
use pamdash::DashboardError;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{fixed_loader, Captured};

// ── Registration ─────────────────────────────────────────────────

#[test]
fn duplicate_id_keeps_the_original_plugin() {
    let mut registry = PluginRegistry::new();
    assert!(registry.register_plugin(fixed_loader("csv1", json!([]))));

    let impostor = Plugin::data_source(
        "csv1",
        "Impostor",
        "9.9.9",
        pamdash::plugin::loader_fn(|_, _| async { Ok(json!([])) }),
    );
    assert!(!registry.register_plugin(impostor));

    let plugin = registry.get_plugin("csv1").unwrap();
    assert_eq!(plugin.name(), "csv1 loader");
    assert_eq!(plugin.version(), "1.0.0");
    assert_eq!(registry.len(), 1);
}

#[test]
fn registered_plugins_start_uninitialized_and_keep_enabled_flag() {
    let mut registry = PluginRegistry::new();
    registry.register_plugin(fixed_loader("on", json!([])));
    registry.register_plugin(fixed_loader("off", json!([])).disabled());

    assert!(registry.get_plugin("on").unwrap().is_enabled());
    assert!(!registry.get_plugin("off").unwrap().is_enabled());
    assert!(registry.iter().all(|p| !p.is_initialized()));

    let enabled: Vec<&str> = registry.get_enabled_plugins().iter().map(|p| p.id()).collect();
    assert_eq!(enabled, vec!["on"]);
}

#[test]
fn plugin_ids_with_whitespace_are_rejected() {
    let mut registry = PluginRegistry::new();
    assert!(!registry.register_plugin(fixed_loader("csv one", json!([]))));
    assert!(registry.is_empty());
}

#[test]
fn lookups_by_type_follow_registration_order() {
    let mut registry = PluginRegistry::new();
    for plugin in builtin::all() {
        assert!(registry.register_plugin(plugin));
    }

    let loaders: Vec<&str> = registry
        .get_plugins_by_type(PluginType::DataSource)
        .iter()
        .map(|p| p.id())
        .collect();
    assert_eq!(loaders, vec!["csv", "json"]);

    let exporters: Vec<&str> = registry
        .get_plugins_by_type(PluginType::Export)
        .iter()
        .map(|p| p.id())
        .collect();
    assert_eq!(exporters, vec!["json-export", "csv-export"]);
}

// ── Lifecycle ────────────────────────────────────────────────────

#[test]
fn initialize_disables_failing_plugins_and_continues() {
    let mut registry = PluginRegistry::new();
    let healthy_runs = Arc::new(AtomicUsize::new(0));
    let runs = Arc::clone(&healthy_runs);

    registry.register_plugin(
        fixed_loader("broken", json!([])).with_initialize(|| Err(DashboardError::Load("vault offline".into()))),
    );
    registry.register_plugin(fixed_loader("healthy", json!([])).with_initialize(move || {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    assert!(!registry.initialize());
    assert!(registry.is_initialized());

    let broken = registry.get_plugin("broken").unwrap();
    assert!(!broken.is_enabled());
    assert!(!broken.is_initialized());
    assert!(registry.get_plugin("healthy").unwrap().is_initialized());

    // repeat calls return the stored result without rerunning plugins
    assert!(!registry.initialize());
    assert_eq!(healthy_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn initialize_fires_on_init_with_plugin_count() {
    let mut registry = PluginRegistry::new();
    let seen = Captured::default();
    let sink = seen.clone();

    registry.register_plugin(fixed_loader("a", json!([])).with_hook(HookName::OnInit, move |data, _| {
        sink.push(data.clone());
        Ok(Value::Null)
    }));
    registry.register_plugin(fixed_loader("b", json!([])));

    assert!(registry.initialize());
    assert_eq!(seen.values(), vec![json!({"plugins": 2})]);
}

#[test]
fn enable_after_initialize_runs_initialize_and_rolls_back_on_failure() {
    let mut registry = PluginRegistry::new();
    registry.register_plugin(fixed_loader("late", json!([])).disabled());
    registry.register_plugin(
        fixed_loader("flaky", json!([]))
            .disabled()
            .with_initialize(|| Err(DashboardError::Load("no license".into()))),
    );
    assert!(registry.initialize());

    assert!(registry.enable_plugin("late"));
    assert!(registry.get_plugin("late").unwrap().is_initialized());

    assert!(!registry.enable_plugin("flaky"));
    assert!(!registry.get_plugin("flaky").unwrap().is_enabled());
}

#[test]
fn enable_before_initialize_defers_the_initialize_step() {
    let mut registry = PluginRegistry::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    registry.register_plugin(fixed_loader("p", json!([])).disabled().with_initialize(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    assert!(registry.enable_plugin("p"));
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    registry.initialize();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn re_enabling_an_initialized_plugin_does_not_initialize_it_again() {
    let mut registry = PluginRegistry::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    registry.register_plugin(fixed_loader("p", json!([])).with_initialize(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    assert!(registry.initialize());
    assert!(registry.disable_plugin("p"));
    assert!(registry.enable_plugin("p"));
    assert!(registry.enable_plugin("p"));

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(registry.get_plugin("p").unwrap().is_enabled());
}

#[test]
fn disable_swallows_cleanup_failures() {
    let mut registry = PluginRegistry::new();
    registry.register_plugin(
        fixed_loader("p", json!([])).with_cleanup(|| Err(DashboardError::Load("socket closed".into()))),
    );

    assert!(registry.disable_plugin("p"));
    assert!(!registry.get_plugin("p").unwrap().is_enabled());
    assert!(!registry.disable_plugin("unknown"));
}

#[test]
fn remove_runs_cleanup_and_unknown_ids_are_a_no_op() {
    let mut registry = PluginRegistry::new();
    let cleaned = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&cleaned);
    registry.register_plugin(fixed_loader("p", json!([])).with_cleanup(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    assert!(!registry.remove_plugin("missing"));
    assert!(registry.remove_plugin("p"));
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    assert!(registry.get_plugin("p").is_none());
    assert!(registry.get_plugins_by_type(PluginType::DataSource).is_empty());
}

// ── Hooks ────────────────────────────────────────────────────────

#[test]
fn failing_hook_is_isolated_and_routed_to_on_error() {
    let mut registry = PluginRegistry::new();
    let errors = Captured::default();
    let sink = errors.clone();

    registry.register_plugin(
        fixed_loader("failing", json!([]))
            .with_hook(HookName::OnDataLoad, |_, _| Err(DashboardError::Load("parse error".into())))
            .with_hook(HookName::OnError, move |data, _| {
                sink.push(data.clone());
                Ok(Value::Null)
            }),
    );
    registry.register_plugin(
        fixed_loader("healthy", json!([]))
            .with_hook(HookName::OnDataLoad, |data, plugin| Ok(json!({"by": plugin.id, "rows": data["rows"]}))),
    );

    let outcomes = registry.execute_hook(HookName::OnDataLoad, &json!({"rows": 3}));
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].plugin_id, "healthy");
    assert_eq!(outcomes[0].result, json!({"by": "healthy", "rows": 3}));

    assert_eq!(
        errors.values(),
        vec![json!({
            "hook": "onDataLoad",
            "error": "Load error: parse error",
            "data": {"rows": 3},
        })]
    );
}

#[test]
fn disabled_plugins_are_skipped_by_hooks() {
    let mut registry = PluginRegistry::new();
    registry.register_plugin(fixed_loader("a", json!([])).with_hook(HookName::OnExport, |_, _| Ok(json!("a"))));
    registry.register_plugin(fixed_loader("b", json!([])).with_hook(HookName::OnExport, |_, _| Ok(json!("b"))));
    registry.disable_plugin("a");

    let outcomes = registry.execute_hook(HookName::OnExport, &Value::Null);
    let ids: Vec<&str> = outcomes.iter().map(|o| o.plugin_id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn hooks_run_in_registration_order() {
    let mut registry = PluginRegistry::new();
    for id in ["z", "a", "m"] {
        registry.register_plugin(fixed_loader(id, json!([])).with_hook(HookName::OnConfigChange, |_, p| Ok(json!(p.id))));
    }
    let results: Vec<Value> = registry
        .execute_hook(HookName::OnConfigChange, &Value::Null)
        .into_iter()
        .map(|o| o.result)
        .collect();
    assert_eq!(results, vec![json!("z"), json!("a"), json!("m")]);
}

// ── Capabilities ─────────────────────────────────────────────────

#[test]
fn processors_and_exports_fire_their_hooks() {
    let mut registry = PluginRegistry::new();
    for plugin in builtin::all() {
        registry.register_plugin(plugin);
    }
    let seen = Captured::default();
    let transform_sink = seen.clone();
    let export_sink = seen.clone();
    registry.register_plugin(
        fixed_loader("audit", json!([]))
            .with_hook(HookName::OnDataTransform, move |data, _| {
                transform_sink.push(data.clone());
                Ok(Value::Null)
            })
            .with_hook(HookName::OnExport, move |data, _| {
                export_sink.push(data.clone());
                Ok(Value::Null)
            }),
    );

    let rows = vec![json!({"platform": "WinDomain"}), json!({"platform": "WinDomain"})];
    let counts = registry
        .run_processor("aggregations", "countBy", &rows, &json!({"field": "platform"}))
        .unwrap();
    assert_eq!(counts, vec![json!({"value": "WinDomain", "count": 2})]);

    let csv = registry.export("csv-export", &rows, &Value::Null).unwrap();
    assert_eq!(csv, "platform\nWinDomain\nWinDomain\n");

    let seen = seen.values();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0]["processor"], json!("countBy"));
    assert_eq!(seen[1]["pluginId"], json!("csv-export"));
}

#[test]
fn capability_mismatches_are_errors() {
    let mut registry = PluginRegistry::new();
    for plugin in builtin::all() {
        registry.register_plugin(plugin);
    }

    assert!(matches!(
        registry.export("csv", &[], &Value::Null),
        Err(DashboardError::MissingCapability { .. })
    ));
    assert!(matches!(
        registry.run_processor("aggregations", "median", &[], &Value::Null),
        Err(DashboardError::MissingCapability { .. })
    ));
    assert!(matches!(
        registry.export("nope", &[], &Value::Null),
        Err(DashboardError::PluginNotFound(_))
    ));
    assert!(matches!(registry.data_loader("json-export"), Err(DashboardError::NoPluginForSource(_))));
}

#[test]
fn ui_components_are_listed_for_enabled_plugins() {
    let mut registry = PluginRegistry::new();
    let mut components = BTreeMap::new();
    components.insert("vaultStatus".to_string(), json!({"kind": "status"}));
    registry.register_plugin(Plugin::new("health", "Health", "1.0", Capability::UiComponent(components)));

    let listed = registry.ui_components();
    assert_eq!(listed.get("health/vaultStatus"), Some(&&json!({"kind": "status"})));

    registry.disable_plugin("health");
    assert!(registry.ui_components().is_empty());
}
