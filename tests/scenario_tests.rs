mod common;

use std::sync::Arc;

use pamdash::datasource::{self, DataSourceState};
use pamdash::memo::memoize_by;
use pamdash::observability::MetricKind;
use pamdash::plugin::builtin::export::CSV_EXPORT_ID;
use pamdash::plugin::PluginRegistry;
use pamdash::store::{AppAction, Store};
use pamdash::{AppContext, Config, DataSource, SyncStatus};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use common::{count, fixed_loader, record_actions};

const ACCOUNTS_CSV: &str = "\
userName,platform,safe
svc_backup,WinDomain,Infra
svc_db,UnixSSH,Databases
admin,WinDomain,Infra
";

#[tokio::test]
async fn register_enable_add_and_load_a_source() {
    let store = Store::new();
    store.register(datasource::module());
    let mut registry = PluginRegistry::new();

    assert!(registry.register_plugin(fixed_loader("csv1", json!([{"a": 1}])).disabled()));
    assert!(registry.enable_plugin("csv1"));
    assert!(datasource::add_source(&store, DataSource::new("s1", "csv1")));

    let loaded = datasource::load_data(&store, &registry, "s1", &Value::Null).await.unwrap();
    assert_eq!(*loaded.data, vec![json!({"a": 1})]);

    let state = store.module::<DataSourceState>(datasource::MODULE_NAME).unwrap();
    assert_eq!(*state.rows("s1"), vec![json!({"a": 1})]);
    assert_eq!(state.sync_status("s1"), Some(SyncStatus::Synced));
}

#[tokio::test]
async fn dashboard_loads_validates_processes_and_exports_configured_sources() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("accounts.csv"), ACCOUNTS_CSV).unwrap();
    let config_path = dir.path().join("dashboard.toml");
    std::fs::write(
        &config_path,
        r#"
        theme = "dark"

        [[sources]]
        id = "accounts"
        plugin_id = "csv"
        data = "accounts.csv"
        config = { requiredFields = ["userName", "platform"] }

        [[sources]]
        id = "safes"
        type = "json"
        data = { rows = [{ safeName = "Infra", members = 4 }] }

        [[sources]]
        id = "archived"
        plugin_id = "csv"
        data = { path = "archived.csv" }
        "#,
    )
    .unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let mut context = pamdash::initialize(config);
    record_actions(context.store());
    assert!(context.initialize());

    let loaded = context.load_all().await.unwrap();
    assert_eq!(loaded.loaded.get("accounts"), Some(&3));
    assert_eq!(loaded.loaded.get("safes"), Some(&1));
    assert!(loaded.failed["archived"].contains("archived.csv"));

    let store = context.store();
    assert_eq!(count(store, "dataSources/loadAll/pending"), 1);
    assert_eq!(count(store, "dataSources/loadAll/fulfilled"), 1);
    assert!(!store.app().loading);
    assert_eq!(store.app().theme, "dark");

    let validation = context.validate_all();
    assert!(validation["accounts"].valid);
    assert!(validation["safes"].valid);
    assert_eq!(validation["archived"].errors, vec!["Data must be an array".to_string()]);

    let platforms = context
        .process("aggregations", "countBy", "accounts", &json!({"field": "platform"}))
        .unwrap();
    assert_eq!(
        platforms,
        vec![
            json!({"value": "WinDomain", "count": 2}),
            json!({"value": "UnixSSH", "count": 1}),
        ]
    );

    let csv = context
        .export_source(CSV_EXPORT_ID, "accounts", &json!({"columns": ["userName", "safe"]}))
        .unwrap();
    assert_eq!(csv, "userName,safe\nsvc_backup,Infra\nsvc_db,Databases\nadmin,Infra\n");

    let summary = context.summary();
    assert_eq!(summary.theme, "dark");
    assert_eq!(summary.plugins.len(), 6);
    let accounts = &summary.sources["accounts"];
    assert_eq!(accounts.plugin.as_deref(), Some("csv"));
    assert_eq!(accounts.rows, 3);
    assert_eq!(accounts.sync_status, Some(SyncStatus::Synced));
    assert_eq!(summary.sources["safes"].plugin.as_deref(), Some("json"));
    assert!(summary.sources["archived"].error.is_some());
    assert_eq!(summary.sources["archived"].sync_status, Some(SyncStatus::Dirty));

    let monitor = context.monitor();
    assert_eq!(monitor.counter("sources.loaded"), 2);
    assert_eq!(monitor.counter("sources.failed"), 1);
    assert_eq!(monitor.counter("rows.loaded"), 4);
    assert_eq!(monitor.stats(MetricKind::Load, "accounts").map(|s| s.count), Some(1));
    assert!(monitor.stats(MetricKind::Render, "aggregations.countBy").is_some());
}

#[tokio::test]
async fn unknown_sources_are_rejected_by_the_context() {
    let context = AppContext::new(Config::default());
    assert!(context.source_ids().is_empty());
    assert!(context.process("aggregations", "countBy", "ghost", &Value::Null).is_err());
    assert!(context.export_source(CSV_EXPORT_ID, "ghost", &Value::Null).is_err());

    let loaded = context.load_all().await.unwrap();
    assert!(loaded.loaded.is_empty() && loaded.failed.is_empty());
}

#[tokio::test]
async fn derived_values_recompute_only_when_their_slice_changes() {
    let store = Store::new();
    store.register(datasource::module());
    let mut registry = PluginRegistry::new();
    registry.register_plugin(fixed_loader("vault", json!([{"safe": "A"}, {"safe": "B"}])));
    datasource::add_source(&store, DataSource::new("safes", "vault"));

    let computed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let calls = Arc::clone(&computed);
    let total_rows = memoize_by(move |state: &DataSourceState| {
        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        state.data.values().map(|rows| rows.len()).sum::<usize>()
    });
    let slice = || store.module::<DataSourceState>(datasource::MODULE_NAME).unwrap();

    assert_eq!(*total_rows(&slice()), 0);
    store.dispatch(AppAction::ToggleSidebar);
    assert_eq!(*total_rows(&slice()), 0);
    assert_eq!(computed.load(std::sync::atomic::Ordering::SeqCst), 1);

    datasource::load_data(&store, &registry, "safes", &Value::Null).await.unwrap();
    assert_eq!(*total_rows(&slice()), 2);
    assert_eq!(computed.load(std::sync::atomic::Ordering::SeqCst), 2);
}
