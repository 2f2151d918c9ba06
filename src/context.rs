//! Application context: the owner of the registry, store and telemetry.
//!
//! There are no process-wide singletons; everything the dashboard needs hangs
//! off one [`AppContext`], built from a [`Config`].

use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::datasource::{self, DataSourceState};
use crate::domain::{DashboardError, DataSource, LoadedData, Result, SyncStatus, ValidationResult};
use crate::observability::{MetricKind, PerformanceMonitor, PerformanceReport};
use crate::plugin::{builtin, PluginInfo, PluginRegistry};
use crate::store::{AsyncAction, Store};
use crate::Config;

/// Outcome of [`AppContext::load_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Row counts of sources that loaded.
    pub loaded: BTreeMap<String, usize>,
    /// Error messages of sources that failed.
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub plugin: Option<String>,
    pub rows: usize,
    pub sync_status: Option<SyncStatus>,
    pub last_loaded: Option<i64>,
    pub validation: Option<ValidationResult>,
    pub error: Option<String>,
}

/// Serializable overview of the dashboard state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub theme: String,
    pub sources: BTreeMap<String, SourceSummary>,
    pub plugins: Vec<PluginInfo>,
    pub performance: PerformanceReport,
}

#[derive(Debug)]
pub struct AppContext {
    config: Config,
    registry: PluginRegistry,
    store: Store,
    monitor: PerformanceMonitor,
}

impl AppContext {
    /// Builds a context with the built-in plugins registered, the
    /// `dataSources` module in the store, and every configured source added.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = Store::with_theme(config.theme.clone());
        store.register(datasource::module());

        let mut registry = PluginRegistry::new();
        for plugin in builtin::all() {
            registry.register_plugin(plugin);
        }

        for source in config.data_sources() {
            datasource::add_source(&store, source);
        }

        let monitor = PerformanceMonitor::new(config.performance);

        tracing::debug!(
            plugins = registry.len(),
            sources = config.sources.len(),
            "application context ready"
        );

        Self {
            config,
            registry,
            store,
            monitor,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Runs plugin initialization; see [`PluginRegistry::initialize`].
    pub fn initialize(&mut self) -> bool {
        self.monitor
            .time(MetricKind::Api, "plugins.initialize", || self.registry.initialize())
    }

    pub fn add_source(&self, source: DataSource) -> bool {
        datasource::add_source(&self.store, source)
    }

    /// Current `dataSources` slice.
    #[must_use]
    pub fn sources(&self) -> Arc<DataSourceState> {
        self.store
            .module::<DataSourceState>(datasource::MODULE_NAME)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn source_ids(&self) -> Vec<String> {
        self.sources().sources.keys().cloned().collect()
    }

    /// Loads one source, recording its load time.
    ///
    /// # Errors
    ///
    /// See [`datasource::load_data`].
    pub async fn load_source(&self, source_id: &str, options: &Value) -> Result<LoadedData> {
        let result = self
            .monitor
            .time_async(
                MetricKind::Load,
                source_id,
                datasource::load_data(&self.store, &self.registry, source_id, options),
            )
            .await;

        match &result {
            Ok(loaded) => {
                self.monitor.increment("sources.loaded");
                self.monitor
                    .add("rows.loaded", u64::try_from(loaded.metadata.row_count).unwrap_or(u64::MAX));
            }
            Err(_) => {
                self.monitor.increment("sources.failed");
            }
        }
        result
    }

    /// Loads every registered source concurrently.
    ///
    /// Individual failures are collected in the summary; the
    /// `dataSources/loadAll` async action brackets the whole batch.
    ///
    /// # Errors
    ///
    /// Only if the batch itself fails; per-source errors never surface here.
    pub async fn load_all(&self) -> Result<LoadSummary> {
        let ids = self.source_ids();

        AsyncAction::<LoadSummary>::new("dataSources/loadAll")
            .run(&self.store, async {
                let results = join_all(ids.iter().map(|id| async move {
                    (id.clone(), self.load_source(id, &Value::Null).await)
                }))
                .await;

                let mut summary = LoadSummary::default();
                for (id, result) in results {
                    match result {
                        Ok(loaded) => {
                            summary.loaded.insert(id, loaded.metadata.row_count);
                        }
                        Err(e) => {
                            summary.failed.insert(id, e.to_string());
                        }
                    }
                }

                tracing::info!(
                    loaded = summary.loaded.len(),
                    failed = summary.failed.len(),
                    "data sources loaded"
                );
                Ok(summary)
            })
            .await
    }

    /// Validates every registered source with its own config.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate_all(&self) -> BTreeMap<String, ValidationResult> {
        self.source_ids()
            .into_iter()
            .map(|id| {
                let result = datasource::validate_source(&self.store, &id, &Value::Null);
                (id, result)
            })
            .collect()
    }

    /// Runs a data processor over a source's loaded rows.
    ///
    /// # Errors
    ///
    /// [`DashboardError::SourceNotFound`] for unknown sources, or any error
    /// from [`PluginRegistry::run_processor`].
    pub fn process(
        &self,
        plugin_id: &str,
        processor: &str,
        source_id: &str,
        options: &Value,
    ) -> Result<Vec<Value>> {
        let rows = self.rows(source_id)?;
        self.monitor.time(
            MetricKind::Render,
            &format!("{plugin_id}.{processor}"),
            || self.registry.run_processor(plugin_id, processor, &rows, options),
        )
    }

    /// Exports a source's loaded rows through an export plugin.
    ///
    /// # Errors
    ///
    /// [`DashboardError::SourceNotFound`] for unknown sources, or any error
    /// from [`PluginRegistry::export`].
    pub fn export_source(&self, plugin_id: &str, source_id: &str, options: &Value) -> Result<String> {
        let rows = self.rows(source_id)?;
        self.registry.export(plugin_id, &rows, options)
    }

    fn rows(&self, source_id: &str) -> Result<Arc<Vec<Value>>> {
        let state = self.sources();
        if !state.sources.contains_key(source_id) {
            return Err(DashboardError::SourceNotFound(source_id.to_string()));
        }
        Ok(state.rows(source_id))
    }

    #[must_use]
    pub fn summary(&self) -> DashboardSummary {
        let state = self.sources();
        let sources = state
            .sources
            .iter()
            .map(|(id, source)| {
                let metadata = state.metadata.get(id);
                let summary = SourceSummary {
                    plugin: source.plugin_key().map(str::to_string),
                    rows: metadata.map_or(0, |m| m.row_count),
                    sync_status: state.sync_status(id),
                    last_loaded: metadata.and_then(|m| m.last_loaded),
                    validation: state.validation_results.get(id).cloned(),
                    error: state.errors.get(id).cloned(),
                };
                (id.clone(), summary)
            })
            .collect();

        DashboardSummary {
            theme: self.store.app().theme.clone(),
            sources,
            plugins: self.registry.iter().map(|p| p.info()).collect(),
            performance: self.monitor.report(),
        }
    }
}
