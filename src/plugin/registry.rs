//! Plugin registry.
//!
//! Owns every registered [`Plugin`], indexes them by [`PluginType`] and by the
//! hooks they implement, drives their lifecycle and dispatches hooks.
//!
//! Registration and lifecycle operations report success as a `bool` and log
//! the reason for a refusal; they never return errors to the caller. Capability
//! lookups used by the data path (`data_loader`, `run_processor`, `export`)
//! return [`Result`]s.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::domain::{DashboardError, Result};

use super::types::{Capability, DataLoader, HookName, Plugin, PluginType};

/// Result of one plugin's hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutcome {
    pub plugin_id: String,
    pub result: Value,
}

/// Registry of plugins, owned by the application context.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Plugin>,
    /// Registration order, used for deterministic iteration.
    order: Vec<String>,
    by_type: HashMap<PluginType, Vec<String>>,
    hooks: HashMap<HookName, Vec<String>>,
    /// `None` until [`initialize`](Self::initialize) has run, then its result.
    initialized: Option<bool>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a plugin.
    ///
    /// Returns `false` (and logs) when validation fails or the id is taken;
    /// the already-registered plugin stays authoritative.
    pub fn register_plugin(&mut self, mut plugin: Plugin) -> bool {
        if let Err(e) = validate_plugin(&plugin) {
            error!(error = %e, "plugin registration rejected");
            return false;
        }

        if let Err(e) = self.check_unique(&plugin.id) {
            error!(error = %e, "plugin registration rejected");
            return false;
        }

        let id = plugin.id.clone();
        plugin.initialized = false;

        for hook in plugin.implemented_hooks() {
            self.hooks.entry(hook).or_default().push(id.clone());
        }
        self.by_type
            .entry(plugin.plugin_type())
            .or_default()
            .push(id.clone());

        info!(
            plugin_id = %id,
            plugin_type = %plugin.plugin_type(),
            version = %plugin.version,
            enabled = plugin.enabled,
            "registered plugin"
        );

        self.order.push(id.clone());
        self.plugins.insert(id, plugin);
        true
    }

    /// Enables a plugin.
    ///
    /// If the registry has already been initialized and this plugin never ran
    /// its `initialize` step, the step runs now; on failure the plugin stays
    /// disabled and `false` is returned.
    pub fn enable_plugin(&mut self, id: &str) -> bool {
        let registry_initialized = self.initialized.is_some();
        let Some(plugin) = self.plugins.get_mut(id) else {
            warn!(plugin_id = %id, "cannot enable unknown plugin");
            return false;
        };

        plugin.enabled = true;

        if registry_initialized && !plugin.initialized {
            if let Err(e) = run_initialize(plugin) {
                error!(plugin_id = %id, error = %e, "plugin initialization failed, keeping it disabled");
                plugin.enabled = false;
                return false;
            }
            plugin.initialized = true;
        }

        debug!(plugin_id = %id, "plugin enabled");
        true
    }

    /// Disables a plugin, running its optional `cleanup` step.
    ///
    /// Cleanup failures are logged and otherwise ignored.
    pub fn disable_plugin(&mut self, id: &str) -> bool {
        let Some(plugin) = self.plugins.get_mut(id) else {
            warn!(plugin_id = %id, "cannot disable unknown plugin");
            return false;
        };

        plugin.enabled = false;
        run_cleanup(plugin);

        debug!(plugin_id = %id, "plugin disabled");
        true
    }

    #[must_use]
    pub fn get_plugin(&self, id: &str) -> Option<&Plugin> {
        self.plugins.get(id)
    }

    /// Plugins of one type, in registration order.
    #[must_use]
    pub fn get_plugins_by_type(&self, plugin_type: PluginType) -> Vec<&Plugin> {
        self.by_type
            .get(&plugin_type)
            .map(|ids| ids.iter().filter_map(|id| self.plugins.get(id)).collect())
            .unwrap_or_default()
    }

    /// Enabled plugins, in registration order.
    #[must_use]
    pub fn get_enabled_plugins(&self) -> Vec<&Plugin> {
        self.iter().filter(|p| p.enabled).collect()
    }

    /// Removes a plugin from every index after running its cleanup step.
    ///
    /// Unknown ids are logged and reported as `false`.
    pub fn remove_plugin(&mut self, id: &str) -> bool {
        let Some(plugin) = self.plugins.remove(id) else {
            error!(plugin_id = %id, "cannot remove unknown plugin");
            return false;
        };

        run_cleanup(&plugin);

        self.order.retain(|other| other != id);
        if let Some(ids) = self.by_type.get_mut(&plugin.plugin_type()) {
            ids.retain(|other| other != id);
        }
        for ids in self.hooks.values_mut() {
            ids.retain(|other| other != id);
        }

        info!(plugin_id = %id, "removed plugin");
        true
    }

    /// Invokes `hook` on every enabled plugin that implements it.
    ///
    /// Plugins run in registration order. A failing hook is routed to that
    /// plugin's `onError` hook and left out of the results; the remaining
    /// plugins still run.
    pub fn execute_hook(&self, hook: HookName, data: &Value) -> Vec<HookOutcome> {
        let _span = tracing::debug_span!("execute_hook", hook = %hook).entered();

        let Some(ids) = self.hooks.get(&hook) else {
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(ids.len());
        for plugin in ids.iter().filter_map(|id| self.plugins.get(id)) {
            if !plugin.enabled {
                debug!(plugin_id = %plugin.id, "skipping hook on disabled plugin");
                continue;
            }
            let Some(callback) = plugin.hook(hook) else {
                continue;
            };

            let info = plugin.info();
            match callback(data, &info) {
                Ok(result) => outcomes.push(HookOutcome {
                    plugin_id: plugin.id.clone(),
                    result,
                }),
                Err(e) => {
                    let failure = hook_failure(plugin, hook, &e);
                    error!(error = %failure, "hook failed");
                    report_hook_error(plugin, hook, &failure, data);
                }
            }
        }

        debug!(invoked = outcomes.len(), "hook dispatched");
        outcomes
    }

    /// Runs `initialize` on every enabled plugin once.
    ///
    /// Idempotent: later calls return the first call's result without
    /// touching any plugin. A plugin whose step fails is force-disabled and
    /// makes the call return `false`; the other plugins are still initialized.
    /// Fires `onInit` once the pass completes.
    pub fn initialize(&mut self) -> bool {
        if let Some(result) = self.initialized {
            debug!("plugin registry already initialized");
            return result;
        }

        let _span = tracing::debug_span!("plugin_registry_initialize", plugins = self.order.len()).entered();

        let mut all_ok = true;
        for id in &self.order {
            let Some(plugin) = self.plugins.get_mut(id) else {
                continue;
            };
            if !plugin.enabled || plugin.initialized {
                continue;
            }

            match run_initialize(plugin) {
                Ok(()) => plugin.initialized = true,
                Err(e) => {
                    error!(plugin_id = %id, error = %e, "plugin initialization failed, disabling");
                    plugin.enabled = false;
                    all_ok = false;
                }
            }
        }

        self.initialized = Some(all_ok);

        let initialized_count = self.plugins.values().filter(|p| p.initialized).count();
        info!(initialized = initialized_count, success = all_ok, "plugin registry initialized");

        self.execute_hook(HookName::OnInit, &json!({ "plugins": initialized_count }));
        all_ok
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized.is_some()
    }

    /// All plugins in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.order.iter().filter_map(|id| self.plugins.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolves the enabled data-source plugin registered under `key`.
    ///
    /// # Errors
    ///
    /// [`DashboardError::NoPluginForSource`] if no such plugin exists, it is
    /// disabled, or it is not a data-source plugin.
    pub fn data_loader(&self, key: &str) -> Result<Arc<dyn DataLoader>> {
        match self.plugins.get(key) {
            Some(Plugin {
                enabled: true,
                capability: Capability::DataSource(loader),
                ..
            }) => Ok(Arc::clone(loader)),
            Some(plugin) => {
                debug!(
                    plugin_id = %key,
                    enabled = plugin.enabled,
                    plugin_type = %plugin.plugin_type(),
                    "plugin is not a usable data source"
                );
                Err(DashboardError::NoPluginForSource(key.to_string()))
            }
            None => Err(DashboardError::NoPluginForSource(key.to_string())),
        }
    }

    /// Runs a named processor of a data-processor plugin, then fires
    /// `onDataTransform`.
    ///
    /// # Errors
    ///
    /// [`DashboardError::PluginNotFound`] for unknown or disabled plugins,
    /// [`DashboardError::MissingCapability`] if the plugin has no such
    /// processor, or the processor's own error.
    pub fn run_processor(
        &self,
        plugin_id: &str,
        processor: &str,
        data: &[Value],
        options: &Value,
    ) -> Result<Vec<Value>> {
        let plugin = self.enabled_plugin(plugin_id)?;
        let Capability::DataProcessor(processors) = &plugin.capability else {
            return Err(missing_capability(plugin_id, "data processors"));
        };
        let run = processors
            .get(processor)
            .ok_or_else(|| missing_capability(plugin_id, &format!("processor '{processor}'")))?;

        let output = run(data, options)?;

        self.execute_hook(
            HookName::OnDataTransform,
            &json!({
                "pluginId": plugin_id,
                "processor": processor,
                "inputRows": data.len(),
                "outputRows": output.len(),
            }),
        );
        Ok(output)
    }

    /// Exports rows through an export plugin, then fires `onExport`.
    ///
    /// # Errors
    ///
    /// [`DashboardError::PluginNotFound`] for unknown or disabled plugins,
    /// [`DashboardError::MissingCapability`] if it is not an export plugin, or
    /// the exporter's own error.
    pub fn export(&self, plugin_id: &str, data: &[Value], options: &Value) -> Result<String> {
        let plugin = self.enabled_plugin(plugin_id)?;
        let Capability::Export(exporter) = &plugin.capability else {
            return Err(missing_capability(plugin_id, "an export function"));
        };

        let document = exporter.export(data, options)?;

        self.execute_hook(
            HookName::OnExport,
            &json!({
                "pluginId": plugin_id,
                "rows": data.len(),
                "bytes": document.len(),
            }),
        );
        Ok(document)
    }

    /// Component descriptors of every enabled UI-component plugin, keyed
    /// `plugin_id/component`.
    #[must_use]
    pub fn ui_components(&self) -> BTreeMap<String, &Value> {
        self.iter()
            .filter(|p| p.enabled)
            .filter_map(|p| match &p.capability {
                Capability::UiComponent(components) => Some((p, components)),
                _ => None,
            })
            .flat_map(|(p, components)| {
                components
                    .iter()
                    .map(move |(name, descriptor)| (format!("{}/{name}", p.id), descriptor))
            })
            .collect()
    }

    fn check_unique(&self, plugin_id: &str) -> Result<()> {
        if self.plugins.contains_key(plugin_id) {
            return Err(DashboardError::DuplicatePlugin(plugin_id.to_string()));
        }
        Ok(())
    }

    fn enabled_plugin(&self, plugin_id: &str) -> Result<&Plugin> {
        self.plugins
            .get(plugin_id)
            .filter(|p| p.enabled)
            .ok_or_else(|| DashboardError::PluginNotFound(plugin_id.to_string()))
    }
}

/// Structural checks beyond what the type system already guarantees.
fn validate_plugin(plugin: &Plugin) -> Result<()> {
    let invalid = |reason: &str| DashboardError::PluginValidation {
        plugin_id: plugin.id.clone(),
        reason: reason.to_string(),
    };

    if plugin.id.trim().is_empty() {
        return Err(invalid("id must be a non-empty string"));
    }
    if plugin.id.chars().any(char::is_whitespace) {
        return Err(invalid("id must not contain whitespace"));
    }
    if plugin.name.trim().is_empty() {
        return Err(invalid("name must be a non-empty string"));
    }
    if plugin.version.trim().is_empty() {
        return Err(invalid("version must be a non-empty string"));
    }

    match &plugin.capability {
        Capability::UiComponent(components) if components.is_empty() => {
            Err(invalid("ui component plugin must provide at least one component"))
        }
        Capability::DataProcessor(processors) if processors.is_empty() => {
            Err(invalid("data processor plugin must provide at least one processor"))
        }
        _ => Ok(()),
    }
}

fn run_initialize(plugin: &Plugin) -> Result<()> {
    match &plugin.initialize {
        Some(initialize) => initialize().map_err(|e| DashboardError::Lifecycle {
            plugin_id: plugin.id.clone(),
            message: e.to_string(),
        }),
        None => Ok(()),
    }
}

fn run_cleanup(plugin: &Plugin) {
    if let Some(cleanup) = &plugin.cleanup {
        if let Err(e) = cleanup() {
            warn!(plugin_id = %plugin.id, error = %e, "plugin cleanup failed");
        }
    }
}

fn hook_failure(plugin: &Plugin, hook: HookName, err: &DashboardError) -> DashboardError {
    DashboardError::Hook {
        hook: hook.to_string(),
        plugin_id: plugin.id.clone(),
        message: err.to_string(),
    }
}

/// Routes a failed hook to the plugin's own `onError` hook.
///
/// The payload carries the callback's message, not the wrapped error text.
fn report_hook_error(plugin: &Plugin, hook: HookName, failure: &DashboardError, data: &Value) {
    if hook == HookName::OnError {
        return;
    }
    let Some(on_error) = plugin.hook(HookName::OnError) else {
        return;
    };

    let message = match failure {
        DashboardError::Hook { message, .. } => message.clone(),
        other => other.to_string(),
    };
    let payload = json!({
        "hook": hook.as_str(),
        "error": message,
        "data": data,
    });
    if let Err(e) = on_error(&payload, &plugin.info()) {
        warn!(plugin_id = %plugin.id, error = %e, "onError hook failed");
    }
}

fn missing_capability(plugin_id: &str, capability: &str) -> DashboardError {
    DashboardError::MissingCapability {
        plugin_id: plugin_id.to_string(),
        capability: capability.to_string(),
    }
}
