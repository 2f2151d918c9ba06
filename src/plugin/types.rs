//! Plugin model: identity, capability, lifecycle and hooks.
//!
//! A [`Plugin`] carries exactly one [`Capability`], so a data-source plugin
//! without a loader (or an exporter without an export function) cannot be
//! constructed. Lifecycle steps and hooks are optional closures.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Result;

/// Closed set of plugin kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PluginType {
    DataSource,
    UiComponent,
    DataProcessor,
    Export,
}

impl PluginType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DataSource => "dataSource",
            Self::UiComponent => "uiComponent",
            Self::DataProcessor => "dataProcessor",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook points a plugin may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookName {
    OnInit,
    OnDataLoad,
    OnDataTransform,
    OnExport,
    OnError,
    OnConfigChange,
}

impl HookName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnInit => "onInit",
            Self::OnDataLoad => "onDataLoad",
            Self::OnDataTransform => "onDataTransform",
            Self::OnExport => "onExport",
            Self::OnError => "onError",
            Self::OnConfigChange => "onConfigChange",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loads raw rows for a data source.
///
/// `source` is the source's opaque `data` field, `options` the merged config.
/// The returned value is normalized by
/// [`normalize_load_result`](crate::domain::normalize_load_result).
#[async_trait]
pub trait DataLoader: Send + Sync {
    async fn load_data(&self, source: &Value, options: &Value) -> Result<Value>;
}

/// Serializes rows into an export document.
pub trait Exporter: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the rows cannot be rendered in this format.
    fn export(&self, data: &[Value], options: &Value) -> Result<String>;
}

impl<F> Exporter for F
where
    F: Fn(&[Value], &Value) -> Result<String> + Send + Sync,
{
    fn export(&self, data: &[Value], options: &Value) -> Result<String> {
        self(data, options)
    }
}

/// Named row transformation offered by a data-processor plugin.
pub type ProcessorFn = Arc<dyn Fn(&[Value], &Value) -> Result<Vec<Value>> + Send + Sync>;

/// Hook callback, invoked with the hook payload and the plugin's identity.
pub type HookFn = Arc<dyn Fn(&Value, &PluginInfo) -> Result<Value> + Send + Sync>;

/// `initialize` / `cleanup` step.
pub type LifecycleFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// Adapts an async closure taking owned arguments into a [`DataLoader`].
///
/// # Example
///
/// ```
/// use pamdash::plugin::loader_fn;
/// use serde_json::json;
///
/// let loader = loader_fn(|_source, _options| async { Ok(json!([{"a": 1}])) });
/// # let _ = loader;
/// ```
pub fn loader_fn<F, Fut>(f: F) -> Arc<dyn DataLoader>
where
    F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(FnLoader(f))
}

struct FnLoader<F>(F);

#[async_trait]
impl<F, Fut> DataLoader for FnLoader<F>
where
    F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn load_data(&self, source: &Value, options: &Value) -> Result<Value> {
        (self.0)(source.clone(), options.clone()).await
    }
}

/// What a plugin contributes. One variant per [`PluginType`].
#[derive(Clone)]
pub enum Capability {
    DataSource(Arc<dyn DataLoader>),
    /// Component descriptors keyed by component name.
    UiComponent(BTreeMap<String, Value>),
    DataProcessor(BTreeMap<String, ProcessorFn>),
    Export(Arc<dyn Exporter>),
}

impl Capability {
    #[must_use]
    pub const fn plugin_type(&self) -> PluginType {
        match self {
            Self::DataSource(_) => PluginType::DataSource,
            Self::UiComponent(_) => PluginType::UiComponent,
            Self::DataProcessor(_) => PluginType::DataProcessor,
            Self::Export(_) => PluginType::Export,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataSource(_) => f.write_str("DataSource(..)"),
            Self::UiComponent(components) => f
                .debug_tuple("UiComponent")
                .field(&components.keys().collect::<Vec<_>>())
                .finish(),
            Self::DataProcessor(processors) => f
                .debug_tuple("DataProcessor")
                .field(&processors.keys().collect::<Vec<_>>())
                .finish(),
            Self::Export(_) => f.write_str("Export(..)"),
        }
    }
}

/// Read-only identity snapshot handed to hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    pub name: String,
    pub version: String,
    pub enabled: bool,
    pub initialized: bool,
}

/// A registrable plugin.
///
/// Built with [`Plugin::new`] (or a per-type shorthand) and the `with_*`
/// builder methods. `enabled` defaults to true; `initialized` is owned by the
/// registry.
#[derive(Clone)]
pub struct Plugin {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) enabled: bool,
    pub(crate) initialized: bool,
    pub(crate) capability: Capability,
    pub(crate) hooks: BTreeMap<HookName, HookFn>,
    pub(crate) initialize: Option<LifecycleFn>,
    pub(crate) cleanup: Option<LifecycleFn>,
}

impl Plugin {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        capability: Capability,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            enabled: true,
            initialized: false,
            capability,
            hooks: BTreeMap::new(),
            initialize: None,
            cleanup: None,
        }
    }

    #[must_use]
    pub fn data_source(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        loader: Arc<dyn DataLoader>,
    ) -> Self {
        Self::new(id, name, version, Capability::DataSource(loader))
    }

    #[must_use]
    pub fn exporter(
        id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self::new(id, name, version, Capability::Export(exporter))
    }

    /// Registers a hook callback, replacing any earlier one for `hook`.
    #[must_use]
    pub fn with_hook<F>(mut self, hook: HookName, f: F) -> Self
    where
        F: Fn(&Value, &PluginInfo) -> Result<Value> + Send + Sync + 'static,
    {
        self.hooks.insert(hook, Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_initialize<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.initialize = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_cleanup<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.cleanup = Some(Arc::new(f));
        self
    }

    /// Registers the plugin in the disabled state.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub const fn plugin_type(&self) -> PluginType {
        self.capability.plugin_type()
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub const fn capability(&self) -> &Capability {
        &self.capability
    }

    #[must_use]
    pub fn hook(&self, hook: HookName) -> Option<&HookFn> {
        self.hooks.get(&hook)
    }

    pub fn implemented_hooks(&self) -> impl Iterator<Item = HookName> + '_ {
        self.hooks.keys().copied()
    }

    #[must_use]
    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            id: self.id.clone(),
            plugin_type: self.plugin_type(),
            name: self.name.clone(),
            version: self.version.clone(),
            enabled: self.enabled,
            initialized: self.initialized,
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("enabled", &self.enabled)
            .field("initialized", &self.initialized)
            .field("capability", &self.capability)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
