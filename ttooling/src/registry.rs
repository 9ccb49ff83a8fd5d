//! Tool registry for lookup by schema name.
//!
//! Re-registering a name replaces the previous entry in place, so schema
//! listings stay deduplicated and keep first-seen order.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::Value;

use crate::{
    FunctionTool, NoopToolRuntimeHooks, Tool, ToolContext, ToolError, ToolRuntimeHooks, ToolSchema,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Registered directly on a registry or runtime builder.
    Host,
    Module(String),
    /// Installed at run time, possibly by another tool.
    Dynamic,
}

impl Display for ToolOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Module(name) => write!(f, "module:{name}"),
            Self::Dynamic => f.write_str("dynamic"),
        }
    }
}

#[derive(Clone)]
pub struct RegistryEntry {
    pub schema: Arc<ToolSchema>,
    pub tool: Arc<dyn Tool>,
    pub origin: ToolOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRegistration {
    pub tool_name: String,
    pub replaced: bool,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: tcommon::Registry<String, RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T) -> Result<ToolRegistration, ToolError>
    where
        T: Tool + 'static,
    {
        self.register_with_origin(Arc::new(tool), ToolOrigin::Host)
    }

    /// Checks the tool's schema and inserts it, replacing any entry of the same name.
    pub fn register_with_origin(
        &mut self,
        tool: Arc<dyn Tool>,
        origin: ToolOrigin,
    ) -> Result<ToolRegistration, ToolError> {
        let schema = tool.schema();
        schema.check()?;

        let tool_name = schema.name.clone();
        let previous = self.tools.insert(
            tool_name.clone(),
            RegistryEntry {
                schema: Arc::new(schema),
                tool,
                origin,
            },
        );

        Ok(ToolRegistration {
            tool_name,
            replaced: previous.is_some(),
        })
    }

    pub fn register_fn<F, Fut>(
        &mut self,
        schema: ToolSchema,
        handler: F,
    ) -> Result<ToolRegistration, ToolError>
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.register(FunctionTool::new(schema, handler))
    }

    pub fn register_sync_fn<F>(
        &mut self,
        schema: ToolSchema,
        handler: F,
    ) -> Result<ToolRegistration, ToolError>
    where
        F: Fn(Value, ToolContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(FunctionTool::from_sync(schema, handler))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn entry(&self, name: &str) -> Option<RegistryEntry> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RegistryEntry> {
        self.tools.remove(name)
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|entry| entry.schema.as_ref().clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Write access to a shared registry, handed to running tools through
/// [`ToolContext::installer`].
#[derive(Clone)]
pub struct ToolInstaller {
    registry: Arc<RwLock<ToolRegistry>>,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl ToolInstaller {
    pub(crate) fn new(registry: Arc<RwLock<ToolRegistry>>, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        Self { registry, hooks }
    }

    pub(crate) fn standalone() -> Self {
        Self::new(
            Arc::new(RwLock::new(ToolRegistry::new())),
            Arc::new(NoopToolRuntimeHooks),
        )
    }

    /// Installs `handler` under `name`. The schema must describe the same name;
    /// on any error the registry is left untouched.
    pub fn register_dynamic<F, Fut>(
        &self,
        name: &str,
        handler: F,
        schema: ToolSchema,
    ) -> Result<ToolRegistration, ToolError>
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        if name.trim().is_empty() {
            return Err(ToolError::registration("tool name must not be empty"));
        }
        if schema.name != name {
            return Err(ToolError::registration(format!(
                "schema name '{}' does not match tool name '{name}'",
                schema.name
            )));
        }

        self.install(Arc::new(FunctionTool::new(schema, handler)), ToolOrigin::Dynamic)
    }

    pub fn install(
        &self,
        tool: Arc<dyn Tool>,
        origin: ToolOrigin,
    ) -> Result<ToolRegistration, ToolError> {
        let registration = self
            .registry
            .write()
            .map_err(|_| ToolError::internal("tool registry lock poisoned"))?
            .register_with_origin(tool, origin.clone())?;

        if registration.replaced {
            tracing::warn!(tool = %registration.tool_name, origin = %origin, "tool replaced");
        } else {
            tracing::debug!(tool = %registration.tool_name, origin = %origin, "tool registered");
        }
        self.hooks
            .on_tool_registered(&registration.tool_name, &origin, registration.replaced);

        Ok(registration)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry
            .read()
            .map(|registry| registry.contains(name))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ParameterSpec, ToolErrorKind};

    fn weather_schema() -> ToolSchema {
        ToolSchema::new("get_weather", "Looks up the weather")
            .required("city", ParameterSpec::string())
    }

    #[test]
    fn registry_tracks_registered_tools() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry
            .register_sync_fn(weather_schema(), |_args, _ctx| Ok(json!("sunny")))
            .expect("register");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("get_weather"));
        assert_eq!(registry.schemas().len(), 1);
        assert_eq!(
            registry.entry("get_weather").map(|entry| entry.origin),
            Some(ToolOrigin::Host)
        );

        let removed = registry.remove("get_weather");
        assert!(removed.is_some());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn reregistration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry
            .register_sync_fn(weather_schema(), |_args, _ctx| Ok(json!("v1")))
            .expect("register");
        registry
            .register_sync_fn(ToolSchema::new("search", "Searches"), |_args, _ctx| Ok(json!([])))
            .expect("register");
        let registration = registry
            .register_sync_fn(
                ToolSchema::new("get_weather", "Looks up the weather, again"),
                |_args, _ctx| Ok(json!("v2")),
            )
            .expect("register");

        assert!(registration.replaced);
        assert_eq!(registry.names(), vec!["get_weather", "search"]);
        assert_eq!(
            registry.schemas()[0].description,
            "Looks up the weather, again"
        );

        let tool = registry.get("get_weather").expect("tool");
        let context = ToolContext::detached("get_weather");
        assert_eq!(tool.invoke(json!({}), &context).await.expect("invoke"), json!("v2"));
    }

    #[test]
    fn malformed_schema_is_rejected() {
        let mut registry = ToolRegistry::new();
        let error = registry
            .register_sync_fn(ToolSchema::new("", "No name"), |_args, _ctx| Ok(json!(null)))
            .expect_err("empty name");

        assert_eq!(error.kind, ToolErrorKind::Registration);
        assert!(registry.is_empty());
    }

    #[test]
    fn installer_rejects_mismatched_names() {
        let installer = ToolInstaller::standalone();
        let error = installer
            .register_dynamic("weather", |_args, _ctx| async { Ok(json!(1)) }, weather_schema())
            .expect_err("name mismatch");

        assert_eq!(error.kind, ToolErrorKind::Registration);
        assert!(!installer.contains("weather"));
        assert!(!installer.contains("get_weather"));
    }

    #[test]
    fn installer_registers_dynamic_tools() {
        let installer = ToolInstaller::standalone();
        let registration = installer
            .register_dynamic(
                "get_weather",
                |_args, _ctx| async { Ok(json!("rain")) },
                weather_schema(),
            )
            .expect("register");

        assert_eq!(registration.tool_name, "get_weather");
        assert!(!registration.replaced);
        assert!(installer.contains("get_weather"));
        assert_eq!(
            serde_json::to_value(&registration).expect("serialize"),
            json!({"toolName": "get_weather", "replaced": false})
        );
    }
}
