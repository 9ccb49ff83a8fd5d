//! Tool modules discovered at startup.
//!
//! A module is one of three shapes, tagged by [`RegistrationKind`]: a fixed
//! set of tools, a factory that builds a set from the dependency bundle, or a
//! [`ToolClass`] constructed once whose methods are bound to the instance.
//! Every shape resolves to a [`ToolSet`] before anything reaches the registry.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use ttooling::{Dependencies, ParameterSpec, RegistrationKind, ToolModule, ToolSchema, ToolSet};
//!
//! let module = ToolModule::factory("math", |_deps: Arc<Dependencies>| async move {
//!     Ok(ToolSet::new().with_sync_fn(
//!         ToolSchema::new("double", "Doubles a number").required("n", ParameterSpec::number()),
//!         |args, _ctx| Ok(json!(args["n"].as_f64().unwrap_or_default() * 2.0)),
//!     ))
//! });
//!
//! assert_eq!(module.kind(), RegistrationKind::Factory);
//! assert_eq!(module.name(), "math");
//! ```

use std::any::type_name;
use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tcommon::BoxFuture;

use crate::{Dependencies, FunctionTool, Tool, ToolContext, ToolError, ToolFuture, ToolSchema};

#[derive(Default, Clone)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.push(Arc::new(tool));
        self
    }

    pub fn with_fn<F, Fut>(self, schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.with(FunctionTool::new(schema, handler))
    }

    pub fn with_sync_fn<F>(self, schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.with(FunctionTool::from_sync(schema, handler))
    }

    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Debug for ToolSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.tools.iter().map(|tool| tool.schema().name).collect();
        f.debug_struct("ToolSet").field("tools", &names).finish()
    }
}

impl IntoIterator for ToolSet {
    type Item = Arc<dyn Tool>;
    type IntoIter = std::vec::IntoIter<Arc<dyn Tool>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tools.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    Static,
    Factory,
    Class,
}

impl Display for RegistrationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Factory => "factory",
            Self::Class => "class",
        })
    }
}

type ModuleFactory =
    dyn FnOnce(Arc<Dependencies>) -> BoxFuture<'static, Result<ToolSet, ToolError>> + Send;

type ClassBinder = fn(&Dependencies) -> Result<ToolSet, ToolError>;

enum ModuleSource {
    Static(ToolSet),
    Factory(Box<ModuleFactory>),
    Class(ClassBinder),
}

pub struct ToolModule {
    name: String,
    source: ModuleSource,
}

impl ToolModule {
    pub fn fixed(name: impl Into<String>, tools: ToolSet) -> Self {
        Self {
            name: name.into(),
            source: ModuleSource::Static(tools),
        }
    }

    pub fn factory<F, Fut>(name: impl Into<String>, factory: F) -> Self
    where
        F: FnOnce(Arc<Dependencies>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ToolSet, ToolError>> + Send + 'static,
    {
        let factory: Box<ModuleFactory> = Box::new(move |deps| Box::pin(factory(deps)));
        Self {
            name: name.into(),
            source: ModuleSource::Factory(factory),
        }
    }

    pub fn class<T>(name: impl Into<String>) -> Self
    where
        T: ToolClass,
    {
        Self {
            name: name.into(),
            source: ModuleSource::Class(bind_class::<T>),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> RegistrationKind {
        match self.source {
            ModuleSource::Static(_) => RegistrationKind::Static,
            ModuleSource::Factory(_) => RegistrationKind::Factory,
            ModuleSource::Class(_) => RegistrationKind::Class,
        }
    }

    /// Runs the factory or constructor, if any, and returns the module's tools.
    ///
    /// An error here skips the whole module. Once the set is returned, the
    /// runtime installs each tool on its own: a tool that fails registration
    /// is skipped and reported while the rest of the module still registers.
    pub async fn resolve(self, dependencies: Arc<Dependencies>) -> Result<ToolSet, ToolError> {
        let name = self.name;
        let tools = match self.source {
            ModuleSource::Static(tools) => tools,
            ModuleSource::Factory(factory) => factory(dependencies).await?,
            ModuleSource::Class(bind) => bind(&dependencies)?,
        };

        if tools.is_empty() {
            return Err(ToolError::registration(format!(
                "module '{name}' exports no tools"
            )));
        }
        Ok(tools)
    }
}

impl Debug for ToolModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolModule")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// A stateful tool provider: constructed once per runtime, each method bound
/// to the shared instance.
pub trait ToolClass: Send + Sync + Sized + 'static {
    fn construct(dependencies: &Dependencies) -> Result<Self, ToolError>;

    fn methods() -> Vec<ToolMethod<Self>>;
}

type MethodHandler<T> =
    dyn Fn(Arc<T>, Value, ToolContext) -> ToolFuture<'static, Result<Value, ToolError>> + Send + Sync;

pub struct ToolMethod<T> {
    schema: ToolSchema,
    handler: Arc<MethodHandler<T>>,
}

impl<T> ToolMethod<T>
where
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Arc<T>, Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Arc<MethodHandler<T>> =
            Arc::new(move |instance, args, context| Box::pin(handler(instance, args, context)));
        Self { schema, handler }
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }
}

struct BoundMethod<T> {
    instance: Arc<T>,
    method: ToolMethod<T>,
}

impl<T> Tool for BoundMethod<T>
where
    T: Send + Sync + 'static,
{
    fn schema(&self) -> ToolSchema {
        self.method.schema.clone()
    }

    fn invoke<'a>(
        &'a self,
        args: Value,
        context: &'a ToolContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>> {
        (self.method.handler)(Arc::clone(&self.instance), args, context.clone())
    }
}

fn bind_class<T>(dependencies: &Dependencies) -> Result<ToolSet, ToolError>
where
    T: ToolClass,
{
    let methods = T::methods();
    if methods.is_empty() {
        return Err(ToolError::registration(format!(
            "tool class '{}' exposes no methods",
            type_name::<T>()
        )));
    }

    let instance = Arc::new(T::construct(dependencies)?);
    Ok(methods
        .into_iter()
        .fold(ToolSet::new(), |tools, method| {
            tools.with(BoundMethod {
                instance: Arc::clone(&instance),
                method,
            })
        }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::{ParameterSpec, ToolErrorKind};

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Counter {
        step: i64,
    }

    impl ToolClass for Counter {
        fn construct(dependencies: &Dependencies) -> Result<Self, ToolError> {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            let step = dependencies
                .setting("step")
                .and_then(|value| value.parse().ok())
                .unwrap_or(1);
            Ok(Self { step })
        }

        fn methods() -> Vec<ToolMethod<Self>> {
            vec![
                ToolMethod::new(
                    ToolSchema::new("counter_step", "Returns the configured step"),
                    |counter: Arc<Self>, _args, _ctx| async move { Ok(json!(counter.step)) },
                ),
                ToolMethod::new(
                    ToolSchema::new("counter_add", "Adds the step to n")
                        .required("n", ParameterSpec::integer()),
                    |counter: Arc<Self>, args, _ctx| async move {
                        Ok(json!(args["n"].as_i64().unwrap_or_default() + counter.step))
                    },
                ),
            ]
        }
    }

    struct Empty;

    impl ToolClass for Empty {
        fn construct(_dependencies: &Dependencies) -> Result<Self, ToolError> {
            Ok(Self)
        }

        fn methods() -> Vec<ToolMethod<Self>> {
            Vec::new()
        }
    }

    fn echo_schema() -> ToolSchema {
        ToolSchema::new("echo", "Echoes input")
    }

    #[tokio::test]
    async fn class_module_binds_methods_to_one_instance() {
        let before = CONSTRUCTED.load(Ordering::SeqCst);
        let module = ToolModule::class::<Counter>("counter");
        assert_eq!(module.kind(), RegistrationKind::Class);

        let deps = Arc::new(Dependencies::new().with_setting("step", "5"));
        let tools: Vec<_> = module.resolve(deps).await.expect("resolve").into_iter().collect();
        assert_eq!(tools.len(), 2);
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), before + 1);

        let context = ToolContext::detached("counter_add");
        let output = tools[1]
            .invoke(json!({"n": 10}), &context)
            .await
            .expect("invoke");
        assert_eq!(output, json!(15));
    }

    #[tokio::test]
    async fn class_without_methods_is_a_registration_error() {
        let error = ToolModule::class::<Empty>("empty")
            .resolve(Arc::new(Dependencies::new()))
            .await
            .expect_err("no methods");
        assert_eq!(error.kind, ToolErrorKind::Registration);
    }

    #[tokio::test]
    async fn factory_receives_dependencies() {
        let module = ToolModule::factory("greeter", |deps: Arc<Dependencies>| async move {
            let greeting = deps.require_setting("greeting")?.to_string();
            Ok::<_, ToolError>(ToolSet::new().with_sync_fn(echo_schema(), move |_args, _ctx| {
                Ok(json!(greeting.clone()))
            }))
        });

        let error = ToolModule::factory("broken", |deps: Arc<Dependencies>| async move {
            deps.require_setting("missing")?;
            Ok::<_, ToolError>(ToolSet::new())
        })
        .resolve(Arc::new(Dependencies::new()))
        .await
        .expect_err("factory fails");
        assert_eq!(error.kind, ToolErrorKind::Registration);

        let deps = Arc::new(Dependencies::new().with_setting("greeting", "hi"));
        let tools = module.resolve(deps).await.expect("resolve");
        assert_eq!(tools.len(), 1);
    }

    #[tokio::test]
    async fn empty_fixed_module_is_rejected() {
        let error = ToolModule::fixed("nothing", ToolSet::new())
            .resolve(Arc::new(Dependencies::new()))
            .await
            .expect_err("empty module");
        assert!(error.message.contains("nothing"));
    }

    #[test]
    fn tool_set_debug_lists_names() {
        let tools = ToolSet::new().with_sync_fn(echo_schema(), |args, _ctx| Ok(args));
        assert_eq!(format!("{tools:?}"), "ToolSet { tools: [\"echo\"] }");
    }
}
