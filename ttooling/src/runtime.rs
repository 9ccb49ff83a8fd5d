//! Tool runtime trait and the default guarded executor.
//!
//! Every call runs the same pipeline: lookup, argument validation, rate
//! check, circuit check, cache lookup, dispatch under a timeout, then
//! bookkeeping. Ordinary failures come back as [`ExecutionResult::Failure`];
//! `execute` only returns `Err` when the runtime is not initialized.
//!
//! ```rust
//! use serde_json::json;
//! use ttooling::{DefaultToolRuntime, ParameterSpec, ToolModule, ToolSchema, ToolSet};
//!
//! let runtime = DefaultToolRuntime::builder()
//!     .module(ToolModule::fixed(
//!         "weather",
//!         ToolSet::new().with_sync_fn(
//!             ToolSchema::new("get_weather", "Current weather for a city")
//!                 .required("city", ParameterSpec::string()),
//!             |args, _ctx| Ok(json!({ "city": args["city"], "temp": 21 })),
//!         ),
//!     ))
//!     .build()
//!     .expect("valid config");
//!
//! // Modules are resolved by `initialize`, which must complete before `execute`.
//! assert!(!runtime.is_ready());
//! assert_eq!(runtime.tool_count().expect("count"), 0);
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::FutureExt;
use futures_util::future::{Either, select};
use serde_json::{Map, Value};
use tcommon::{Clock, SystemClock};

use crate::{
    Admission, CircuitBreaker, CircuitState, CircuitTransition, Dependencies, ExecuteOptions,
    ExecutionResult, ExecutionStats, LearningSnapshot, NoopToolRuntimeHooks, RateLimiter,
    RegistryEntry, ResolvedPolicy, ResultCache, RuntimeConfig, StatsSnapshot, Tool, ToolContext,
    ToolError, ToolErrorKind, ToolFuture, ToolInstaller, ToolModule, ToolOrigin, ToolRegistration,
    ToolRegistry, ToolRuntimeHooks, ToolSchema, validate_arguments,
};

pub trait ToolRuntime: Send + Sync {
    fn execute<'a>(
        &'a self,
        tool_name: &'a str,
        args: Value,
    ) -> ToolFuture<'a, Result<ExecutionResult, ToolError>>;

    fn tool_schemas(&self) -> Result<Vec<ToolSchema>, ToolError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initializing,
    Ready,
}

enum Gate {
    Cached(Value),
    Dispatch(Admission),
}

pub struct DefaultToolRuntimeBuilder {
    config: RuntimeConfig,
    modules: Vec<ToolModule>,
    tools: Vec<Arc<dyn Tool>>,
    clock: Arc<dyn Clock>,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl Default for DefaultToolRuntimeBuilder {
    fn default() -> Self {
        Self {
            config: RuntimeConfig::default(),
            modules: Vec::new(),
            tools: Vec::new(),
            clock: Arc::new(SystemClock),
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }
}

impl DefaultToolRuntimeBuilder {
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Queues a module for discovery during [`DefaultToolRuntime::initialize`].
    pub fn module(mut self, module: ToolModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn modules<I>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = ToolModule>,
    {
        self.modules.extend(modules);
        self
    }

    /// Registers a tool when the runtime is built.
    pub fn tool<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<DefaultToolRuntime, ToolError> {
        self.config.validate()?;

        let registry = Arc::new(RwLock::new(ToolRegistry::new()));
        let installer = ToolInstaller::new(Arc::clone(&registry), Arc::clone(&self.hooks));
        for tool in self.tools {
            installer.install(tool, ToolOrigin::Host)?;
        }

        let capacity = self.config.learning_log_capacity;
        Ok(DefaultToolRuntime {
            inner: Arc::new(RuntimeInner {
                config: self.config,
                registry,
                installer,
                hooks: self.hooks,
                rate_limiter: RateLimiter::new(Arc::clone(&self.clock)),
                cache: ResultCache::new(Arc::clone(&self.clock)),
                breaker: CircuitBreaker::new(self.clock),
                stats: Mutex::new(ExecutionStats::new(capacity)),
                lifecycle: Mutex::new(Lifecycle::Uninitialized),
                pending: Mutex::new(self.modules),
                dependencies: RwLock::new(Arc::new(Dependencies::new())),
            }),
        })
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    registry: Arc<RwLock<ToolRegistry>>,
    installer: ToolInstaller,
    hooks: Arc<dyn ToolRuntimeHooks>,
    rate_limiter: RateLimiter,
    cache: ResultCache,
    breaker: CircuitBreaker,
    stats: Mutex<ExecutionStats>,
    lifecycle: Mutex<Lifecycle>,
    pending: Mutex<Vec<ToolModule>>,
    dependencies: RwLock<Arc<Dependencies>>,
}

/// Cheap to clone; clones share one registry and one set of guards.
#[derive(Clone)]
pub struct DefaultToolRuntime {
    inner: Arc<RuntimeInner>,
}

impl DefaultToolRuntime {
    pub fn builder() -> DefaultToolRuntimeBuilder {
        DefaultToolRuntimeBuilder::default()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn is_ready(&self) -> bool {
        self.inner
            .lifecycle()
            .map(|lifecycle| *lifecycle == Lifecycle::Ready)
            .unwrap_or(false)
    }

    /// Resolves the queued modules with `dependencies` and registers their
    /// tools. Later calls return the current tool count without re-running
    /// any factory or constructor.
    pub async fn initialize(&self, dependencies: Dependencies) -> Result<usize, ToolError> {
        {
            let mut lifecycle = self.inner.lifecycle()?;
            match *lifecycle {
                Lifecycle::Ready => return self.tool_count(),
                Lifecycle::Initializing => {
                    return Err(ToolError::not_ready("runtime initialization already in progress"));
                }
                Lifecycle::Uninitialized => *lifecycle = Lifecycle::Initializing,
            }
        }

        let outcome = self.discover(Arc::new(dependencies)).await;
        *self.inner.lifecycle()? = match outcome {
            Ok(_) => Lifecycle::Ready,
            Err(_) => Lifecycle::Uninitialized,
        };

        let registered = outcome?;
        let tool_count = self.tool_count()?;
        tracing::info!(registered, tool_count, "tool runtime initialized");
        Ok(tool_count)
    }

    async fn discover(&self, dependencies: Arc<Dependencies>) -> Result<usize, ToolError> {
        *self
            .inner
            .dependencies
            .write()
            .map_err(|_| ToolError::internal("dependency lock poisoned"))? = Arc::clone(&dependencies);

        let modules = std::mem::take(&mut *self.inner.pending()?);
        let mut registered = 0;
        for module in modules {
            let module_name = module.name().to_string();
            let kind = module.kind();

            let tools = match module.resolve(Arc::clone(&dependencies)).await {
                Ok(tools) => tools,
                Err(error) => {
                    self.inner.skip_module(&module_name, &error);
                    continue;
                }
            };

            for tool in tools {
                match self
                    .inner
                    .installer
                    .install(tool, ToolOrigin::Module(module_name.clone()))
                {
                    Ok(_) => registered += 1,
                    Err(error) if error.kind == ToolErrorKind::Internal => return Err(error),
                    // Only the offending tool is skipped; its siblings still install.
                    Err(error) => self.inner.skip_module(&module_name, &error),
                }
            }
            tracing::debug!(module = %module_name, kind = %kind, "tool module resolved");
        }

        Ok(registered)
    }

    pub async fn execute_default(
        &self,
        tool_name: &str,
        args: Value,
    ) -> Result<ExecutionResult, ToolError> {
        self.execute_with(tool_name, args, ExecuteOptions::default())
            .await
    }

    pub async fn execute_with(
        &self,
        tool_name: &str,
        args: Value,
        options: ExecuteOptions,
    ) -> Result<ExecutionResult, ToolError> {
        if !self.is_ready() {
            return Err(ToolError::not_ready(
                "tool runtime must be initialized before execute",
            )
            .with_tool_name(tool_name));
        }

        let args = match args {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        self.inner.hooks.on_execution_start(tool_name, &args);
        let result = self.inner.run(tool_name, args, options).await;
        match &result {
            ExecutionResult::Success {
                from_cache,
                execution_time,
                ..
            } => self
                .inner
                .hooks
                .on_execution_success(tool_name, *from_cache, *execution_time),
            ExecutionResult::Failure {
                error,
                execution_time,
            } => self
                .inner
                .hooks
                .on_execution_failure(tool_name, error, *execution_time),
        }

        Ok(result)
    }

    pub fn register_dynamic_tool<F, Fut>(
        &self,
        name: &str,
        handler: F,
        schema: ToolSchema,
    ) -> Result<ToolRegistration, ToolError>
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        self.inner.installer.register_dynamic(name, handler, schema)
    }

    pub fn installer(&self) -> ToolInstaller {
        self.inner.installer.clone()
    }

    pub fn stats_snapshot(&self) -> Result<StatsSnapshot, ToolError> {
        let cache_size = self.inner.cache.len()?;
        let open_circuits = self.inner.breaker.open_circuits()?;
        let registered_tools = self.tool_count()?;
        let stats = self.inner.stats()?;

        Ok(StatsSnapshot {
            total_calls: stats.total_calls(),
            successful_calls: stats.successful_calls(),
            failed_calls: stats.failed_calls(),
            success_rate: stats.success_rate(),
            average_execution_ms: stats.average_execution_ms(),
            per_tool_usage: stats.per_tool_usage().clone(),
            cache_size,
            cache_hits: stats.cache_hits(),
            open_circuits,
            registered_tools,
            recent_failures: stats.failures().len(),
        })
    }

    pub fn learning_log(&self) -> Result<LearningSnapshot, ToolError> {
        Ok(self.inner.stats()?.learning_snapshot())
    }

    pub fn reset_stats(&self) -> Result<(), ToolError> {
        self.inner.stats()?.reset();
        Ok(())
    }

    pub fn clear_cache(&self) -> Result<(), ToolError> {
        self.inner.cache.clear()
    }

    pub fn clear_tool_cache(&self, tool_name: &str) -> Result<usize, ToolError> {
        self.inner.cache.clear_tool(tool_name)
    }

    pub fn reset_circuit(&self, tool_name: &str) -> Result<(), ToolError> {
        if let Some(transition) = self.inner.breaker.reset(tool_name)? {
            self.inner.report_transition(&transition);
        }
        Ok(())
    }

    pub fn circuit_state(&self, tool_name: &str) -> Result<CircuitState, ToolError> {
        self.inner.breaker.state(tool_name)
    }

    /// Removes a tool along with its cached results, rate window, and circuit.
    pub fn unregister_tool(&self, tool_name: &str) -> Result<bool, ToolError> {
        let removed = self
            .inner
            .registry
            .write()
            .map_err(|_| ToolError::internal("tool registry lock poisoned"))?
            .remove(tool_name)
            .is_some();

        if removed {
            self.inner.cache.clear_tool(tool_name)?;
            self.inner.rate_limiter.reset(tool_name)?;
            self.inner.breaker.reset(tool_name)?;
            tracing::info!(tool = %tool_name, "tool unregistered");
        }
        Ok(removed)
    }

    pub fn tool_count(&self) -> Result<usize, ToolError> {
        Ok(self.inner.registry()?.len())
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.inner
            .registry()
            .map(|registry| registry.contains(tool_name))
            .unwrap_or(false)
    }
}

impl ToolRuntime for DefaultToolRuntime {
    fn execute<'a>(
        &'a self,
        tool_name: &'a str,
        args: Value,
    ) -> ToolFuture<'a, Result<ExecutionResult, ToolError>> {
        Box::pin(self.execute_with(tool_name, args, ExecuteOptions::default()))
    }

    fn tool_schemas(&self) -> Result<Vec<ToolSchema>, ToolError> {
        Ok(self.inner.registry()?.schemas())
    }
}

impl RuntimeInner {
    fn lifecycle(&self) -> Result<MutexGuard<'_, Lifecycle>, ToolError> {
        self.lifecycle
            .lock()
            .map_err(|_| ToolError::internal("runtime lifecycle lock poisoned"))
    }

    fn pending(&self) -> Result<MutexGuard<'_, Vec<ToolModule>>, ToolError> {
        self.pending
            .lock()
            .map_err(|_| ToolError::internal("module queue lock poisoned"))
    }

    fn stats(&self) -> Result<MutexGuard<'_, ExecutionStats>, ToolError> {
        self.stats
            .lock()
            .map_err(|_| ToolError::internal("execution stats lock poisoned"))
    }

    fn registry(&self) -> Result<RwLockReadGuard<'_, ToolRegistry>, ToolError> {
        self.registry
            .read()
            .map_err(|_| ToolError::internal("tool registry lock poisoned"))
    }

    fn skip_module(&self, module_name: &str, error: &ToolError) {
        tracing::warn!(module = %module_name, error = %error, "skipping tool module registration");
        self.hooks.on_registration_failure(module_name, error);
    }

    fn report_transition(&self, transition: &CircuitTransition) {
        if transition.to == CircuitState::Open {
            tracing::warn!(
                tool = %transition.tool_name,
                from = %transition.from,
                to = %transition.to,
                "circuit opened"
            );
        } else {
            tracing::info!(
                tool = %transition.tool_name,
                from = %transition.from,
                to = %transition.to,
                "circuit transition"
            );
        }
        self.hooks.on_circuit_transition(transition);
    }

    async fn run(&self, tool_name: &str, args: Value, options: ExecuteOptions) -> ExecutionResult {
        let started = Instant::now();

        let entry = match self.lookup(tool_name) {
            Ok(entry) => entry,
            Err(error) => {
                if let Ok(mut stats) = self.stats() {
                    stats.record_unknown_tool();
                }
                return ExecutionResult::failure(error, started.elapsed());
            }
        };

        let policy = self.config.policy_for(tool_name);
        let admission = match self.admit(tool_name, &entry, &args, policy, options) {
            Ok(Gate::Dispatch(admission)) => admission,
            Ok(Gate::Cached(result)) => {
                return match self.stats() {
                    Ok(mut stats) => {
                        stats.record_cache_hit(tool_name);
                        ExecutionResult::cached(result, started.elapsed())
                    }
                    Err(error) => ExecutionResult::failure(error, started.elapsed()),
                };
            }
            Err(error) => {
                if let Ok(mut stats) = self.stats() {
                    stats.record_rejection(tool_name);
                }
                return ExecutionResult::failure(error, started.elapsed());
            }
        };

        let mut trial = TrialSlot::new(&self.breaker, tool_name, admission);
        let context = match self.context_for(tool_name) {
            Ok(context) => context,
            Err(error) => return ExecutionResult::failure(error, started.elapsed()),
        };
        let timeout = options.timeout.unwrap_or(policy.timeout);
        let outcome = dispatch(entry.tool.as_ref(), args.clone(), &context, timeout).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(result) => {
                match self.settle_success(&mut trial, &args, &result, policy, options, elapsed) {
                    Ok(()) => ExecutionResult::success(result, elapsed),
                    Err(error) => ExecutionResult::failure(error, elapsed),
                }
            }
            Err(error) => {
                let error = normalize_handler_error(error, tool_name);
                match self.settle_failure(&mut trial, &args, &error, policy) {
                    Ok(()) => ExecutionResult::failure(error, elapsed),
                    Err(internal) => ExecutionResult::failure(internal, elapsed),
                }
            }
        }
    }

    fn lookup(&self, tool_name: &str) -> Result<RegistryEntry, ToolError> {
        self.registry()?.entry(tool_name).ok_or_else(|| {
            ToolError::not_found(format!("tool '{tool_name}' is not registered"))
                .with_tool_name(tool_name)
        })
    }

    fn admit(
        &self,
        tool_name: &str,
        entry: &RegistryEntry,
        args: &Value,
        policy: ResolvedPolicy,
        options: ExecuteOptions,
    ) -> Result<Gate, ToolError> {
        validate_arguments(&entry.schema.parameters, args)
            .map_err(|error| error.with_tool_name(tool_name))?;
        self.rate_limiter.try_acquire(tool_name, policy.rate_limit)?;

        let decision = self.breaker.admit(tool_name, policy.circuit)?;
        if let Some(transition) = &decision.transition {
            self.report_transition(transition);
        }

        if options.use_cache && policy.caches_results() {
            let cached = self.cache.get(tool_name, args);
            if decision.admission == Admission::Trial && !matches!(cached, Ok(None)) {
                self.breaker.release_trial(tool_name)?;
            }
            if let Some(result) = cached? {
                return Ok(Gate::Cached(result));
            }
        }

        Ok(Gate::Dispatch(decision.admission))
    }

    fn context_for(&self, tool_name: &str) -> Result<ToolContext, ToolError> {
        let dependencies = self
            .dependencies
            .read()
            .map_err(|_| ToolError::internal("dependency lock poisoned"))?;
        Ok(ToolContext::new(
            tool_name,
            Arc::clone(&dependencies),
            self.installer.clone(),
        ))
    }

    fn settle_success(
        &self,
        trial: &mut TrialSlot<'_>,
        args: &Value,
        result: &Value,
        policy: ResolvedPolicy,
        options: ExecuteOptions,
        elapsed: Duration,
    ) -> Result<(), ToolError> {
        let tool_name = trial.tool_name;
        let transition = self.breaker.record_success(tool_name)?;
        trial.settle();
        if let Some(transition) = transition {
            self.report_transition(&transition);
        }
        if options.use_cache && policy.caches_results() {
            self.cache
                .put(tool_name, args, result.clone(), policy.cache_ttl)?;
        }
        self.stats()?.record_success(tool_name, args, elapsed);
        Ok(())
    }

    /// Non-tripping failures leave the trial slot to be released by `trial`.
    fn settle_failure(
        &self,
        trial: &mut TrialSlot<'_>,
        args: &Value,
        error: &ToolError,
        policy: ResolvedPolicy,
    ) -> Result<(), ToolError> {
        let tool_name = trial.tool_name;
        if error.kind.trips_circuit() {
            let transition = self.breaker.record_failure(tool_name, policy.circuit)?;
            trial.settle();
            if let Some(transition) = transition {
                self.report_transition(&transition);
            }
        }
        self.stats()?.record_failure(tool_name, args, error);
        Ok(())
    }
}

/// Holds a half-open trial slot until the breaker records the trial's
/// outcome. Dropping it unsettled, including when the `execute` future is
/// cancelled mid-dispatch, hands the slot back.
struct TrialSlot<'a> {
    breaker: &'a CircuitBreaker,
    tool_name: &'a str,
    held: bool,
}

impl<'a> TrialSlot<'a> {
    fn new(breaker: &'a CircuitBreaker, tool_name: &'a str, admission: Admission) -> Self {
        Self {
            breaker,
            tool_name,
            held: admission == Admission::Trial,
        }
    }

    fn settle(&mut self) {
        self.held = false;
    }
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        if let Err(error) = self.breaker.release_trial(self.tool_name) {
            tracing::error!(tool = %self.tool_name, error = %error, "failed to release circuit trial");
        } else {
            tracing::debug!(tool = %self.tool_name, "circuit trial released without an outcome");
        }
    }
}

async fn dispatch(
    tool: &dyn Tool,
    args: Value,
    context: &ToolContext,
    timeout: Duration,
) -> Result<Value, ToolError> {
    let invocation = AssertUnwindSafe(async move { tool.invoke(args, context).await })
        .catch_unwind()
        .boxed();

    // A deadline past the end of representable time means no deadline.
    if Instant::now().checked_add(timeout).is_none() {
        return unwind_outcome(invocation.await, &context.tool_name);
    }

    match select(invocation, Delay::new(timeout)).await {
        Either::Left((outcome, _)) => unwind_outcome(outcome, &context.tool_name),
        Either::Right(((), _)) => Err(ToolError::timeout(format!(
            "tool '{}' timed out after {}ms",
            context.tool_name,
            timeout.as_millis()
        ))),
    }
}

fn unwind_outcome(
    outcome: Result<Result<Value, ToolError>, Box<dyn Any + Send>>,
    tool_name: &str,
) -> Result<Value, ToolError> {
    outcome.unwrap_or_else(|payload| {
        Err(ToolError::execution(format!(
            "tool '{tool_name}' panicked: {}",
            panic_message(&*payload)
        )))
    })
}

/// Handler errors surface as execution failures unless they are caller
/// errors or timeouts.
fn normalize_handler_error(error: ToolError, tool_name: &str) -> ToolError {
    let error = match error.kind {
        ToolErrorKind::Validation | ToolErrorKind::Timeout | ToolErrorKind::Execution => error,
        _ => ToolError::new(ToolErrorKind::Execution, error.message, error.retryable),
    };
    error.with_tool_name(tool_name)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
