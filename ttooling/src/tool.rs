//! Tool trait contract for registry-managed capabilities.
//!
//! ```rust
//! use serde_json::{Value, json};
//! use ttooling::{FunctionTool, ParameterSpec, Tool, ToolSchema};
//!
//! let tool = FunctionTool::new(
//!     ToolSchema::new("echo", "Echoes input").required("text", ParameterSpec::string()),
//!     |args: Value, _ctx| async move { Ok(json!({ "echo": args["text"] })) },
//! );
//!
//! assert_eq!(tool.schema().name, "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tcommon::BoxFuture;

use crate::{ToolContext, ToolError, ToolSchema};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    fn invoke<'a>(
        &'a self,
        args: Value,
        context: &'a ToolContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>>;
}

type ToolHandler =
    dyn Fn(Value, ToolContext) -> ToolFuture<'static, Result<Value, ToolError>> + Send + Sync;

pub struct FunctionTool {
    schema: ToolSchema,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> =
            Arc::new(move |args, context| Box::pin(handler(args, context)));

        Self { schema, handler }
    }

    pub fn from_sync<F>(schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(Value, ToolContext) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self::new(schema, move |args, context| {
            let output = handler(args, context);
            async move { output }
        })
    }
}

impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    fn invoke<'a>(
        &'a self,
        args: Value,
        context: &'a ToolContext,
    ) -> ToolFuture<'a, Result<Value, ToolError>> {
        (self.handler)(args, context.clone())
    }
}
