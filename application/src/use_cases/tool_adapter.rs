//! Tool adapter: the planner's view of the registry.
//!
//! Projects every descriptor into `{id, description, parameters,
//! requires_confirmation, execute?}`. Descriptors without a handler are
//! still listed (so the planner knows the capability exists) but carry no
//! `execute`. Invoking a tool delegates to the [`Dispatcher`] and returns its
//! envelope unchanged.

use super::dispatch::Dispatcher;
use crate::ports::tool_schema::ToolSchemaPort;
use dispatch_domain::{ActionContext, ActionDescriptor, InvocationResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callable half of a [`PlannerTool`].
#[derive(Clone)]
pub struct ToolExecute {
    descriptor: Arc<ActionDescriptor>,
    dispatcher: Dispatcher,
}

impl ToolExecute {
    pub async fn call(
        &self,
        args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        self.dispatcher
            .dispatch_with_cancel(&self.descriptor, args, ctx, cancel)
            .await
    }
}

/// One entry of the planner call surface.
#[derive(Clone, Serialize)]
pub struct PlannerTool {
    pub id: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
    pub requires_confirmation: bool,
    #[serde(skip)]
    pub execute: Option<ToolExecute>,
}

impl PlannerTool {
    pub fn is_executable(&self) -> bool {
        self.execute.is_some()
    }
}

impl std::fmt::Debug for PlannerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlannerTool")
            .field("id", &self.id)
            .field("requires_confirmation", &self.requires_confirmation)
            .field("executable", &self.is_executable())
            .finish()
    }
}

/// Builds and serves the planner call surface.
pub struct ToolAdapter {
    tools: Vec<PlannerTool>,
}

impl ToolAdapter {
    /// Project every descriptor in the dispatcher's registry, in
    /// registration order.
    pub fn new(dispatcher: &Dispatcher, schema: &dyn ToolSchemaPort) -> Self {
        let tools = dispatcher
            .registry()
            .iter()
            .map(|descriptor| PlannerTool {
                id: descriptor.name().to_string(),
                description: descriptor.description().to_string(),
                parameters: schema.input_schema(descriptor.input_schema()),
                requires_confirmation: descriptor.requires_confirmation(),
                execute: descriptor.is_executable().then(|| ToolExecute {
                    descriptor: Arc::clone(descriptor),
                    dispatcher: dispatcher.clone(),
                }),
            })
            .collect();
        Self { tools }
    }

    pub fn tools(&self) -> &[PlannerTool] {
        &self.tools
    }

    pub fn tool(&self, id: &str) -> Option<&PlannerTool> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Only the tools this process can run.
    pub fn executable_tools(&self) -> impl Iterator<Item = &PlannerTool> {
        self.tools.iter().filter(|t| t.is_executable())
    }

    /// The surface as a JSON array, as handed to a planner.
    pub fn surface_json(&self) -> Value {
        serde_json::to_value(&self.tools).unwrap_or(Value::Array(Vec::new()))
    }
}
