//! Action descriptors: immutable metadata for one capability.

use super::handler::{Action, ActionHandler, TypedHandler};
use super::schema::{InputSchema, ValidationError};
use crate::core::string::normalize_key;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Worked example shown to the planner.
///
/// `input` must satisfy the descriptor's schema; the registry checks this on
/// registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExample {
    pub input: Value,
    pub output: Value,
    pub explanation: String,
}

impl ActionExample {
    pub fn new(input: Value, output: Value, explanation: impl Into<String>) -> Self {
        Self {
            input,
            output,
            explanation: explanation.into(),
        }
    }
}

/// Description of one invocable capability.
///
/// Built once at startup and shared behind `Arc` for the process lifetime.
/// A descriptor without a handler is still advertised to the planner but is
/// executed elsewhere (e.g. rendered client-side).
#[derive(Clone)]
pub struct ActionDescriptor {
    name: String,
    aliases: Vec<String>,
    description: String,
    input_schema: InputSchema,
    examples: Vec<ActionExample>,
    requires_confirmation: bool,
    handler: Option<Arc<dyn ActionHandler>>,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: description.into(),
            input_schema: InputSchema::new(),
            examples: Vec::new(),
            requires_confirmation: false,
            handler: None,
        }
    }

    /// Add a resolution alias. Stored normalized; duplicates are ignored.
    pub fn with_alias(mut self, alias: impl AsRef<str>) -> Self {
        let alias = normalize_key(alias.as_ref());
        if !alias.is_empty() && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
        self
    }

    pub fn with_aliases(self, aliases: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        aliases.into_iter().fold(self, |d, alias| d.with_alias(alias))
    }

    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_example(mut self, example: ActionExample) -> Self {
        self.examples.push(example);
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    /// Attach a typed action as the handler.
    pub fn with_action<A: Action>(self, action: A) -> Self {
        self.with_handler(Arc::new(TypedHandler::new(action)))
    }

    pub fn with_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &InputSchema {
        &self.input_schema
    }

    pub fn examples(&self) -> &[ActionExample] {
        &self.examples
    }

    pub fn requires_confirmation(&self) -> bool {
        self.requires_confirmation
    }

    pub fn handler(&self) -> Option<&Arc<dyn ActionHandler>> {
        self.handler.as_ref()
    }

    pub fn is_executable(&self) -> bool {
        self.handler.is_some()
    }

    /// Validate raw arguments against this descriptor's schema.
    pub fn validate(&self, raw_args: &Value) -> Result<Value, ValidationError> {
        self.input_schema.validate(raw_args)
    }

    /// Index and error of the first example whose input fails the schema.
    pub fn first_invalid_example(&self) -> Option<(usize, ValidationError)> {
        self.examples
            .iter()
            .enumerate()
            .find_map(|(index, example)| self.validate(&example.input).err().map(|e| (index, e)))
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("requires_confirmation", &self.requires_confirmation)
            .field("examples", &self.examples.len())
            .field("executable", &self.is_executable())
            .finish()
    }
}
