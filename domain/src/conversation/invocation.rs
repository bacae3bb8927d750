//! Tool invocation lifecycle.
//!
//! Tracks one planner call inside a conversation message. A record moves
//! strictly forward through three states:
//!
//! ```text
//! partial-call ──> call ──> result
//!   (streaming)    (args     (terminal,
//!                  complete)  envelope attached)
//! ```
//!
//! A record may be opened at `partial-call` or, for planners that do not
//! stream, directly at `call`. It may never be opened at `result`, skip
//! `call`, or move backward. Every change goes through
//! [`ToolInvocationRecord::apply`], which is the only transition function.

use crate::action::value_objects::InvocationResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Unique identifier of one planner tool call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCallId(String);

impl ToolCallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for calls the planner did not label.
    pub fn generate() -> Self {
        Self(format!("call_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ToolCallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for ToolCallId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

/// Lifecycle state of a tool invocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvocationState {
    PartialCall,
    Call,
    Result,
}

impl InvocationState {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationState::PartialCall => "partial-call",
            InvocationState::Call => "call",
            InvocationState::Result => "result",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Result)
    }
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Tool call '{0}' cannot be recorded as a result before it was called")]
    ResultWithoutCall(ToolCallId),

    #[error("Tool call '{id}' cannot move backward from '{from}' to '{to}'")]
    Backward {
        id: ToolCallId,
        from: InvocationState,
        to: InvocationState,
    },

    #[error("Tool call '{0}' already has a result and is immutable")]
    AlreadyCompleted(ToolCallId),

    #[error("Tool call '{0}' was already called with different arguments")]
    ConflictingCall(ToolCallId),

    /// A second `call` for the same id; only the first one may dispatch.
    #[error("Tool call '{0}' was already called")]
    AlreadyCalled(ToolCallId),

    #[error("Tool call '{id}' belongs to '{expected}', not '{actual}'")]
    ToolNameMismatch {
        id: ToolCallId,
        expected: String,
        actual: String,
    },

    #[error("Update for tool call '{actual}' applied to record '{expected}'")]
    IdMismatch {
        expected: ToolCallId,
        actual: ToolCallId,
    },
}

/// A requested change to a record, keyed by `tool_call_id`.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationUpdate {
    /// Planner is still streaming arguments.
    PartialCall {
        tool_call_id: ToolCallId,
        tool_name: String,
        args: Value,
    },
    /// Arguments are complete (and validated, when the action is known).
    Call {
        tool_call_id: ToolCallId,
        tool_name: String,
        args: Value,
    },
    /// Dispatch finished.
    Result {
        tool_call_id: ToolCallId,
        tool_name: String,
        result: InvocationResult,
    },
}

impl InvocationUpdate {
    pub fn partial_call(
        tool_call_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::PartialCall {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    pub fn call(
        tool_call_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::Call {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }

    pub fn result(
        tool_call_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
        result: InvocationResult,
    ) -> Self {
        Self::Result {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
        }
    }

    pub fn tool_call_id(&self) -> &ToolCallId {
        match self {
            Self::PartialCall { tool_call_id, .. }
            | Self::Call { tool_call_id, .. }
            | Self::Result { tool_call_id, .. } => tool_call_id,
        }
    }

    pub fn tool_name(&self) -> &str {
        match self {
            Self::PartialCall { tool_name, .. }
            | Self::Call { tool_name, .. }
            | Self::Result { tool_name, .. } => tool_name,
        }
    }

    pub fn state(&self) -> InvocationState {
        match self {
            Self::PartialCall { .. } => InvocationState::PartialCall,
            Self::Call { .. } => InvocationState::Call,
            Self::Result { .. } => InvocationState::Result,
        }
    }
}

/// Persisted record of one tool call within a message.
///
/// `result` is present if and only if `state == result`; deserialization
/// rejects documents that break this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ToolInvocationRepr")]
pub struct ToolInvocationRecord {
    tool_call_id: ToolCallId,
    tool_name: String,
    args: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<InvocationResult>,
    state: InvocationState,
}

impl ToolInvocationRecord {
    /// Open a new record from its first observed update.
    pub fn open(update: InvocationUpdate) -> Result<Self, LifecycleError> {
        match update {
            InvocationUpdate::PartialCall {
                tool_call_id,
                tool_name,
                args,
            } => Ok(Self {
                tool_call_id,
                tool_name,
                args,
                result: None,
                state: InvocationState::PartialCall,
            }),
            InvocationUpdate::Call {
                tool_call_id,
                tool_name,
                args,
            } => Ok(Self {
                tool_call_id,
                tool_name,
                args,
                result: None,
                state: InvocationState::Call,
            }),
            InvocationUpdate::Result { tool_call_id, .. } => {
                Err(LifecycleError::ResultWithoutCall(tool_call_id))
            }
        }
    }

    /// Apply an update, enforcing forward-only transitions.
    ///
    /// | from \ to | partial-call | call | result |
    /// |-----------|--------------|------|--------|
    /// | partial-call | args replaced | ok | rejected (skips call) |
    /// | call | rejected | rejected (`AlreadyCalled` / `ConflictingCall`) | ok |
    /// | result | rejected | rejected | rejected |
    pub fn apply(&mut self, update: InvocationUpdate) -> Result<(), LifecycleError> {
        if update.tool_call_id() != &self.tool_call_id {
            return Err(LifecycleError::IdMismatch {
                expected: self.tool_call_id.clone(),
                actual: update.tool_call_id().clone(),
            });
        }
        if update.tool_name() != self.tool_name {
            return Err(LifecycleError::ToolNameMismatch {
                id: self.tool_call_id.clone(),
                expected: self.tool_name.clone(),
                actual: update.tool_name().to_string(),
            });
        }

        let id = self.tool_call_id.clone();
        match (self.state, update) {
            (InvocationState::Result, _) => Err(LifecycleError::AlreadyCompleted(id)),
            (InvocationState::PartialCall, InvocationUpdate::PartialCall { args, .. }) => {
                self.args = args;
                Ok(())
            }
            (InvocationState::PartialCall, InvocationUpdate::Call { args, .. }) => {
                self.args = args;
                self.state = InvocationState::Call;
                Ok(())
            }
            (InvocationState::PartialCall, InvocationUpdate::Result { .. }) => {
                Err(LifecycleError::ResultWithoutCall(id))
            }
            (InvocationState::Call, InvocationUpdate::PartialCall { .. }) => {
                Err(LifecycleError::Backward {
                    id,
                    from: InvocationState::Call,
                    to: InvocationState::PartialCall,
                })
            }
            (InvocationState::Call, InvocationUpdate::Call { args, .. }) => {
                if args == self.args {
                    Err(LifecycleError::AlreadyCalled(id))
                } else {
                    Err(LifecycleError::ConflictingCall(id))
                }
            }
            (InvocationState::Call, InvocationUpdate::Result { result, .. }) => {
                self.result = Some(result);
                self.state = InvocationState::Result;
                Ok(())
            }
        }
    }

    pub fn tool_call_id(&self) -> &ToolCallId {
        &self.tool_call_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    pub fn result(&self) -> Option<&InvocationResult> {
        self.result.as_ref()
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolInvocationRepr {
    tool_call_id: ToolCallId,
    tool_name: String,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    result: Option<InvocationResult>,
    state: InvocationState,
}

impl TryFrom<ToolInvocationRepr> for ToolInvocationRecord {
    type Error = String;

    fn try_from(repr: ToolInvocationRepr) -> Result<Self, Self::Error> {
        let has_result = repr.result.is_some();
        if has_result != (repr.state == InvocationState::Result) {
            return Err(format!(
                "tool invocation '{}' in state '{}' {} a result",
                repr.tool_call_id,
                repr.state,
                if has_result { "must not carry" } else { "must carry" }
            ));
        }
        Ok(Self {
            tool_call_id: repr.tool_call_id,
            tool_name: repr.tool_name,
            args: repr.args,
            result: repr.result,
            state: repr.state,
        })
    }
}
