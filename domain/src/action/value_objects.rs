//! Action value objects: the uniform outcome envelope.
//!
//! Every dispatch produces exactly one [`InvocationResult`], whatever the
//! handler did. The envelope's shape is enforced on construction and on
//! deserialization:
//!
//! | status | `data` | `error` |
//! |--------|--------|---------|
//! | `success` | present | absent |
//! | `error` | absent | present |
//! | `cancelled` | absent | absent |

use super::schema::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes produced by the dispatch engine itself.
///
/// Handler-specific codes (`TRANSFER_ERROR`, `SWAP_ERROR`, ...) pass through
/// the dispatcher unmodified and are not listed here.
///
/// | Code | Retryable by planner? | Meaning |
/// |------|-----------|-------------|
/// | `VALIDATION_ERROR` | Yes | Bad or missing arguments, see `details` |
/// | `NOT_FOUND` | Yes | Unknown capability name |
/// | `NOT_EXECUTABLE` | No | Capability is advertised but runs elsewhere |
/// | `EXECUTION_ERROR` | No | Handler failed unexpectedly |
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const NOT_EXECUTABLE: &str = "NOT_EXECUTABLE";
    pub const EXECUTION_ERROR: &str = "EXECUTION_ERROR";
}

/// Outcome category of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Error,
    Cancelled,
}

impl InvocationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationStatus::Success => "success",
            InvocationStatus::Error => "error",
            InvocationStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error payload of a failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl InvocationError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Arguments rejected by the input schema; `details` lists every issue.
    pub fn validation(error: &ValidationError) -> Self {
        let details = serde_json::to_value(&error.issues).unwrap_or(Value::Null);
        Self::new(codes::VALIDATION_ERROR, error.to_string()).with_details(details)
    }

    pub fn not_found(query: impl AsRef<str>) -> Self {
        Self::new(
            codes::NOT_FOUND,
            format!("No action matches '{}'", query.as_ref()),
        )
    }

    pub fn not_executable(action: impl AsRef<str>) -> Self {
        Self::new(
            codes::NOT_EXECUTABLE,
            format!("Action '{}' has no handler and cannot be executed here", action.as_ref()),
        )
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(codes::EXECUTION_ERROR, message)
    }

    /// Whether a planner may usefully retry with different arguments.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code.as_str(), codes::VALIDATION_ERROR | codes::NOT_FOUND)
    }
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for InvocationError {}

/// The single envelope returned by every dispatch.
///
/// Fields are private so the status/payload pairing cannot be broken;
/// build one with [`success`](Self::success), [`failure`](Self::failure) or
/// [`cancelled`](Self::cancelled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InvocationResultRepr", into = "InvocationResultRepr")]
pub struct InvocationResult {
    status: InvocationStatus,
    message: String,
    data: Option<Value>,
    error: Option<InvocationError>,
}

impl InvocationResult {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed invocation; the envelope message mirrors the error message.
    pub fn failure(error: InvocationError) -> Self {
        Self {
            status: InvocationStatus::Error,
            message: error.message.clone(),
            data: None,
            error: Some(error),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Cancelled,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    pub fn status(&self) -> InvocationStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&InvocationError> {
        self.error.as_ref()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == InvocationStatus::Cancelled
    }
}

#[derive(Serialize, Deserialize)]
struct InvocationResultRepr {
    status: InvocationStatus,
    message: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<InvocationError>,
}

/// Distinguishes an explicit `"data": null` (success with no payload) from a
/// missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<InvocationResultRepr> for InvocationResult {
    type Error = String;

    fn try_from(repr: InvocationResultRepr) -> Result<Self, Self::Error> {
        match (repr.status, &repr.data, &repr.error) {
            (InvocationStatus::Success, Some(_), None)
            | (InvocationStatus::Error, None, Some(_))
            | (InvocationStatus::Cancelled, None, None) => Ok(Self {
                status: repr.status,
                message: repr.message,
                data: repr.data,
                error: repr.error,
            }),
            (status, _, _) => Err(format!(
                "invocation result with status '{}' has mismatched data/error fields",
                status
            )),
        }
    }
}

impl From<InvocationResult> for InvocationResultRepr {
    fn from(result: InvocationResult) -> Self {
        Self {
            status: result.status,
            message: result.message,
            data: result.data,
            error: result.error,
        }
    }
}
