//! Action domain module
//!
//! This module defines the **capability substrate** shared by every
//! integration: how an action is described, how a planner-supplied name is
//! resolved to it, how untrusted arguments are checked, and what envelope
//! every invocation produces.
//!
//! # Overview
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────┐    ┌──────────────────┐
//! │ ActionRegistry   │───▶│ InputSchema  │───▶│ InvocationResult │
//! │ (name / aliases) │    │ (validate)   │    │ (envelope)       │
//! └────────┬─────────┘    └──────────────┘    └──────────────────┘
//!          │
//!          ├─ names:   "transfer"   → ActionDescriptor
//!          └─ aliases: "send sonic" → "transfer"
//! ```
//!
//! # Alias Resolution
//!
//! Planners paraphrase capability names ("Send Sonic" for `transfer`).
//! Each [`ActionDescriptor`] carries an explicit alias set, compared after
//! normalization (trim, lowercase, collapsed whitespace). Collisions are
//! rejected at registration, so resolution never has to break ties.
//!
//! # Confirmation
//!
//! Descriptors flagged with
//! [`requiring_confirmation`](ActionDescriptor::requiring_confirmation) move
//! funds; the application-layer dispatcher suspends them until a human
//! accepts.
//!
//! # Key Types
//!
//! - [`ActionDescriptor`]: immutable capability metadata + optional handler
//! - [`ActionRegistry`]: registration self-checks and resolution
//! - [`InputSchema`]: argument contract with defaults, coercions, refinements
//! - [`Action`] / [`ActionHandler`]: typed and erased handler contracts
//! - [`InvocationResult`]: `success` / `error` / `cancelled` envelope
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application** (`Dispatcher`, `ToolAdapter`): orchestration, confirmation
//! - **Infrastructure**: concrete actions, schema export, persistence

pub mod descriptor;
pub mod handler;
pub mod registry;
pub mod schema;
pub mod value_objects;

pub use descriptor::{ActionDescriptor, ActionExample};
pub use handler::{
    Action, ActionContext, ActionFailure, ActionHandler, ActionSuccess, CallerIdentity,
    TypedHandler,
};
pub use registry::{ActionRegistry, RegistryError};
pub use schema::{
    FieldSpec, FieldType, InputSchema, PathSegment, Refinement, ValidationError, ValidationIssue,
};
pub use value_objects::{InvocationError, InvocationResult, InvocationStatus, codes};
