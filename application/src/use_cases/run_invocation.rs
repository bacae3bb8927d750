//! Run Invocation use case.
//!
//! Drives one planner tool call through its lifecycle and persists every
//! transition on the thread's tail message:
//!
//! ```text
//! propose()  ── partial-call (raw args, may be incomplete)
//! run()      ── call (validated args when they pass, raw otherwise)
//!            ── Dispatcher (validate → confirm → execute)
//!            ── result (envelope attached)
//! ```
//!
//! The `call` upsert is the dispatch gate: only the run that moves a record
//! into `call` executes the action. A second `call` for the same
//! `toolCallId` is rejected by the thread before anything runs.
//!
//! Runs in flight share a per-thread [`CancellationToken`].
//! [`close_thread`] deactivates the thread first and then cancels that
//! token, so every confirmation still pending resolves to `cancelled`. The
//! settling `result` is still accepted by the now inactive thread.
//!
//! [`close_thread`]: RunInvocationUseCase::close_thread

use super::dispatch::Dispatcher;
use crate::ports::audit_logger::{AuditEvent, AuditLogger, NoAuditLogger, events};
use crate::ports::conversation_repository::{ConversationRepository, StoreError};
use dispatch_domain::{
    ActionContext, ActionDescriptor, CallerIdentity, ConversationMessage, InvocationResult,
    InvocationState, InvocationUpdate, LifecycleError, ThreadError, ToolCallId,
    ToolInvocationRecord,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can occur while recording an invocation.
#[derive(Error, Debug)]
pub enum RunInvocationError {
    #[error("Failed to record invocation: {0}")]
    Store(#[from] StoreError),

    /// Another run already moved this tool call to `call`; nothing was
    /// dispatched.
    #[error("Tool call '{0}' was already dispatched")]
    AlreadyDispatched(ToolCallId),

    /// The action ran but its result could not be persisted.
    #[error("Action finished with '{}' but the result was not recorded: {source}", .result.status())]
    ResultNotRecorded {
        result: Box<InvocationResult>,
        source: StoreError,
    },
}

/// A tool call as emitted by the planner.
#[derive(Debug, Clone)]
pub struct PlannerCall {
    pub tool_call_id: ToolCallId,
    /// Name or alias, as the planner wrote it.
    pub name: String,
    pub args: Value,
}

impl PlannerCall {
    pub fn new(tool_call_id: impl Into<ToolCallId>, name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Where an invocation is recorded and on whose behalf it runs.
#[derive(Debug, Clone)]
pub struct InvocationScope {
    pub thread_id: String,
    /// Tail message the invocation belongs to.
    pub message_id: String,
    pub caller: CallerIdentity,
    pub network: String,
}

/// Result of [`RunInvocationUseCase::run`].
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub result: InvocationResult,
    /// The record as persisted (state `result`).
    pub record: ToolInvocationRecord,
}

/// Cancellation shared by the runs of one thread.
struct ThreadRuns {
    token: CancellationToken,
    generation: u64,
    in_flight: usize,
}

#[derive(Default)]
struct RunRegistry {
    threads: HashMap<String, ThreadRuns>,
    next_generation: u64,
}

/// Registration of one run; the thread entry is dropped with its last run.
struct RunGuard<'a> {
    registry: &'a Mutex<RunRegistry>,
    thread_id: String,
    generation: u64,
    token: CancellationToken,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let finished = match registry.threads.get_mut(&self.thread_id) {
            Some(runs) if runs.generation == self.generation => {
                runs.in_flight = runs.in_flight.saturating_sub(1);
                runs.in_flight == 0
            }
            _ => false,
        };
        if finished {
            registry.threads.remove(&self.thread_id);
        }
    }
}

pub struct RunInvocationUseCase {
    dispatcher: Dispatcher,
    repository: Arc<dyn ConversationRepository>,
    audit: Arc<dyn AuditLogger>,
    runs: Mutex<RunRegistry>,
}

impl RunInvocationUseCase {
    pub fn new(dispatcher: Dispatcher, repository: Arc<dyn ConversationRepository>) -> Self {
        Self {
            dispatcher,
            repository,
            audit: Arc::new(NoAuditLogger),
            runs: Mutex::default(),
        }
    }

    /// Create with an audit logger.
    pub fn with_audit_logger(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn lock_runs(&self) -> MutexGuard<'_, RunRegistry> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, thread_id: &str) -> RunGuard<'_> {
        let mut registry = self.lock_runs();
        let next = registry.next_generation;
        let runs = registry
            .threads
            .entry(thread_id.to_string())
            .or_insert_with(|| ThreadRuns {
                token: CancellationToken::new(),
                generation: next,
                in_flight: 0,
            });
        runs.in_flight += 1;
        let generation = runs.generation;
        let token = runs.token.clone();
        registry.next_generation = next.max(generation + 1);

        RunGuard {
            registry: &self.runs,
            thread_id: thread_id.to_string(),
            generation,
            token,
        }
    }

    /// Runs of `thread_id` currently in flight.
    pub fn in_flight(&self, thread_id: &str) -> usize {
        self.lock_runs()
            .threads
            .get(thread_id)
            .map_or(0, |runs| runs.in_flight)
    }

    /// Cancel every run in flight for a thread, leaving the thread open.
    ///
    /// Pending confirmations resolve to `cancelled`; handlers that already
    /// started are not interrupted. Returns how many runs were signalled.
    pub fn cancel_runs(&self, thread_id: &str) -> usize {
        let runs = self.lock_runs().threads.remove(thread_id);
        match runs {
            Some(runs) => {
                runs.token.cancel();
                debug!("Cancelled {} run(s) in thread {}", runs.in_flight, thread_id);
                runs.in_flight
            }
            None => 0,
        }
    }

    /// Append an empty assistant message to hold this turn's invocations.
    pub async fn start_assistant_message(
        &self,
        thread_id: &str,
        content: impl Into<String>,
    ) -> Result<String, RunInvocationError> {
        let message = ConversationMessage::assistant(content);
        let message_id = message.id.clone();
        self.repository.append_message(thread_id, message).await?;
        debug!("Started assistant message {} in thread {}", message_id, thread_id);
        Ok(message_id)
    }

    /// Record a streaming (`partial-call`) observation.
    pub async fn propose(
        &self,
        scope: &InvocationScope,
        call: &PlannerCall,
    ) -> Result<ToolInvocationRecord, RunInvocationError> {
        let tool_name = self.tool_name(&call.name);
        let record = self
            .repository
            .upsert_tail_invocation(
                &scope.thread_id,
                &scope.message_id,
                InvocationUpdate::partial_call(call.tool_call_id.clone(), &tool_name, call.args.clone()),
            )
            .await
            .inspect_err(|e| warn!(tool_call_id = %call.tool_call_id, "Rejected partial call: {}", e))?;

        self.audit.log(AuditEvent::new(
            events::INVOCATION_PROPOSED,
            json!({
                "thread_id": scope.thread_id,
                "tool_call_id": call.tool_call_id,
                "action": tool_name,
                "args": call.args,
            }),
        ));
        Ok(record)
    }

    /// Complete the call, dispatch it and record the result.
    pub async fn run(
        &self,
        scope: &InvocationScope,
        call: PlannerCall,
    ) -> Result<InvocationOutcome, RunInvocationError> {
        // registered before the call is recorded so a concurrent
        // close_thread always reaches this run
        let guard = self.enter(&scope.thread_id);
        let cancel = guard.token.child_token();
        let descriptor = self.dispatcher.registry().resolve(&call.name).ok().cloned();
        let tool_name = self.tool_name(&call.name);

        let call_args = descriptor
            .as_ref()
            .and_then(|d| d.validate(&call.args).ok())
            .unwrap_or_else(|| call.args.clone());

        self.repository
            .upsert_tail_invocation(
                &scope.thread_id,
                &scope.message_id,
                InvocationUpdate::call(call.tool_call_id.clone(), &tool_name, call_args.clone()),
            )
            .await
            .map_err(|e| match e {
                StoreError::Thread(ThreadError::Lifecycle(LifecycleError::AlreadyCalled(id))) => {
                    RunInvocationError::AlreadyDispatched(id)
                }
                other => RunInvocationError::Store(other),
            })
            .inspect_err(|e| warn!(tool_call_id = %call.tool_call_id, "Rejected call: {}", e))?;

        self.audit.log(AuditEvent::new(
            events::INVOCATION_CALLED,
            json!({
                "thread_id": scope.thread_id,
                "tool_call_id": call.tool_call_id,
                "action": tool_name,
                "args": call_args,
            }),
        ));

        let ctx = ActionContext::new(
            call.tool_call_id.clone(),
            scope.caller.clone(),
            scope.network.clone(),
        );
        let result = match &descriptor {
            Some(d) => self.dispatch(d, &call_args, &ctx, &cancel).await,
            None => {
                self.dispatcher
                    .dispatch_by_name(&call.name, &call_args, &ctx, &cancel)
                    .await
            }
        };
        drop(guard);

        let record = match self
            .repository
            .upsert_tail_invocation(
                &scope.thread_id,
                &scope.message_id,
                InvocationUpdate::result(call.tool_call_id.clone(), &tool_name, result.clone()),
            )
            .await
        {
            Ok(record) => record,
            Err(source) => {
                warn!(
                    tool_call_id = %call.tool_call_id,
                    "Result of '{}' could not be recorded: {}",
                    tool_name,
                    source
                );
                return Err(RunInvocationError::ResultNotRecorded {
                    result: Box::new(result),
                    source,
                });
            }
        };

        info!(
            tool_call_id = %call.tool_call_id,
            "Recorded '{}' result: {}",
            tool_name,
            result.status()
        );
        Ok(InvocationOutcome { result, record })
    }

    /// Deactivate a thread, then cancel its pending confirmations.
    pub async fn close_thread(&self, thread_id: &str) -> Result<(), RunInvocationError> {
        // after this no new call can be recorded; every run that recorded
        // one is registered and reached by cancel_runs
        self.repository.deactivate_thread(thread_id).await?;
        let cancelled = self.cancel_runs(thread_id);

        // calls run by another use case sharing the confirmation port
        let thread = self.repository.load_thread(thread_id).await?;
        let confirmation = self.dispatcher.confirmation();
        for (_, record) in thread
            .invocations()
            .filter(|(_, r)| r.state() == InvocationState::Call)
        {
            confirmation.cancel(record.tool_call_id());
        }

        info!("Closed thread {} ({} run(s) cancelled)", thread_id, cancelled);
        Ok(())
    }

    async fn dispatch(
        &self,
        descriptor: &ActionDescriptor,
        args: &Value,
        ctx: &ActionContext,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        self.dispatcher
            .dispatch_with_cancel(descriptor, args, ctx, cancel)
            .await
    }

    /// Canonical action name when the planner's name resolves, else the
    /// trimmed name as given.
    fn tool_name(&self, name: &str) -> String {
        self.dispatcher
            .registry()
            .resolve(name)
            .map(|d| d.name().to_string())
            .unwrap_or_else(|_| name.trim().to_string())
    }
}
