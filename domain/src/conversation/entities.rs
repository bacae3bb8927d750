//! Conversation entities: persisted messages and threads.
//!
//! Messages embed their [`ToolInvocationRecord`]s. Only the tail message of
//! an active thread may change; everything before it is history and is
//! never rewritten.

use super::invocation::{
    InvocationState, InvocationUpdate, LifecycleError, ToolCallId, ToolInvocationRecord,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Author role of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Data,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Data => "data",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from mutating a thread or its messages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThreadError {
    #[error("Thread '{0}' is no longer active")]
    Inactive(String),

    #[error("Thread '{0}' has no messages")]
    EmptyThread(String),

    #[error("Message '{0}' already exists in this thread")]
    DuplicateMessage(String),

    #[error("Message '{0}' not found")]
    MessageNotFound(String),

    #[error("Message '{0}' is not the tail of the thread; history is immutable")]
    HistoryImmutable(String),

    #[error("Tool call '{0}' is already recorded on an earlier message")]
    DuplicateToolCall(ToolCallId),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// One persisted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_invocations: Vec<ToolInvocationRecord>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_invocations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn invocation(&self, tool_call_id: &ToolCallId) -> Option<&ToolInvocationRecord> {
        self.tool_invocations
            .iter()
            .find(|r| r.tool_call_id() == tool_call_id)
    }

    /// Insert or advance the record keyed by the update's `tool_call_id`.
    ///
    /// On error the message is left unchanged.
    pub fn upsert_invocation(
        &mut self,
        update: InvocationUpdate,
    ) -> Result<&ToolInvocationRecord, LifecycleError> {
        let position = self
            .tool_invocations
            .iter()
            .position(|r| r.tool_call_id() == update.tool_call_id());

        let index = match position {
            Some(index) => {
                let mut next = self.tool_invocations[index].clone();
                next.apply(update)?;
                self.tool_invocations[index] = next;
                index
            }
            None => {
                self.tool_invocations.push(ToolInvocationRecord::open(update)?);
                self.tool_invocations.len() - 1
            }
        };
        Ok(&self.tool_invocations[index])
    }

    /// Invocations still waiting for a result.
    pub fn open_invocations(&self) -> impl Iterator<Item = &ToolInvocationRecord> {
        self.tool_invocations
            .iter()
            .filter(|r| r.state() != InvocationState::Result)
    }
}

/// A persisted, append-only conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    pub thread_id: String,
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    pub is_active: bool,
}

impl ConversationThread {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), user_id)
    }

    pub fn with_id(thread_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            messages: Vec::new(),
            is_active: true,
        }
    }

    fn ensure_active(&self) -> Result<(), ThreadError> {
        if self.is_active {
            Ok(())
        } else {
            Err(ThreadError::Inactive(self.thread_id.clone()))
        }
    }

    /// Append a message to the end of the thread.
    pub fn append(&mut self, message: ConversationMessage) -> Result<(), ThreadError> {
        self.ensure_active()?;
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(ThreadError::DuplicateMessage(message.id));
        }
        for record in &message.tool_invocations {
            if self.find_invocation(record.tool_call_id()).is_some() {
                return Err(ThreadError::DuplicateToolCall(record.tool_call_id().clone()));
            }
        }
        self.messages.push(message);
        Ok(())
    }

    /// Apply an invocation update to the tail message.
    ///
    /// `message_id` must name the tail; earlier messages are immutable.
    /// Inactive threads only accept `result` updates, so calls that were in
    /// flight when the thread closed can still settle.
    pub fn upsert_tail_invocation(
        &mut self,
        message_id: &str,
        update: InvocationUpdate,
    ) -> Result<&ToolInvocationRecord, ThreadError> {
        if !matches!(update, InvocationUpdate::Result { .. }) {
            self.ensure_active()?;
        }

        let Some((tail, history)) = self.messages.split_last_mut() else {
            return Err(ThreadError::EmptyThread(self.thread_id.clone()));
        };
        if tail.id != message_id {
            return if history.iter().any(|m| m.id == message_id) {
                Err(ThreadError::HistoryImmutable(message_id.to_string()))
            } else {
                Err(ThreadError::MessageNotFound(message_id.to_string()))
            };
        }

        let id = update.tool_call_id();
        if history.iter().any(|m| m.invocation(id).is_some()) {
            return Err(ThreadError::DuplicateToolCall(id.clone()));
        }

        Ok(tail.upsert_invocation(update)?)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn tail(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    pub fn message(&self, message_id: &str) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn find_invocation(&self, tool_call_id: &ToolCallId) -> Option<&ToolInvocationRecord> {
        self.messages.iter().find_map(|m| m.invocation(tool_call_id))
    }

    /// Every invocation record, in message order.
    pub fn invocations(&self) -> impl Iterator<Item = (&ConversationMessage, &ToolInvocationRecord)> {
        self.messages
            .iter()
            .flat_map(|m| m.tool_invocations.iter().map(move |r| (m, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::value_objects::InvocationResult;
    use serde_json::json;

    fn thread_with_tail() -> (ConversationThread, String) {
        let mut thread = ConversationThread::with_id("t-1", "user-1");
        thread.append(ConversationMessage::user("send 1 S to bob")).unwrap();
        let reply = ConversationMessage::assistant("");
        let id = reply.id.clone();
        thread.append(reply).unwrap();
        (thread, id)
    }

    #[test]
    fn test_new_thread_is_active_and_empty() {
        let thread = ConversationThread::new("user-1");
        assert!(thread.is_active);
        assert!(thread.messages.is_empty());
        assert!(thread.tail().is_none());
    }

    #[test]
    fn test_append_rejects_duplicate_message_id() {
        let mut thread = ConversationThread::with_id("t", "u");
        thread.append(ConversationMessage::user("a").with_id("m1")).unwrap();
        let err = thread
            .append(ConversationMessage::user("b").with_id("m1"))
            .unwrap_err();
        assert_eq!(err, ThreadError::DuplicateMessage("m1".into()));
    }

    #[test]
    fn test_inactive_thread_rejects_writes() {
        let (mut thread, tail) = thread_with_tail();
        thread.deactivate();
        assert!(matches!(
            thread.append(ConversationMessage::user("late")),
            Err(ThreadError::Inactive(_))
        ));
        assert!(matches!(
            thread.upsert_tail_invocation(&tail, InvocationUpdate::call("c", "x", json!({}))),
            Err(ThreadError::Inactive(_))
        ));
    }

    #[test]
    fn test_inactive_thread_settles_open_invocations() {
        let (mut thread, tail) = thread_with_tail();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::call("c", "transfer", json!({})))
            .unwrap();
        thread.deactivate();

        let record = thread
            .upsert_tail_invocation(
                &tail,
                InvocationUpdate::result("c", "transfer", InvocationResult::cancelled("closed")),
            )
            .unwrap();
        assert_eq!(record.state(), InvocationState::Result);

        // a result cannot open a record, even here
        assert!(matches!(
            thread.upsert_tail_invocation(
                &tail,
                InvocationUpdate::result("d", "transfer", InvocationResult::cancelled("closed")),
            ),
            Err(ThreadError::Lifecycle(LifecycleError::ResultWithoutCall(_)))
        ));
    }

    #[test]
    fn test_upsert_on_empty_thread() {
        let mut thread = ConversationThread::with_id("t", "u");
        let err = thread
            .upsert_tail_invocation("m", InvocationUpdate::call("c", "x", json!({})))
            .unwrap_err();
        assert_eq!(err, ThreadError::EmptyThread("t".into()));
    }

    #[test]
    fn test_history_is_immutable() {
        let (mut thread, _) = thread_with_tail();
        let first = thread.messages[0].id.clone();
        let err = thread
            .upsert_tail_invocation(&first, InvocationUpdate::call("c", "x", json!({})))
            .unwrap_err();
        assert_eq!(err, ThreadError::HistoryImmutable(first));

        let err = thread
            .upsert_tail_invocation("missing", InvocationUpdate::call("c", "x", json!({})))
            .unwrap_err();
        assert_eq!(err, ThreadError::MessageNotFound("missing".into()));
    }

    #[test]
    fn test_state_sequence_per_tool_call() {
        let (mut thread, tail) = thread_with_tail();
        let args = json!({"to": "0x1", "amount": "1"});

        let mut observed = Vec::new();
        for update in [
            InvocationUpdate::partial_call("c-1", "transfer", json!({"to": "0x1"})),
            InvocationUpdate::partial_call("c-1", "transfer", args.clone()),
            InvocationUpdate::call("c-1", "transfer", args.clone()),
            InvocationUpdate::result("c-1", "transfer", InvocationResult::cancelled("declined")),
        ] {
            let record = thread.upsert_tail_invocation(&tail, update).unwrap();
            observed.push(record.state());
        }

        // non-decreasing and ends in result
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(observed.last(), Some(&InvocationState::Result));

        let record = thread.find_invocation(&"c-1".into()).unwrap();
        assert!(record.result().unwrap().is_cancelled());
        assert_eq!(thread.tail().unwrap().tool_invocations.len(), 1);
    }

    #[test]
    fn test_failed_transition_leaves_record_unchanged() {
        let (mut thread, tail) = thread_with_tail();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::call("c-1", "transfer", json!({"a": 1})))
            .unwrap();
        let err = thread
            .upsert_tail_invocation(&tail, InvocationUpdate::partial_call("c-1", "transfer", json!({})))
            .unwrap_err();
        assert!(matches!(err, ThreadError::Lifecycle(LifecycleError::Backward { .. })));

        let record = thread.find_invocation(&"c-1".into()).unwrap();
        assert_eq!(record.state(), InvocationState::Call);
        assert_eq!(record.args(), &json!({"a": 1}));
    }

    #[test]
    fn test_tool_call_id_unique_across_thread() {
        let (mut thread, tail) = thread_with_tail();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::call("c-1", "get_balance", json!({})))
            .unwrap();

        let next = ConversationMessage::assistant("more");
        let next_id = next.id.clone();
        thread.append(next).unwrap();

        let err = thread
            .upsert_tail_invocation(&next_id, InvocationUpdate::call("c-1", "get_balance", json!({})))
            .unwrap_err();
        assert_eq!(err, ThreadError::DuplicateToolCall("c-1".into()));
    }

    #[test]
    fn test_multiple_invocations_in_one_message() {
        let (mut thread, tail) = thread_with_tail();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::call("a", "get_balance", json!({})))
            .unwrap();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::partial_call("b", "transfer", json!({})))
            .unwrap();
        let message = thread.tail().unwrap();
        assert_eq!(message.tool_invocations.len(), 2);
        assert_eq!(message.open_invocations().count(), 2);
        assert_eq!(thread.invocations().count(), 2);
    }

    #[test]
    fn test_thread_serialization_shape() {
        let (mut thread, tail) = thread_with_tail();
        thread
            .upsert_tail_invocation(&tail, InvocationUpdate::call("c-1", "get_balance", json!({})))
            .unwrap();

        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(value["threadId"], "t-1");
        assert_eq!(value["isActive"], true);
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value["messages"][0].get("toolInvocations").is_none());
        assert_eq!(value["messages"][1]["toolInvocations"][0]["state"], "call");

        let back: ConversationThread = serde_json::from_value(value).unwrap();
        assert_eq!(back, thread);
    }
}
