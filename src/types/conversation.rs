//! Append-only conversation history for a single query.

use std::collections::HashSet;

use crate::error::MathChatError;

use super::message::{Message, OperationRequest, OperationResult, Role};

/// Ordered message history owned by one control-loop invocation.
///
/// Every operation request appended through [`Conversation::push_requests`]
/// must be resolved by exactly one [`Conversation::push_result`] before the
/// next assistant turn is accepted.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    pending: Vec<String>,
    seen_ids: HashSet<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history from a user query, optionally preceded by a system prompt.
    pub fn for_query(system_prompt: Option<&str>, query: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        if let Some(prompt) = system_prompt {
            conversation.messages.push(Message::system(prompt));
        }
        conversation.messages.push(Message::user(query));
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Request ids that have not been answered yet, in request order.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Append the assistant's final answer.
    pub fn push_answer(&mut self, text: impl Into<String>) -> Result<(), MathChatError> {
        self.ensure_resolved("final answer")?;
        self.messages.push(Message::assistant(text));
        Ok(())
    }

    /// Append an assistant turn that requests a batch of operations.
    ///
    /// Rejects the whole batch if any id repeats, either inside the batch or
    /// against an earlier request of this conversation.
    pub fn push_requests(
        &mut self,
        text: impl Into<String>,
        requests: Vec<OperationRequest>,
    ) -> Result<(), MathChatError> {
        self.ensure_resolved("operation batch")?;
        if requests.is_empty() {
            return Err(MathChatError::InvalidState(
                "an operation batch must contain at least one request".into(),
            ));
        }

        let mut batch_ids = HashSet::with_capacity(requests.len());
        for request in &requests {
            if self.seen_ids.contains(&request.id) || !batch_ids.insert(request.id.as_str()) {
                return Err(MathChatError::InvalidState(format!(
                    "operation request id '{}' was already used",
                    request.id
                )));
            }
        }

        for request in &requests {
            self.seen_ids.insert(request.id.clone());
            self.pending.push(request.id.clone());
        }
        self.messages
            .push(Message::assistant_with_requests(text, requests));
        Ok(())
    }

    /// Append the result for one pending request.
    pub fn push_result(&mut self, result: OperationResult) -> Result<(), MathChatError> {
        let Some(index) = self.pending.iter().position(|id| *id == result.request_id) else {
            return Err(MathChatError::InvalidState(format!(
                "no pending operation request with id '{}'",
                result.request_id
            )));
        };
        self.pending.remove(index);
        self.messages.push(Message::tool_result(result));
        Ok(())
    }

    /// The final answer, when the history ends with one.
    pub fn final_answer(&self) -> Option<&str> {
        match self.messages.last() {
            Some(msg) if msg.role == Role::Assistant && !msg.has_requests() => {
                Some(msg.content.as_str())
            }
            _ => None,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    fn ensure_resolved(&self, what: &str) -> Result<(), MathChatError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(MathChatError::InvalidState(format!(
                "cannot append {what} while {} operation request(s) are unresolved",
                self.pending.len()
            )))
        }
    }
}
