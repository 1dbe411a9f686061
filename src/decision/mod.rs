//! The decision-maker boundary: given a history, answer or ask for operations.

#[cfg(feature = "openai")]
pub mod http;
#[cfg(feature = "openai")]
pub mod openai;
pub mod scripted;

#[cfg(feature = "openai")]
pub use openai::OpenAiDecisionMaker;
pub use scripted::ScriptedDecisionMaker;

use async_trait::async_trait;

use crate::error::MathChatError;
use crate::operations::OperationSpec;
use crate::types::{Message, OperationRequest, Usage};

/// What the decision-maker wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Stop and return this text to the user.
    FinalAnswer { text: String, usage: Usage },
    /// Run these operations, then ask again.
    RequestOperations {
        text: String,
        requests: Vec<OperationRequest>,
        usage: Usage,
    },
}

impl Decision {
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer {
            text: text.into(),
            usage: Usage::default(),
        }
    }

    pub fn request(requests: Vec<OperationRequest>) -> Self {
        Self::from_parts(String::new(), requests, Usage::default())
    }

    /// Build from a raw response. No requests means a final answer.
    pub fn from_parts(text: String, requests: Vec<OperationRequest>, usage: Usage) -> Self {
        if requests.is_empty() {
            Self::FinalAnswer { text, usage }
        } else {
            Self::RequestOperations {
                text,
                requests,
                usage,
            }
        }
    }

    pub fn with_usage(mut self, value: Usage) -> Self {
        match &mut self {
            Self::FinalAnswer { usage, .. } | Self::RequestOperations { usage, .. } => {
                *usage = value;
            }
        }
        self
    }

    pub fn text(&self) -> &str {
        match self {
            Self::FinalAnswer { text, .. } | Self::RequestOperations { text, .. } => text,
        }
    }

    pub fn usage(&self) -> &Usage {
        match self {
            Self::FinalAnswer { usage, .. } | Self::RequestOperations { usage, .. } => usage,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::FinalAnswer { .. })
    }
}

/// An external capability that reads the history and decides.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    /// Decide on the next step given the full history and available operations.
    async fn decide(
        &self,
        history: &[Message],
        operations: &[OperationSpec],
    ) -> Result<Decision, MathChatError>;
}

#[async_trait]
impl<T: DecisionMaker + ?Sized> DecisionMaker for std::sync::Arc<T> {
    async fn decide(
        &self,
        history: &[Message],
        operations: &[OperationSpec],
    ) -> Result<Decision, MathChatError> {
        (**self).decide(history, operations).await
    }
}
