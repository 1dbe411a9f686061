//! Convenience re-exports for common use.

pub use crate::config::MathChatConfig;
pub use crate::control_loop::{ControlLoop, LoopConfig, LoopOutcome};
pub use crate::decision::{Decision, DecisionMaker, ScriptedDecisionMaker};
#[cfg(feature = "openai")]
pub use crate::decision::OpenAiDecisionMaker;
pub use crate::error::{MathChatError, OperationErrorKind, Result};
pub use crate::executor::{LocalExecutor, OperationExecutor};
pub use crate::operations::{OperationRegistry, OperationSpec};
pub use crate::types::{Message, OperationRequest, OperationResult, Role};
