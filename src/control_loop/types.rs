//! State, configuration and outcome of one control-loop invocation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_ITERATIONS;
use crate::types::{Message, Usage};

/// Identifier of one query's run through the loop.
pub type QueryId = Uuid;

/// Where the loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingDecision,
    ExecutingOperations,
    Done,
}

/// Limits and scheduling for the control loop.
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct LoopConfig {
    /// Maximum number of `decide` calls per query.
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,
    /// Run the operations of one batch concurrently.
    #[builder(default = true)]
    pub parallel_operations: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Result of a query that reached `Done`.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub query_id: QueryId,
    pub answer: String,
    /// The terminal history, ending in the final answer.
    pub history: Vec<Message>,
    /// Number of `decide` calls made.
    pub iterations: usize,
    pub operations_executed: usize,
    pub usage: Usage,
}
