//! Deterministic decision-maker driven by a queue of canned decisions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Decision, DecisionMaker};
use crate::error::MathChatError;
use crate::operations::OperationSpec;
use crate::types::Message;

type Step = Box<dyn Fn(&[Message]) -> Result<Decision, MathChatError> + Send + Sync>;

/// Replays scripted steps in order and records every history it was shown.
///
/// Once the script runs out, `decide` fails with
/// [`MathChatError::DecisionMakerUnavailable`].
#[derive(Default)]
pub struct ScriptedDecisionMaker {
    steps: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedDecisionMaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script that returns these decisions in order.
    pub fn from_decisions(decisions: impl IntoIterator<Item = Decision>) -> Self {
        decisions
            .into_iter()
            .fold(Self::new(), |script, decision| script.then(decision))
    }

    /// Append a fixed decision.
    pub fn then(self, decision: Decision) -> Self {
        self.then_with(move |_| Ok(decision.clone()))
    }

    /// Append a step that fails.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.then_with(move |_| {
            Err(MathChatError::DecisionMakerUnavailable {
                message: message.clone(),
            })
        })
    }

    /// Append a step computed from the history it receives.
    pub fn then_with<F>(self, step: F) -> Self
    where
        F: Fn(&[Message]) -> Result<Decision, MathChatError> + Send + Sync + 'static,
    {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(Box::new(step));
        }
        self
    }

    /// Number of `decide` calls so far.
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or_default()
    }

    /// Histories passed to each `decide` call, in call order.
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().map(|steps| steps.len()).unwrap_or_default()
    }
}

#[async_trait]
impl DecisionMaker for ScriptedDecisionMaker {
    async fn decide(
        &self,
        history: &[Message],
        _operations: &[OperationSpec],
    ) -> Result<Decision, MathChatError> {
        let step = {
            let mut seen = self
                .seen
                .lock()
                .map_err(|_| MathChatError::InvalidState("scripted history lock poisoned".into()))?;
            seen.push(history.to_vec());
            let mut steps = self
                .steps
                .lock()
                .map_err(|_| MathChatError::InvalidState("scripted step lock poisoned".into()))?;
            steps.pop_front()
        };
        match step {
            Some(step) => step(history),
            None => Err(MathChatError::DecisionMakerUnavailable {
                message: "scripted decision-maker has no more steps".into(),
            }),
        }
    }
}
