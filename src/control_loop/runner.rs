//! The decide / execute state machine.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::events::{LoopEventEmitter, LoopEventPayload, LoopEventSink};
use super::types::{LoopConfig, LoopOutcome, LoopState};
use crate::decision::{Decision, DecisionMaker};
use crate::error::MathChatError;
use crate::executor::OperationExecutor;
use crate::operations::OperationSpec;
use crate::types::{Conversation, OperationRequest, OperationResult, Usage};

/// Alternates between asking the decision-maker and executing the
/// operations it requests until it produces a final answer.
///
/// The operation catalog is taken from the executor once, at construction,
/// and stays fixed for the lifetime of the loop. Every query gets its own
/// history; a `ControlLoop` can serve many queries concurrently.
pub struct ControlLoop {
    decision_maker: Arc<dyn DecisionMaker>,
    executor: Arc<dyn OperationExecutor>,
    catalog: Vec<OperationSpec>,
    config: LoopConfig,
    system_prompt: Option<String>,
    event_sink: Option<LoopEventSink>,
}

impl ControlLoop {
    pub fn new(
        decision_maker: Arc<dyn DecisionMaker>,
        executor: Arc<dyn OperationExecutor>,
    ) -> Self {
        let catalog = executor.catalog();
        Self {
            decision_maker,
            executor,
            catalog,
            config: LoopConfig::default(),
            system_prompt: None,
            event_sink: None,
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_event_sink(mut self, sink: LoopEventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Operations advertised to the decision-maker.
    pub fn catalog(&self) -> &[OperationSpec] {
        &self.catalog
    }

    /// Run one query to completion.
    pub async fn run(&self, query: &str) -> Result<LoopOutcome, MathChatError> {
        self.run_with_cancellation(query, CancellationToken::new())
            .await
    }

    /// Run one query, giving up as soon as `cancel` fires.
    ///
    /// On cancellation the batch in flight is abandoned as a whole: none of
    /// its results reach the history, the history is dropped and the caller
    /// gets [`MathChatError::Cancelled`].
    pub async fn run_with_cancellation(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<LoopOutcome, MathChatError> {
        let query_id = Uuid::new_v4();
        let emitter = LoopEventEmitter::new(query_id, self.event_sink.clone());
        emitter.emit(LoopEventPayload::Started {
            query: query.to_string(),
        });

        let result = self.drive(query, &cancel, &emitter).await;
        match &result {
            Ok(outcome) => {
                info!(
                    %query_id,
                    iterations = outcome.iterations,
                    operations = outcome.operations_executed,
                    "query completed"
                );
                emitter.emit(LoopEventPayload::Completed {
                    answer: outcome.answer.clone(),
                });
            }
            Err(MathChatError::Cancelled) => {
                debug!(%query_id, "query cancelled");
                emitter.emit(LoopEventPayload::Cancelled);
            }
            Err(e) => {
                debug!(%query_id, error = %e, "query failed");
                emitter.emit(LoopEventPayload::Failed {
                    error: e.to_string(),
                });
            }
        }
        result.map(|outcome| LoopOutcome {
            query_id,
            ..outcome
        })
    }

    async fn drive(
        &self,
        query: &str,
        cancel: &CancellationToken,
        emitter: &LoopEventEmitter,
    ) -> Result<LoopOutcome, MathChatError> {
        let mut conversation = Conversation::for_query(self.system_prompt.as_deref(), query);
        let mut state = LoopState::AwaitingDecision;
        let mut iterations = 0usize;
        let mut operations_executed = 0usize;
        let mut usage = Usage::default();

        loop {
            if state != LoopState::Done && cancel.is_cancelled() {
                return Err(MathChatError::Cancelled);
            }

            match state {
                LoopState::AwaitingDecision => {
                    if iterations >= self.config.max_iterations {
                        return Err(MathChatError::IterationLimitExceeded {
                            limit: self.config.max_iterations,
                        });
                    }
                    iterations += 1;
                    debug!(iteration = iterations, messages = conversation.len(), "deciding");
                    emitter.emit(LoopEventPayload::DecisionRequested {
                        iteration: iterations,
                    });

                    let decision = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(MathChatError::Cancelled),
                        decision = self.decision_maker.decide(conversation.messages(), &self.catalog) => decision?,
                    };
                    usage.merge(decision.usage());

                    state = match decision {
                        Decision::FinalAnswer { text, .. } => {
                            conversation.push_answer(text)?;
                            LoopState::Done
                        }
                        Decision::RequestOperations { text, requests, .. }
                            if requests.is_empty() =>
                        {
                            conversation.push_answer(text)?;
                            LoopState::Done
                        }
                        Decision::RequestOperations { text, requests, .. } => {
                            debug!(count = requests.len(), "operations requested");
                            emitter.emit(LoopEventPayload::OperationsRequested {
                                requests: requests.clone(),
                            });
                            conversation.push_requests(text, requests)?;
                            LoopState::ExecutingOperations
                        }
                    };
                }
                LoopState::ExecutingOperations => {
                    let requests = conversation
                        .last()
                        .map(|msg| msg.requests.clone())
                        .unwrap_or_default();

                    let results = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(MathChatError::Cancelled),
                        results = self.execute_batch(&requests) => results?,
                    };

                    for result in results {
                        emitter.emit(LoopEventPayload::OperationCompleted {
                            result: result.clone(),
                        });
                        conversation.push_result(result)?;
                    }
                    operations_executed += requests.len();
                    state = LoopState::AwaitingDecision;
                }
                LoopState::Done => break,
            }
            emitter.emit(LoopEventPayload::StateChanged { state });
        }

        let answer = conversation
            .final_answer()
            .map(str::to_string)
            .ok_or_else(|| MathChatError::InvalidState("loop ended without a final answer".into()))?;

        Ok(LoopOutcome {
            query_id: Uuid::nil(),
            answer,
            history: conversation.into_messages(),
            iterations,
            operations_executed,
            usage,
        })
    }

    /// Execute every request of a batch. Returns only when all are resolved.
    async fn execute_batch(
        &self,
        requests: &[OperationRequest],
    ) -> Result<Vec<OperationResult>, MathChatError> {
        let results = if self.config.parallel_operations {
            join_all(requests.iter().map(|request| self.executor.execute(request)))
                .await
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut results = Vec::with_capacity(requests.len());
            for request in requests {
                results.push(self.executor.execute(request).await?);
            }
            results
        };

        for (request, result) in requests.iter().zip(&results) {
            if request.id != result.request_id {
                return Err(MathChatError::InvalidState(format!(
                    "executor answered request '{}' with a result for '{}'",
                    request.id, result.request_id
                )));
            }
        }
        Ok(results)
    }
}
