//! Turning operation requests into operation results.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MathChatError;
use crate::operations::{OperationRegistry, OperationSpec};
use crate::types::{OperationFailure, OperationRequest, OperationResult};

/// Executes one operation request.
///
/// Per-operation failures (unknown name, bad arguments, violated
/// precondition) come back as an `Ok` result with an error outcome. An `Err`
/// means the executor itself is broken, e.g. the tool server is gone, and
/// aborts the query.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Operations this executor can run, as advertised to the decision-maker.
    fn catalog(&self) -> Vec<OperationSpec>;

    async fn execute(&self, request: &OperationRequest) -> Result<OperationResult, MathChatError>;
}

#[async_trait]
impl<T: OperationExecutor + ?Sized> OperationExecutor for Arc<T> {
    fn catalog(&self) -> Vec<OperationSpec> {
        (**self).catalog()
    }

    async fn execute(&self, request: &OperationRequest) -> Result<OperationResult, MathChatError> {
        (**self).execute(request).await
    }
}

/// In-process executor backed by an [`OperationRegistry`].
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    registry: Arc<OperationRegistry>,
}

impl LocalExecutor {
    pub fn new(registry: OperationRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Executor over the built-in math operations.
    pub fn builtin() -> Self {
        Self::new(OperationRegistry::builtin())
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run a request synchronously. Never fails as a whole.
    pub fn run(&self, request: &OperationRequest) -> OperationResult {
        let Some(descriptor) = self.registry.lookup(&request.name) else {
            tracing::debug!(operation = %request.name, "unknown operation requested");
            return OperationResult::error(request, OperationFailure::unknown_operation(&request.name));
        };

        match descriptor.invoke(request.arguments.clone()) {
            Ok(value) => OperationResult::ok(request, value),
            Err(failure) => {
                tracing::debug!(
                    operation = %request.name,
                    request_id = %request.id,
                    kind = %failure.kind,
                    "operation failed"
                );
                OperationResult::error(request, failure)
            }
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl OperationExecutor for LocalExecutor {
    fn catalog(&self) -> Vec<OperationSpec> {
        self.registry.specs()
    }

    async fn execute(&self, request: &OperationRequest) -> Result<OperationResult, MathChatError> {
        Ok(self.run(request))
    }
}
