//! Registry entries: what an operation looks like and how it runs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::arguments::OperationArguments;
use super::parameters::OperationParameters;
use super::validation::validate_arguments;
use crate::types::OperationFailure;

/// The public face of an operation, as advertised to a decision-maker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub parameters: OperationParameters,
}

impl OperationSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: OperationParameters,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

type Precondition = dyn Fn(&OperationArguments) -> Result<(), OperationFailure> + Send + Sync;
type Compute =
    dyn Fn(&OperationArguments) -> Result<serde_json::Value, OperationFailure> + Send + Sync;

/// An operation spec bound to its precondition and pure computation.
#[derive(Clone)]
pub struct OperationDescriptor {
    spec: OperationSpec,
    precondition: Arc<Precondition>,
    compute: Arc<Compute>,
}

impl OperationDescriptor {
    pub fn new<P, C>(spec: OperationSpec, precondition: P, compute: C) -> Self
    where
        P: Fn(&OperationArguments) -> Result<(), OperationFailure> + Send + Sync + 'static,
        C: Fn(&OperationArguments) -> Result<serde_json::Value, OperationFailure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            spec,
            precondition: Arc::new(precondition),
            compute: Arc::new(compute),
        }
    }

    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    pub fn parameters(&self) -> &OperationParameters {
        &self.spec.parameters
    }

    /// Normalize and schema-check raw arguments.
    pub fn prepare(&self, raw: serde_json::Value) -> Result<OperationArguments, OperationFailure> {
        let args = OperationArguments::parse(raw)?;
        validate_arguments(args.raw(), &self.spec.parameters.schema)
            .map_err(OperationFailure::invalid_arguments)?;
        Ok(args)
    }

    pub fn check_precondition(&self, args: &OperationArguments) -> Result<(), OperationFailure> {
        (self.precondition)(args)
    }

    /// Run the computation. Callers are expected to have checked the precondition.
    pub fn compute(&self, args: &OperationArguments) -> Result<serde_json::Value, OperationFailure> {
        (self.compute)(args)
    }

    /// Validate, check the precondition, then compute.
    pub fn invoke(&self, raw: serde_json::Value) -> Result<serde_json::Value, OperationFailure> {
        let args = self.prepare(raw)?;
        self.check_precondition(&args)?;
        self.compute(&args)
    }
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}
