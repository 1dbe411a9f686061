//! Named, immutable set of operations.

use std::collections::HashMap;

use super::arithmetic::builtin_operations;
use super::descriptor::{OperationDescriptor, OperationSpec};
use crate::error::MathChatError;

/// Lookup table of operations, frozen once built.
///
/// Shared across tasks behind an `Arc`; nothing mutates it after
/// construction.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<OperationDescriptor>,
    index: HashMap<String, usize>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `add`, `multiply`, `divide`, `square_root` and `factorial`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for op in builtin_operations() {
            registry.index.insert(op.name().to_string(), registry.operations.len());
            registry.operations.push(op);
        }
        registry
    }

    /// Add an operation, rejecting a name that is already taken.
    pub fn with(mut self, operation: OperationDescriptor) -> Result<Self, MathChatError> {
        self.register(operation)?;
        Ok(self)
    }

    pub fn register(&mut self, operation: OperationDescriptor) -> Result<(), MathChatError> {
        let name = operation.name().to_string();
        if name.trim().is_empty() {
            return Err(MathChatError::InvalidArgument(
                "operation name must not be empty".into(),
            ));
        }
        if self.index.contains_key(&name) {
            return Err(MathChatError::InvalidArgument(format!(
                "operation '{name}' is already registered"
            )));
        }
        self.index.insert(name, self.operations.len());
        self.operations.push(operation);
        Ok(())
    }

    /// Find an operation by name. `None` means the name is unknown.
    pub fn lookup(&self, name: &str) -> Option<&OperationDescriptor> {
        self.index.get(name).map(|&i| &self.operations[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Specs of every operation, in registration order.
    pub fn specs(&self) -> Vec<OperationSpec> {
        self.operations.iter().map(|op| op.spec().clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
