//! Operation registry: named operations with schemas, preconditions and pure computations.

pub mod arguments;
pub mod arithmetic;
pub mod descriptor;
pub mod parameters;
pub mod registry;
pub mod validation;

pub use arguments::OperationArguments;
pub use arithmetic::{builtin_operations, MAX_FACTORIAL_INPUT};
pub use descriptor::{OperationDescriptor, OperationSpec};
pub use parameters::{OperationParameters, ParameterBuilder};
pub use registry::OperationRegistry;
pub use validation::validate_arguments;
