//! The built-in arithmetic operations served as the "Math" tool set.
//!
//! Integer operations (`add`, `multiply`, `factorial`) work on `i64`/`u64`
//! and refuse inputs whose result would not fit. `divide` and `square_root`
//! work on `f64`.

use serde_json::json;

use super::arguments::OperationArguments;
use super::descriptor::{OperationDescriptor, OperationSpec};
use super::parameters::OperationParameters;
use crate::types::OperationFailure;

/// Largest `n` for which `n!` fits in a `u64`.
pub const MAX_FACTORIAL_INPUT: i64 = 20;

/// All built-in operations, in advertisement order.
pub fn builtin_operations() -> Vec<OperationDescriptor> {
    vec![
        add_operation(),
        multiply_operation(),
        divide_operation(),
        square_root_operation(),
        factorial_operation(),
    ]
}

fn integer_pair() -> OperationParameters {
    OperationParameters::object()
        .integer("a", "First integer", true)
        .integer("b", "Second integer", true)
        .build()
}

fn integer_operands(args: &OperationArguments) -> Result<(i64, i64), OperationFailure> {
    Ok((args.get_i64("a")?, args.get_i64("b")?))
}

/// `add(a, b)`: sum of two integers.
pub fn add_operation() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new("add", "Add two numbers", integer_pair()),
        |args| integer_operands(args).map(|_| ()),
        |args| {
            let (a, b) = integer_operands(args)?;
            a.checked_add(b).map(|v| json!(v)).ok_or_else(|| {
                OperationFailure::precondition_failed(format!(
                    "{a} + {b} does not fit in a 64-bit integer"
                ))
            })
        },
    )
}

/// `multiply(a, b)`: product of two integers.
pub fn multiply_operation() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new("multiply", "Multiply two numbers", integer_pair()),
        |args| integer_operands(args).map(|_| ()),
        |args| {
            let (a, b) = integer_operands(args)?;
            a.checked_mul(b).map(|v| json!(v)).ok_or_else(|| {
                OperationFailure::precondition_failed(format!(
                    "{a} * {b} does not fit in a 64-bit integer"
                ))
            })
        },
    )
}

/// `divide(a, b)`: floating-point quotient. A zero divisor is refused.
pub fn divide_operation() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new(
            "divide",
            "Divide a by b",
            OperationParameters::object()
                .number("a", "Dividend", true)
                .number("b", "Divisor", true)
                .build(),
        ),
        |args| {
            args.get_f64("a")?;
            if args.get_f64("b")? == 0.0 {
                return Err(OperationFailure::precondition_failed(
                    "Division by zero is not allowed.",
                ));
            }
            Ok(())
        },
        |args| finite(args.get_f64("a")? / args.get_f64("b")?),
    )
}

/// `square_root(x)`: principal square root of a non-negative number.
pub fn square_root_operation() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new(
            "square_root",
            "Calculate the square root of a number",
            OperationParameters::object()
                .number("x", "Radicand", true)
                .build(),
        ),
        |args| {
            if args.get_f64("x")? < 0.0 {
                return Err(OperationFailure::precondition_failed(
                    "Cannot take square root of a negative number.",
                ));
            }
            Ok(())
        },
        |args| finite(args.get_f64("x")?.sqrt()),
    )
}

/// `factorial(n)`: `n!` for `0 <= n <= MAX_FACTORIAL_INPUT`.
pub fn factorial_operation() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new(
            "factorial",
            "Calculate the factorial of a non-negative integer",
            OperationParameters::object()
                .integer("n", "Non-negative integer", true)
                .build(),
        ),
        |args| {
            let n = args.get_i64("n")?;
            if n < 0 {
                return Err(OperationFailure::precondition_failed(
                    "Factorial is not defined for negative numbers.",
                ));
            }
            if n > MAX_FACTORIAL_INPUT {
                return Err(OperationFailure::precondition_failed(format!(
                    "Factorial is only supported up to {MAX_FACTORIAL_INPUT}; got {n}."
                )));
            }
            Ok(())
        },
        |args| {
            let n = args.get_i64("n")?;
            let n = u64::try_from(n).map_err(|_| {
                OperationFailure::precondition_failed(
                    "Factorial is not defined for negative numbers.",
                )
            })?;
            (1..=n)
                .try_fold(1u64, |acc, k| acc.checked_mul(k))
                .map(|v| json!(v))
                .ok_or_else(|| {
                    OperationFailure::precondition_failed(format!(
                        "{n}! does not fit in a 64-bit integer"
                    ))
                })
        },
    )
}

fn finite(value: f64) -> Result<serde_json::Value, OperationFailure> {
    if value.is_finite() {
        Ok(json!(value))
    } else {
        Err(OperationFailure::precondition_failed(
            "Result is not a finite number.",
        ))
    }
}
