//! Operation registry and local executor through the public API.

use mathchat::error::{MathChatError, OperationErrorKind};
use mathchat::executor::{LocalExecutor, OperationExecutor};
use mathchat::operations::{
    OperationArguments, OperationDescriptor, OperationParameters, OperationRegistry,
    OperationSpec,
};
use mathchat::types::{OperationFailure, OperationRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

fn negate() -> OperationDescriptor {
    OperationDescriptor::new(
        OperationSpec::new(
            "negate",
            "Negate an integer",
            OperationParameters::object()
                .integer("x", "Value to negate", true)
                .build(),
        ),
        |args: &OperationArguments| {
            if args.get_i64("x")? == i64::MIN {
                return Err(OperationFailure::precondition_failed(
                    "i64::MIN has no negation",
                ));
            }
            Ok(())
        },
        |args: &OperationArguments| Ok(json!(-args.get_i64("x")?)),
    )
}

#[test]
fn builtin_catalog_advertises_the_math_tools() {
    let registry = OperationRegistry::builtin();
    assert_eq!(
        registry.names(),
        vec!["add", "multiply", "divide", "square_root", "factorial"]
    );

    let divide = registry.lookup("divide").unwrap();
    assert_eq!(divide.parameters().property_names(), vec!["a", "b"]);
    assert!(registry.lookup("modulo").is_none());
}

#[test]
fn custom_operations_join_the_registry() {
    let registry = OperationRegistry::builtin().with(negate()).unwrap();
    assert_eq!(registry.len(), 6);
    assert!(registry.contains("negate"));

    let err = registry.with(negate()).unwrap_err();
    assert!(matches!(err, MathChatError::InvalidArgument(_)));
}

#[tokio::test]
async fn executor_resolves_every_request_with_a_result() {
    let executor = LocalExecutor::new(OperationRegistry::builtin().with(negate()).unwrap());
    let cases = vec![
        (OperationRequest::new("1", "negate", json!({"x": 4})), Ok(json!(-4))),
        (
            OperationRequest::new("2", "negate", json!({"x": i64::MIN})),
            Err(OperationErrorKind::PreconditionFailed),
        ),
        (
            OperationRequest::new("3", "add", json!("{\"a\": 2, \"b\": 2}")),
            Ok(json!(4)),
        ),
        (
            OperationRequest::new("4", "add", json!({"a": "two", "b": 2})),
            Err(OperationErrorKind::InvalidArguments),
        ),
        (
            OperationRequest::new("5", "power", json!({"a": 2, "b": 8})),
            Err(OperationErrorKind::UnknownOperation),
        ),
        (
            OperationRequest::new("6", "factorial", json!({"n": 21})),
            Err(OperationErrorKind::PreconditionFailed),
        ),
    ];

    for (request, expected) in cases {
        let result = executor.execute(&request).await.unwrap();
        assert_eq!(result.request_id, request.id);
        assert_eq!(result.operation, request.name);
        match expected {
            Ok(value) => assert_eq!(result.value(), Some(&value)),
            Err(kind) => assert_eq!(result.failure().map(|f| f.kind), Some(kind)),
        }
    }
}

#[test]
fn executor_catalog_matches_registry_specs() {
    let executor = LocalExecutor::builtin();
    assert_eq!(executor.catalog(), executor.registry().specs());
}

#[test]
fn failure_text_carries_kind_and_message() {
    let executor = LocalExecutor::builtin();
    let result = executor.run(&OperationRequest::new("z", "divide", json!({"a": 3, "b": 0})));

    let text: serde_json::Value = serde_json::from_str(&result.content_text()).unwrap();
    assert_eq!(
        text,
        json!({"error": "precondition_failed", "message": "Division by zero is not allowed."})
    );
}
