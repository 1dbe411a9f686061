//! Validate operation arguments against their parameter schema before execution.

/// Validate arguments against a JSON Schema.
///
/// Covers the subset the built-in operations use: the top-level object
/// check, required fields, per-property types and `additionalProperties:
/// false`. Returns `Err(message)` describing the first violation found.
///
/// `integer` accepts any JSON number here; whether a number is whole is
/// decided by the operation itself.
pub fn validate_arguments(
    args: &serde_json::Value,
    schema: &serde_json::Value,
) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(|v| v.as_str()) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for field in required {
            if let Some(name) = field.as_str() {
                if !obj.contains_key(name) {
                    return Err(format!("missing required field '{name}'"));
                }
            }
        }
    }

    let properties = schema.get("properties").and_then(|v| v.as_object());
    let closed = schema.get("additionalProperties") == Some(&serde_json::Value::Bool(false));

    for (key, value) in obj {
        match properties.and_then(|props| props.get(key)) {
            Some(prop_schema) => {
                if let Some(expected_type) = prop_schema.get("type").and_then(|v| v.as_str()) {
                    if !value_matches_type(value, expected_type) {
                        return Err(format!(
                            "field '{}' expected type '{}', got {}",
                            key,
                            expected_type,
                            json_type_name(value)
                        ));
                    }
                }
            }
            None if closed => return Err(format!("unexpected field '{key}'")),
            None => {}
        }
    }

    Ok(())
}

fn value_matches_type(value: &serde_json::Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" | "integer" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" },
            },
            "required": ["a", "b"],
            "additionalProperties": false,
        })
    }

    #[test]
    fn accepts_matching_arguments() {
        assert!(validate_arguments(&json!({"a": 5, "b": 7}), &pair_schema()).is_ok());
    }

    #[test]
    fn rejects_non_object_args() {
        let err = validate_arguments(&json!([5, 7]), &pair_schema()).unwrap_err();
        assert!(err.contains("expected object"));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate_arguments(&json!({"a": 5}), &pair_schema()).unwrap_err();
        assert_eq!(err, "missing required field 'b'");
    }

    #[test]
    fn rejects_wrong_property_type() {
        let err = validate_arguments(&json!({"a": "5", "b": 7}), &pair_schema()).unwrap_err();
        assert!(err.contains("field 'a' expected type 'integer', got string"));
    }

    #[test]
    fn integer_type_admits_fractional_numbers() {
        assert!(validate_arguments(&json!({"a": 2.5, "b": 7}), &pair_schema()).is_ok());
    }

    #[test]
    fn closed_schema_rejects_extra_fields() {
        let err =
            validate_arguments(&json!({"a": 1, "b": 2, "c": 3}), &pair_schema()).unwrap_err();
        assert_eq!(err, "unexpected field 'c'");
    }

    #[test]
    fn open_schema_ignores_extra_fields() {
        let schema = json!({
            "type": "object",
            "properties": { "x": { "type": "number" } },
            "required": ["x"],
        });
        assert!(validate_arguments(&json!({"x": 1, "note": "hi"}), &schema).is_ok());
    }

    #[test]
    fn empty_schema_accepts_anything() {
        assert!(validate_arguments(&json!({"anything": true}), &json!({})).is_ok());
    }
}
