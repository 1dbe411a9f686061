//! Typed access to operation arguments.

use crate::types::OperationFailure;

/// Largest magnitude at which every integer is exactly representable as `f64`.
const MAX_EXACT_F64_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Wrapper around operation arguments providing typed extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationArguments {
    value: serde_json::Value,
}

impl OperationArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Normalize raw arguments as produced by a decision-maker.
    ///
    /// `null` and blank strings become an empty object; strings holding JSON
    /// are parsed. Anything that does not end up as an object is rejected.
    pub fn parse(value: serde_json::Value) -> Result<Self, OperationFailure> {
        match value {
            serde_json::Value::Null => Ok(Self::new(serde_json::json!({}))),
            serde_json::Value::Object(_) => Ok(Self::new(value)),
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(Self::new(serde_json::json!({})));
                }
                let parsed: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
                    OperationFailure::invalid_arguments(format!(
                        "arguments must be valid JSON: {e}"
                    ))
                })?;
                match parsed {
                    serde_json::Value::String(_) => Err(OperationFailure::invalid_arguments(
                        "arguments must be a JSON object",
                    )),
                    other => Self::parse(other),
                }
            }
            other => Err(OperationFailure::invalid_arguments(format!(
                "arguments must be a JSON object; got {other}"
            ))),
        }
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn into_raw(self) -> serde_json::Value {
        self.value
    }

    /// Get a float argument.
    pub fn get_f64(&self, key: &str) -> Result<f64, OperationFailure> {
        self.value
            .get(key)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| OperationFailure::invalid_arguments(format!("missing number argument '{key}'")))
    }

    /// Get an integer argument.
    ///
    /// Numbers with no fractional part (`5.0`) count as integers. A number
    /// with a fractional part is a precondition violation rather than a
    /// schema mismatch.
    pub fn get_i64(&self, key: &str) -> Result<i64, OperationFailure> {
        let Some(value) = self.value.get(key) else {
            return Err(OperationFailure::invalid_arguments(format!(
                "missing integer argument '{key}'"
            )));
        };
        if let Some(int) = value.as_i64() {
            return Ok(int);
        }
        let Some(float) = value.as_f64() else {
            return Err(OperationFailure::invalid_arguments(format!(
                "argument '{key}' must be an integer"
            )));
        };
        if float.fract() != 0.0 {
            return Err(OperationFailure::precondition_failed(format!(
                "argument '{key}' must be a whole number, got {float}"
            )));
        }
        if float.abs() > MAX_EXACT_F64_INTEGER {
            return Err(OperationFailure::precondition_failed(format!(
                "argument '{key}' is too large to be handled exactly"
            )));
        }
        Ok(float as i64)
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, OperationFailure> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            OperationFailure::invalid_arguments(format!("failed to deserialize arguments: {e}"))
        })
    }
}
