//! Error classification shared by fatal and per-operation failures.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why a single operation request could not produce a value.
///
/// These never abort the control loop; they are reported back to the
/// decision-maker inside a tool-result message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationErrorKind {
    UnknownOperation,
    InvalidArguments,
    PreconditionFailed,
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    Transport,
    DecisionMaker,
    Protocol,
    Cancelled,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    CheckToolServer,
    IncreaseTimeout,
    RephraseQuery,
    None,
}
