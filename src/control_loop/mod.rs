//! Control loop: the state machine between the decision-maker and the executor.

pub mod events;
pub mod runner;
pub mod types;

pub use events::{LoopEvent, LoopEventPayload, LoopEventSink};
pub use runner::ControlLoop;
pub use types::{LoopConfig, LoopOutcome, LoopState, QueryId};
