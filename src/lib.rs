//! mathchat: a tool-calling control loop between a language model and math operations.
//!
//! A [`control_loop::ControlLoop`] asks a [`decision::DecisionMaker`] what to
//! do with a question, runs the operations it requests through an
//! [`executor::OperationExecutor`], feeds the results back, and repeats until
//! the decision-maker answers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mathchat::prelude::*;
//!
//! # async fn example() -> mathchat::error::Result<()> {
//! let config = MathChatConfig::from_env()?;
//! let control = ControlLoop::new(
//!     Arc::new(OpenAiDecisionMaker::from_config(&config)?),
//!     Arc::new(LocalExecutor::builtin()),
//! );
//! let outcome = control.run("What is 5 + 7?").await?;
//! println!("{}", outcome.answer);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control_loop;
pub mod decision;
pub mod error;
pub mod executor;
pub mod operations;
pub mod prelude;
pub mod types;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;
