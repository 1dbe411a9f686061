//! Core types for mathchat.

pub mod conversation;
pub mod message;
pub mod usage;

pub use conversation::*;
pub use message::*;
pub use usage::*;
