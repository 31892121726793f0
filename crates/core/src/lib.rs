//! Core logic: the chat session and its transcript reconciliation.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod session;
pub mod transcript;

pub use session::{ChatSession, ChatSessionBuilder};
