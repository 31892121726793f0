//! An abstraction layer for agent chat endpoints.
//!
//! This crate establishes the protocol between a chat session and the
//! transport that carries its streamed replies, so that sessions can run
//! against any endpoint implementation (HTTP, scripted fakes, etc.)
//! without modifying the session logic.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod endpoint;
mod error;
mod event;
mod request;
mod stream;

pub use endpoint::*;
pub use error::*;
pub use event::*;
pub use request::*;
pub use stream::*;
