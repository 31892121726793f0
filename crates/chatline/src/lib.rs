//! An out-of-the-box streaming chat client for agent endpoints.
//!
//! The crate includes a CLI tool for chatting in the terminal. And you
//! can also use it as a library to bring agent chat into your own host
//! apps.

#![deny(missing_docs)]

pub mod visitor;

pub use chatline_http::{
    EndpointConfig, EndpointConfigBuilder, HttpEndpoint,
};

/// Re-exports of [`chatline_core`] crate.
pub mod core {
    pub use chatline_core::*;
}

/// Re-exports of [`chatline_transport`] crate.
pub mod transport {
    pub use chatline_transport::*;
}
