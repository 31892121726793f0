use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ChatRequest;
use crate::stream::EventStream;

/// The error type for an agent endpoint.
pub trait EndpointError: Error + Send + Sync + 'static {
    /// Returns the classification of this error.
    fn kind(&self) -> ErrorKind;
}

/// A type that represents an agent endpoint, which accepts a chat
/// request and produces a stream of reply events.
///
/// Once the endpoint is created, it should behave like a stateless
/// object. It can still have internal state, but callers should not
/// rely on it, and the endpoint should be prepared for being dropped
/// anytime.
///
/// Retry of retriable connection attempts is the endpoint's own
/// business. When `send_request` returns an error, the caller treats
/// the attempt as over.
pub trait AgentEndpoint: Send + Sync {
    /// The error type that may be returned by the endpoint.
    type Error: EndpointError;

    /// The stream type produced by this endpoint.
    type Stream: EventStream<Error = Self::Error>;

    /// Opens a streaming request against the endpoint.
    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static;
}
