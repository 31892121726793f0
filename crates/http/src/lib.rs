//! An agent endpoint implementation speaking JSON-over-POST requests
//! with server-sent-event replies.

#[macro_use]
extern crate tracing;

mod classify;
mod config;
mod sse;
mod stream;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use backoff::ExponentialBackoff;
use chatline_transport::{
    AgentEndpoint, ChatRequest, EndpointError, ErrorKind,
};
use mime::Mime;
use reqwest::{Client, header};
use serde_json::Value;

use classify::{Classification, classify_open};
pub use config::{EndpointConfig, EndpointConfigBuilder};
pub use stream::HttpEventStream;

use sse::Sse;

/// Error type for [`HttpEndpoint`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl EndpointError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// The HTTP agent endpoint.
///
/// Transient connection failures (including retriable open
/// classifications) are retried with exponential backoff within the
/// configured budget before being surfaced. Failures after the stream
/// has opened are never retried here, the caller owns that decision.
#[derive(Clone, Debug)]
pub struct HttpEndpoint {
    client: Client,
    config: Arc<EndpointConfig>,
}

impl HttpEndpoint {
    /// Creates a new `HttpEndpoint` with the given configuration.
    #[inline]
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl AgentEndpoint for HttpEndpoint {
    type Error = Error;
    type Stream = HttpEventStream;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        let body = build_body(req);
        let client = self.client.clone();
        let config = Arc::clone(&self.config);

        async move {
            let policy = ExponentialBackoff {
                max_elapsed_time: Some(config.retry_budget),
                ..Default::default()
            };
            backoff::future::retry(policy, || {
                open_attempt(client.clone(), Arc::clone(&config), body.clone())
            })
            .await
        }
    }
}

async fn open_attempt(
    client: Client,
    config: Arc<EndpointConfig>,
    body: Value,
) -> Result<HttpEventStream, backoff::Error<Error>> {
    let resp = client
        .post(&config.url)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!("connection attempt failed: {err}");
            backoff::Error::transient(Error::new(
                format!("{err}"),
                ErrorKind::Retriable,
            ))
        })?;

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let is_event_stream = content_type
        .as_deref()
        .and_then(|v| v.parse::<Mime>().ok())
        .map(|m| {
            m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
        })
        .unwrap_or(false);

    match classify_open(resp.status().as_u16(), is_event_stream) {
        Classification::Success => {
            Ok(HttpEventStream::from_sse(Sse::from_response(resp)))
        }
        Classification::Failure(kind) => {
            let err = Error::new(
                format!(
                    "endpoint rejected the stream (status: {}, content type: {:?})",
                    resp.status(),
                    content_type
                ),
                kind,
            );
            if kind == ErrorKind::Retriable {
                warn!("retrying connection attempt: {err}");
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            }
        }
    }
}

/// Assembles the outbound request body.
///
/// Extension fields come first so the canonical fields always win on
/// collision.
fn build_body(req: &ChatRequest) -> Value {
    let mut body = req.extension.clone();
    body.insert("streaming".to_owned(), Value::Bool(true));
    body.insert("query".to_owned(), Value::String(req.query.clone()));
    body.insert(
        "visitorId".to_owned(),
        Value::String(req.visitor_id.clone()),
    );
    if let Some(channel) = req.channel {
        body.insert(
            "channel".to_owned(),
            Value::String(channel.as_str().to_owned()),
        );
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use chatline_transport::Channel;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_body() {
        let req = ChatRequest {
            query: "hi".to_owned(),
            visitor_id: "visitor:1".to_owned(),
            channel: Some(Channel::Website),
            extension: Default::default(),
        };
        assert_eq!(
            build_body(&req),
            json!({
                "streaming": true,
                "query": "hi",
                "visitorId": "visitor:1",
                "channel": "website",
            })
        );
    }

    #[test]
    fn test_build_body_extension_fields() {
        let mut extension = serde_json::Map::new();
        extension
            .insert("agentId".to_owned(), json!("agent:42"));
        // A colliding extension field must not shadow the canonical one.
        extension.insert("streaming".to_owned(), json!(false));

        let req = ChatRequest {
            query: "hi".to_owned(),
            visitor_id: "visitor:1".to_owned(),
            channel: None,
            extension,
        };
        let body = build_body(&req);
        assert_eq!(body["agentId"], json!("agent:42"));
        assert_eq!(body["streaming"], json!(true));
        assert!(body.get("channel").is_none());
    }
}
