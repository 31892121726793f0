//! A local fake agent endpoint for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use chatline_transport::{
    AgentEndpoint, ChatRequest, EndpointError, ErrorKind, EventStream,
    StreamEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl EndpointError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Debug)]
pub struct TestEventStream {
    events: VecDeque<StreamEvent>,
    // Whether the script ends with a terminal event. A stream that
    // runs out of events without one mimics the server dropping the
    // connection mid-answer.
    terminated: bool,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestEventStream {
    fn new(preset_events: Vec<PresetEvent>, delay: Duration) -> Self {
        let terminated = matches!(
            preset_events.last(),
            Some(PresetEvent::Done | PresetEvent::ServerError(_))
        );
        let events = preset_events
            .into_iter()
            .map(|event| match event {
                PresetEvent::Fragment(text) => StreamEvent::Fragment(text),
                PresetEvent::ServerError(text) => {
                    StreamEvent::ServerError(text)
                }
                PresetEvent::Done => StreamEvent::Done,
            })
            .collect();
        Self {
            events,
            terminated,
            delay,
            sleep: None,
        }
    }
}

impl EventStream for TestEventStream {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(sleep) = &mut this.sleep {
            let sleep = sleep.as_mut();
            ready!(sleep.poll(cx));
            this.sleep = None;

            if let Some(event) = this.events.pop_front() {
                return Poll::Ready(Ok(Some(event)));
            }
            if this.terminated {
                return Poll::Ready(Ok(None));
            }
            return Poll::Ready(Err(Error {
                message: "connection closed before the terminal event",
                kind: ErrorKind::Retriable,
            }));
        }
        this.sleep = Some(Box::pin(sleep(this.delay)));
        Pin::new(this).poll_next_event(cx)
    }
}

/// A local fake agent endpoint for testing purpose.
///
/// Before sending requests, you need to set up the script, which is
/// the ordered list of stream outcomes the endpoint should produce.
/// Each request consumes one scripted stream; when the script runs
/// out, requests fail. Received requests are recorded and can be
/// inspected with [`requests`](TestEndpoint::requests).
///
/// # Note
///
/// This type is not optimized for production use, there are heavy
/// memory copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestEndpoint {
    script: Arc<Mutex<VecDeque<PresetStream>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    delay: Option<Duration>,
}

impl TestEndpoint {
    /// Appends a scripted stream outcome.
    #[inline]
    pub fn add_stream(&mut self, preset: PresetStream) {
        self.script
            .lock()
            .expect("script lock is poisoned")
            .push_back(preset);
    }

    /// Sets the delay between delivered events.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .expect("requests lock is poisoned")
            .clone()
    }
}

impl AgentEndpoint for TestEndpoint {
    type Error = crate::Error;
    type Stream = TestEventStream;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send + 'static
    {
        self.requests
            .lock()
            .expect("requests lock is poisoned")
            .push(req.clone());

        let step = self
            .script
            .lock()
            .expect("script lock is poisoned")
            .pop_front();
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let result = match step {
            None => Err(Error {
                message: "no more scripted streams",
                kind: ErrorKind::Fatal,
            }),
            Some(preset) => match preset.failure {
                Some(kind) => Err(Error {
                    message: "scripted request failure",
                    kind,
                }),
                None => Ok(TestEventStream::new(preset.events, delay)),
            },
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    fn request(query: &str) -> ChatRequest {
        ChatRequest {
            query: query.to_owned(),
            visitor_id: "visitor:test".to_owned(),
            channel: None,
            extension: Default::default(),
        }
    }

    async fn collect_stream(
        stream: TestEventStream,
    ) -> (String, Result<Option<StreamEvent>, Error>) {
        let mut stream = pin!(stream);
        let mut answer = String::new();
        loop {
            let result =
                poll_fn(|cx| stream.as_mut().poll_next_event(cx)).await;
            match result {
                Ok(Some(StreamEvent::Fragment(fragment))) => {
                    answer.push_str(&fragment);
                }
                other => return (answer, other),
            }
        }
    }

    #[tokio::test]
    async fn test_scripted_stream() {
        let mut endpoint = TestEndpoint::default();
        endpoint.add_stream(PresetStream::with_events([
            PresetEvent::Fragment("Hello, ".to_owned()),
            PresetEvent::Fragment("world!".to_owned()),
            PresetEvent::Done,
        ]));

        let stream =
            endpoint.send_request(&request("Hi")).await.unwrap();
        let (answer, last) = collect_stream(stream).await;
        assert_eq!(answer, "Hello, world!");
        assert_eq!(last.unwrap(), Some(StreamEvent::Done));

        let requests = endpoint.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, "Hi");
    }

    #[tokio::test]
    async fn test_missing_terminal_event() {
        let mut endpoint = TestEndpoint::default();
        endpoint.add_stream(PresetStream::with_events([
            PresetEvent::Fragment("Hell".to_owned()),
        ]));

        let stream =
            endpoint.send_request(&request("Hi")).await.unwrap();
        let (answer, last) = collect_stream(stream).await;
        assert_eq!(answer, "Hell");
        assert_eq!(last.unwrap_err().kind(), ErrorKind::Retriable);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let mut endpoint = TestEndpoint::default();
        endpoint
            .add_stream(PresetStream::with_failure(ErrorKind::UsageLimitExceeded));

        let err = endpoint.send_request(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UsageLimitExceeded);
    }

    #[tokio::test]
    async fn test_exhausted_script() {
        let endpoint = TestEndpoint::default();
        let err = endpoint.send_request(&request("Hi")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
