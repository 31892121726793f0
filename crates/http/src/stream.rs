use std::pin::Pin;
use std::task::{Context, Poll, ready};

use chatline_transport::{ErrorKind, EventStream, StreamEvent};
use percent_encoding::percent_decode_str;
use pin_project_lite::pin_project;

use crate::Error;
use crate::sse::{Error as SseError, Sse};

/// Payload marking the end of a successfully streamed answer.
const DONE_MARKER: &str = "[DONE]";
/// Prefix marking a server-signaled application error.
const ERROR_MARKER: &str = "[ERROR]";

struct Decoder {
    sse: Sse,
    // Set once a terminal event has been decoded, further polls yield
    // the end of the stream instead of touching the connection.
    finished: bool,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<StreamEvent>, Decoder), Error>;

pin_project! {
    /// The reply stream produced by [`HttpEndpoint`](crate::HttpEndpoint).
    pub struct HttpEventStream {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl HttpEventStream {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let decoder = Decoder {
            sse,
            finished: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(decoder))),
        }
    }
}

impl EventStream for HttpEventStream {
    type Error = Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            // The stream has been exhausted or has failed before.
            return Poll::Ready(Ok(None));
        };
        let (event, decoder) = match ready!(next_event_fut.as_mut().poll(cx))
        {
            Ok((Some(event), decoder)) => (event, decoder),
            Ok((None, _)) => {
                *this.next_event_fut = None;
                return Poll::Ready(Ok(None));
            }
            Err(err) => {
                *this.next_event_fut = None;
                return Poll::Ready(Err(err));
            }
        };

        // The stream may still have more data to pull, create a new
        // future for the next event.
        *this.next_event_fut = Some(Box::pin(next_event(decoder)));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut decoder: Decoder) -> NextEvent {
    if decoder.finished {
        return Ok((None, decoder));
    }

    let payload = match decoder.sse.next_event().await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            // The server ended the connection without a terminal event.
            return Err(Error::new(
                "server closed the connection before finishing the answer",
                ErrorKind::Retriable,
            ));
        }
        Err(SseError::ConnectionLost) => {
            return Err(Error::new(
                "connection failed while reading the stream",
                ErrorKind::Retriable,
            ));
        }
        Err(SseError::InvalidFrame) => {
            return Err(Error::new(
                "malformed event frame",
                ErrorKind::Fatal,
            ));
        }
    };
    trace!("got stream payload: {payload}");

    let event = decode_payload(&payload)?;
    if !matches!(event, StreamEvent::Fragment(_)) {
        decoder.finished = true;
    }
    Ok((Some(event), decoder))
}

/// Decodes one wire payload.
///
/// The grammar is: the literal `[DONE]`, or `[ERROR]` followed by the
/// error detail, or a percent-encoded UTF-8 text fragment.
fn decode_payload(payload: &str) -> Result<StreamEvent, Error> {
    if payload == DONE_MARKER {
        return Ok(StreamEvent::Done);
    }
    if let Some(detail) = payload.strip_prefix(ERROR_MARKER) {
        return Ok(StreamEvent::ServerError(detail.to_owned()));
    }
    let decoded = percent_decode_str(payload).decode_utf8().map_err(|_| {
        Error::new(
            "fragment is not valid percent-encoded UTF-8",
            ErrorKind::Fatal,
        )
    })?;
    Ok(StreamEvent::Fragment(decoded.into_owned()))
}
