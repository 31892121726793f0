use std::pin::Pin;
use std::task::{self, Poll};

use crate::endpoint::EndpointError;
use crate::event::StreamEvent;

/// An open reply stream from an agent endpoint.
pub trait EventStream: Sized + Send + 'static {
    /// The error type that may be returned by the stream.
    type Error: EndpointError;

    /// Attempts to pull out the next event from the stream.
    ///
    /// # Return value
    ///
    /// There are several possible return values, each indicating a
    /// distinct stream state:
    ///
    /// - `Poll::Pending` means that this stream is still waiting for
    ///   the next event. Implementations will ensure that the current
    ///   task will be notified when the next event may be ready.
    /// - `Poll::Ready(Ok(Some(event)))` means the stream has an event
    ///   to deliver, and may produce further events on subsequent
    ///   `poll_next_event` calls.
    /// - `Poll::Ready(Ok(None))` means the connection has ended after
    ///   the server finished the answer. A connection that ends before
    ///   a [`StreamEvent::Done`] must be reported as an error with a
    ///   retriable classification instead.
    /// - `Poll::Ready(Err(error))` means the stream has failed.
    ///
    /// # Cancellation
    ///
    /// Dropping the stream aborts the underlying connection. Callers
    /// tear streams down this way on [`StreamEvent::Done`] and
    /// [`StreamEvent::ServerError`]; implementations must not require
    /// the stream to be polled to completion.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<StreamEvent>, Self::Error>>;
}
