use serde::{Deserialize, Serialize};

/// One decoded unit of the server-pushed reply stream.
///
/// Endpoint implementations are responsible for decoding the wire
/// payloads (marker detection, percent-decoding) before handing events
/// to the session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A fragment of the growing answer, already decoded to plain text.
    Fragment(String),
    /// An application-level error the server embedded in the stream
    /// itself, distinct from transport failures. Always terminates the
    /// stream.
    ServerError(String),
    /// The server has finished the answer. The stream should be torn
    /// down after this event.
    Done,
}
