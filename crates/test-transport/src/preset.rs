use chatline_transport::ErrorKind;
use serde::{Deserialize, Serialize};

/// The events in a preset stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    /// A decoded answer fragment.
    #[serde(rename = "fragment")]
    Fragment(String),
    /// A server-signaled application error.
    #[serde(rename = "server_error")]
    ServerError(String),
    /// The end-of-answer marker.
    #[serde(rename = "done")]
    Done,
}

/// The preset outcome of one streaming request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetStream {
    /// Events delivered by this stream, in order.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails with this classification instead of
    /// producing a stream.
    pub failure: Option<ErrorKind>,
}

impl PresetStream {
    /// Creates a `PresetStream` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a `PresetStream` that fails the request with the given
    /// classification.
    #[inline]
    pub fn with_failure(kind: ErrorKind) -> Self {
        Self {
            events: vec![],
            failure: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let preset = PresetStream::with_events([
            PresetEvent::Fragment("I have left ".to_string()),
            PresetEvent::Fragment("a message for you.".to_string()),
            PresetEvent::Done,
        ]);

        let serialized = serde_json::to_string(&preset).unwrap();
        let deserialized: PresetStream =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(preset, deserialized);
    }

    #[test]
    fn test_scripted_failure() {
        let preset = PresetStream::with_failure(ErrorKind::Fatal);
        assert!(preset.events.is_empty());
        assert_eq!(preset.failure, Some(ErrorKind::Fatal));
    }
}
