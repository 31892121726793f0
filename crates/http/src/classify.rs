use chatline_transport::ErrorKind;

/// The outcome of inspecting an opened response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The response is a live event stream, start reading it.
    Success,
    /// The attempt failed with the given classification.
    Failure(ErrorKind),
}

/// Classifies the open phase of a streaming request.
///
/// Success requires both a 2xx status and an event-stream content type.
/// A 402 is the usage-limit rejection; the remaining 4xx range (except
/// 429, which is transient rate limiting) is permanent. Everything
/// else, including a 2xx carrying the wrong content type, is treated
/// as a transient server problem.
pub fn classify_open(status: u16, is_event_stream: bool) -> Classification {
    if (200..300).contains(&status) && is_event_stream {
        return Classification::Success;
    }
    if (400..500).contains(&status) && status != 429 {
        if status == 402 {
            return Classification::Failure(ErrorKind::UsageLimitExceeded);
        }
        return Classification::Failure(ErrorKind::Fatal);
    }
    Classification::Failure(ErrorKind::Retriable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_needs_both() {
        assert_eq!(classify_open(200, true), Classification::Success);
        assert_eq!(
            classify_open(200, false),
            Classification::Failure(ErrorKind::Retriable)
        );
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(
            classify_open(400, false),
            Classification::Failure(ErrorKind::Fatal)
        );
        assert_eq!(
            classify_open(404, false),
            Classification::Failure(ErrorKind::Fatal)
        );
        assert_eq!(
            classify_open(402, false),
            Classification::Failure(ErrorKind::UsageLimitExceeded)
        );
        assert_eq!(
            classify_open(429, false),
            Classification::Failure(ErrorKind::Retriable)
        );
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert_eq!(
            classify_open(500, false),
            Classification::Failure(ErrorKind::Retriable)
        );
        assert_eq!(
            classify_open(503, false),
            Classification::Failure(ErrorKind::Retriable)
        );
    }
}
