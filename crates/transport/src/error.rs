use serde::{Deserialize, Serialize};

/// The classification of an endpoint failure.
///
/// The classification decides what a failed connection attempt should
/// lead to: another attempt, abandonment, or special reporting. It is
/// raised by endpoint implementations; sessions never resubmit on their
/// own.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ErrorKind {
    /// A transient server or connection issue. The endpoint may retry
    /// the attempt before surfacing it.
    Retriable,
    /// A permanent client-side rejection. The attempt must not be
    /// retried.
    Fatal,
    /// The usage quota for this visitor has been exhausted. A fatal
    /// subtype that callers may want to report distinctly.
    UsageLimitExceeded,
}

impl ErrorKind {
    /// Returns `true` if retrying the attempt cannot succeed.
    #[inline]
    pub fn is_permanent(&self) -> bool {
        !matches!(self, ErrorKind::Retriable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanence() {
        assert!(!ErrorKind::Retriable.is_permanent());
        assert!(ErrorKind::Fatal.is_permanent());
        assert!(ErrorKind::UsageLimitExceeded.is_permanent());
    }
}
