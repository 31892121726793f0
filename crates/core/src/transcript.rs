//! Transcript-related types.

use serde::{Deserialize, Serialize};

/// The author of a transcript entry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The end user.
    Human,
    /// The remote agent.
    Agent,
}

/// One entry of the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who authored this entry.
    pub speaker: Speaker,
    /// The text content.
    ///
    /// For the agent entry of an in-flight submission, the whole text
    /// is rewritten as fragments arrive.
    pub text: String,
    /// A server-assigned identifier. Reserved, the current ingestion
    /// logic never populates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TranscriptEntry {
    /// Creates an entry without an identifier.
    #[inline]
    pub fn new<S: Into<String>>(speaker: Speaker, text: S) -> Self {
        Self {
            speaker,
            text: text.into(),
            id: None,
        }
    }
}

/// The ordered conversation history.
///
/// A transcript is owned exclusively by its session. Readers always
/// receive clones, so published snapshots can never be corrupted by
/// in-flight reconciliation, nor can readers mutate session state.
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Returns the entries in conversational order.
    #[inline]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the transcript has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recent entry.
    #[inline]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    #[inline]
    pub(crate) fn push(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }

    #[inline]
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    #[inline]
    pub(crate) fn entry_mut(
        &mut self,
        index: usize,
    ) -> Option<&mut TranscriptEntry> {
        self.entries.get_mut(index)
    }
}
