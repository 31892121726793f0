#[cfg(test)]
mod tests;

use std::future::poll_fn;
use std::pin::pin;

use chatline_transport::{
    AgentEndpoint, Channel, ChatRequest, EndpointError, EventStream,
    StreamEvent,
};
use serde_json::{Map, Value};

use crate::transcript::{Speaker, Transcript, TranscriptEntry};

/// Shown in place of an answer when a submission fails.
const DEFAULT_FALLBACK_MESSAGE: &str =
    "Something went wrong. Please try again.";

type TranscriptSubscriber = Box<dyn Fn(&Transcript) + Send + Sync>;

/// The lifecycle of one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingOpen,
    Streaming,
    Terminated,
}

/// [`ChatSession`] builder.
pub struct ChatSessionBuilder<E> {
    endpoint: E,
    visitor_id: String,
    channel: Option<Channel>,
    extension: Map<String, Value>,
    seed: Vec<TranscriptEntry>,
    fallback_message: String,
    on_transcript: Option<TranscriptSubscriber>,
}

impl<E: AgentEndpoint> ChatSessionBuilder<E> {
    /// Creates a new builder with the specified endpoint and visitor
    /// identifier.
    ///
    /// The visitor identifier is opaque to the session and is included
    /// verbatim in every request.
    pub fn with_endpoint<S: Into<String>>(endpoint: E, visitor_id: S) -> Self {
        Self {
            endpoint,
            visitor_id: visitor_id.into(),
            channel: None,
            extension: Map::new(),
            seed: vec![],
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_owned(),
            on_transcript: None,
        }
    }

    /// Tags requests of this session with a channel.
    #[inline]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Adds a field merged into the body of every request.
    #[inline]
    pub fn with_extension_field<S: Into<String>>(
        mut self,
        key: S,
        value: Value,
    ) -> Self {
        self.extension.insert(key.into(), value);
        self
    }

    /// Appends a pre-existing entry to the initial transcript, e.g. a
    /// greeting exchange.
    #[inline]
    pub fn with_seed_entry<S: Into<String>>(
        mut self,
        speaker: Speaker,
        text: S,
    ) -> Self {
        self.seed.push(TranscriptEntry::new(speaker, text));
        self
    }

    /// Overrides the message shown when a submission fails.
    #[inline]
    pub fn with_fallback_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.fallback_message = msg.into();
        self
    }

    /// Attaches a callback to be invoked with a transcript snapshot
    /// after every change.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&Transcript) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Builds the session.
    pub fn build(self) -> ChatSession<E> {
        let mut transcript = Transcript::default();
        for entry in self.seed {
            transcript.push(entry);
        }
        ChatSession {
            endpoint: self.endpoint,
            transcript,
            visitor_id: self.visitor_id,
            channel: self.channel,
            extension: self.extension,
            fallback_message: self.fallback_message,
            on_transcript: self.on_transcript,
            stage: Stage::Idle,
        }
    }
}

/// A chat session against an agent endpoint.
///
/// The session owns the transcript: it appends the user's message on
/// submission, reconciles the streamed reply into the reserved agent
/// slot as fragments arrive, and publishes a snapshot to the
/// subscriber after every change.
///
/// There is at most one in-flight submission: [`submit`](Self::submit)
/// borrows the session mutably for its whole lifetime, so overlapping
/// submissions are unrepresentable.
pub struct ChatSession<E> {
    endpoint: E,
    transcript: Transcript,
    visitor_id: String,
    channel: Option<Channel>,
    extension: Map<String, Value>,
    fallback_message: String,
    on_transcript: Option<TranscriptSubscriber>,
    stage: Stage,
}

impl<E: AgentEndpoint> ChatSession<E> {
    /// Returns a snapshot of the current transcript.
    #[inline]
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }

    /// Submits a user message and streams the agent's reply into the
    /// transcript.
    ///
    /// The human entry is appended and published synchronously, before
    /// any network activity. Control returns once the reply stream has
    /// concluded; every transcript change in between is visible
    /// through the subscriber callback.
    ///
    /// A failed submission never surfaces to the caller: the session
    /// recovers locally by replacing any partial reply with a single
    /// generic fallback entry.
    pub async fn submit(&mut self, message: &str) {
        if message.is_empty() {
            // Nothing to ask. No transcript change, no request.
            return;
        }

        self.transcript
            .push(TranscriptEntry::new(Speaker::Human, message));
        // The slot the forthcoming reply will land in.
        let target_index = self.transcript.len();
        self.publish();

        let req = ChatRequest {
            query: message.to_owned(),
            visitor_id: self.visitor_id.clone(),
            channel: self.channel,
            extension: self.extension.clone(),
        };

        let result = self.stream_reply(&req, target_index).await;
        self.set_stage(Stage::Terminated);

        if let Err(err) = result {
            warn!("submission failed ({:?}): {err}", err.kind());
            // The pre-attempt history wins over any partial reply.
            self.transcript.truncate(target_index);
            self.transcript.push(TranscriptEntry::new(
                Speaker::Agent,
                self.fallback_message.clone(),
            ));
            self.publish();
        }

        self.set_stage(Stage::Idle);
    }

    /// Drives one reply stream to completion, reconciling fragments
    /// into the transcript slot at `target_index`.
    async fn stream_reply(
        &mut self,
        req: &ChatRequest,
        target_index: usize,
    ) -> Result<(), E::Error> {
        self.set_stage(Stage::AwaitingOpen);
        let stream = self.endpoint.send_request(req).await?;
        self.set_stage(Stage::Streaming);

        let mut stream = pin!(stream);
        let mut buffer = String::new();
        loop {
            let event =
                poll_fn(|cx| stream.as_mut().poll_next_event(cx)).await?;
            let Some(event) = event else {
                // Conforming streams only end after a terminal event.
                return Ok(());
            };
            trace!("got an event: {event:?}");

            match event {
                StreamEvent::Fragment(fragment) => {
                    buffer.push_str(&fragment);
                    // Each reconciliation writes the entire accumulated
                    // buffer, not just the new fragment.
                    if let Some(entry) =
                        self.transcript.entry_mut(target_index)
                    {
                        entry.text = buffer.clone();
                    } else {
                        self.transcript.push(TranscriptEntry::new(
                            Speaker::Agent,
                            buffer.clone(),
                        ));
                    }
                    self.publish();
                }
                StreamEvent::ServerError(detail) => {
                    // The error entry bypasses the accumulator and
                    // lands on the history captured at submission.
                    self.transcript.truncate(target_index);
                    self.transcript
                        .push(TranscriptEntry::new(Speaker::Agent, detail));
                    self.publish();
                    // Dropping the stream aborts the connection.
                    return Ok(());
                }
                StreamEvent::Done => return Ok(()),
            }
        }
    }

    #[inline]
    fn set_stage(&mut self, stage: Stage) {
        trace!("stage: {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn publish(&self) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(&self.transcript);
        }
    }
}
