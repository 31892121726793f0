use std::sync::{Arc, Mutex};

use chatline_test_transport::{PresetEvent, PresetStream, TestEndpoint};
use chatline_transport::{Channel, ErrorKind};
use serde_json::json;

use crate::ChatSessionBuilder;
use crate::transcript::{Speaker, Transcript};

type Snapshots = Arc<Mutex<Vec<Transcript>>>;

fn recording() -> (Snapshots, impl Fn(&Transcript) + Send + Sync + 'static) {
    let snapshots: Snapshots = Default::default();
    let subscriber = {
        let snapshots = Arc::clone(&snapshots);
        move |transcript: &Transcript| {
            snapshots.lock().unwrap().push(transcript.clone());
        }
    };
    (snapshots, subscriber)
}

fn entry_texts(transcript: &Transcript) -> Vec<(Speaker, &str)> {
    transcript
        .entries()
        .iter()
        .map(|e| (e.speaker, e.text.as_str()))
        .collect()
}

#[tokio::test]
async fn test_empty_message_is_a_no_op() {
    let endpoint = TestEndpoint::default();
    let (snapshots, subscriber) = recording();
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint.clone(), "visitor:test")
            .on_transcript(subscriber)
            .build();

    session.submit("").await;

    assert!(session.transcript().is_empty());
    assert!(snapshots.lock().unwrap().is_empty());
    assert!(endpoint.requests().is_empty());
}

#[tokio::test]
async fn test_human_entry_is_published_before_any_reply() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("Hi!".to_owned()),
        PresetEvent::Done,
    ]));
    let (snapshots, subscriber) = recording();
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint.clone(), "visitor:test")
            .with_channel(Channel::Website)
            .with_extension_field("agentId", json!("agent:42"))
            .on_transcript(subscriber)
            .build();

    session.submit("Good morning").await;

    // The very first snapshot carries exactly the human entry.
    let snapshots = snapshots.lock().unwrap();
    assert_eq!(
        entry_texts(&snapshots[0]),
        vec![(Speaker::Human, "Good morning")]
    );

    let requests = endpoint.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, "Good morning");
    assert_eq!(requests[0].visitor_id, "visitor:test");
    assert_eq!(requests[0].channel, Some(Channel::Website));
    assert_eq!(requests[0].extension["agentId"], json!("agent:42"));
}

#[tokio::test]
async fn test_done_without_fragments_adds_no_agent_entry() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([PresetEvent::Done]));
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test").build();

    session.submit("hi").await;

    assert_eq!(
        entry_texts(&session.transcript()),
        vec![(Speaker::Human, "hi")]
    );
}

#[tokio::test]
async fn test_fragments_accumulate_into_one_entry() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("How ".to_owned()),
        PresetEvent::Fragment("are ".to_owned()),
        PresetEvent::Fragment("you?".to_owned()),
        PresetEvent::Done,
    ]));
    let (snapshots, subscriber) = recording();
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test")
            .on_transcript(subscriber)
            .build();

    session.submit("hi").await;

    assert_eq!(
        entry_texts(&session.transcript()),
        vec![(Speaker::Human, "hi"), (Speaker::Agent, "How are you?")]
    );

    // The first fragment creates the agent entry, the rest only
    // rewrite its text. One snapshot per change: the human entry, then
    // one per fragment.
    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots.len(), 4);
    assert_eq!(
        entry_texts(&snapshots[1]),
        vec![(Speaker::Human, "hi"), (Speaker::Agent, "How ")]
    );
    assert_eq!(
        entry_texts(&snapshots[2]),
        vec![(Speaker::Human, "hi"), (Speaker::Agent, "How are ")]
    );
    assert_eq!(
        entry_texts(&snapshots[3]),
        vec![(Speaker::Human, "hi"), (Speaker::Agent, "How are you?")]
    );
}

#[tokio::test]
async fn test_server_error_discards_partial_reply() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("Partial ans".to_owned()),
        PresetEvent::ServerError("agent is unavailable".to_owned()),
        // Never delivered: the session aborts the stream on the error
        // marker.
        PresetEvent::Fragment("wer".to_owned()),
    ]));
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test").build();

    session.submit("hi").await;

    assert_eq!(
        entry_texts(&session.transcript()),
        vec![
            (Speaker::Human, "hi"),
            (Speaker::Agent, "agent is unavailable"),
        ]
    );
}

#[tokio::test]
async fn test_open_failure_appends_fallback_entry() {
    for kind in [
        ErrorKind::Fatal,
        ErrorKind::Retriable,
        ErrorKind::UsageLimitExceeded,
    ] {
        let mut endpoint = TestEndpoint::default();
        endpoint.add_stream(PresetStream::with_failure(kind));
        let mut session =
            ChatSessionBuilder::with_endpoint(endpoint, "visitor:test")
                .build();

        session.submit("hi").await;

        // Every failure kind produces the same generic message.
        assert_eq!(
            entry_texts(&session.transcript()),
            vec![
                (Speaker::Human, "hi"),
                (Speaker::Agent, "Something went wrong. Please try again."),
            ]
        );
    }
}

#[tokio::test]
async fn test_mid_stream_failure_discards_partial_reply() {
    let mut endpoint = TestEndpoint::default();
    // No terminal event: the connection drops mid-answer.
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("Let me thi".to_owned()),
    ]));
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test")
            .with_fallback_message("request failed")
            .build();

    session.submit("hi").await;

    // The partial fragment is dropped, not preserved.
    assert_eq!(
        entry_texts(&session.transcript()),
        vec![(Speaker::Human, "hi"), (Speaker::Agent, "request failed")]
    );
}

#[tokio::test]
async fn test_seeded_greeting_scenario() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("Hello".to_owned()),
        PresetEvent::Fragment(" there".to_owned()),
        PresetEvent::Done,
    ]));
    let (snapshots, subscriber) = recording();
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test")
            .with_seed_entry(Speaker::Human, "hello")
            .with_seed_entry(
                Speaker::Agent,
                "Hello! How can I assist you today?",
            )
            .on_transcript(subscriber)
            .build();
    assert_eq!(session.transcript().len(), 2);

    session.submit("hi").await;

    let snapshots = snapshots.lock().unwrap();
    // Submission: 3 entries, last is the human message.
    assert_eq!(snapshots[0].len(), 3);
    assert_eq!(
        entry_texts(&snapshots[0])[2],
        (Speaker::Human, "hi")
    );
    // First fragment: 4 entries, last is the growing reply.
    assert_eq!(snapshots[1].len(), 4);
    assert_eq!(entry_texts(&snapshots[1])[3], (Speaker::Agent, "Hello"));
    // Second fragment: still 4 entries, text rewritten.
    assert_eq!(snapshots[2].len(), 4);
    assert_eq!(
        entry_texts(&snapshots[2])[3],
        (Speaker::Agent, "Hello there")
    );
    // Done leaves the transcript unchanged.
    assert_eq!(snapshots.len(), 3);
    assert_eq!(session.transcript().len(), 4);
}

#[tokio::test]
async fn test_consecutive_submissions() {
    let mut endpoint = TestEndpoint::default();
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("First answer".to_owned()),
        PresetEvent::Done,
    ]));
    endpoint.add_stream(PresetStream::with_events([
        PresetEvent::Fragment("Second answer".to_owned()),
        PresetEvent::Done,
    ]));
    let mut session =
        ChatSessionBuilder::with_endpoint(endpoint, "visitor:test").build();

    session.submit("one").await;
    session.submit("two").await;

    assert_eq!(
        entry_texts(&session.transcript()),
        vec![
            (Speaker::Human, "one"),
            (Speaker::Agent, "First answer"),
            (Speaker::Human, "two"),
            (Speaker::Agent, "Second answer"),
        ]
    );
}
