//! Speech Generator port
//!
//! Produces one juror's debate utterance as a stream of text increments,
//! terminated by a completion that carries the authoritative text and the
//! stance deltas the speech causes.

use async_trait::async_trait;
use jury_domain::{JurorId, SpeakerRole, SpeechBrief, Stance};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur when asking for a speech
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Unknown speaker: {0}")]
    UnknownSpeaker(String),

    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Everything the generator gets to produce one speech
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub session_id: String,
    pub juror_id: JurorId,
    pub role: SpeakerRole,
    pub round: u32,
    /// Recent debate transcript
    pub context: String,
    /// Note passed to this juror since their last speech
    pub note: Option<String>,
    /// Stances of every juror at the start of the speech
    pub stances: BTreeMap<JurorId, Stance>,
}

impl SpeechRequest {
    pub fn from_brief(session_id: impl Into<String>, brief: SpeechBrief) -> Self {
        Self {
            session_id: session_id.into(),
            juror_id: brief.speaker,
            role: brief.role,
            round: brief.round,
            context: brief.context,
            note: brief.note,
            stances: brief.stances,
        }
    }
}

/// Terminal payload of a successful speech
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpeechCompletion {
    /// Authoritative full text; empty means "use the streamed chunks"
    pub full_text: String,
    /// Raw deltas keyed by juror id, validated by the streamer
    pub stance_deltas: BTreeMap<String, i32>,
}

/// An event in a streaming speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// A text increment
    Delta(String),
    /// The speech finished (signals stream end)
    Completed(SpeechCompletion),
    /// Generation failed part way (signals stream end)
    Error(String),
}

/// Handle for receiving the events of one speech.
pub struct SpeechStream {
    pub receiver: mpsc::Receiver<SpeechEvent>,
}

impl SpeechStream {
    pub fn new(receiver: mpsc::Receiver<SpeechEvent>) -> Self {
        Self { receiver }
    }

    /// A stream that has already failed with `reason`
    pub fn failed(reason: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 guarantees the send succeeds
        let _ = tx.try_send(SpeechEvent::Error(reason.into()));
        Self::new(rx)
    }

    /// A finished stream built from ready-made parts
    pub fn from_parts(chunks: Vec<String>, completion: SpeechCompletion) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len() + 1);
        for chunk in chunks {
            let _ = tx.try_send(SpeechEvent::Delta(chunk));
        }
        let _ = tx.try_send(SpeechEvent::Completed(completion));
        Self::new(rx)
    }

    /// Receive the next event; `None` once the sender is gone
    pub async fn recv(&mut self) -> Option<SpeechEvent> {
        self.receiver.recv().await
    }
}

/// Produces juror speeches
///
/// Implementations bound their own latency: the engine does not time out a
/// speech, it only reacts to `Error` or a closed stream.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    async fn generate(&self, request: SpeechRequest) -> Result<SpeechStream, GeneratorError>;
}

#[cfg(test)]
pub(crate) fn raw_deltas<'a>(entries: impl IntoIterator<Item = (&'a str, i32)>) -> BTreeMap<String, i32> {
    entries
        .into_iter()
        .map(|(id, delta)| (id.to_string(), delta))
        .collect()
}

/// Deltas keyed by juror id, converted to the raw form a completion carries
pub fn deltas_to_raw(deltas: &BTreeMap<JurorId, i32>) -> BTreeMap<String, i32> {
    deltas.iter().map(|(id, d)| (id.to_string(), *d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_parts_yields_chunks_then_completion() {
        let mut stream = SpeechStream::from_parts(
            vec!["a".into(), "b".into()],
            SpeechCompletion {
                full_text: "ab".into(),
                stance_deltas: raw_deltas([("j1", 3)]),
            },
        );
        assert_eq!(stream.recv().await, Some(SpeechEvent::Delta("a".into())));
        assert_eq!(stream.recv().await, Some(SpeechEvent::Delta("b".into())));
        let last = stream.recv().await.unwrap();
        assert!(matches!(last, SpeechEvent::Completed(c) if c.full_text == "ab"));
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn test_failed_stream() {
        let mut stream = SpeechStream::failed("boom");
        assert_eq!(stream.recv().await, Some(SpeechEvent::Error("boom".into())));
    }
}
