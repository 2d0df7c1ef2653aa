//! Speech Streamer
//!
//! Turns one generator stream into ordered text increments plus a single
//! finalized speech. The controller drives it with [`SpeechStreamer::next_chunk`]
//! inside a `select!`, so that call is cancel-safe: dropping its future never
//! loses an increment.

use crate::ports::speech_generator::{SpeechCompletion, SpeechEvent, SpeechStream};
use jury_domain::{DeltaViolation, FinalizedSpeech, Roster, Speech, sanitize_deltas};
use tracing::{debug, warn};

/// How the generator stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamEnd {
    Completed(SpeechCompletion),
    Failed(String),
}

pub struct SpeechStreamer {
    speech: Speech,
    stream: Option<SpeechStream>,
    end: Option<StreamEnd>,
}

impl SpeechStreamer {
    pub fn new(speech: Speech, stream: SpeechStream) -> Self {
        Self {
            speech,
            stream: Some(stream),
            end: None,
        }
    }

    /// A streamer for a speech whose generator refused to start
    pub fn failed(speech: Speech, reason: impl Into<String>) -> Self {
        Self {
            speech,
            stream: None,
            end: Some(StreamEnd::Failed(reason.into())),
        }
    }

    pub fn speech(&self) -> &Speech {
        &self.speech
    }

    /// Next non-empty text increment, or `None` once the stream has ended.
    pub async fn next_chunk(&mut self) -> Option<String> {
        loop {
            if self.end.is_some() {
                return None;
            }
            let stream = self.stream.as_mut()?;
            match stream.recv().await {
                Some(SpeechEvent::Delta(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    self.speech.push_chunk(&text);
                    return Some(text);
                }
                Some(SpeechEvent::Completed(completion)) => {
                    self.end = Some(StreamEnd::Completed(completion));
                    self.stream = None;
                }
                Some(SpeechEvent::Error(reason)) => {
                    self.end = Some(StreamEnd::Failed(reason));
                    self.stream = None;
                }
                None => {
                    self.end = Some(StreamEnd::Failed(
                        "stream closed before completion".to_string(),
                    ));
                    self.stream = None;
                }
            }
        }
    }

    /// Finalize the speech, enforcing the stance delta contract against `roster`.
    ///
    /// A failed or unfinished stream yields the partial text with no deltas.
    pub fn finish(self, roster: &Roster) -> FinalizedSpeech {
        let speaker = self.speech.speaker().to_string();
        match self.end {
            Some(StreamEnd::Completed(completion)) => {
                let (deltas, violations) = sanitize_deltas(&completion.stance_deltas, roster);
                for violation in &violations {
                    match violation {
                        DeltaViolation::UnknownJuror(key) => {
                            warn!(speaker = %speaker, juror = %key, "Dropping stance delta for unknown juror");
                        }
                        DeltaViolation::OutOfRange { juror, delta } => {
                            warn!(speaker = %speaker, juror = %juror, delta, "Stance delta out of range, using 0");
                        }
                    }
                }
                if !completion.full_text.is_empty()
                    && !completion.full_text.starts_with(self.speech.text())
                {
                    warn!(speaker = %speaker, "Final text does not extend the streamed chunks");
                }
                debug!(
                    speaker = %speaker,
                    chunks = self.speech.chunk_count(),
                    deltas = deltas.len(),
                    "Speech completed"
                );
                self.speech.finalize(completion.full_text, deltas)
            }
            Some(StreamEnd::Failed(reason)) => {
                warn!(speaker = %speaker, reason = %reason, "Speech generation failed, keeping partial text");
                self.speech.finalize_degraded()
            }
            None => {
                warn!(speaker = %speaker, "Speech finished before the stream settled");
                self.speech.finalize_degraded()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::speech_generator::raw_deltas;
    use jury_domain::{Juror, SpeakerRole, Stance};
    use tokio::sync::mpsc;

    fn roster() -> Roster {
        Roster::new(vec![
            Juror::new("j1", "One", Stance::new(30)),
            Juror::new("j2", "Two", Stance::new(70)),
        ])
    }

    fn speech() -> Speech {
        Speech::new("j1".into(), SpeakerRole::Leader, 1)
    }

    async fn drain(streamer: &mut SpeechStreamer) -> Vec<String> {
        let mut chunks = Vec::new();
        while let Some(chunk) = streamer.next_chunk().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_chunks_in_order_and_completion_text_wins() {
        let stream = SpeechStream::from_parts(
            vec!["I ".into(), String::new(), "object".into()],
            SpeechCompletion {
                full_text: "I object.".into(),
                stance_deltas: raw_deltas([("j2", -4)]),
            },
        );
        let mut streamer = SpeechStreamer::new(speech(), stream);

        assert_eq!(drain(&mut streamer).await, vec!["I ", "object"]);

        let done = streamer.finish(&roster());
        assert_eq!(done.full_text, "I object.");
        assert_eq!(done.stance_deltas.get("j2"), Some(&-4));
        assert!(!done.degraded);
    }

    #[tokio::test]
    async fn test_empty_completion_text_falls_back_to_chunks() {
        let stream = SpeechStream::from_parts(
            vec!["Guilty ".into(), "as charged".into()],
            SpeechCompletion::default(),
        );
        let mut streamer = SpeechStreamer::new(speech(), stream);
        drain(&mut streamer).await;

        assert_eq!(streamer.finish(&roster()).full_text, "Guilty as charged");
    }

    #[tokio::test]
    async fn test_delta_contract_enforced() {
        let stream = SpeechStream::from_parts(
            vec!["x".into()],
            SpeechCompletion {
                full_text: "x".into(),
                stance_deltas: raw_deltas([("j2", 150), ("ghost", 5), ("j1", -10)]),
            },
        );
        let mut streamer = SpeechStreamer::new(speech(), stream);
        drain(&mut streamer).await;

        let done = streamer.finish(&roster());
        assert_eq!(done.stance_deltas.get("j2"), Some(&0));
        assert_eq!(done.stance_deltas.get("j1"), Some(&-10));
        assert!(!done.stance_deltas.contains_key("ghost"));
    }

    #[tokio::test]
    async fn test_error_mid_stream_keeps_partial_text() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(SpeechEvent::Delta("Half a".into())).await.unwrap();
        tx.send(SpeechEvent::Error("model crashed".into()))
            .await
            .unwrap();
        let mut streamer = SpeechStreamer::new(speech(), SpeechStream::new(rx));

        assert_eq!(drain(&mut streamer).await, vec!["Half a"]);
        let done = streamer.finish(&roster());
        assert_eq!(done.full_text, "Half a");
        assert!(done.stance_deltas.is_empty());
        assert!(done.degraded);
    }

    #[tokio::test]
    async fn test_closed_stream_counts_as_failure() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(SpeechEvent::Delta("abc".into())).await.unwrap();
        drop(tx);
        let mut streamer = SpeechStreamer::new(speech(), SpeechStream::new(rx));
        drain(&mut streamer).await;

        assert!(streamer.finish(&roster()).degraded);
    }

    #[tokio::test]
    async fn test_refused_generation() {
        let mut streamer = SpeechStreamer::failed(speech(), "unknown speaker");
        assert_eq!(streamer.next_chunk().await, None);
        let done = streamer.finish(&roster());
        assert_eq!(done.full_text, "");
        assert!(done.degraded);
    }
}
