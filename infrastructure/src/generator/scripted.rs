//! Scripted Speech Generator
//!
//! Plays back per-juror lines as a chunked stream, the way a model would
//! stream tokens, and scores each line with the topic-weight persuasion
//! policy ([`StanceImpact`]) to produce stance deltas.

use crate::config::{FileGeneratorConfig, FileJurorConfig};
use async_trait::async_trait;
use jury_application::ports::speech_generator::deltas_to_raw;
use jury_application::{
    GeneratorError, SpeechCompletion, SpeechEvent, SpeechGenerator, SpeechRequest, SpeechStream,
};
use jury_domain::{
    ConfigIssue, JurorId, SpeakerProfile, SpeakerRole, Stance, StanceDeltas, StanceImpact,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const STREAM_CAPACITY: usize = 32;

/// One playable utterance and its persuasive content
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    text: String,
    impact: StanceImpact,
}

impl ScriptLine {
    pub fn new(text: impl Into<String>, impact: StanceImpact) -> Self {
        Self {
            text: text.into(),
            impact,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn impact(&self) -> &StanceImpact {
        &self.impact
    }
}

/// A juror's persuasion profile and lines
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JurorScript {
    profile: SpeakerProfile,
    lines: Vec<ScriptLine>,
}

impl JurorScript {
    pub fn new(profile: SpeakerProfile, lines: Vec<ScriptLine>) -> Self {
        Self { profile, lines }
    }

    pub fn profile(&self) -> &SpeakerProfile {
        &self.profile
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    /// Line for `round` (1-based), cycling through the script
    pub fn line_for(&self, round: u32) -> Option<&ScriptLine> {
        if self.lines.is_empty() {
            return None;
        }
        let index = (round.saturating_sub(1) as usize) % self.lines.len();
        self.lines.get(index)
    }
}

pub struct ScriptedSpeechGenerator {
    scripts: HashMap<JurorId, JurorScript>,
    chunk_chars: usize,
    chunk_delay: Duration,
}

impl ScriptedSpeechGenerator {
    pub fn new(scripts: HashMap<JurorId, JurorScript>) -> Self {
        Self {
            scripts,
            chunk_chars: 12,
            chunk_delay: Duration::ZERO,
        }
    }

    /// Build from the configured cast, returning any script issues
    pub fn from_config(
        jurors: &[FileJurorConfig],
        pacing: &FileGeneratorConfig,
    ) -> (Self, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let scripts = jurors
            .iter()
            .map(|juror| {
                let (script, script_issues) = juror.to_script();
                issues.extend(script_issues);
                (JurorId::from(juror.id.as_str()), script)
            })
            .collect();
        let generator = Self::new(scripts)
            .with_chunk_chars(pacing.chunk_chars)
            .with_chunk_delay(pacing.chunk_delay());
        (generator, issues)
    }

    pub fn with_chunk_chars(mut self, chars: usize) -> Self {
        self.chunk_chars = chars.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    fn compose(&self, request: &SpeechRequest, line: Option<&ScriptLine>) -> String {
        let mut text = String::new();
        if let Some(note) = &request.note {
            text.push_str(&format!("Someone passed me a note: \"{note}\". "));
        }
        if request.role == SpeakerRole::Responder && request.round > 1 {
            text.push_str("Let me answer that. ");
        }
        match line {
            Some(line) => text.push_str(line.text()),
            None => text.push_str("I have nothing to add this round."),
        }
        text
    }

    fn deltas(&self, request: &SpeechRequest, line: &ScriptLine, power: f64) -> StanceDeltas {
        let speaker_stance = request
            .stances
            .get(&request.juror_id)
            .copied()
            .unwrap_or(Stance::NEUTRAL);
        let fallback = SpeakerProfile::default();
        let listeners = request.stances.iter().map(|(id, stance)| {
            let profile = self.scripts.get(id).map_or(&fallback, |s| s.profile());
            (id, *stance, profile)
        });
        line.impact()
            .deltas(&request.juror_id, speaker_stance, power, listeners)
            .into_iter()
            .filter(|(_, delta)| *delta != 0)
            .collect()
    }

    fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[async_trait]
impl SpeechGenerator for ScriptedSpeechGenerator {
    async fn generate(&self, request: SpeechRequest) -> Result<SpeechStream, GeneratorError> {
        let script = self
            .scripts
            .get(&request.juror_id)
            .ok_or_else(|| GeneratorError::UnknownSpeaker(request.juror_id.to_string()))?;

        let line = script.line_for(request.round);
        let full_text = self.compose(&request, line);
        let deltas = line
            .map(|line| self.deltas(&request, line, script.profile().speaker_power))
            .unwrap_or_default();
        let chunks = self.chunk(&full_text);

        debug!(
            juror = %request.juror_id,
            round = request.round,
            chunks = chunks.len(),
            deltas = deltas.len(),
            "Scripted speech"
        );

        let completion = SpeechCompletion {
            full_text,
            stance_deltas: deltas_to_raw(&deltas),
        };
        let delay = self.chunk_delay;
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        tokio::spawn(async move {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(SpeechEvent::Delta(chunk)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(SpeechEvent::Completed(completion)).await;
        });

        Ok(SpeechStream::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_jurors;
    use jury_domain::Impact;
    use std::collections::BTreeMap;

    fn request(juror: &str, round: u32, note: Option<&str>) -> SpeechRequest {
        let stances: BTreeMap<JurorId, Stance> = [("a", 50), ("b", 50), ("c", 10)]
            .into_iter()
            .map(|(id, s)| (JurorId::from(id), Stance::new(s)))
            .collect();
        SpeechRequest {
            session_id: "s1".to_string(),
            juror_id: juror.into(),
            role: SpeakerRole::Leader,
            round,
            context: String::new(),
            note: note.map(str::to_string),
            stances,
        }
    }

    fn generator() -> ScriptedSpeechGenerator {
        let weights = |w: i32| SpeakerProfile {
            speaker_power: 1.0,
            topic_weights: HashMap::from([("safety".to_string(), w)]),
        };
        let scripts = HashMap::from([
            (
                JurorId::from("a"),
                JurorScript::new(
                    weights(5),
                    vec![
                        ScriptLine::new(
                            "Safety was ignored.",
                            StanceImpact::new(vec!["safety".into()], Impact::Positive),
                        ),
                        ScriptLine::new(
                            "Then again, it was an attack.",
                            StanceImpact::new(vec!["safety".into()], Impact::Negative),
                        ),
                    ],
                ),
            ),
            (JurorId::from("b"), JurorScript::new(weights(6), vec![])),
            (JurorId::from("c"), JurorScript::new(weights(10), vec![])),
        ]);
        ScriptedSpeechGenerator::new(scripts).with_chunk_chars(5)
    }

    async fn drain(mut stream: SpeechStream) -> (Vec<String>, SpeechCompletion) {
        let mut chunks = Vec::new();
        loop {
            match stream.recv().await {
                Some(SpeechEvent::Delta(text)) => chunks.push(text),
                Some(SpeechEvent::Completed(done)) => return (chunks, done),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_chunks_concatenate_to_full_text() {
        let stream = generator().generate(request("a", 1, None)).await.unwrap();
        let (chunks, done) = drain(stream).await;
        assert_eq!(done.full_text, "Safety was ignored.");
        assert_eq!(chunks.concat(), done.full_text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 5));
    }

    #[tokio::test]
    async fn test_deltas_follow_topic_weights() {
        let stream = generator().generate(request("a", 1, None)).await.unwrap();
        let (_, done) = drain(stream).await;
        // b: 6 × 1.0 × 1.0 × 1.0 = 6; c: 10 × 0.6 damping, halved when entrenched = 3
        assert_eq!(done.stance_deltas.get("b"), Some(&6));
        assert_eq!(done.stance_deltas.get("c"), Some(&3));
        assert!(!done.stance_deltas.contains_key("a"));
    }

    #[tokio::test]
    async fn test_lines_cycle_by_round() {
        let stream = generator().generate(request("a", 2, None)).await.unwrap();
        let (_, done) = drain(stream).await;
        assert_eq!(done.full_text, "Then again, it was an attack.");
        assert_eq!(done.stance_deltas.get("b"), Some(&-6));
    }

    #[tokio::test]
    async fn test_note_is_acknowledged() {
        let stream = generator()
            .generate(request("a", 1, Some("Check the logs")))
            .await
            .unwrap();
        let (_, done) = drain(stream).await;
        assert!(done.full_text.contains("Check the logs"));
    }

    #[tokio::test]
    async fn test_juror_without_lines_has_no_effect() {
        let stream = generator().generate(request("b", 1, None)).await.unwrap();
        let (_, done) = drain(stream).await;
        assert!(done.stance_deltas.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_speaker() {
        let result = generator().generate(request("ghost", 1, None)).await;
        assert!(matches!(result, Err(GeneratorError::UnknownSpeaker(id)) if id == "ghost"));
    }

    #[test]
    fn test_from_default_cast() {
        let (generator, issues) =
            ScriptedSpeechGenerator::from_config(&default_jurors(), &FileGeneratorConfig::default());
        assert!(issues.is_empty());
        assert_eq!(generator.scripts.len(), 5);
        assert_eq!(generator.chunk_chars, 12);
    }
}
