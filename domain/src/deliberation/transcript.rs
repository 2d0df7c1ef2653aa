//! Session-lifetime debate record used to give speakers context

use super::round::SpeakerRole;
use super::speech::FinalizedSpeech;
use crate::core::ids::JurorId;
use std::collections::BTreeMap;

/// Number of most recent rounds quoted verbatim in the context
const RECENT_ROUNDS: usize = 2;
/// Older rounds are condensed into a summary of at most this many characters
const SUMMARY_LIMIT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub round: u32,
    pub speaker: JurorId,
    pub role: SpeakerRole,
    pub text: String,
}

impl TranscriptEntry {
    fn line(&self) -> String {
        format!("{}({}): {}", self.speaker, self.role, self.text)
    }
}

/// Finalized speeches of the current debate, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn record(&mut self, speech: &FinalizedSpeech) {
        self.entries.push(TranscriptEntry {
            round: speech.round,
            speaker: speech.speaker.clone(),
            role: speech.role,
            text: speech.full_text.clone(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Debate context handed to the speech generator.
    ///
    /// The last two rounds are quoted in full; anything older is condensed
    /// into a single summary truncated to 300 characters.
    pub fn debate_context(&self) -> String {
        if self.entries.is_empty() {
            return "No debate record yet.".to_string();
        }

        let mut rounds: BTreeMap<u32, Vec<&TranscriptEntry>> = BTreeMap::new();
        for entry in &self.entries {
            rounds.entry(entry.round).or_default().push(entry);
        }

        let split = rounds.len().saturating_sub(RECENT_ROUNDS);
        let mut parts = Vec::new();

        let older: Vec<String> = rounds
            .iter()
            .take(split)
            .flat_map(|(round, entries)| entries.iter().map(move |e| format!("R{round} {}", e.line())))
            .collect();
        if !older.is_empty() {
            parts.push(format!("[Earlier rounds]\n{}", truncate(&older.join("\n"))));
        }

        for (round, entries) in rounds.iter().skip(split) {
            parts.push(format!("[Round {round}]"));
            parts.extend(entries.iter().map(|e| e.line()));
        }

        parts.join("\n")
    }
}

fn truncate(summary: &str) -> String {
    if summary.chars().count() <= SUMMARY_LIMIT {
        return summary.to_string();
    }
    let cut: String = summary.chars().take(SUMMARY_LIMIT).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juror::StanceDeltas;

    fn speech(round: u32, speaker: &str, text: &str) -> FinalizedSpeech {
        FinalizedSpeech {
            speaker: speaker.into(),
            role: SpeakerRole::Leader,
            round,
            full_text: text.to_string(),
            stance_deltas: StanceDeltas::new(),
            degraded: false,
        }
    }

    #[test]
    fn test_empty_transcript_context() {
        assert_eq!(Transcript::default().debate_context(), "No debate record yet.");
    }

    #[test]
    fn test_recent_rounds_are_quoted() {
        let mut transcript = Transcript::default();
        transcript.record(&speech(1, "a", "first"));
        transcript.record(&speech(2, "b", "second"));
        let context = transcript.debate_context();
        assert_eq!(
            context,
            "[Round 1]\na(leader): first\n[Round 2]\nb(leader): second"
        );
    }

    #[test]
    fn test_older_rounds_are_summarized_and_truncated() {
        let mut transcript = Transcript::default();
        transcript.record(&speech(1, "a", &"x".repeat(400)));
        transcript.record(&speech(2, "b", "two"));
        transcript.record(&speech(3, "c", "three"));
        let context = transcript.debate_context();

        assert!(context.starts_with("[Earlier rounds]\nR1 a(leader): "));
        assert!(context.contains("...\n[Round 2]"));
        assert!(context.ends_with("[Round 3]\nc(leader): three"));
        assert!(!context.contains("R2"));
    }
}
