//! Deliberation configuration from TOML (`[deliberation]` section)

use jury_application::DeliberationConfig;
use jury_domain::{ConfigIssue, ConfigIssueCode, NoteRefill};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw deliberation configuration from TOML
///
/// # Example
///
/// ```toml
/// [deliberation]
/// total_rounds = 4
/// responders_per_round = 2
/// max_notes = 3
/// note_refill = "per_debate"     # "per_debate" or "per_window"
/// note_window_ms = 5000
/// max_note_length = 200
/// event_buffer = 1024
/// ended_retention_ms = 60000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    pub total_rounds: u32,
    pub responders_per_round: usize,
    pub max_notes: u32,
    pub note_refill: String,
    pub note_window_ms: u64,
    pub max_note_length: usize,
    pub event_buffer: usize,
    pub ended_retention_ms: u64,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        Self {
            total_rounds: 4,
            responders_per_round: 2,
            max_notes: 3,
            note_refill: "per_debate".to_string(),
            note_window_ms: 5000,
            max_note_length: 200,
            event_buffer: 1024,
            ended_retention_ms: 60_000,
        }
    }
}

impl FileDeliberationConfig {
    /// Parse note_refill into [`NoteRefill`], falling back to per-debate.
    pub fn parse_note_refill(&self) -> (NoteRefill, Vec<ConfigIssue>) {
        match self.note_refill.parse::<NoteRefill>() {
            Ok(refill) => (refill, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: "deliberation.note_refill".to_string(),
                        value: self.note_refill.clone(),
                        valid_values: vec!["per_debate".to_string(), "per_window".to_string()],
                    },
                    format!(
                        "deliberation.note_refill: unknown value '{}', falling back to 'per_debate'",
                        self.note_refill
                    ),
                );
                (NoteRefill::default(), vec![issue])
            }
        }
    }

    /// Convert to application config, reporting values that were adjusted.
    pub fn to_deliberation_config(&self) -> (DeliberationConfig, Vec<ConfigIssue>) {
        let (refill, mut issues) = self.parse_note_refill();

        for (field, value) in [
            ("deliberation.total_rounds", self.total_rounds as usize),
            ("deliberation.responders_per_round", self.responders_per_round),
            ("deliberation.event_buffer", self.event_buffer),
            ("deliberation.max_note_length", self.max_note_length),
        ] {
            if value == 0 {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::OutOfRange {
                        field: field.to_string(),
                        value: 0,
                    },
                    format!("{field}: must be at least 1, using 1"),
                ));
            }
        }

        let config = DeliberationConfig::default()
            .with_total_rounds(self.total_rounds.max(1))
            .with_responders_per_round(self.responders_per_round.max(1))
            .with_max_notes(self.max_notes)
            .with_note_refill(refill)
            .with_note_window(Duration::from_millis(self.note_window_ms))
            .with_max_note_length(self.max_note_length.max(1))
            .with_event_buffer(self.event_buffer.max(1))
            .with_ended_retention(Duration::from_millis(self.ended_retention_ms));
        (config, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_application_default() {
        let (config, issues) = FileDeliberationConfig::default().to_deliberation_config();
        assert!(issues.is_empty());
        assert_eq!(config, DeliberationConfig::default());
    }

    #[test]
    fn test_unknown_refill_falls_back() {
        let file = FileDeliberationConfig {
            note_refill: "hourly".to_string(),
            ..Default::default()
        };
        let (refill, issues) = file.parse_note_refill();
        assert_eq!(refill, NoteRefill::PerDebate);
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }

    #[test]
    fn test_zero_values_are_raised() {
        let file = FileDeliberationConfig {
            total_rounds: 0,
            responders_per_round: 0,
            note_window_ms: 0,
            ..Default::default()
        };
        let (config, issues) = file.to_deliberation_config();
        assert_eq!(config.total_rounds, 1);
        assert_eq!(config.responders_per_round, 1);
        assert_eq!(config.note_window, Duration::ZERO);
        assert_eq!(issues.len(), 2);
    }
}
