//! Juror cast from TOML (`[[jurors]]` array)
//!
//! Each entry defines one juror's identity, starting stance and the scripted
//! material the bundled speech generator plays back for them.

use crate::generator::{JurorScript, ScriptLine};
use jury_domain::{
    ConfigIssue, ConfigIssueCode, Impact, Juror, SpeakerProfile, Stance, StanceImpact,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scripted utterance
///
/// ```toml
/// [[jurors.lines]]
/// text = "The logs show the safety layer was disabled by hand."
/// topics = ["technical_responsibility", "safety_measures"]
/// impact = "positive"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSpeechLine {
    pub text: String,
    pub topics: Vec<String>,
    /// "positive" (toward convict), "negative" (toward acquit) or "neutral"
    pub impact: String,
}

impl Default for FileSpeechLine {
    fn default() -> Self {
        Self {
            text: String::new(),
            topics: Vec::new(),
            impact: "neutral".to_string(),
        }
    }
}

/// Raw juror entry
///
/// ```toml
/// [[jurors]]
/// id = "chen"
/// name = "Margaret Chen"
/// initial_stance = 35
/// speaker_power = 0.7
/// topic_weights = { technical_details = 8, legal_precedent = -4 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileJurorConfig {
    pub id: String,
    pub name: String,
    pub initial_stance: i32,
    /// How strongly this juror sways others (0.0 to 1.0)
    pub speaker_power: f64,
    pub topic_weights: BTreeMap<String, i32>,
    pub lines: Vec<FileSpeechLine>,
}

impl Default for FileJurorConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            initial_stance: 50,
            speaker_power: 0.5,
            topic_weights: BTreeMap::new(),
            lines: Vec::new(),
        }
    }
}

impl FileJurorConfig {
    pub fn to_juror(&self, seat: usize) -> Juror {
        let name = if self.name.is_empty() {
            self.id.clone()
        } else {
            self.name.clone()
        };
        Juror::new(self.id.as_str(), name, Stance::new(self.initial_stance)).with_seat(seat)
    }

    pub fn profile(&self) -> SpeakerProfile {
        SpeakerProfile {
            speaker_power: self.speaker_power.clamp(0.0, 1.0),
            topic_weights: self
                .topic_weights
                .iter()
                .map(|(topic, weight)| (topic.clone(), *weight))
                .collect(),
        }
    }

    /// Build the generator script, warning about lines with an unknown impact.
    pub fn to_script(&self) -> (JurorScript, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let impact = line.impact.parse::<Impact>().unwrap_or_else(|_| {
                    issues.push(ConfigIssue::warning(
                        ConfigIssueCode::InvalidEnumValue {
                            field: format!("jurors.{}.lines[{i}].impact", self.id),
                            value: line.impact.clone(),
                            valid_values: vec![
                                "positive".to_string(),
                                "negative".to_string(),
                                "neutral".to_string(),
                            ],
                        },
                        format!(
                            "jurors.{}.lines[{i}].impact: unknown value '{}', using 'neutral'",
                            self.id, line.impact
                        ),
                    ));
                    Impact::Neutral
                });
                ScriptLine::new(
                    line.text.clone(),
                    StanceImpact::new(line.topics.clone(), impact),
                )
            })
            .collect();
        (JurorScript::new(self.profile(), lines), issues)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if !(0..=100).contains(&self.initial_stance) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: format!("jurors.{}.initial_stance", self.id),
                    value: i64::from(self.initial_stance),
                },
                format!(
                    "jurors.{}.initial_stance: {} is outside 0-100 and will be clamped",
                    self.id, self.initial_stance
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.speaker_power) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: format!("jurors.{}.speaker_power", self.id),
                    value: self.speaker_power.round() as i64,
                },
                format!(
                    "jurors.{}.speaker_power: {} is outside 0.0-1.0 and will be clamped",
                    self.id, self.speaker_power
                ),
            ));
        }
        issues.extend(self.to_script().1);
        issues
    }
}

fn line(text: &str, topics: &[&str], impact: &str) -> FileSpeechLine {
    FileSpeechLine {
        text: text.to_string(),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        impact: impact.to_string(),
    }
}

fn weights(entries: &[(&str, i32)]) -> BTreeMap<String, i32> {
    entries.iter().map(|(t, w)| (t.to_string(), *w)).collect()
}

/// The built-in five-juror cast used when no `[[jurors]]` are configured
pub fn default_jurors() -> Vec<FileJurorConfig> {
    vec![
        FileJurorConfig {
            id: "chen".to_string(),
            name: "Margaret Chen".to_string(),
            initial_stance: 35,
            speaker_power: 0.7,
            topic_weights: weights(&[
                ("technical_responsibility", 8),
                ("technical_details", 10),
                ("safety_measures", 6),
                ("emotional_appeal", -3),
            ]),
            lines: vec![
                line(
                    "The incident log shows the guardrail was bypassed from outside the model. That matters.",
                    &["external_attack", "technical_details"],
                    "negative",
                ),
                line(
                    "Still, the operator shipped without the rate limiter its own review demanded.",
                    &["safety_measures", "corporate_responsibility"],
                    "positive",
                ),
                line(
                    "I keep coming back to the architecture. A system this capable needs a human checkpoint.",
                    &["technical_responsibility", "ai_autonomy"],
                    "positive",
                ),
            ],
        },
        FileJurorConfig {
            id: "okafor".to_string(),
            name: "Daniel Okafor".to_string(),
            initial_stance: 70,
            speaker_power: 0.8,
            topic_weights: weights(&[
                ("victim_position", 9),
                ("corporate_responsibility", 7),
                ("social_impact", 5),
                ("external_attack", -4),
            ]),
            lines: vec![
                line(
                    "Somebody lost their savings because this system acted on its own. Start there.",
                    &["victim_position", "ai_autonomy"],
                    "positive",
                ),
                line(
                    "If we let this go, every company learns that negligence is cheaper than care.",
                    &["social_impact", "corporate_responsibility"],
                    "positive",
                ),
                line(
                    "I hear the attack argument, but locks exist because burglars do.",
                    &["external_attack", "safety_measures"],
                    "positive",
                ),
            ],
        },
        FileJurorConfig {
            id: "martin".to_string(),
            name: "Lucie Martin".to_string(),
            initial_stance: 50,
            speaker_power: 0.5,
            topic_weights: weights(&[
                ("legal_precedent", 8),
                ("ai_autonomy", 6),
                ("emotional_appeal", 2),
            ]),
            lines: vec![
                line(
                    "There is no precedent for holding software to intent. We should be careful what we invent.",
                    &["legal_precedent", "ai_autonomy"],
                    "negative",
                ),
                line(
                    "The law asks whether harm was foreseeable. The warnings were in writing.",
                    &["legal_precedent", "safety_measures"],
                    "positive",
                ),
                line(
                    "I am not sure yet. Both readings of the evidence hold together.",
                    &["technical_details"],
                    "neutral",
                ),
            ],
        },
        FileJurorConfig {
            id: "silva".to_string(),
            name: "Rafael Silva".to_string(),
            initial_stance: 20,
            speaker_power: 0.6,
            topic_weights: weights(&[
                ("external_attack", 9),
                ("technical_details", 5),
                ("victim_position", 3),
                ("corporate_responsibility", -2),
            ]),
            lines: vec![
                line(
                    "The intrusion came from a stolen key. Blame the thief, not the lock.",
                    &["external_attack"],
                    "negative",
                ),
                line(
                    "Convicting here means every tool maker is liable for every misuse.",
                    &["legal_precedent", "social_impact"],
                    "negative",
                ),
                line(
                    "I admit the patch was late. Late is not the same as reckless.",
                    &["safety_measures", "technical_details"],
                    "neutral",
                ),
            ],
        },
        FileJurorConfig {
            id: "novak".to_string(),
            name: "Ivana Novak".to_string(),
            initial_stance: 85,
            speaker_power: 0.4,
            topic_weights: weights(&[
                ("emotional_appeal", 7),
                ("victim_position", 6),
                ("ai_autonomy", 4),
                ("legal_precedent", -3),
            ]),
            lines: vec![
                line(
                    "Imagine it was your mother on the other end of that transfer.",
                    &["emotional_appeal", "victim_position"],
                    "positive",
                ),
                line(
                    "It decided by itself. Nobody was watching. That is the whole case for me.",
                    &["ai_autonomy"],
                    "positive",
                ),
                line(
                    "Fine, the attacker matters too. It does not erase what the system did.",
                    &["external_attack", "ai_autonomy"],
                    "neutral",
                ),
            ],
        },
    ]
}
