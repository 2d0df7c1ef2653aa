//! Console output for deliberation events

use chrono::Local;
use colored::Colorize;
use jury_domain::{DeliberationEvent, SessionSnapshot, SpeakerRole, StanceDeltas};

/// Formats deliberation events for console display.
///
/// Chunks are printed inline without a newline so a speech reads as it
/// streams; `speech.end` closes the line and lists the stance changes.
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format one event; `None` for events with nothing to show
    pub fn format_event(event: &DeliberationEvent) -> Option<String> {
        let text = match event {
            DeliberationEvent::DebateStart { total_rounds } => format!(
                "{}\n{} {} rounds\n",
                Self::header("Jury Deliberation"),
                "Starting:".cyan().bold(),
                total_rounds
            ),
            DeliberationEvent::RoundStart {
                round,
                leader_id,
                responder_ids,
            } => format!(
                "{}{} {}  {} {}\n",
                Self::section_header(&format!("Round {round}")),
                "Leader:".yellow().bold(),
                leader_id,
                "Responders:".dimmed(),
                responder_ids
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            // Speaker labels are added by `TranscriptPrinter`
            DeliberationEvent::SpeechChunk { text, .. } => text.clone(),
            DeliberationEvent::SpeechEnd { stance_deltas, .. } => {
                format!("\n{}\n", Self::format_deltas(stance_deltas))
            }
            DeliberationEvent::NoteWindow {
                round,
                notes_remaining,
            } => format!(
                "{} after round {} ({} notes left)\n",
                "[note window]".magenta(),
                round,
                notes_remaining
            ),
            DeliberationEvent::NoteReceived {
                target_id,
                notes_remaining,
            } => format!(
                "{} passed to {} ({} left)\n",
                "[note]".magenta().bold(),
                target_id,
                notes_remaining
            ),
            DeliberationEvent::StateSync(snapshot) => Self::format_snapshot(snapshot),
            DeliberationEvent::DebateEnd {} => format!(
                "\n{} {}\n{}",
                "Deliberation closed at".green().bold(),
                Local::now().format("%H:%M:%S"),
                Self::footer()
            ),
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// Label printed before a speaker's first chunk
    pub fn speech_label(speaker: &str, role: SpeakerRole) -> String {
        let label = format!("{speaker} ({}): ", role.as_str());
        match role {
            SpeakerRole::Leader => label.yellow().bold().to_string(),
            SpeakerRole::Responder => label.blue().bold().to_string(),
        }
    }

    pub fn format_deltas(deltas: &StanceDeltas) -> String {
        let moved: Vec<String> = deltas
            .iter()
            .filter(|(_, d)| **d != 0)
            .map(|(id, d)| {
                let change = format!("{id} {d:+}");
                if *d > 0 {
                    change.red().to_string()
                } else {
                    change.green().to_string()
                }
            })
            .collect();
        if moved.is_empty() {
            "  (no one moved)".dimmed().to_string()
        } else {
            format!("  {} {}", "stance:".dimmed(), moved.join(", "))
        }
    }

    pub fn format_snapshot(snapshot: &SessionSnapshot) -> String {
        let mut output = format!(
            "{} {} round {}/{}  notes left {}  average {:.1}\n",
            "Session".cyan().bold(),
            snapshot.session_id,
            snapshot.round,
            snapshot.total_rounds,
            snapshot.notes_remaining,
            snapshot.average_stance
        );
        for (id, stance) in &snapshot.stances {
            output.push_str(&format!("  {:<12} {:>3}\n", id.as_str(), stance.value()));
        }
        output
    }

    /// Event as a single JSON line: `{"event": ..., "data": ...}`
    pub fn format_json(event: &DeliberationEvent) -> String {
        serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}

/// Tracks which speaker is mid-speech so labels print once per speech
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    speaking: Option<String>,
}

impl TranscriptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `event`, prefixing the speaker label at the start of each speech
    pub fn render(&mut self, event: &DeliberationEvent) -> Option<String> {
        let body = ConsoleFormatter::format_event(event)?;
        match event {
            DeliberationEvent::SpeechChunk {
                speaker_id, role, ..
            } if self.speaking.as_deref() != Some(speaker_id.as_str()) => {
                self.speaking = Some(speaker_id.to_string());
                Some(format!(
                    "{}{}",
                    ConsoleFormatter::speech_label(speaker_id.as_str(), *role),
                    body
                ))
            }
            DeliberationEvent::SpeechEnd {
                speaker_id, role, ..
            } => {
                // A speech that streamed nothing still gets its label
                let label = if self.speaking.as_deref() == Some(speaker_id.as_str()) {
                    String::new()
                } else {
                    ConsoleFormatter::speech_label(speaker_id.as_str(), *role)
                };
                self.speaking = None;
                Some(format!("{label}{body}"))
            }
            _ => Some(body),
        }
    }
}
