//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Enum-like fields stay strings here and are parsed with fallbacks, so a
//! typo produces a [`ConfigIssue`] instead of a load failure.

mod deliberation;
mod generator;
mod jurors;
mod server;

pub use deliberation::FileDeliberationConfig;
pub use generator::FileGeneratorConfig;
pub use jurors::{FileJurorConfig, FileSpeechLine, default_jurors};
pub use server::{DEFAULT_BIND, FileServerConfig};

use jury_domain::{ConfigIssue, ConfigIssueCode, Juror};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Round count, note budget and window timing
    pub deliberation: FileDeliberationConfig,
    /// HTTP listener
    pub server: FileServerConfig,
    /// Scripted generator pacing
    pub generator: FileGeneratorConfig,
    /// Juror cast; empty means the built-in cast
    pub jurors: Vec<FileJurorConfig>,
}

impl FileConfig {
    /// Configured jurors, or the built-in cast when none are set
    pub fn effective_jurors(&self) -> Vec<FileJurorConfig> {
        if self.jurors.is_empty() {
            default_jurors()
        } else {
            self.jurors.clone()
        }
    }

    /// Jurors in seat order, ready to seed a session
    pub fn roster(&self) -> Vec<Juror> {
        self.effective_jurors()
            .iter()
            .enumerate()
            .map(|(seat, juror)| juror.to_juror(seat))
            .collect()
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Errors (duplicate juror ids, a cast smaller than two) make the cast
    /// unusable; everything else falls back to a safe value.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        issues.extend(self.deliberation.to_deliberation_config().1);
        issues.extend(self.server.parse_bind().1);

        let jurors = self.effective_jurors();
        let mut seen = HashSet::new();
        for juror in &jurors {
            if !seen.insert(juror.id.as_str()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateJuror {
                        id: juror.id.clone(),
                    },
                    format!("jurors: id '{}' is used more than once", juror.id),
                ));
            }
            issues.extend(juror.validate());
        }

        if jurors.len() < 2 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::RosterTooSmall {
                    count: jurors.len(),
                },
                format!("jurors: a debate needs at least 2 jurors, found {}", jurors.len()),
            ));
        } else if (self.deliberation.total_rounds as usize) < jurors.len() {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::RoundsBelowRoster {
                    rounds: self.deliberation.total_rounds,
                    jurors: jurors.len(),
                },
                format!(
                    "deliberation.total_rounds: {} rounds for {} jurors; not every juror is guaranteed to lead",
                    self.deliberation.total_rounds,
                    jurors.len()
                ),
            ));
        }

        issues
    }
}
