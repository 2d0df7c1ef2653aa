//! Scripted generator pacing from TOML (`[generator]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ```toml
/// [generator]
/// chunk_chars = 12
/// chunk_delay_ms = 40
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGeneratorConfig {
    /// Characters per streamed chunk
    pub chunk_chars: usize,
    /// Pause between chunks
    pub chunk_delay_ms: u64,
}

impl Default for FileGeneratorConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 12,
            chunk_delay_ms: 40,
        }
    }
}

impl FileGeneratorConfig {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}
