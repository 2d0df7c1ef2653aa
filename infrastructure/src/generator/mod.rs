//! Speech Generator adapters

mod scripted;

pub use scripted::{JurorScript, ScriptLine, ScriptedSpeechGenerator};
