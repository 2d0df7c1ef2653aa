//! Application layer for the jury deliberation engine
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::DeliberationConfig;
pub use ports::{
    session_store::{SessionStore, StoreError},
    speech_generator::{
        GeneratorError, SpeechCompletion, SpeechEvent, SpeechGenerator, SpeechRequest,
        SpeechStream,
    },
};
pub use use_cases::deliberation_controller::{ControllerCommand, ControllerHandle, EventReceiver};
pub use use_cases::deliberation_service::DeliberationService;
pub use use_cases::speech_streamer::SpeechStreamer;
