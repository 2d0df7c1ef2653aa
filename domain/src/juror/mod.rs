//! Juror subdomain
//!
//! A juror is a simulated participant with a scalar stance between
//! 0 (acquit) and 100 (convict). The stance only changes when the
//! controller applies the deltas carried by a finalized speech.
//!
//! - [`stance::Stance`]: clamped opinion value
//! - [`entities::Roster`]: the jurors of one deliberation, with the stance model
//! - [`impact::StanceImpact`]: topic-weighted persuasion policy used by speech generators

pub mod entities;
pub mod impact;
pub mod stance;

pub use entities::{Juror, Roster};
pub use impact::{Impact, SpeakerProfile, StanceImpact};
pub use stance::{Stance, StanceDeltas, MAX_DELTA};
