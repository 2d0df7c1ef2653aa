//! Stance value object and delta bounds

use crate::core::ids::JurorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest magnitude a single stance delta may carry.
pub const MAX_DELTA: i32 = 100;

/// Map of juror id to signed stance change.
///
/// Ordered so that serialized payloads are stable.
pub type StanceDeltas = BTreeMap<JurorId, i32>;

/// A juror's lean toward conviction, always within `[0, 100]`.
///
/// ```
/// use jury_domain::Stance;
///
/// assert_eq!(Stance::new(140).value(), 100);
/// assert_eq!(Stance::new(60).apply(-75).value(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "u8")]
pub struct Stance(u8);

impl Stance {
    pub const MIN: Stance = Stance(0);
    pub const MAX: Stance = Stance(100);
    pub const NEUTRAL: Stance = Stance(50);

    /// Create a stance, clamping out-of-range input
    pub fn new(value: i32) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Apply a signed delta, clamping the result to `[0, 100]`
    pub fn apply(self, delta: i32) -> Self {
        Self::new(i32::from(self.0).saturating_add(delta))
    }

    /// Distance from the neutral midpoint (0..=50)
    pub fn extremity(self) -> u8 {
        self.0.abs_diff(50)
    }

    /// Absolute distance to another stance (0..=100)
    pub fn distance(self, other: Stance) -> u8 {
        self.0.abs_diff(other.0)
    }
}

impl Default for Stance {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl From<i32> for Stance {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<Stance> for u8 {
    fn from(stance: Stance) -> Self {
        stance.0
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
