//! Round and speaker role value objects

use crate::core::ids::JurorId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Part a juror plays in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// Opens the round
    Leader,
    /// Reacts to the leader
    Responder,
}

impl SpeakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Leader => "leader",
            SpeakerRole::Responder => "responder",
        }
    }
}

impl fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled exchange (Value Object)
///
/// Immutable once produced by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    number: u32,
    leader: JurorId,
    responders: Vec<JurorId>,
}

impl Round {
    pub fn new(number: u32, leader: JurorId, responders: Vec<JurorId>) -> Self {
        Self {
            number,
            leader,
            responders,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn leader(&self) -> &JurorId {
        &self.leader
    }

    pub fn responders(&self) -> &[JurorId] {
        &self.responders
    }

    /// Speaking order: the leader, then each responder
    pub fn speakers(&self) -> impl Iterator<Item = (&JurorId, SpeakerRole)> {
        std::iter::once((&self.leader, SpeakerRole::Leader))
            .chain(self.responders.iter().map(|id| (id, SpeakerRole::Responder)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speakers_order() {
        let round = Round::new(1, "a".into(), vec!["b".into(), "c".into()]);
        let order: Vec<_> = round
            .speakers()
            .map(|(id, role)| format!("{id}:{role}"))
            .collect();
        assert_eq!(order, vec!["a:leader", "b:responder", "c:responder"]);
    }
}
