//! Juror entity and the roster-level stance model

use super::stance::{Stance, StanceDeltas};
use crate::core::ids::JurorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A simulated juror (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Juror {
    pub id: JurorId,
    /// Display name
    pub name: String,
    /// Current stance (0 = acquit, 100 = convict)
    pub stance: Stance,
    /// Seat order on the bench, starting at 0
    pub seat: usize,
}

impl Juror {
    pub fn new(id: impl Into<JurorId>, name: impl Into<String>, stance: Stance) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stance,
            seat: 0,
        }
    }

    pub fn with_seat(mut self, seat: usize) -> Self {
        self.seat = seat;
        self
    }
}

/// The jurors taking part in one deliberation, in seat order.
///
/// This is the stance model: the only place juror stances change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    jurors: Vec<Juror>,
}

impl Roster {
    /// Build a roster, ordering jurors by seat and re-numbering seats densely.
    pub fn new(mut jurors: Vec<Juror>) -> Self {
        jurors.sort_by_key(|j| j.seat);
        for (seat, juror) in jurors.iter_mut().enumerate() {
            juror.seat = seat;
        }
        Self { jurors }
    }

    pub fn len(&self) -> usize {
        self.jurors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jurors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Juror> {
        self.jurors.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Juror> {
        self.jurors.iter().find(|j| j.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &JurorId> {
        self.jurors.iter().map(|j| &j.id)
    }

    pub fn stance_of(&self, id: &str) -> Option<Stance> {
        self.get(id).map(|j| j.stance)
    }

    /// Current stances keyed by juror id
    pub fn stances(&self) -> BTreeMap<JurorId, Stance> {
        self.jurors.iter().map(|j| (j.id.clone(), j.stance)).collect()
    }

    /// Apply deltas with `new = clamp(old + delta, 0, 100)`.
    ///
    /// Ids not on the roster are ignored. Returns the effective change per
    /// juror after clamping, omitting jurors whose stance did not move.
    pub fn apply_deltas(&mut self, deltas: &StanceDeltas) -> StanceDeltas {
        let mut applied = StanceDeltas::new();
        for juror in &mut self.jurors {
            let Some(&delta) = deltas.get(&juror.id) else {
                continue;
            };
            let before = juror.stance;
            juror.stance = before.apply(delta);
            let moved = i32::from(juror.stance.value()) - i32::from(before.value());
            if moved != 0 {
                applied.insert(juror.id.clone(), moved);
            }
        }
        applied
    }

    /// Mean stance across the roster, 0.0 when empty
    pub fn average_stance(&self) -> f64 {
        if self.jurors.is_empty() {
            return 0.0;
        }
        let total: u32 = self.jurors.iter().map(|j| u32::from(j.stance.value())).sum();
        f64::from(total) / self.jurors.len() as f64
    }
}

impl FromIterator<Juror> for Roster {
    fn from_iter<T: IntoIterator<Item = Juror>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new(vec![
            Juror::new("a", "Ada", Stance::new(10)).with_seat(2),
            Juror::new("b", "Bo", Stance::new(50)).with_seat(0),
            Juror::new("c", "Cy", Stance::new(95)).with_seat(1),
        ])
    }

    #[test]
    fn test_roster_orders_by_seat() {
        let ids: Vec<_> = roster().ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_apply_deltas_clamps_and_reports_effective_change() {
        let mut roster = roster();
        let deltas = StanceDeltas::from([
            (JurorId::from("a"), -40),
            (JurorId::from("b"), 7),
            (JurorId::from("c"), 20),
            (JurorId::from("ghost"), 5),
        ]);
        let applied = roster.apply_deltas(&deltas);

        assert_eq!(roster.stance_of("a"), Some(Stance::new(0)));
        assert_eq!(roster.stance_of("b"), Some(Stance::new(57)));
        assert_eq!(roster.stance_of("c"), Some(Stance::new(100)));
        assert_eq!(applied.get("a"), Some(&-10));
        assert_eq!(applied.get("b"), Some(&7));
        assert_eq!(applied.get("c"), Some(&5));
        assert!(!applied.contains_key("ghost"));
    }

    #[test]
    fn test_zero_movement_is_omitted() {
        let mut roster = roster();
        roster.apply_deltas(&StanceDeltas::from([(JurorId::from("c"), 50)]));
        let applied = roster.apply_deltas(&StanceDeltas::from([(JurorId::from("c"), 10)]));
        assert!(applied.is_empty());
    }

    #[test]
    fn test_average_stance() {
        let roster = roster();
        assert!((roster.average_stance() - 155.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(Roster::default().average_stance(), 0.0);
    }

    #[test]
    fn test_stances_stay_bounded_under_repeated_extreme_deltas() {
        let mut roster = roster();
        for delta in [100, 100, -100, -100, -100, 100, i32::MAX, i32::MIN] {
            let deltas: StanceDeltas = roster.ids().map(|id| (id.clone(), delta)).collect();
            roster.apply_deltas(&deltas);
            assert!(roster.iter().all(|j| j.stance.value() <= 100));
        }
    }
}
