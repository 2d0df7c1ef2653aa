//! Round scheduling
//!
//! Chooses who leads and who responds in each round. Selection is
//! deterministic for a given roster, stance map and history:
//!
//! - **Leader**: jurors that have not led yet are preferred; among them the
//!   most polarized (furthest from 50) wins, then the one who led least,
//!   then the lowest id. The previous leader never leads twice in a row
//!   while someone else is available.
//! - **Responders**: jurors not yet heard in this debate come first, then the
//!   ones whose stance is furthest from the leader's, then those who have
//!   responded least, then the lowest id.
//!
//! Because every round's leader is drawn from the not-yet-led pool until it
//! is exhausted, a debate with at least as many rounds as jurors gives every
//! juror the floor at least once.

use super::round::Round;
use crate::core::error::DeliberationError;
use crate::core::ids::JurorId;
use crate::juror::{Juror, Roster};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Who has spoken so far in a debate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingHistory {
    leaders: Vec<JurorId>,
    responders: Vec<Vec<JurorId>>,
}

impl SchedulingHistory {
    pub fn record(&mut self, round: &Round) {
        self.leaders.push(round.leader().clone());
        self.responders.push(round.responders().to_vec());
    }

    pub fn last_leader(&self) -> Option<&JurorId> {
        self.leaders.last()
    }

    pub fn lead_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for id in &self.leaders {
            *counts.entry(id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn response_counts(&self) -> HashMap<&str, usize> {
        let mut counts = HashMap::new();
        for id in self.responders.iter().flatten() {
            *counts.entry(id.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Whether the juror has led or responded in any recorded round
    pub fn has_spoken(&self, id: &str) -> bool {
        self.leaders.iter().any(|l| l.as_str() == id)
            || self.responders.iter().flatten().any(|r| r.as_str() == id)
    }
}

/// Stance-weighted, fairness-preserving speaker selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundScheduler {
    responders_per_round: usize,
}

impl Default for RoundScheduler {
    fn default() -> Self {
        Self {
            responders_per_round: 2,
        }
    }
}

impl RoundScheduler {
    /// `responders_per_round` is raised to 1 if given as 0.
    pub fn new(responders_per_round: usize) -> Self {
        Self {
            responders_per_round: responders_per_round.max(1),
        }
    }

    pub fn responders_per_round(&self) -> usize {
        self.responders_per_round
    }

    pub fn select_leader(
        &self,
        roster: &Roster,
        history: &SchedulingHistory,
    ) -> Result<JurorId, DeliberationError> {
        if roster.is_empty() {
            return Err(DeliberationError::EmptyRoster);
        }

        let lead_counts = history.lead_counts();
        let led = |j: &Juror| lead_counts.get(j.id.as_str()).copied().unwrap_or(0);

        let never_led: Vec<&Juror> = roster.iter().filter(|j| led(j) == 0).collect();
        let mut pool = if never_led.is_empty() {
            roster.iter().collect::<Vec<_>>()
        } else {
            never_led
        };

        if pool.len() > 1
            && let Some(last) = history.last_leader()
        {
            pool.retain(|j| &j.id != last);
        }

        pool.into_iter()
            .min_by_key(|j| (Reverse(j.stance.extremity()), led(j), j.id.clone()))
            .map(|j| j.id.clone())
            .ok_or(DeliberationError::EmptyRoster)
    }

    pub fn select_responders(
        &self,
        leader: &JurorId,
        roster: &Roster,
        history: &SchedulingHistory,
    ) -> Vec<JurorId> {
        let mut candidates: Vec<&Juror> = roster.iter().filter(|j| &j.id != leader).collect();
        if candidates.len() <= self.responders_per_round {
            return candidates.into_iter().map(|j| j.id.clone()).collect();
        }

        let leader_stance = roster.stance_of(leader.as_str()).unwrap_or_default();
        let response_counts = history.response_counts();

        candidates.sort_by_key(|j| {
            (
                history.has_spoken(j.id.as_str()),
                Reverse(j.stance.distance(leader_stance)),
                response_counts.get(j.id.as_str()).copied().unwrap_or(0),
                j.id.clone(),
            )
        });
        candidates
            .into_iter()
            .take(self.responders_per_round)
            .map(|j| j.id.clone())
            .collect()
    }

    /// Produce the round numbered `number`.
    ///
    /// Fails for rosters with fewer than two jurors: a round needs a leader
    /// and at least one responder.
    pub fn schedule(
        &self,
        number: u32,
        roster: &Roster,
        history: &SchedulingHistory,
    ) -> Result<Round, DeliberationError> {
        if roster.len() < 2 {
            return Err(if roster.is_empty() {
                DeliberationError::EmptyRoster
            } else {
                DeliberationError::RosterTooSmall(roster.len())
            });
        }
        let leader = self.select_leader(roster, history)?;
        let responders = self.select_responders(&leader, roster, history);
        Ok(Round::new(number, leader, responders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::juror::Stance;
    use std::collections::HashSet;

    fn roster(entries: &[(&str, i32)]) -> Roster {
        Roster::new(
            entries
                .iter()
                .enumerate()
                .map(|(seat, (id, stance))| {
                    Juror::new(*id, id.to_uppercase(), Stance::new(*stance)).with_seat(seat)
                })
                .collect(),
        )
    }

    #[test]
    fn test_most_polarized_juror_leads_first() {
        let roster = roster(&[("a", 10), ("b", 50), ("c", 60)]);
        let leader = RoundScheduler::default()
            .select_leader(&roster, &SchedulingHistory::default())
            .unwrap();
        assert_eq!(leader.as_str(), "a");
    }

    #[test]
    fn test_jurors_who_led_yield_to_those_who_have_not() {
        let roster = roster(&[("a", 10), ("b", 90)]);
        let mut history = SchedulingHistory::default();
        history.record(&Round::new(1, "a".into(), vec!["b".into()]));
        let leader = RoundScheduler::default().select_leader(&roster, &history).unwrap();
        assert_eq!(leader.as_str(), "b");
    }

    #[test]
    fn test_no_leader_repeats_back_to_back() {
        let roster = roster(&[("a", 0), ("b", 50)]);
        let scheduler = RoundScheduler::default();
        let mut history = SchedulingHistory::default();
        let mut previous: Option<JurorId> = None;
        for number in 1..=6 {
            let round = scheduler.schedule(number, &roster, &history).unwrap();
            assert_ne!(Some(round.leader()), previous.as_ref());
            previous = Some(round.leader().clone());
            history.record(&round);
        }
    }

    #[test]
    fn test_responders_maximize_conflict_with_leader() {
        let roster = roster(&[("leader", 50), ("a", 10), ("b", 90), ("c", 60)]);
        let responders = RoundScheduler::default().select_responders(
            &"leader".into(),
            &roster,
            &SchedulingHistory::default(),
        );
        let set: HashSet<_> = responders.iter().map(|r| r.as_str()).collect();
        assert_eq!(set, HashSet::from(["a", "b"]));
    }

    #[test]
    fn test_unheard_jurors_respond_before_heard_ones() {
        let roster = roster(&[("l", 50), ("a", 0), ("b", 100), ("c", 55)]);
        let mut history = SchedulingHistory::default();
        history.record(&Round::new(1, "x".into(), vec!["a".into(), "b".into()]));
        let responders =
            RoundScheduler::default().select_responders(&"l".into(), &roster, &history);
        assert_eq!(responders[0].as_str(), "c");
    }

    #[test]
    fn test_small_roster_takes_everyone_else() {
        let roster = roster(&[("a", 10), ("b", 60)]);
        let round = RoundScheduler::default()
            .schedule(1, &roster, &SchedulingHistory::default())
            .unwrap();
        assert_eq!(round.leader().as_str(), "a");
        assert_eq!(round.responders().len(), 1);
    }

    #[test]
    fn test_rejects_degenerate_rosters() {
        let scheduler = RoundScheduler::default();
        let history = SchedulingHistory::default();
        assert_eq!(
            scheduler.schedule(1, &Roster::default(), &history),
            Err(DeliberationError::EmptyRoster)
        );
        assert_eq!(
            scheduler.schedule(1, &roster(&[("solo", 50)]), &history),
            Err(DeliberationError::RosterTooSmall(1))
        );
    }

    #[test]
    fn test_every_juror_heard_when_rounds_cover_roster() {
        let cases: &[&[(&str, i32)]] = &[
            &[("a", 50), ("b", 50), ("c", 50), ("d", 50), ("e", 50)],
            &[("a", 0), ("b", 1), ("c", 2), ("d", 3), ("e", 100), ("f", 99)],
            &[("a", 0), ("b", 100), ("c", 50), ("d", 51), ("e", 49), ("f", 0), ("g", 100)],
        ];
        for &entries in cases {
            for per_round in 1..=3 {
                let roster = roster(entries);
                let scheduler = RoundScheduler::new(per_round);
                let mut history = SchedulingHistory::default();
                for number in 1..=roster.len() as u32 {
                    let round = scheduler.schedule(number, &roster, &history).unwrap();
                    assert!(!round.responders().is_empty());
                    assert!(!round.responders().contains(round.leader()));
                    history.record(&round);
                }
                for juror in roster.iter() {
                    assert!(
                        history.has_spoken(juror.id.as_str()),
                        "{} never spoke (per_round={per_round})",
                        juror.id
                    );
                }
            }
        }
    }
}
