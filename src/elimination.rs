//! Battle royale elimination rounds
//!
//! Consumes the session's standings and removes the worst-performing
//! slice of active participants. Victim order reverses the leaderboard's
//! tie-break direction: the lowest score goes first, and among equal
//! scores the later joiner loses first, so "worse" resolves
//! deterministically downward. Repeated triggers after the session has
//! ended are no-ops, keeping timer retries safe.

use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use crate::{
    error::Error,
    events::EventSink,
    participant::ParticipantId,
    session::{Mode, Session, Status},
};

/// The outcome of one elimination trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EliminationReport {
    /// The elimination round this trigger applied (unchanged on no-ops)
    pub round: u32,
    /// Participants removed by this trigger, worst first
    pub eliminated: Vec<ParticipantId>,
    /// Active participants left after the trigger
    pub remaining: usize,
    /// Whether this trigger completed the session
    pub session_ended: bool,
}

impl Session {
    /// Applies one battle royale elimination round
    ///
    /// Removes `max(1, floor(active × fraction))` of the active
    /// participants, capped at `active − 1` so a winner always remains.
    /// Each victim's elimination round and final placement are recorded
    /// and a `ParticipantEliminated` event is emitted per victim. When
    /// exactly one active participant remains afterwards, the session
    /// completes immediately with that participant as the winner.
    ///
    /// Triggering on a completed session is a no-op, not an error, so
    /// the operation is safe to retry blindly from timers.
    ///
    /// # Errors
    ///
    /// * [`Error::WrongMode`] - the session is not battle royale
    /// * [`Error::SessionNotActive`] - the session has not started
    pub fn trigger_elimination(
        &mut self,
        sink: &mut impl EventSink,
    ) -> Result<EliminationReport, Error> {
        if !matches!(self.mode, Mode::BattleRoyale) {
            return Err(Error::WrongMode);
        }
        match self.status {
            Status::Waiting => return Err(Error::SessionNotActive),
            Status::Completed => {
                return Ok(EliminationReport {
                    round: self.elimination_round,
                    eliminated: Vec::new(),
                    remaining: self.roster.active_count(),
                    session_ended: true,
                });
            }
            Status::Active => {}
        }

        let active_count = self.roster.active_count();
        let count = ((active_count as f64 * self.scoring.elimination_fraction).floor() as usize)
            .max(1)
            .min(active_count.saturating_sub(1));

        // standings run best to worst; reversing them yields lowest score
        // first with the later joiner ahead on equal scores
        let victims = self
            .leaderboard
            .standings()
            .iter()
            .filter(|entry| {
                self.roster
                    .get(entry.participant)
                    .is_some_and(|p| p.is_active())
            })
            .rev()
            .take(count)
            .map(|entry| entry.participant)
            .collect_vec();

        let round = if victims.is_empty() {
            self.elimination_round
        } else {
            self.elimination_round += 1;
            self.elimination_round
        };

        let mut remaining = active_count;
        for victim in &victims {
            remaining -= 1;
            let final_position = remaining + 1;
            self.roster.eliminate(*victim, round, final_position);
            self.emit_eliminated(sink, *victim, round, final_position);
        }

        if !victims.is_empty() {
            info!(
                session = %self.id,
                round,
                eliminated = victims.len(),
                remaining,
                "elimination round applied"
            );
        }

        let session_ended = if remaining == 1 {
            self.complete(sink)?;
            true
        } else {
            false
        };

        Ok(EliminationReport {
            round,
            eliminated: victims,
            remaining,
            session_ended,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{collections::BTreeSet, time::Duration};

    use super::*;
    use crate::{
        events::Event,
        question::{Quiz, QuestionConfig},
        scoring::ScoringConfig,
        session::Options,
        session_id::SessionId,
    };

    fn battle_royale(players: usize) -> (Session, Vec<ParticipantId>) {
        let quiz = Quiz::new(
            "Royale",
            vec![QuestionConfig::new(
                "Only question",
                vec!["A".to_owned(), "B".to_owned()],
                BTreeSet::from([0]),
                Duration::from_secs(30),
            )],
        );
        let mut session = Session::create(
            SessionId::new(),
            quiz,
            Mode::BattleRoyale,
            ScoringConfig::default(),
            Options::default(),
        )
        .unwrap();
        let ids = (0..players)
            .map(|i| session.join(Some(&format!("Player {i}")), None).unwrap())
            .collect();
        session.start(&mut Vec::<Event>::new()).unwrap();
        (session, ids)
    }

    /// Gives each participant a distinct score: later ids answer slower
    fn spread_scores(session: &mut Session, ids: &[ParticipantId]) {
        for (i, id) in ids.iter().enumerate() {
            session
                .submit_answer(
                    &mut Vec::<Event>::new(),
                    *id,
                    0,
                    BTreeSet::from([0]),
                    Duration::from_secs(i as u64 * 2),
                )
                .unwrap();
        }
    }

    #[test]
    fn test_four_players_default_fraction_removes_exactly_one() {
        let (mut session, ids) = battle_royale(4);
        spread_scores(&mut session, &ids);

        let mut events: Vec<Event> = Vec::new();
        let report = session.trigger_elimination(&mut events).unwrap();

        assert_eq!(report.round, 1);
        assert_eq!(report.remaining, 3);
        assert!(!report.session_ended);
        // the slowest answer scored lowest
        assert_eq!(report.eliminated, vec![ids[3]]);
        assert_eq!(
            session.roster().get(ids[3]).unwrap().status(),
            crate::participant::Status::Eliminated {
                round: 1,
                final_position: 4
            }
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::ParticipantEliminated(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_elimination_never_removes_the_last_participant() {
        let (mut session, ids) = battle_royale(4);
        spread_scores(&mut session, &ids);

        let mut events: Vec<Event> = Vec::new();
        session.trigger_elimination(&mut events).unwrap(); // 4 -> 3
        session.trigger_elimination(&mut events).unwrap(); // 3 -> 2
        let report = session.trigger_elimination(&mut events).unwrap(); // 2 -> 1

        assert_eq!(report.remaining, 1);
        assert!(report.session_ended);
        assert_eq!(session.status(), Status::Completed);
        assert_eq!(session.winner(), Some(ids[0]));
    }

    #[test]
    fn test_trigger_after_completion_is_a_noop() {
        let (mut session, _) = battle_royale(4);
        let mut events: Vec<Event> = Vec::new();
        while !session.trigger_elimination(&mut events).unwrap().session_ended {}

        let events_before = events.len();
        let report = session.trigger_elimination(&mut events).unwrap();

        assert!(report.eliminated.is_empty());
        assert!(report.session_ended);
        assert_eq!(report.remaining, 1);
        assert_eq!(events.len(), events_before);
    }

    #[test]
    fn test_large_fraction_is_capped_to_leave_a_winner() {
        let (mut session, _) = battle_royale(4);
        session.scoring.elimination_fraction = 0.9;

        let report = session
            .trigger_elimination(&mut Vec::<Event>::new())
            .unwrap();

        // floor(4 × 0.9) = 3 = active − 1: the cap leaves the winner
        assert_eq!(report.eliminated.len(), 3);
        assert_eq!(report.remaining, 1);
        assert!(report.session_ended);
    }

    #[test]
    fn test_tied_scores_eliminate_the_later_joiner_first() {
        let (mut session, ids) = battle_royale(4);
        // nobody answers: all scores are 0 and only join order differs

        let report = session
            .trigger_elimination(&mut Vec::<Event>::new())
            .unwrap();

        assert_eq!(report.eliminated, vec![ids[3]]);
    }

    #[test]
    fn test_eliminated_participant_cannot_submit() {
        let (mut session, ids) = battle_royale(4);
        let mut events: Vec<Event> = Vec::new();
        session.trigger_elimination(&mut events).unwrap();

        assert_eq!(
            session.submit_answer(
                &mut events,
                ids[3],
                0,
                BTreeSet::from([0]),
                Duration::ZERO
            ),
            Err(Error::ParticipantEliminated)
        );
    }

    #[test]
    fn test_final_positions_count_down_from_the_bottom() {
        let (mut session, ids) = battle_royale(8);
        spread_scores(&mut session, &ids);
        session.scoring.elimination_fraction = 0.25;

        let report = session
            .trigger_elimination(&mut Vec::<Event>::new())
            .unwrap();

        // floor(8 × 0.25) = 2 victims: worst placed 8th, next 7th
        assert_eq!(report.eliminated, vec![ids[7], ids[6]]);
        assert_eq!(
            session.roster().get(ids[7]).unwrap().status(),
            crate::participant::Status::Eliminated {
                round: 1,
                final_position: 8
            }
        );
        assert_eq!(
            session.roster().get(ids[6]).unwrap().status(),
            crate::participant::Status::Eliminated {
                round: 1,
                final_position: 7
            }
        );
    }

    #[test]
    fn test_wrong_mode_and_not_started_are_errors() {
        let quiz = Quiz::new(
            "Classic",
            vec![QuestionConfig::new(
                "Q",
                vec!["A".to_owned(), "B".to_owned()],
                BTreeSet::from([0]),
                Duration::from_secs(30),
            )],
        );
        let mut classic = Session::create(
            SessionId::new(),
            quiz.clone(),
            Mode::Classic,
            ScoringConfig::default(),
            Options::default(),
        )
        .unwrap();
        classic.join(Some("Alice"), None).unwrap();
        classic.start(&mut Vec::<Event>::new()).unwrap();
        assert_eq!(
            classic.trigger_elimination(&mut Vec::<Event>::new()),
            Err(Error::WrongMode)
        );

        let mut waiting = Session::create(
            SessionId::new(),
            quiz,
            Mode::BattleRoyale,
            ScoringConfig::default(),
            Options::default(),
        )
        .unwrap();
        assert_eq!(
            waiting.trigger_elimination(&mut Vec::<Event>::new()),
            Err(Error::SessionNotActive)
        );
    }
}
