//! Tournament bracket management
//!
//! Generates head-to-head pairings from a session's participant set and
//! advances winners across rounds. The initial ordering is a single
//! shuffle with a recorded seed, so a bracket is fully reproducible from
//! its inputs and tests can assert exact pairings. Two formats are
//! supported: single elimination (rounds until one winner remains) and
//! round robin (every pair plays once, ranked by wins).

use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::SystemTime;

use crate::{error::Error, participant::ParticipantId};

/// A unique identifier for a match within one tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(u32);

impl MatchId {
    /// Reconstructs a match identifier from its raw numeric form
    ///
    /// Identifiers are issued by the bracket; this exists for callers
    /// that persisted one outside the engine.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The pairing structure of a tournament
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketFormat {
    /// Losers are out; rounds continue until a single winner remains
    #[default]
    SingleElimination,
    /// Every pair plays once; ranking is by win count
    RoundRobin,
}

/// One head-to-head match
///
/// Created when its round is generated and mutated exactly once, by
/// result recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier unique within the tournament
    id: MatchId,
    /// The round this match belongs to (1-indexed)
    round: u32,
    /// The two contestants
    slots: [ParticipantId; 2],
    /// The recorded winner, if the match has been decided
    winner: Option<ParticipantId>,
    /// Final scores aligned with `slots`, recorded with the result
    scores: Option<[u64; 2]>,
    /// When the result was recorded
    decided_at: Option<SystemTime>,
}

impl Match {
    /// Returns the match identifier
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Returns the round this match belongs to (1-indexed)
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Returns the two contestants
    pub fn slots(&self) -> [ParticipantId; 2] {
        self.slots
    }

    /// Returns the recorded winner, if any
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    /// Returns the recorded scores aligned with the slots, if any
    pub fn scores(&self) -> Option<[u64; 2]> {
        self.scores
    }
}

/// One row of the round robin ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// The ranked participant
    pub participant: ParticipantId,
    /// Matches won
    pub wins: usize,
    /// Matches lost
    pub losses: usize,
    /// Total match points across all decided matches
    pub points: u64,
}

/// The bracket state of one tournament
///
/// Owns every match across all rounds plus the seeded participant order
/// everything else is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bracket {
    /// The pairing format
    format: BracketFormat,
    /// The seed the initial shuffle was drawn from
    seed: u64,
    /// Participants in their shuffled bracket order
    order: Vec<ParticipantId>,
    /// Every match created so far, in creation order
    matches: Vec<Match>,
    /// The round currently being played (1-indexed)
    current_round: u32,
    /// Participants advancing out of the current round, in match order
    advancers: Vec<ParticipantId>,
    /// The sole winner, once decided (single elimination only)
    champion: Option<ParticipantId>,
    /// Whether no further rounds will be generated
    complete: bool,
    /// Next match identifier to issue
    next_match_id: u32,
}

impl Bracket {
    /// Generates a bracket from the registered participants
    ///
    /// The participant list is shuffled exactly once using the given
    /// seed and then paired sequentially (1v2, 3v4, ...). An odd
    /// participant out receives a bye: they advance without a match
    /// record. The seed is retained so the bracket can be replayed.
    pub fn generate(participants: &[ParticipantId], seed: u64, format: BracketFormat) -> Self {
        let mut order = participants.to_vec();
        let mut rng = fastrand::Rng::with_seed(seed);
        rng.shuffle(&mut order);

        let mut bracket = Self {
            format,
            seed,
            order,
            matches: Vec::new(),
            current_round: 0,
            advancers: Vec::new(),
            champion: None,
            complete: false,
            next_match_id: 0,
        };
        match format {
            BracketFormat::SingleElimination => {
                let contenders = bracket.order.clone();
                bracket.open_elimination_round(&contenders);
            }
            BracketFormat::RoundRobin => bracket.open_round_robin_round(),
        }
        bracket
    }

    /// Returns the seed the bracket order was drawn from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the participants in their shuffled bracket order
    pub fn order(&self) -> &[ParticipantId] {
        &self.order
    }

    /// Returns every match created so far
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Returns the matches of one round, in match order
    pub fn round_matches(&self, round: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.round == round).collect_vec()
    }

    /// Returns the round currently being played (1-indexed)
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Returns whether all rounds have been played
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the sole winner, if the bracket has produced one
    ///
    /// Single elimination yields its last surviving participant; a
    /// completed round robin yields the top of [`Bracket::standings`].
    pub fn champion(&self) -> Option<ParticipantId> {
        match self.format {
            BracketFormat::SingleElimination => self.champion,
            BracketFormat::RoundRobin => {
                if self.complete {
                    self.standings().first().map(|s| s.participant)
                } else {
                    None
                }
            }
        }
    }

    /// Records the result of a match
    ///
    /// A round is complete only when every one of its matches has a
    /// recorded winner; completing a round generates the next one (or
    /// finishes the bracket).
    ///
    /// # Errors
    ///
    /// * [`Error::MatchNotFound`] - no such match exists
    /// * [`Error::MatchAlreadyDecided`] - the match already has a winner
    /// * [`Error::InvalidWinner`] - the winner is not one of the match's
    ///   two contestants
    pub fn record_result(
        &mut self,
        match_id: MatchId,
        winner: ParticipantId,
        scores: [u64; 2],
    ) -> Result<&Match, Error> {
        let index = self
            .matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or(Error::MatchNotFound)?;

        {
            let m = &mut self.matches[index];
            if m.winner.is_some() {
                return Err(Error::MatchAlreadyDecided);
            }
            if !m.slots.contains(&winner) {
                return Err(Error::InvalidWinner);
            }
            m.winner = Some(winner);
            m.scores = Some(scores);
            m.decided_at = Some(SystemTime::now());
        }

        if self.round_complete() {
            self.advance_round();
        }

        Ok(&self.matches[index])
    }

    /// Returns the round robin ranking
    ///
    /// Ordered by wins descending, then losses ascending, then total
    /// match points descending, with the seeded bracket order as the
    /// deterministic last resort.
    pub fn standings(&self) -> Vec<Standing> {
        let mut rows = self
            .order
            .iter()
            .map(|&participant| Standing {
                participant,
                wins: 0,
                losses: 0,
                points: 0,
            })
            .collect_vec();

        for m in &self.matches {
            let Some(winner) = m.winner else { continue };
            let scores = m.scores.unwrap_or_default();
            for (slot, &contestant) in m.slots.iter().enumerate() {
                if let Some(row) = rows.iter_mut().find(|r| r.participant == contestant) {
                    row.points += scores[slot];
                    if contestant == winner {
                        row.wins += 1;
                    } else {
                        row.losses += 1;
                    }
                }
            }
        }

        // stable sort keeps the seeded order as the final tie-break
        rows.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.losses.cmp(&b.losses))
                .then(b.points.cmp(&a.points))
        });
        rows
    }

    /// Returns whether every match of the current round is decided
    fn round_complete(&self) -> bool {
        self.matches
            .iter()
            .filter(|m| m.round == self.current_round)
            .all(|m| m.winner.is_some())
    }

    /// Moves the bracket forward once the current round is complete
    fn advance_round(&mut self) {
        match self.format {
            BracketFormat::SingleElimination => {
                let mut advancers = self
                    .round_matches(self.current_round)
                    .into_iter()
                    .filter_map(Match::winner)
                    .collect_vec();
                // the bye, if any, advances behind the match winners
                advancers.append(&mut self.advancers);

                if advancers.len() == 1 {
                    self.champion = advancers.first().copied();
                    self.complete = true;
                } else {
                    self.open_elimination_round(&advancers);
                }
            }
            BracketFormat::RoundRobin => {
                if u64::from(self.current_round) >= self.round_robin_round_count() {
                    self.complete = true;
                } else {
                    self.open_round_robin_round();
                }
            }
        }
    }

    /// Opens the next single elimination round over the given contenders
    fn open_elimination_round(&mut self, contenders: &[ParticipantId]) {
        self.current_round += 1;
        self.advancers = Vec::new();

        let mut chunks = contenders.chunks_exact(2);
        for pair in chunks.by_ref() {
            self.create_match([pair[0], pair[1]]);
        }
        if let [bye] = chunks.remainder() {
            self.advancers.push(*bye);
        }

        // a lone contender cannot happen here: generation requires the
        // session minimum and advancement stops at one winner
        if contenders.len() == 1 {
            self.champion = contenders.first().copied();
            self.complete = true;
        }
    }

    /// Returns the total number of round robin rounds for this bracket
    fn round_robin_round_count(&self) -> u64 {
        let n = self.order.len() as u64;
        if n % 2 == 0 { n.saturating_sub(1) } else { n }
    }

    /// Opens the next round robin round using the circle method
    ///
    /// Slot 0 stays fixed while the rest rotate one position per round;
    /// an odd participant count leaves one participant idle each round.
    fn open_round_robin_round(&mut self) {
        self.current_round += 1;

        let mut slots: Vec<Option<ParticipantId>> =
            self.order.iter().copied().map(Some).collect_vec();
        if slots.len() % 2 == 1 {
            slots.push(None);
        }
        let m = slots.len();
        let rotation = (self.current_round - 1) as usize;

        let position = |slot: usize| -> Option<ParticipantId> {
            if slot == 0 {
                slots[0]
            } else {
                slots[1 + (slot - 1 + rotation) % (m - 1)]
            }
        };

        for i in 0..m / 2 {
            if let (Some(left), Some(right)) = (position(i), position(m - 1 - i)) {
                self.create_match([left, right]);
            }
        }
    }

    /// Creates one match in the current round
    fn create_match(&mut self, slots: [ParticipantId; 2]) {
        let id = MatchId(self.next_match_id);
        self.next_match_id += 1;
        self.matches.push(Match {
            id,
            round: self.current_round,
            slots,
            winner: None,
            scores: None,
            decided_at: None,
        });
    }
}
