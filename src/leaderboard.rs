//! Leaderboard ranking and score summaries
//!
//! Maintains the ranked standings for one session. Standings are
//! recomputed and swapped wholesale on every scoring event, so readers
//! always observe either the pre- or post-update ordering, never a torn
//! one. Every recompute bumps a monotonically increasing version used by
//! the engine's read-through snapshot cache.

use std::{cmp::Reverse, collections::HashMap};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{TruncatedVec, participant::ParticipantId};

/// One row of the ranked standings
///
/// Ordering is total: cumulative score descending, then join sequence
/// ascending, so two entries never compare equal and ranking is stable
/// across recomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The participant this row ranks
    pub participant: ParticipantId,
    /// Cumulative score at the time of the recompute
    pub score: u64,
    /// Join sequence number, the deterministic tie-break key
    pub join_seq: u64,
}

/// Score information for one participant
///
/// Sent to participants so they can see their own standing without
/// receiving the full board.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct ScoreMessage {
    /// Total points earned by the participant
    pub points: u64,
    /// Current position in the standings (1-indexed)
    pub position: usize,
}

/// Summary of final session statistics and participant performance
#[derive(Debug, Clone)]
pub struct FinalSummary {
    /// For each question, (participants who earned points, participants who earned none)
    stats: Vec<(usize, usize)>,
    /// For each participant, the points they earned on each question
    mapping: HashMap<ParticipantId, Vec<u64>>,
}

/// Serialization helper for the leaderboard
#[derive(Deserialize)]
struct LeaderboardSerde {
    points_by_question: Vec<Vec<(ParticipantId, u64)>>,
    standings: Vec<Entry>,
    previous_standings: Vec<Entry>,
    version: u64,
}

/// Ranked standings for one session
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "LeaderboardSerde")]
pub struct Leaderboard {
    /// Points awarded to each participant on each question, in question order
    points_by_question: Vec<Vec<(ParticipantId, u64)>>,
    /// Current standings in rank order
    standings: Vec<Entry>,
    /// Standings as of the end of the previous question
    previous_standings: Vec<Entry>,
    /// Bumped on every recompute; stamps snapshots for cache invalidation
    version: u64,

    /// Mapping from participant to their score and rank index (cached)
    #[serde(skip)]
    score_and_rank: HashMap<ParticipantId, (u64, usize)>,
    /// Final session summary (computed once when needed)
    #[serde(skip)]
    final_summary: once_cell_serde::sync::OnceCell<FinalSummary>,
}

impl From<LeaderboardSerde> for Leaderboard {
    /// Reconstructs the leaderboard from serialized data
    ///
    /// Rebuilds the score-and-rank mapping from the standings, which is
    /// not serialized.
    fn from(serde: LeaderboardSerde) -> Self {
        let score_and_rank = serde
            .standings
            .iter()
            .enumerate()
            .map(|(rank, entry)| (entry.participant, (entry.score, rank)))
            .collect();
        Self {
            points_by_question: serde.points_by_question,
            standings: serde.standings,
            previous_standings: serde.previous_standings,
            version: serde.version,
            score_and_rank,
            final_summary: once_cell_serde::sync::OnceCell::new(),
        }
    }
}

impl Leaderboard {
    /// Records the points a participant earned on a question
    ///
    /// The per-question rows feed the final summary; ranking itself is
    /// driven by [`Leaderboard::rebuild`].
    pub fn record_points(&mut self, question_index: usize, participant: ParticipantId, points: u64) {
        if self.points_by_question.len() <= question_index {
            self.points_by_question.resize(question_index + 1, Vec::new());
        }
        self.points_by_question[question_index].push((participant, points));
    }

    /// Recomputes the standings from the given participant rows
    ///
    /// Sorts by score descending with join sequence ascending as the
    /// tie-break, swaps the standings wholesale, and bumps the version.
    /// The ordering is a total order, so recomputation is deterministic
    /// for any input ordering.
    pub fn rebuild<I: Iterator<Item = Entry>>(&mut self, entries: I) {
        let standings = entries
            .sorted_by_key(|entry| (Reverse(entry.score), entry.join_seq))
            .collect_vec();

        self.score_and_rank = standings
            .iter()
            .enumerate()
            .map(|(rank, entry)| (entry.participant, (entry.score, rank)))
            .collect();

        self.standings = standings;
        self.version += 1;
    }

    /// Freezes the current standings as the previous-question baseline
    ///
    /// Called when the session advances so displays can show rank deltas
    /// against the end of the last question.
    pub fn snapshot_previous(&mut self) {
        self.previous_standings = self.standings.clone();
    }

    /// Returns the current recompute version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the current standings in rank order
    pub fn standings(&self) -> &[Entry] {
        &self.standings
    }

    /// Returns the standings as of the end of the previous question
    pub fn previous_standings(&self) -> &[Entry] {
        &self.previous_standings
    }

    /// Returns the top of the standings, truncated for display
    pub fn top(&self, limit: usize) -> TruncatedVec<Entry> {
        TruncatedVec::new(
            self.standings.iter().copied(),
            limit,
            self.standings.len(),
        )
    }

    /// Returns the score and 1-indexed position of a participant
    pub fn score(&self, participant: ParticipantId) -> Option<ScoreMessage> {
        let (points, rank) = self.score_and_rank.get(&participant)?;
        Some(ScoreMessage {
            points: *points,
            position: rank + 1,
        })
    }

    /// Computes the final summary across all questions
    fn compute_final_summary(&self) -> FinalSummary {
        FinalSummary {
            stats: self
                .points_by_question
                .iter()
                .map(|row| {
                    let earned = row.iter().filter(|(_, points)| *points > 0).count();
                    (earned, row.len() - earned)
                })
                .collect(),
            mapping: self.points_by_question.iter().enumerate().fold(
                HashMap::new(),
                |mut mapping, (question_index, row)| {
                    for (participant, points) in row {
                        mapping
                            .entry(*participant)
                            .or_insert_with(|| vec![0; question_index])
                            .push(*points);
                    }
                    for points in mapping.values_mut() {
                        points.resize(question_index + 1, 0);
                    }
                    mapping
                },
            ),
        }
    }

    /// Gets or computes the cached final summary
    fn final_summary(&self) -> &FinalSummary {
        self.final_summary.get_or_init(|| self.compute_final_summary())
    }

    /// Returns aggregate per-question statistics for the presenter
    ///
    /// The result pairs the participant count with, for each question,
    /// how many participants earned points versus none.
    pub fn presenter_summary(&self) -> (usize, Vec<(usize, usize)>) {
        let summary = self.final_summary();
        (summary.mapping.len(), summary.stats.clone())
    }

    /// Returns one participant's points per question, zero-filled
    pub fn participant_summary(&self, participant: ParticipantId) -> Vec<u64> {
        self.final_summary()
            .mapping
            .get(&participant)
            .map_or(vec![0; self.points_by_question.len()], Clone::clone)
    }
}
