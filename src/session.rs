//! Session lifecycle and the answer-submission pipeline
//!
//! A [`Session`] owns everything one live quiz run needs: the state
//! machine (`Waiting → Active → Completed`), the current-question
//! pointer, the roster, the standings, and every submitted answer. All
//! mutation goes through the defined transitions; the engine serializes
//! calls per session, and every transition is written so that the loser
//! of a concurrent race observes the already-applied state and no-ops
//! instead of erroring.

use std::{
    collections::{BTreeSet, HashMap, hash_map::Entry},
    fmt::Debug,
    time::Duration,
};

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use web_time::SystemTime;

use crate::{
    TruncatedVec,
    bracket::{Bracket, BracketFormat, MatchId},
    error::Error,
    events::{
        AnswerScored, EventSink, LeaderboardUpdated, MatchCompleted, ParticipantEliminated,
        QuestionDisplayed, SessionCompleted, SessionStarted,
    },
    leaderboard::{Entry as BoardEntry, Leaderboard, ScoreMessage},
    names::NameStyle,
    participant::{ParticipantId, Roster},
    question::Quiz,
    scoring::{self, ScoringConfig},
    session_id::SessionId,
};

/// The competition mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Fixed question sequence with a single leaderboard
    Classic,
    /// Periodic elimination of the lowest performers until one remains
    BattleRoyale,
    /// Bracket-based head-to-head matches across rounds
    Tournament,
}

impl Mode {
    /// Returns the minimum participant count required to start
    pub fn min_participants(self) -> usize {
        match self {
            Mode::Classic => crate::constants::session::MIN_PARTICIPANTS_CLASSIC,
            Mode::BattleRoyale | Mode::Tournament => {
                crate::constants::session::MIN_PARTICIPANTS_COMPETITIVE
            }
        }
    }
}

/// The lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Accepting participants, not yet showing questions
    Waiting,
    /// Showing questions and accepting answers
    Active,
    /// Terminal; all further mutation is frozen
    Completed,
}

/// Per-session options beyond the quiz and scoring parameters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Validate)]
pub struct Options {
    /// Style for names generated on anonymous joins
    #[garde(dive)]
    pub name_style: NameStyle,
    /// Seed for the tournament bracket shuffle; drawn randomly when
    /// absent, and recorded either way so brackets replay exactly
    #[garde(skip)]
    pub bracket_seed: Option<u64>,
    /// Pairing format for tournament sessions
    #[garde(skip)]
    pub bracket_format: BracketFormat,
}

/// One accepted answer for one (participant, question) pair
///
/// Created once by the submission pipeline and immutable thereafter.
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    /// The chosen choice indices
    choices: BTreeSet<usize>,
    /// Elapsed answer time reported by the caller
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    response_time: Duration,
    /// Points awarded by the scoring engine
    points: u64,
    /// Whether the answer earned any credit
    credited: bool,
    /// Wall-clock submission time
    submitted_at: SystemTime,
}

impl SubmittedAnswer {
    /// Returns the chosen choice indices
    pub fn choices(&self) -> &BTreeSet<usize> {
        &self.choices
    }

    /// Returns the points awarded
    pub fn points(&self) -> u64 {
        self.points
    }

    /// Returns whether the answer earned any credit
    pub fn credited(&self) -> bool {
        self.credited
    }
}

/// The outcome of advancing the question pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The session moved to the question at this position
    NextQuestion(usize),
    /// No questions remained; the session completed
    SessionCompleted,
}

/// One live run of a quiz
#[serde_with::serde_as]
#[derive(Serialize, Deserialize)]
pub struct Session {
    /// The session's join code
    pub(crate) id: SessionId,
    /// The competition mode
    pub(crate) mode: Mode,
    /// Lifecycle status; mutated only through `change_status`
    pub(crate) status: Status,
    /// The quiz being played; immutable once the session starts
    pub(crate) quiz: Quiz,
    /// Scoring parameters, opaque input from the application
    pub(crate) scoring: ScoringConfig,
    /// Session options
    pub(crate) options: Options,
    /// Position of the current question while Active
    pub(crate) current_question: usize,
    /// Everyone competing in this session
    pub(crate) roster: Roster,
    /// Ranked standings
    pub(crate) leaderboard: Leaderboard,
    /// Accepted answers; entry occupancy enforces at-most-one per pair
    #[serde_as(as = "Vec<(_, _)>")]
    pub(crate) answers: HashMap<(ParticipantId, usize), SubmittedAnswer>,
    /// When the session started
    pub(crate) started_at: Option<SystemTime>,
    /// When the session completed
    pub(crate) ended_at: Option<SystemTime>,
    /// Whether new joins are refused
    pub(crate) locked: bool,
    /// Number of battle royale elimination rounds applied so far
    pub(crate) elimination_round: u32,
    /// Bracket state; present only in tournament mode once started
    pub(crate) bracket: Option<Bracket>,
    /// The winner recorded at completion, when the mode yields one
    pub(crate) winner: Option<ParticipantId>,
}

impl Debug for Session {
    /// Custom debug implementation that avoids printing large amounts of data
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session in the `Waiting` state
    ///
    /// Validates the quiz and scoring configuration up front; the quiz
    /// must contain at least one internally consistent question.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyQuiz`] / [`Error::InvalidChoice`] - quiz
    ///   consistency failures
    /// * [`Error::InvalidConfig`] - bound violations reported by the
    ///   configuration validators
    pub fn create(
        id: SessionId,
        quiz: Quiz,
        mode: Mode,
        scoring: ScoringConfig,
        options: Options,
    ) -> Result<Self, Error> {
        quiz.check()?;
        quiz.validate()
            .map_err(|report| Error::InvalidConfig(report.to_string()))?;
        scoring
            .validate()
            .map_err(|report| Error::InvalidConfig(report.to_string()))?;
        options
            .validate()
            .map_err(|report| Error::InvalidConfig(report.to_string()))?;

        Ok(Self {
            id,
            mode,
            status: Status::Waiting,
            quiz,
            scoring,
            options,
            current_question: 0,
            roster: Roster::new(crate::constants::session::MAX_PARTICIPANTS),
            leaderboard: Leaderboard::default(),
            answers: HashMap::new(),
            started_at: None,
            ended_at: None,
            locked: false,
            elimination_round: 0,
            bracket: None,
            winner: None,
        })
    }

    /// Returns the session's join code
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the competition mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the lifecycle status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the quiz being played
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// Returns the roster of participants
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Returns the ranked standings
    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// Returns the bracket, if this is a started tournament session
    pub fn bracket(&self) -> Option<&Bracket> {
        self.bracket.as_ref()
    }

    /// Returns the recorded winner, once the session has completed
    pub fn winner(&self) -> Option<ParticipantId> {
        self.winner
    }

    /// Returns the position of the current question while Active
    pub fn current_question(&self) -> Option<usize> {
        matches!(self.status, Status::Active).then_some(self.current_question)
    }

    /// Returns the accepted answer for a (participant, question) pair
    pub fn answer(
        &self,
        participant: ParticipantId,
        question_index: usize,
    ) -> Option<&SubmittedAnswer> {
        self.answers.get(&(participant, question_index))
    }

    /// Returns a participant's score and 1-indexed position
    pub fn score(&self, participant: ParticipantId) -> Option<ScoreMessage> {
        self.leaderboard.score(participant)
    }

    /// Locks or unlocks the session to new joins
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Returns whether the session refuses new joins
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Adds a participant to the waiting session
    ///
    /// An anonymous join (no name) receives a generated display name;
    /// the avatar reference is carried verbatim for display collaborators.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidTransition`] - the session already started
    /// * [`Error::SessionLocked`] - the presenter locked the session
    /// * [`Error::SessionFull`] / [`Error::Name`] - roster refusals
    pub fn join(
        &mut self,
        name: Option<&str>,
        avatar: Option<String>,
    ) -> Result<ParticipantId, Error> {
        if !matches!(self.status, Status::Waiting) {
            return Err(Error::InvalidTransition);
        }
        if self.locked {
            return Err(Error::SessionLocked);
        }
        self.roster.join(name, avatar, self.options.name_style)
    }

    /// Attempts to transition the lifecycle status
    ///
    /// The transition applies only when the current status matches the
    /// expected `before` state, so a retried or racing transition
    /// observes the applied state and reports `false` instead of
    /// corrupting anything.
    fn change_status(&mut self, before: Status, after: Status) -> bool {
        if self.status == before {
            self.status = after;
            true
        } else {
            false
        }
    }

    /// Starts the session: `Waiting → Active`
    ///
    /// Requires the mode's minimum participant count. Sets the current
    /// question to the first one and, in tournament mode, generates the
    /// bracket from the roster in join order with the recorded seed.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidTransition`] - the session is not Waiting
    /// * [`Error::InsufficientParticipants`] - below the mode minimum
    pub fn start(&mut self, sink: &mut impl EventSink) -> Result<(), Error> {
        if !matches!(self.status, Status::Waiting) {
            return Err(Error::InvalidTransition);
        }

        let required = self.mode.min_participants();
        let actual = self.roster.count();
        if actual < required {
            return Err(Error::InsufficientParticipants { required, actual });
        }

        if !self.change_status(Status::Waiting, Status::Active) {
            return Err(Error::InvalidTransition);
        }

        self.started_at = Some(SystemTime::now());
        self.current_question = 0;
        // every participant ranks from the start, tied at zero
        self.rebuild_standings();

        if matches!(self.mode, Mode::Tournament) {
            let order = self
                .roster
                .in_join_order()
                .into_iter()
                .map(|(id, _)| id)
                .collect::<Vec<_>>();
            let seed = self.options.bracket_seed.unwrap_or_else(|| fastrand::u64(..));
            self.bracket = Some(Bracket::generate(
                &order,
                seed,
                self.options.bracket_format,
            ));
        }

        info!(session = %self.id, participants = actual, "session started");

        sink.emit(
            SessionStarted {
                session: self.id,
                mode: self.mode,
                participant_count: actual,
                question_count: self.quiz.len(),
            }
            .into(),
        );
        self.emit_question_displayed(sink);

        Ok(())
    }

    /// Moves the current-question pointer forward by one
    ///
    /// Past the last question this triggers completion. Calling advance
    /// on an already-completed session is the no-op loser path of a
    /// presenter retry, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the session has not
    /// started yet.
    pub fn advance(&mut self, sink: &mut impl EventSink) -> Result<AdvanceOutcome, Error> {
        match self.status {
            Status::Waiting => Err(Error::InvalidTransition),
            Status::Completed => Ok(AdvanceOutcome::SessionCompleted),
            Status::Active => {
                self.leaderboard.snapshot_previous();

                let next = self.current_question + 1;
                if next < self.quiz.len() {
                    self.current_question = next;
                    self.emit_question_displayed(sink);
                    Ok(AdvanceOutcome::NextQuestion(next))
                } else {
                    self.complete(sink)?;
                    Ok(AdvanceOutcome::SessionCompleted)
                }
            }
        }
    }

    /// Completes the session: `Active → Completed`
    ///
    /// Idempotent: completing an already-completed session is a no-op so
    /// retried timers and racing presenter controls stay safe. Records
    /// the end timestamp and the winner the mode yields, and freezes all
    /// further mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if the session never started.
    pub fn complete(&mut self, sink: &mut impl EventSink) -> Result<(), Error> {
        match self.status {
            Status::Completed => Ok(()),
            Status::Waiting => Err(Error::InvalidTransition),
            Status::Active => {
                if self.change_status(Status::Active, Status::Completed) {
                    self.ended_at = Some(SystemTime::now());
                    self.winner = self.determine_winner();

                    info!(session = %self.id, winner = ?self.winner, "session completed");

                    sink.emit(
                        SessionCompleted {
                            session: self.id,
                            winner: self.winner,
                        }
                        .into(),
                    );
                }
                Ok(())
            }
        }
    }

    /// Validates and scores one answer submission
    ///
    /// The preconditions run in order: the session must be active, the
    /// submission must target the current question, the participant must
    /// exist and still be competing, the choice set must be non-empty and
    /// in range, and the response time must fit the question's limit.
    /// The at-most-one-answer rule is enforced by entry occupancy in the
    /// answer map — the insertion itself is the compare-and-swap, so two
    /// racing submissions resolve to one success and one
    /// [`Error::DuplicateSubmission`] without any check-then-act window.
    ///
    /// On success the scoring engine runs, the participant's score and
    /// streak update, the standings recompute, and `AnswerScored` plus
    /// `LeaderboardUpdated` events are emitted. Returns the awarded
    /// points.
    pub fn submit_answer(
        &mut self,
        sink: &mut impl EventSink,
        participant: ParticipantId,
        question_index: usize,
        choices: BTreeSet<usize>,
        response_time: Duration,
    ) -> Result<u64, Error> {
        if !matches!(self.status, Status::Active) {
            return Err(Error::SessionNotActive);
        }
        if question_index != self.current_question {
            return Err(Error::QuestionMismatch);
        }

        let question = self
            .quiz
            .question(question_index)
            .ok_or(Error::QuestionMismatch)?;

        let record = self.roster.get(participant).ok_or(Error::UnknownParticipant)?;
        if !record.is_active() {
            return Err(Error::ParticipantEliminated);
        }
        let streak = record.streak();

        if choices.is_empty() || choices.iter().any(|&c| c >= question.choices().len()) {
            return Err(Error::InvalidChoice);
        }
        if response_time > question.time_limit() {
            return Err(Error::InvalidResponseTime);
        }

        let verdict = match self.answers.entry((participant, question_index)) {
            Entry::Occupied(_) => {
                trace!(session = %self.id, %participant, "duplicate submission refused");
                return Err(Error::DuplicateSubmission);
            }
            Entry::Vacant(slot) => {
                let verdict =
                    scoring::score_answer(question, &self.scoring, &choices, response_time, streak);
                slot.insert(SubmittedAnswer {
                    choices,
                    response_time,
                    points: verdict.points,
                    credited: verdict.credited,
                    submitted_at: SystemTime::now(),
                });
                verdict
            }
        };

        self.roster
            .record_outcome(participant, verdict.credited, verdict.points);
        self.leaderboard
            .record_points(question_index, participant, verdict.points);
        self.rebuild_standings();

        debug!(
            session = %self.id,
            %participant,
            question = question_index,
            points = verdict.points,
            "answer scored"
        );

        sink.emit(
            AnswerScored {
                session: self.id,
                participant,
                question_index,
                points: verdict.points,
                credited: verdict.credited,
            }
            .into(),
        );
        sink.emit(self.leaderboard_updated());

        Ok(verdict.points)
    }

    /// Records the result of a tournament match
    ///
    /// Delegates validation to the bracket; on success emits
    /// `MatchCompleted`, and completes the session once the bracket has
    /// produced its champion.
    ///
    /// # Errors
    ///
    /// * [`Error::WrongMode`] - the session is not a tournament
    /// * [`Error::SessionNotActive`] - the tournament is not running
    /// * [`Error::MatchNotFound`] / [`Error::MatchAlreadyDecided`] /
    ///   [`Error::InvalidWinner`] - bracket refusals
    pub fn record_match_result(
        &mut self,
        sink: &mut impl EventSink,
        match_id: MatchId,
        winner: ParticipantId,
        scores: [u64; 2],
    ) -> Result<(), Error> {
        if !matches!(self.mode, Mode::Tournament) {
            return Err(Error::WrongMode);
        }
        if !matches!(self.status, Status::Active) {
            return Err(Error::SessionNotActive);
        }

        let bracket = self.bracket.as_mut().ok_or(Error::SessionNotActive)?;
        let decided = bracket.record_result(match_id, winner, scores)?;
        let round = decided.round();

        info!(session = %self.id, %match_id, %winner, "match decided");

        sink.emit(
            MatchCompleted {
                session: self.id,
                match_id,
                round,
                winner,
            }
            .into(),
        );

        if self.bracket.as_ref().is_some_and(Bracket::is_complete) {
            self.complete(sink)?;
        }

        Ok(())
    }

    /// Recomputes the standings from the roster
    ///
    /// Eliminated participants stay ranked so final placements survive;
    /// the swap is wholesale, so readers never see a torn ordering.
    pub(crate) fn rebuild_standings(&mut self) {
        self.leaderboard.rebuild(self.roster.iter().map(|(id, p)| BoardEntry {
            participant: id,
            score: p.score(),
            join_seq: p.join_seq(),
        }));
    }

    /// Builds the display standings with names resolved, truncated
    pub(crate) fn display_standings(&self) -> TruncatedVec<(String, u64)> {
        self.leaderboard
            .top(crate::constants::leaderboard::DISPLAY_LIMIT)
            .map(|entry| {
                (
                    self.roster
                        .get(entry.participant)
                        .map_or_else(|| "Unknown".to_owned(), |p| p.name().to_owned()),
                    entry.score,
                )
            })
    }

    /// Builds a `LeaderboardUpdated` event for the current standings
    pub(crate) fn leaderboard_updated(&self) -> crate::events::Event {
        LeaderboardUpdated {
            session: self.id,
            version: self.leaderboard.version(),
            standings: self.display_standings(),
        }
        .into()
    }

    /// Emits `QuestionDisplayed` for the current question
    fn emit_question_displayed(&self, sink: &mut impl EventSink) {
        if let Some(question) = self.quiz.question(self.current_question) {
            sink.emit(
                QuestionDisplayed {
                    session: self.id,
                    index: self.current_question,
                    count: self.quiz.len(),
                    prompt: question.prompt().to_owned(),
                    choices: question.choices().to_vec(),
                    time_limit: question.time_limit(),
                }
                .into(),
            );
        }
    }

    /// Emits `ParticipantEliminated` for one removed participant
    pub(crate) fn emit_eliminated(
        &self,
        sink: &mut impl EventSink,
        participant: ParticipantId,
        round: u32,
        final_position: usize,
    ) {
        let name = self
            .roster
            .get(participant)
            .map_or_else(|| "Unknown".to_owned(), |p| p.name().to_owned());
        sink.emit(
            ParticipantEliminated {
                session: self.id,
                participant,
                name,
                round,
                final_position,
            }
            .into(),
        );
    }

    /// Determines the winner the mode yields at completion
    fn determine_winner(&self) -> Option<ParticipantId> {
        match self.mode {
            Mode::Classic => self
                .leaderboard
                .standings()
                .first()
                .map(|entry| entry.participant),
            Mode::BattleRoyale => {
                let active = self.roster.active_ids();
                match active.as_slice() {
                    [sole] => Some(*sole),
                    _ => self
                        .leaderboard
                        .standings()
                        .iter()
                        .find(|entry| {
                            self.roster
                                .get(entry.participant)
                                .is_some_and(|p| p.is_active())
                        })
                        .map(|entry| entry.participant),
                }
            }
            Mode::Tournament => self.bracket.as_ref().and_then(Bracket::champion),
        }
    }
}
