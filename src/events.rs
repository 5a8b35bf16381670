//! Domain events emitted by the engine
//!
//! Everything the surrounding application needs to observe — session
//! lifecycle, question flow, scoring, eliminations, match results — is
//! published as one of these events. Payloads are plain serializable
//! data with no behavior; the concrete transport (pub/sub, websockets)
//! is the collaborator's concern.

use std::time::Duration;

use serde::Serialize;

use crate::{
    TruncatedVec,
    bracket::MatchId,
    participant::ParticipantId,
    session::Mode,
    session_id::SessionId,
};

/// A session left the waiting room and began its question flow
#[derive(Debug, Clone, Serialize)]
pub struct SessionStarted {
    /// The session that started
    pub session: SessionId,
    /// The session's competition mode
    pub mode: Mode,
    /// Number of participants at start
    pub participant_count: usize,
    /// Number of questions in the quiz
    pub question_count: usize,
}

/// A question became the session's current question
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDisplayed {
    /// The session showing the question
    pub session: SessionId,
    /// Position of the question in the quiz (0-based)
    pub index: usize,
    /// Total number of questions in the quiz
    pub count: usize,
    /// The prompt to display
    pub prompt: String,
    /// The choices to display, in order
    pub choices: Vec<String>,
    /// Time participants have to answer
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub time_limit: Duration,
}

/// An answer was accepted and scored
#[derive(Debug, Clone, Serialize)]
pub struct AnswerScored {
    /// The session the answer belongs to
    pub session: SessionId,
    /// The participant who answered
    pub participant: ParticipantId,
    /// The question answered (0-based position)
    pub question_index: usize,
    /// Points awarded
    pub points: u64,
    /// Whether the answer earned any credit
    pub credited: bool,
}

/// The standings changed after a scoring event
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardUpdated {
    /// The session whose standings changed
    pub session: SessionId,
    /// Recompute version of the standings carried in this event
    pub version: u64,
    /// Current standings as (display name, score), truncated for broadcast
    pub standings: TruncatedVec<(String, u64)>,
}

/// A participant was removed by a battle royale elimination round
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantEliminated {
    /// The session the participant was competing in
    pub session: SessionId,
    /// The eliminated participant
    pub participant: ParticipantId,
    /// Display name of the eliminated participant
    pub name: String,
    /// The elimination round that removed them
    pub round: u32,
    /// Final placement, 1-indexed from the winner down
    pub final_position: usize,
}

/// A session reached its terminal state
#[derive(Debug, Clone, Serialize)]
pub struct SessionCompleted {
    /// The completed session
    pub session: SessionId,
    /// The winner, when the mode produces a single one
    pub winner: Option<ParticipantId>,
}

/// A tournament match received its result
#[derive(Debug, Clone, Serialize)]
pub struct MatchCompleted {
    /// The session hosting the tournament
    pub session: SessionId,
    /// The decided match
    pub match_id: MatchId,
    /// The round the match belongs to
    pub round: u32,
    /// The winning participant
    pub winner: ParticipantId,
}

/// Domain events published to the surrounding application
#[derive(Debug, Clone, Serialize, derive_more::From)]
pub enum Event {
    /// A session started
    SessionStarted(SessionStarted),
    /// A question was displayed
    QuestionDisplayed(QuestionDisplayed),
    /// An answer was scored
    AnswerScored(AnswerScored),
    /// The standings changed
    LeaderboardUpdated(LeaderboardUpdated),
    /// A participant was eliminated
    ParticipantEliminated(ParticipantEliminated),
    /// A session completed
    SessionCompleted(SessionCompleted),
    /// A tournament match was decided
    MatchCompleted(MatchCompleted),
}

impl Event {
    /// Converts the event to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never
    /// happen with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Receives the events a session operation produced
///
/// The engine collects events while it holds a session's serialization
/// point and forwards them to the application's sink only after the lock
/// is released, so implementations are free to block on delivery.
pub trait EventSink {
    /// Accepts one event
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    /// Buffers the event in order
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// A sink that discards every event, for callers that do not observe them
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: Event) {}
}
