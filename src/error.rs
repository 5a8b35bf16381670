//! Error taxonomy for the quiz arena engine
//!
//! Every expected failure in the engine is represented as a typed variant
//! here and returned to the caller as a `Result`. Lifecycle and
//! elimination operations are safe to retry blindly; a
//! [`Error::DuplicateSubmission`] is the expected outcome for the loser of
//! a submission race and must not be retried by the engine itself.

use serde::Serialize;
use thiserror::Error;

use crate::{names, session_id::SessionId};

/// Errors returned by the session engine
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A lifecycle rule was violated, such as starting an already-active session
    #[error("invalid lifecycle transition")]
    InvalidTransition,
    /// An answer was already recorded for this participant and question
    #[error("your answer was already recorded")]
    DuplicateSubmission,
    /// The session is not accepting answers in its current status
    #[error("session is not active")]
    SessionNotActive,
    /// The submission targets a question other than the current one
    #[error("submission does not match the current question")]
    QuestionMismatch,
    /// A match result names a winner that is not one of the match's participants
    #[error("winner is not a participant of this match")]
    InvalidWinner,
    /// The session does not have enough participants for the operation
    #[error("not enough participants: {required} required, {actual} present")]
    InsufficientParticipants {
        /// Minimum participant count required by the session mode
        required: usize,
        /// Participant count at the time of the attempt
        actual: usize,
    },
    /// No session exists with the given identifier
    #[error("unknown session {0}")]
    SessionNotFound(SessionId),
    /// The session has reached its participant capacity
    #[error("maximum number of participants reached")]
    SessionFull,
    /// The session is locked to new participants
    #[error("session is locked")]
    SessionLocked,
    /// No participant exists with the given identifier in this session
    #[error("unknown participant")]
    UnknownParticipant,
    /// The participant has been eliminated and may not submit answers
    #[error("participant has been eliminated")]
    ParticipantEliminated,
    /// The chosen answer set is empty or references an out-of-range choice
    #[error("chosen answer set is invalid")]
    InvalidChoice,
    /// The reported response time is negative or exceeds the question time limit
    #[error("response time is outside the question time limit")]
    InvalidResponseTime,
    /// The operation applies to a different competition mode
    #[error("operation is not available in this session mode")]
    WrongMode,
    /// No match exists with the given identifier in this tournament
    #[error("unknown match")]
    MatchNotFound,
    /// The match already has a recorded winner
    #[error("match result was already recorded")]
    MatchAlreadyDecided,
    /// The quiz contains no questions
    #[error("quiz contains no questions")]
    EmptyQuiz,
    /// A configuration value violates its documented bounds
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A display name failed validation
    #[error(transparent)]
    Name(#[from] names::Error),
}
