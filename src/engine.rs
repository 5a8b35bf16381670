//! The multi-session engine
//!
//! Hosts many concurrent sessions behind one public API. Each session
//! sits behind its own mutex, so submissions racing within one session
//! serialize while unrelated sessions proceed independently — there is
//! no global lock across sessions. Events produced by an operation are
//! buffered while the session lock is held and forwarded to the
//! application's sink only after it is released, so delivery can block
//! without stalling the session.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use serde::Serialize;
use tracing::info;

use crate::{
    bracket::MatchId,
    elimination::EliminationReport,
    error::Error,
    events::{Event, EventSink},
    leaderboard::ScoreMessage,
    participant::ParticipantId,
    question::Quiz,
    scoring::ScoringConfig,
    session::{AdvanceOutcome, Mode, Options, Session, Status},
    session_id::SessionId,
};

/// One row of a leaderboard snapshot, with the display name resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// The ranked participant
    pub participant: ParticipantId,
    /// The participant's display name
    pub name: String,
    /// Position in the standings (1-indexed)
    pub rank: usize,
    /// Cumulative score
    pub score: u64,
}

/// A cached leaderboard snapshot stamped with its recompute version
struct CachedBoard {
    /// The leaderboard version the snapshot was built from
    version: u64,
    /// The full ranked snapshot, shared with callers
    entries: Arc<Vec<RankedEntry>>,
}

/// The session engine
///
/// Owns every live session and the event sink the surrounding
/// application registered. All methods take `&self`; interior locks
/// provide the per-session serialization the state machines rely on.
pub struct Engine<S> {
    /// Live sessions by join code
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
    /// The application's event sink, serialized independently of sessions
    sink: Mutex<S>,
    /// Leaderboard snapshots keyed by session, invalidated by version
    board_cache: Mutex<HashMap<SessionId, CachedBoard>>,
}

impl<S: EventSink> Engine<S> {
    /// Creates an engine that forwards events to the given sink
    pub fn new(sink: S) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            sink: Mutex::new(sink),
            board_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a session and returns its join code
    ///
    /// The code is drawn randomly and redrawn on collision with a live
    /// session.
    ///
    /// # Errors
    ///
    /// Propagates quiz and configuration validation failures from
    /// [`Session::create`].
    pub fn create_session(
        &self,
        quiz: Quiz,
        mode: Mode,
        scoring: ScoringConfig,
        options: Options,
    ) -> Result<SessionId, Error> {
        let mut sessions = self.sessions.write().expect("session registry poisoned");

        let mut id = SessionId::new();
        while sessions.contains_key(&id) {
            id = SessionId::new();
        }

        let session = Session::create(id, quiz, mode, scoring, options)?;
        sessions.insert(id, Arc::new(Mutex::new(session)));

        info!(session = %id, ?mode, "session created");
        Ok(id)
    }

    /// Adds a participant to a waiting session
    ///
    /// Passing no name requests a generated one; the avatar reference is
    /// display data carried verbatim from the identity collaborator.
    pub fn join_session(
        &self,
        id: SessionId,
        name: Option<&str>,
        avatar: Option<String>,
    ) -> Result<ParticipantId, Error> {
        self.with_session(id, |session, _| session.join(name, avatar))
    }

    /// Locks or unlocks a session to new joins
    pub fn set_locked(&self, id: SessionId, locked: bool) -> Result<(), Error> {
        self.with_session(id, |session, _| {
            session.set_locked(locked);
            Ok(())
        })
    }

    /// Starts a session: `Waiting → Active`
    pub fn start_session(&self, id: SessionId) -> Result<(), Error> {
        self.with_session(id, |session, events| session.start(events))
    }

    /// Submits one answer and returns the awarded points
    ///
    /// The expected loser of a submission race receives
    /// [`Error::DuplicateSubmission`]; the engine never retries on the
    /// caller's behalf.
    pub fn submit_answer(
        &self,
        id: SessionId,
        participant: ParticipantId,
        question_index: usize,
        choices: BTreeSet<usize>,
        response_time: Duration,
    ) -> Result<u64, Error> {
        self.with_session(id, |session, events| {
            session.submit_answer(events, participant, question_index, choices, response_time)
        })
    }

    /// Moves a session to its next question, completing it past the last
    pub fn advance_question(&self, id: SessionId) -> Result<AdvanceOutcome, Error> {
        self.with_session(id, |session, events| session.advance(events))
    }

    /// Completes a session explicitly; idempotent
    pub fn complete_session(&self, id: SessionId) -> Result<(), Error> {
        self.with_session(id, |session, events| session.complete(events))
    }

    /// Applies one battle royale elimination round
    pub fn trigger_elimination(&self, id: SessionId) -> Result<EliminationReport, Error> {
        self.with_session(id, |session, events| session.trigger_elimination(events))
    }

    /// Records a tournament match result
    pub fn record_match_result(
        &self,
        id: SessionId,
        match_id: MatchId,
        winner: ParticipantId,
        scores: [u64; 2],
    ) -> Result<(), Error> {
        self.with_session(id, |session, events| {
            session.record_match_result(events, match_id, winner, scores)
        })
    }

    /// Returns a session's lifecycle status
    pub fn session_status(&self, id: SessionId) -> Result<Status, Error> {
        self.with_session(id, |session, _| Ok(session.status()))
    }

    /// Returns one participant's score and position
    pub fn participant_score(
        &self,
        id: SessionId,
        participant: ParticipantId,
    ) -> Result<Option<ScoreMessage>, Error> {
        self.with_session(id, |session, _| Ok(session.score(participant)))
    }

    /// Returns the top of a session's leaderboard
    ///
    /// Reads go through a snapshot cache keyed by session and standings
    /// version: a snapshot is rebuilt only when a scoring event has
    /// bumped the version since it was taken, never on a clock. The
    /// returned rows are a consistent snapshot — concurrent scoring
    /// produces either the pre- or post-update board, never a torn one.
    pub fn leaderboard(&self, id: SessionId, limit: usize) -> Result<Vec<RankedEntry>, Error> {
        let handle = self.session_handle(id)?;

        let snapshot = {
            let session = handle.lock().expect("session lock poisoned");
            let version = session.leaderboard().version();

            let mut cache = self.board_cache.lock().expect("board cache poisoned");
            match cache.get(&id) {
                Some(cached) if cached.version == version => Arc::clone(&cached.entries),
                _ => {
                    let entries = Arc::new(Self::ranked_snapshot(&session));
                    cache.insert(
                        id,
                        CachedBoard {
                            version,
                            entries: Arc::clone(&entries),
                        },
                    );
                    entries
                }
            }
        };

        Ok(snapshot.iter().take(limit).cloned().collect())
    }

    /// Removes a session from the registry
    ///
    /// Meant for abandoned or archived sessions; the engine applies no
    /// timeout of its own. An active session is completed first so
    /// collaborators observe a terminal event.
    pub fn remove_session(&self, id: SessionId) -> Result<(), Error> {
        // complete first so the terminal event fires outside any registry lock
        match self.complete_session(id) {
            Ok(()) | Err(Error::InvalidTransition) => {}
            Err(other) => return Err(other),
        }

        let removed = self
            .sessions
            .write()
            .expect("session registry poisoned")
            .remove(&id);
        self.board_cache
            .lock()
            .expect("board cache poisoned")
            .remove(&id);

        match removed {
            Some(_) => Ok(()),
            None => Err(Error::SessionNotFound(id)),
        }
    }

    /// Builds the full ranked snapshot for a session
    fn ranked_snapshot(session: &Session) -> Vec<RankedEntry> {
        session
            .leaderboard()
            .standings()
            .iter()
            .enumerate()
            .map(|(index, entry)| RankedEntry {
                participant: entry.participant,
                name: session
                    .roster()
                    .get(entry.participant)
                    .map_or_else(|| "Unknown".to_owned(), |p| p.name().to_owned()),
                rank: index + 1,
                score: entry.score,
            })
            .collect()
    }

    /// Looks up the shared handle for a session
    fn session_handle(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, Error> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(&id)
            .cloned()
            .ok_or(Error::SessionNotFound(id))
    }

    /// Runs one operation under the session's serialization point
    ///
    /// The operation writes its events into a buffer; the buffer is
    /// drained into the application sink only after the session lock has
    /// been released, so the lock is never held across delivery.
    fn with_session<R>(
        &self,
        id: SessionId,
        operation: impl FnOnce(&mut Session, &mut Vec<Event>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let handle = self.session_handle(id)?;

        let mut events = Vec::new();
        let result = {
            let mut session = handle.lock().expect("session lock poisoned");
            operation(&mut session, &mut events)
        };

        if !events.is_empty() {
            let mut sink = self.sink.lock().expect("event sink poisoned");
            for event in events {
                sink.emit(event);
            }
        }

        result
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Barrier;

    use super::*;
    use crate::{events::NullSink, question::QuestionConfig};

    /// A sink that shares its buffer with the test body
    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<Event>>>);

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn drain(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn sample_quiz(questions: usize) -> Quiz {
        Quiz::new(
            "Sample",
            (0..questions)
                .map(|i| {
                    QuestionConfig::new(
                        format!("Question {i}"),
                        vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
                        BTreeSet::from([0]),
                        Duration::from_secs(30),
                    )
                })
                .collect(),
        )
    }

    fn classic_with_players(
        engine: &Engine<impl EventSink>,
        players: usize,
    ) -> (SessionId, Vec<ParticipantId>) {
        let id = engine
            .create_session(
                sample_quiz(2),
                Mode::Classic,
                ScoringConfig::default(),
                Options::default(),
            )
            .unwrap();
        let ids = (0..players)
            .map(|i| engine.join_session(id, Some(&format!("Player {i}")), None).unwrap())
            .collect();
        engine.start_session(id).unwrap();
        (id, ids)
    }

    #[test]
    fn test_unknown_session_is_reported() {
        let engine = Engine::new(NullSink);
        let id = SessionId::new();
        assert_eq!(engine.start_session(id), Err(Error::SessionNotFound(id)));
    }

    #[test]
    fn test_full_classic_flow_emits_lifecycle_events() {
        let sink = RecordingSink::default();
        let engine = Engine::new(sink.clone());
        let (id, ids) = classic_with_players(&engine, 2);

        engine
            .submit_answer(id, ids[0], 0, BTreeSet::from([0]), Duration::ZERO)
            .unwrap();
        engine.advance_question(id).unwrap();
        assert_eq!(
            engine.advance_question(id).unwrap(),
            AdvanceOutcome::SessionCompleted
        );
        assert_eq!(engine.session_status(id).unwrap(), Status::Completed);

        let events = sink.drain();
        assert!(events.iter().any(|e| matches!(e, Event::SessionStarted(_))));
        assert!(events.iter().any(|e| matches!(e, Event::AnswerScored(_))));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::SessionCompleted(_)))
        );
        // two questions displayed: at start and on advance
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::QuestionDisplayed(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_concurrent_duplicate_submissions_resolve_to_one_success() {
        let engine = Arc::new(Engine::new(NullSink));
        let (id, ids) = classic_with_players(&engine, 1);
        let participant = ids[0];

        const RACERS: usize = 16;
        let barrier = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.submit_answer(
                        id,
                        participant,
                        0,
                        BTreeSet::from([0]),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateSubmission)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, RACERS - 1);
    }

    #[test]
    fn test_leaderboard_snapshot_is_cached_by_version() {
        let engine = Engine::new(NullSink);
        let (id, ids) = classic_with_players(&engine, 3);

        let first = engine.leaderboard(id, 10).unwrap();
        let second = engine.leaderboard(id, 10).unwrap();
        assert_eq!(first, second);

        engine
            .submit_answer(id, ids[2], 0, BTreeSet::from([0]), Duration::ZERO)
            .unwrap();

        let third = engine.leaderboard(id, 10).unwrap();
        assert_eq!(third[0].participant, ids[2]);
        assert_eq!(third[0].rank, 1);
        assert_ne!(first, third);
    }

    #[test]
    fn test_leaderboard_limit_truncates() {
        let engine = Engine::new(NullSink);
        let (id, _) = classic_with_players(&engine, 5);

        assert_eq!(engine.leaderboard(id, 3).unwrap().len(), 3);
        assert_eq!(engine.leaderboard(id, 10).unwrap().len(), 5);
    }

    #[test]
    fn test_sessions_are_independent() {
        let engine = Engine::new(NullSink);
        let (first, _) = classic_with_players(&engine, 1);
        let (second, _) = classic_with_players(&engine, 1);

        engine.complete_session(first).unwrap();

        assert_eq!(engine.session_status(first).unwrap(), Status::Completed);
        assert_eq!(engine.session_status(second).unwrap(), Status::Active);
    }

    #[test]
    fn test_remove_session_completes_and_forgets() {
        let sink = RecordingSink::default();
        let engine = Engine::new(sink.clone());
        let (id, _) = classic_with_players(&engine, 1);

        engine.remove_session(id).unwrap();

        assert_eq!(
            engine.session_status(id),
            Err(Error::SessionNotFound(id))
        );
        assert!(
            sink.drain()
                .iter()
                .any(|e| matches!(e, Event::SessionCompleted(_)))
        );
        assert_eq!(engine.remove_session(id), Err(Error::SessionNotFound(id)));
    }

    #[test]
    fn test_remove_waiting_session_is_allowed() {
        let engine = Engine::new(NullSink);
        let id = engine
            .create_session(
                sample_quiz(1),
                Mode::Classic,
                ScoringConfig::default(),
                Options::default(),
            )
            .unwrap();

        engine.remove_session(id).unwrap();
        assert_eq!(
            engine.session_status(id),
            Err(Error::SessionNotFound(id))
        );
    }

    #[test]
    fn test_participant_score_passthrough() {
        let engine = Engine::new(NullSink);
        let (id, ids) = classic_with_players(&engine, 1);

        assert_eq!(
            engine.participant_score(id, ids[0]).unwrap().unwrap().points,
            0
        );
        engine
            .submit_answer(id, ids[0], 0, BTreeSet::from([0]), Duration::ZERO)
            .unwrap();
        assert_eq!(
            engine.participant_score(id, ids[0]).unwrap().unwrap().points,
            1500
        );
    }
}
