//! Participant records and the per-session roster
//!
//! This module tracks everyone competing in a session: their display
//! name, join order, cumulative score, answer streak, and whether they
//! are still standing. Participants are never removed once they join;
//! elimination is a status flag so final rankings stay intact.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    str::FromStr,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;
use web_time::SystemTime;

use crate::{error::Error, names, names::NameStyle};

/// A unique identifier for a participant
///
/// Identifiers are issued when a participant joins and persist for the
/// lifetime of the session, across eliminations and reconnects.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Creates a new random participant identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ParticipantId {
    type Err = uuid::Error;

    /// Parses an identifier from a UUID string
    ///
    /// # Errors
    ///
    /// Returns a `uuid::Error` if the string is not a valid UUID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Whether a participant is still competing
///
/// This is the discriminant of [`Status`] without associated data, used
/// for filtering the roster by activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum ActivityStatus {
    /// Still competing
    Active,
    /// Removed from competition by an elimination round
    Eliminated,
}

/// The competitive status of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Still competing
    Active,
    /// Removed from competition, with the round and final placement recorded
    Eliminated {
        /// The elimination round in which the participant was removed
        round: u32,
        /// Final placement, 1-indexed from the winner down
        final_position: usize,
    },
}

impl Status {
    /// Returns the activity discriminant of this status
    pub fn kind(&self) -> ActivityStatus {
        match self {
            Status::Active => ActivityStatus::Active,
            Status::Eliminated { .. } => ActivityStatus::Eliminated,
        }
    }
}

/// One entrant in a session
///
/// Created on join and mutated only by scoring and elimination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Display name broadcast on leaderboards
    name: String,
    /// Avatar reference supplied by the identity collaborator, read-only
    avatar: Option<String>,
    /// Explicit join order, the deterministic tie-break key for ranking
    join_seq: u64,
    /// Wall-clock join time
    joined_at: SystemTime,
    /// Cumulative points across all scored answers
    score: u64,
    /// Count of consecutive answers that earned credit
    streak: u32,
    /// Whether the participant is still competing
    status: Status,
}

impl Participant {
    /// Returns the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the avatar reference, if the collaborator supplied one
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Returns the join sequence number
    pub fn join_seq(&self) -> u64 {
        self.join_seq
    }

    /// Returns the wall-clock join time
    pub fn joined_at(&self) -> SystemTime {
        self.joined_at
    }

    /// Returns the cumulative score
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Returns the current streak of consecutive credited answers
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Returns the competitive status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns whether the participant is still competing
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }
}

/// Serialization helper for the roster
#[derive(Deserialize)]
struct RosterSerde {
    mapping: HashMap<ParticipantId, Participant>,
    next_join_seq: u64,
    capacity: usize,
}

/// The set of participants in one session
///
/// Maintains the primary participant mapping plus a reverse mapping by
/// activity status for efficient filtering, and enforces the session's
/// capacity bound and display-name uniqueness.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "RosterSerde")]
pub struct Roster {
    /// Primary mapping from participant id to their record
    mapping: HashMap<ParticipantId, Participant>,
    /// Next join sequence number to issue
    next_join_seq: u64,
    /// Maximum number of participants accepted
    capacity: usize,

    /// Reverse mapping by activity status (rebuilt on deserialize)
    #[serde(skip_serializing)]
    reverse_mapping: EnumMap<ActivityStatus, HashSet<ParticipantId>>,
    /// Names already taken in this session (rebuilt on deserialize)
    #[serde(skip_serializing)]
    existing_names: HashSet<String>,
}

impl From<RosterSerde> for Roster {
    /// Reconstructs the roster from serialized data
    ///
    /// Rebuilds the reverse mapping and the taken-name set from the
    /// primary mapping, since neither cache is serialized.
    fn from(serde: RosterSerde) -> Self {
        let RosterSerde {
            mapping,
            next_join_seq,
            capacity,
        } = serde;
        let mut reverse_mapping: EnumMap<ActivityStatus, HashSet<ParticipantId>> =
            EnumMap::default();
        let mut existing_names = HashSet::new();
        for (id, participant) in &mapping {
            reverse_mapping[participant.status.kind()].insert(*id);
            existing_names.insert(participant.name.clone());
        }
        Self {
            mapping,
            next_join_seq,
            capacity,
            reverse_mapping,
            existing_names,
        }
    }
}

impl Roster {
    /// Creates an empty roster with the given capacity bound
    pub fn new(capacity: usize) -> Self {
        Self {
            mapping: HashMap::new(),
            next_join_seq: 0,
            capacity,
            reverse_mapping: EnumMap::default(),
            existing_names: HashSet::new(),
        }
    }

    /// Adds a participant to the roster
    ///
    /// A caller-provided name is cleaned and checked for uniqueness; an
    /// anonymous join (no name) receives a generated name in the given
    /// style, retried until it does not collide.
    ///
    /// # Errors
    ///
    /// * [`Error::SessionFull`] - the capacity bound has been reached
    /// * [`Error::Name`] - the provided name is invalid or already taken
    pub fn join(
        &mut self,
        name: Option<&str>,
        avatar: Option<String>,
        style: NameStyle,
    ) -> Result<ParticipantId, Error> {
        if self.mapping.len() >= self.capacity {
            return Err(Error::SessionFull);
        }

        let name = match name {
            Some(name) => {
                let name = names::clean(name)?;
                if !self.existing_names.insert(name.clone()) {
                    return Err(Error::Name(names::Error::Used));
                }
                name
            }
            None => loop {
                let name = style.get_name();
                if self.existing_names.insert(name.clone()) {
                    break name;
                }
            },
        };

        let id = ParticipantId::new();
        let join_seq = self.next_join_seq;
        self.next_join_seq += 1;

        self.mapping.insert(
            id,
            Participant {
                name,
                avatar,
                join_seq,
                joined_at: SystemTime::now(),
                score: 0,
                streak: 0,
                status: Status::Active,
            },
        );
        self.reverse_mapping[ActivityStatus::Active].insert(id);

        Ok(id)
    }

    /// Returns the participant with the given id, if any
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.mapping.get(&id)
    }

    /// Returns the total number of participants, active or not
    pub fn count(&self) -> usize {
        self.mapping.len()
    }

    /// Returns the number of participants still competing
    pub fn active_count(&self) -> usize {
        self.reverse_mapping[ActivityStatus::Active].len()
    }

    /// Returns the ids of participants still competing
    pub fn active_ids(&self) -> Vec<ParticipantId> {
        self.reverse_mapping[ActivityStatus::Active]
            .iter()
            .copied()
            .collect_vec()
    }

    /// Returns all participants ordered by join sequence
    pub fn in_join_order(&self) -> Vec<(ParticipantId, &Participant)> {
        self.mapping
            .iter()
            .map(|(id, p)| (*id, p))
            .sorted_by_key(|(_, p)| p.join_seq)
            .collect_vec()
    }

    /// Iterates over every participant with their id
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &Participant)> {
        self.mapping.iter().map(|(id, p)| (*id, p))
    }

    /// Records the outcome of a scored answer on the participant
    ///
    /// Adds the awarded points to the cumulative score and extends or
    /// resets the streak depending on whether the answer earned credit.
    pub fn record_outcome(&mut self, id: ParticipantId, credited: bool, points: u64) {
        if let Some(participant) = self.mapping.get_mut(&id) {
            participant.score += points;
            participant.streak = if credited { participant.streak + 1 } else { 0 };
        }
    }

    /// Marks a participant as eliminated
    ///
    /// Records the elimination round and the participant's final
    /// placement. A participant who is already eliminated keeps their
    /// original record; elimination is applied at most once.
    pub fn eliminate(&mut self, id: ParticipantId, round: u32, final_position: usize) {
        if let Some(participant) = self.mapping.get_mut(&id) {
            if participant.is_active() {
                participant.status = Status::Eliminated {
                    round,
                    final_position,
                };
                self.reverse_mapping[ActivityStatus::Active].remove(&id);
                self.reverse_mapping[ActivityStatus::Eliminated].insert(id);
            }
        }
    }
}
