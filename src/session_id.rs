//! Session join code generation
//!
//! Sessions are identified by short numeric codes that participants type
//! in to join. Codes are displayed in octal so every code is a 5-digit
//! string drawn from the digits 0-7, which keeps them easy to read out
//! loud and rules out confusable decimal forms.

use std::{fmt::Display, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum value for generated session codes (octal 10000)
const MIN_VALUE: u16 = 0o10_000;
/// Maximum value for generated session codes (octal 100000, exclusive)
const MAX_VALUE: u16 = 0o100_000;

/// A unique join code for a live session
///
/// Codes are generated randomly within a range that always renders as a
/// 5-digit octal string. The engine retries generation on collision, so a
/// code uniquely identifies one live session at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u16);

impl SessionId {
    /// Creates a new random session code
    pub fn new() -> Self {
        Self(fastrand::u16(MIN_VALUE..MAX_VALUE))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    /// Formats the code as a 5-digit octal number
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:05o}", self.0)
    }
}

impl Serialize for SessionId {
    /// Serializes the code as its octal string form
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    /// Deserializes a code from its octal string form
    fn deserialize<D>(deserializer: D) -> Result<SessionId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SessionId::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

impl FromStr for SessionId {
    type Err = ParseIntError;

    /// Parses a session code from an octal string
    ///
    /// # Errors
    ///
    /// Returns a `ParseIntError` if the string is not a valid octal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u16::from_str_radix(s, 8)?))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_new_in_range() {
        for _ in 0..100 {
            let id = SessionId::new();
            assert!(id.0 >= MIN_VALUE);
            assert!(id.0 < MAX_VALUE);
        }
    }

    #[test]
    fn test_session_id_display_format() {
        assert_eq!(SessionId(MIN_VALUE).to_string(), "10000");
        assert_eq!(SessionId(0o12345).to_string(), "12345");
        assert_eq!(SessionId(MAX_VALUE - 1).to_string(), "77777");
    }

    #[test]
    fn test_session_id_from_str() {
        assert_eq!(SessionId::from_str("10000").unwrap(), SessionId(MIN_VALUE));
        assert_eq!(SessionId::from_str("12345").unwrap(), SessionId(0o12345));
    }

    #[test]
    fn test_session_id_from_str_invalid() {
        assert!(SessionId::from_str("invalid").is_err());
        assert!(SessionId::from_str("888").is_err()); // invalid octal digit
        assert!(SessionId::from_str("").is_err());
    }

    #[test]
    fn test_session_id_serde_round_trip() {
        let id = SessionId(0o54321);
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, "\"54321\"");

        let deserialized: SessionId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn test_session_id_deserialization_rejects_numbers() {
        let result: Result<SessionId, _> = serde_json::from_str("123");
        assert!(result.is_err());
    }
}
