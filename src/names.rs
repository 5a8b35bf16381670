//! Display name validation and generation
//!
//! Participant identity lives outside the engine; what the engine needs
//! is a display name that is safe to broadcast. This module validates
//! caller-provided names (length, emptiness, content filtering) and
//! generates names for anonymous participants who join without one.

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Defines the style of automatically generated display names
///
/// Anonymous participants receive a generated name in one of these
/// styles so they can be addressed on the leaderboard like everyone else.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, garde::Validate)]
pub enum NameStyle {
    /// Roman-style names (praenomen + nomen, optionally + cognomen)
    Roman(#[garde(range(min = 2, max = 3))] usize),
    /// Pet-style names (adjective + animal combinations)
    Petname(#[garde(range(min = 2, max = 3))] usize),
}

impl Default for NameStyle {
    /// Default name style is Petname with 2 words
    fn default() -> Self {
        Self::Petname(2)
    }
}

impl NameStyle {
    /// Generates a random name according to this style
    pub fn get_name(&self) -> String {
        match self {
            Self::Roman(count) => romanname::romanname(romanname::NameConfig {
                praenomen: *count > 2,
            }),
            Self::Petname(count) => loop {
                if let Some(name) = petname::petname(*count as u8, " ") {
                    break name;
                }
            },
        }
        .to_title_case()
    }
}

/// Errors that can occur during display name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The requested name is already in use by another participant
    #[error("name already in-use")]
    Used,
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Validates and cleans a caller-provided display name
///
/// The name is trimmed of surrounding whitespace, bounded in length, and
/// passed through the content filter. Uniqueness within a session is the
/// roster's concern, not this function's.
///
/// # Errors
///
/// * [`Error::TooLong`] - name exceeds the configured maximum length
/// * [`Error::Empty`] - name is empty after trimming whitespace
/// * [`Error::Sinful`] - name contains inappropriate content
pub fn clean(name: &str) -> Result<String, Error> {
    if name.len() > crate::constants::names::MAX_LENGTH {
        return Err(Error::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_clean_accepts_reasonable_names() {
        assert_eq!(clean("Alice").unwrap(), "Alice");
        assert_eq!(clean("  Bob  ").unwrap(), "Bob");
    }

    #[test]
    fn test_clean_rejects_empty() {
        assert_eq!(clean(""), Err(Error::Empty));
        assert_eq!(clean("   "), Err(Error::Empty));
    }

    #[test]
    fn test_clean_rejects_too_long() {
        let long = "a".repeat(crate::constants::names::MAX_LENGTH + 1);
        assert_eq!(clean(&long), Err(Error::TooLong));
    }

    #[test]
    fn test_generated_names_are_non_empty() {
        for style in [NameStyle::Petname(2), NameStyle::Roman(2), NameStyle::Roman(3)] {
            for _ in 0..10 {
                assert!(!style.get_name().is_empty());
            }
        }
    }

    #[test]
    fn test_default_style_is_petname() {
        assert!(matches!(NameStyle::default(), NameStyle::Petname(2)));
    }
}
