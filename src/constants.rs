//! Configuration constants for the quiz arena engine
//!
//! This module contains the numeric limits and defaults used throughout
//! the engine to bound configuration values and provide consistent
//! behavior across the different competition modes.

/// Session-level configuration constants
pub mod session {
    /// Maximum number of participants allowed in a single session
    pub const MAX_PARTICIPANTS: usize = 1000;
    /// Maximum number of questions allowed in a single quiz
    pub const MAX_QUESTIONS: usize = 100;
    /// Maximum length of a quiz title in characters
    pub const MAX_TITLE_LENGTH: usize = 200;
    /// Minimum participants required to start a classic session
    pub const MIN_PARTICIPANTS_CLASSIC: usize = 1;
    /// Minimum participants required to start a battle royale or tournament session
    pub const MIN_PARTICIPANTS_COMPETITIVE: usize = 4;
}

/// Question configuration constants
pub mod question {
    /// Maximum length of a question prompt in characters
    pub const MAX_PROMPT_LENGTH: usize = 200;
    /// Maximum length of a single choice label in characters
    pub const MAX_CHOICE_LENGTH: usize = 200;
    /// Maximum number of choices per question
    pub const MAX_CHOICE_COUNT: usize = 8;
    /// Minimum time limit in seconds for answering a question
    pub const MIN_TIME_LIMIT: u64 = 5;
    /// Maximum time limit in seconds for answering a question
    pub const MAX_TIME_LIMIT: u64 = 240;
}

/// Scoring configuration constants
pub mod scoring {
    /// Default base points awarded for a correct answer
    pub const DEFAULT_BASE_POINTS: u64 = 1000;
    /// Default multiplier applied to the speed-based bonus
    pub const DEFAULT_TIME_BONUS_MULTIPLIER: f64 = 0.5;
    /// Largest accepted time bonus multiplier
    pub const MAX_TIME_BONUS_MULTIPLIER: f64 = 2.0;
    /// Default flat bonus per consecutive correct answer (0 disables streaks)
    pub const DEFAULT_STREAK_BONUS_POINTS: u64 = 0;
    /// Largest accepted streak bonus per consecutive correct answer
    pub const MAX_STREAK_BONUS_POINTS: u64 = 500;
}

/// Battle royale elimination constants
pub mod elimination {
    /// Default share of active participants removed per elimination round
    pub const DEFAULT_FRACTION: f64 = 0.25;
    /// Smallest accepted elimination fraction
    pub const MIN_FRACTION: f64 = 0.05;
    /// Largest accepted elimination fraction
    pub const MAX_FRACTION: f64 = 0.9;
}

/// Display name constants
pub mod names {
    /// Maximum length of a participant display name in characters
    pub const MAX_LENGTH: usize = 30;
}

/// Leaderboard display constants
pub mod leaderboard {
    /// Maximum number of entries included in broadcast standings
    pub const DISPLAY_LIMIT: usize = 50;
}
