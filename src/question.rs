//! Quiz and question configuration
//!
//! A quiz is an ordered list of questions, each carrying its choices,
//! correct-choice set, time limit, and point value. Configurations are
//! validated up front and immutable once a session starts; all runtime
//! answer state lives in the session, not here.

use std::{collections::BTreeSet, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::Error;

type ValidationResult = garde::Result;

/// Validates that a duration falls within specified bounds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    field: &'static str,
    val: &Duration,
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "{field} is outside of the bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates the time limit for answering a question
fn validate_time_limit(val: &Duration) -> ValidationResult {
    validate_duration::<
        { crate::constants::question::MIN_TIME_LIMIT },
        { crate::constants::question::MAX_TIME_LIMIT },
    >("time_limit", val)
}

/// Validates that a question declares at least one correct choice
fn validate_correct_set(val: &BTreeSet<usize>) -> ValidationResult {
    if val.is_empty() {
        Err(garde::Error::new("correct choice set cannot be empty"))
    } else {
        Ok(())
    }
}

/// Configuration for a single question
///
/// Questions are identified by their ordered position within the quiz.
/// A question with one correct choice is single-answer; with several it
/// is multi-select, optionally scored with partial credit.
#[serde_with::serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionConfig {
    /// The prompt displayed to participants
    #[garde(length(max = crate::constants::question::MAX_PROMPT_LENGTH))]
    prompt: String,
    /// The available choices, in display order
    #[garde(
        length(min = 1, max = crate::constants::question::MAX_CHOICE_COUNT),
        inner(length(max = crate::constants::question::MAX_CHOICE_LENGTH))
    )]
    choices: Vec<String>,
    /// Indices into `choices` that are correct
    #[garde(custom(|v, _| validate_correct_set(v)))]
    correct: BTreeSet<usize>,
    /// Time participants have to answer once the question is displayed
    #[garde(custom(|v, _| validate_time_limit(v)))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    time_limit: Duration,
    /// Base points for a correct answer; falls back to the session default
    #[garde(skip)]
    base_points: Option<u64>,
    /// Whether multi-select answers earn proportional partial credit
    #[garde(skip)]
    partial_credit: bool,
}

impl QuestionConfig {
    /// Creates a question with the given prompt, choices, and correct set
    pub fn new(
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct: BTreeSet<usize>,
        time_limit: Duration,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            choices,
            correct,
            time_limit,
            base_points: None,
            partial_credit: false,
        }
    }

    /// Overrides the session's default base points for this question
    #[must_use]
    pub fn with_base_points(mut self, base_points: u64) -> Self {
        self.base_points = Some(base_points);
        self
    }

    /// Enables proportional partial credit for multi-select answers
    #[must_use]
    pub fn with_partial_credit(mut self) -> Self {
        self.partial_credit = true;
        self
    }

    /// Returns the prompt text
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the choices in display order
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Returns the set of correct choice indices
    pub fn correct(&self) -> &BTreeSet<usize> {
        &self.correct
    }

    /// Returns the answer time limit
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Returns the base points, falling back to the given default
    pub fn base_points_or(&self, default: u64) -> u64 {
        self.base_points.unwrap_or(default)
    }

    /// Returns whether more than one choice is correct
    pub fn is_multi_select(&self) -> bool {
        self.correct.len() > 1
    }

    /// Returns whether partial credit applies to multi-select answers
    pub fn partial_credit(&self) -> bool {
        self.partial_credit
    }

    /// Checks that every correct index refers to an existing choice
    ///
    /// Index consistency spans two fields, which is out of reach for the
    /// per-field derive validation, so it runs as a separate check when a
    /// session is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidChoice`] if the correct set is empty or
    /// references an out-of-range choice.
    pub fn check_choice_indices(&self) -> Result<(), Error> {
        if self.correct.is_empty() || self.correct.iter().any(|&i| i >= self.choices.len()) {
            return Err(Error::InvalidChoice);
        }
        Ok(())
    }
}

/// A complete quiz: a title and an ordered question sequence
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// The quiz title, shown on the waiting screen
    #[garde(length(max = crate::constants::session::MAX_TITLE_LENGTH))]
    title: String,
    /// The ordered questions presented during the session
    #[garde(length(max = crate::constants::session::MAX_QUESTIONS), dive)]
    questions: Vec<QuestionConfig>,
}

impl Quiz {
    /// Creates a quiz from a title and question list
    pub fn new(title: impl Into<String>, questions: Vec<QuestionConfig>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }

    /// Returns the quiz title
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the number of questions
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns whether the quiz has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at the given position, if any
    pub fn question(&self, index: usize) -> Option<&QuestionConfig> {
        self.questions.get(index)
    }

    /// Validates the quiz bounds and every question's internal consistency
    ///
    /// # Errors
    ///
    /// * [`Error::EmptyQuiz`] - the quiz has no questions
    /// * [`Error::InvalidChoice`] - a question's correct set is
    ///   inconsistent with its choices
    pub fn check(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::EmptyQuiz);
        }
        for question in &self.questions {
            question.check_choice_indices()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sample_question() -> QuestionConfig {
        QuestionConfig::new(
            "Which planet is closest to the sun?",
            vec![
                "Mercury".to_owned(),
                "Venus".to_owned(),
                "Mars".to_owned(),
            ],
            BTreeSet::from([0]),
            Duration::from_secs(30),
        )
    }

    #[test]
    fn test_question_validation_accepts_sample() {
        assert!(sample_question().validate().is_ok());
    }

    #[test]
    fn test_question_rejects_long_prompt() {
        let mut question = sample_question();
        question.prompt = "a".repeat(crate::constants::question::MAX_PROMPT_LENGTH + 1);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_question_rejects_empty_choices() {
        let mut question = sample_question();
        question.choices = vec![];
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_question_rejects_empty_correct_set() {
        let mut question = sample_question();
        question.correct = BTreeSet::new();
        assert!(question.validate().is_err());
        assert_eq!(question.check_choice_indices(), Err(Error::InvalidChoice));
    }

    #[test]
    fn test_question_rejects_time_limit_out_of_bounds() {
        let mut question = sample_question();
        question.time_limit =
            Duration::from_secs(crate::constants::question::MIN_TIME_LIMIT - 1);
        assert!(question.validate().is_err());

        question.time_limit =
            Duration::from_secs(crate::constants::question::MAX_TIME_LIMIT + 1);
        assert!(question.validate().is_err());
    }

    #[test]
    fn test_check_choice_indices_rejects_out_of_range() {
        let mut question = sample_question();
        question.correct = BTreeSet::from([7]);
        assert_eq!(question.check_choice_indices(), Err(Error::InvalidChoice));
    }

    #[test]
    fn test_multi_select_detection() {
        let mut question = sample_question();
        assert!(!question.is_multi_select());

        question.correct = BTreeSet::from([0, 1]);
        assert!(question.is_multi_select());
    }

    #[test]
    fn test_base_points_fallback() {
        let question = sample_question();
        assert_eq!(question.base_points_or(1000), 1000);

        let question = question.with_base_points(750);
        assert_eq!(question.base_points_or(1000), 750);
    }

    #[test]
    fn test_quiz_check_rejects_empty() {
        let quiz = Quiz::new("Empty", vec![]);
        assert_eq!(quiz.check(), Err(Error::EmptyQuiz));
    }

    #[test]
    fn test_quiz_len_and_question_lookup() {
        let quiz = Quiz::new("Planets", vec![sample_question()]);
        assert_eq!(quiz.len(), 1);
        assert!(!quiz.is_empty());
        assert!(quiz.question(0).is_some());
        assert!(quiz.question(1).is_none());
        assert!(quiz.check().is_ok());
    }

    #[test]
    fn test_quiz_serde_round_trip_keeps_duration_millis() {
        let quiz = Quiz::new("Planets", vec![sample_question()]);
        let serialized = serde_json::to_string(&quiz).unwrap();
        assert!(serialized.contains("30000"));

        let restored: Quiz = serde_json::from_str(&serialized).unwrap();
        assert_eq!(restored.question(0).unwrap().time_limit(), Duration::from_secs(30));
    }
}
