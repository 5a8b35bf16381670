//! Pure scoring engine
//!
//! Turns a question, a submitted choice set, a response time, and the
//! participant's streak into a point value. The computation has no state
//! beyond its inputs: identical inputs always produce identical output,
//! which keeps disputes reproducible and tests exact.

use std::{collections::BTreeSet, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::question::QuestionConfig;

type ValidationResult = garde::Result;

/// Validates the time bonus multiplier bounds
fn validate_multiplier(val: &f64) -> ValidationResult {
    if (0.0..=crate::constants::scoring::MAX_TIME_BONUS_MULTIPLIER).contains(val) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "time_bonus_multiplier is outside of the bounds [0,{}]",
            crate::constants::scoring::MAX_TIME_BONUS_MULTIPLIER
        )))
    }
}

/// Validates the elimination fraction bounds
fn validate_fraction(val: &f64) -> ValidationResult {
    if (crate::constants::elimination::MIN_FRACTION..=crate::constants::elimination::MAX_FRACTION)
        .contains(val)
    {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "elimination_fraction is outside of the bounds [{},{}]",
            crate::constants::elimination::MIN_FRACTION,
            crate::constants::elimination::MAX_FRACTION
        )))
    }
}

/// Scoring parameters for a session
///
/// Supplied by the surrounding application at session creation and
/// treated as opaque input by everything except the scoring engine and
/// the elimination controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct ScoringConfig {
    /// Points awarded for a correct answer before bonuses, unless the
    /// question overrides it
    #[garde(range(min = 1))]
    pub base_points: u64,
    /// Scales the speed bonus: a correct answer at t=0 earns
    /// `base × multiplier` extra, decaying linearly to 0 at the limit
    #[garde(custom(|v, _| validate_multiplier(v)))]
    pub time_bonus_multiplier: f64,
    /// Flat bonus per consecutive previously-credited answer; 0 disables
    /// streak bonuses entirely
    #[garde(range(max = crate::constants::scoring::MAX_STREAK_BONUS_POINTS))]
    pub streak_bonus_points: u64,
    /// Enables proportional partial credit for every multi-select
    /// question; individual questions can also opt in selectively
    #[garde(skip)]
    pub partial_credit: bool,
    /// Share of active participants removed per battle royale round
    #[garde(custom(|v, _| validate_fraction(v)))]
    pub elimination_fraction: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_points: crate::constants::scoring::DEFAULT_BASE_POINTS,
            time_bonus_multiplier: crate::constants::scoring::DEFAULT_TIME_BONUS_MULTIPLIER,
            streak_bonus_points: crate::constants::scoring::DEFAULT_STREAK_BONUS_POINTS,
            partial_credit: false,
            elimination_fraction: crate::constants::elimination::DEFAULT_FRACTION,
        }
    }
}

/// The outcome of scoring one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Points awarded, already rounded, never negative
    pub points: u64,
    /// Whether the answer earned any credit (extends the streak)
    pub credited: bool,
}

/// Returns the credit fraction in `[0, 1]` earned by a submission
///
/// Single-answer questions are all-or-nothing. Multi-select questions
/// are all-or-nothing too unless partial credit applies, in which case a
/// strict subset of the correct choices earns `|S ∩ C| / |C|` — and any
/// incorrect pick zeroes the question outright.
fn credit_fraction(
    question: &QuestionConfig,
    config: &ScoringConfig,
    submitted: &BTreeSet<usize>,
) -> f64 {
    if submitted == question.correct() {
        return 1.0;
    }
    if !question.is_multi_select() {
        return 0.0;
    }
    let partial = question.partial_credit() || config.partial_credit;
    if partial && !submitted.is_empty() && submitted.is_subset(question.correct()) {
        submitted.len() as f64 / question.correct().len() as f64
    } else {
        0.0
    }
}

/// Scores one submission
///
/// Implements the scoring rules shared by all three competition modes:
///
/// 1. Correctness produces a credit fraction (see [`credit_fraction`]).
/// 2. No credit scores 0; the caller resets the streak.
/// 3. With credit, the base award is `base_points × credit`, plus a time
///    bonus of `base × multiplier × (1 − t/L)` floored at 0 so answers at
///    the deadline earn nothing beyond base.
/// 4. A flat streak bonus of `streak_bonus_points × streak` is added,
///    where `streak` counts the consecutive immediately-preceding
///    credited answers in this session.
/// 5. The final score is rounded and never negative.
pub fn score_answer(
    question: &QuestionConfig,
    config: &ScoringConfig,
    submitted: &BTreeSet<usize>,
    response_time: Duration,
    streak: u32,
) -> Verdict {
    let credit = credit_fraction(question, config, submitted);
    if credit <= 0.0 {
        return Verdict {
            points: 0,
            credited: false,
        };
    }

    let base = question.base_points_or(config.base_points) as f64 * credit;

    let remaining =
        1.0 - response_time.as_secs_f64() / question.time_limit().as_secs_f64();
    let time_bonus = base * config.time_bonus_multiplier * remaining.clamp(0.0, 1.0);

    let streak_bonus = (config.streak_bonus_points * u64::from(streak)) as f64;

    Verdict {
        points: (base + time_bonus + streak_bonus).round() as u64,
        credited: true,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::question::QuestionConfig;

    fn single_answer_question() -> QuestionConfig {
        QuestionConfig::new(
            "Capital of France?",
            vec!["Paris".to_owned(), "Lyon".to_owned(), "Nice".to_owned()],
            BTreeSet::from([0]),
            Duration::from_secs(30),
        )
    }

    fn multi_select_question() -> QuestionConfig {
        QuestionConfig::new(
            "Which are primary colors?",
            vec![
                "Red".to_owned(),
                "Green".to_owned(),
                "Blue".to_owned(),
                "Yellow".to_owned(),
            ],
            BTreeSet::from([0, 2, 3]),
            Duration::from_secs(30),
        )
    }

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.time_bonus_multiplier = -0.5;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.elimination_fraction = 0.99;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_correct_at_zero_earns_maximum() {
        let verdict = score_answer(
            &single_answer_question(),
            &config(),
            &BTreeSet::from([0]),
            Duration::ZERO,
            0,
        );
        // base 1000 + full time bonus 1000 × 0.5
        assert_eq!(verdict.points, 1500);
        assert!(verdict.credited);
    }

    #[test]
    fn test_midpoint_answer_earns_half_the_bonus() {
        // base 1000, limit 30s, multiplier 0.5, answered at t=15
        let verdict = score_answer(
            &single_answer_question(),
            &config(),
            &BTreeSet::from([0]),
            Duration::from_secs(15),
            0,
        );
        assert_eq!(verdict.points, 1250);
    }

    #[test]
    fn test_answer_at_deadline_earns_base_only() {
        let verdict = score_answer(
            &single_answer_question(),
            &config(),
            &BTreeSet::from([0]),
            Duration::from_secs(30),
            0,
        );
        assert_eq!(verdict.points, 1000);
    }

    #[test]
    fn test_incorrect_scores_zero() {
        let verdict = score_answer(
            &single_answer_question(),
            &config(),
            &BTreeSet::from([1]),
            Duration::ZERO,
            5,
        );
        assert_eq!(verdict.points, 0);
        assert!(!verdict.credited);
    }

    #[test]
    fn test_multi_select_requires_exact_match_without_partial_credit() {
        let question = multi_select_question();
        let exact = score_answer(
            &question,
            &config(),
            &BTreeSet::from([0, 2, 3]),
            Duration::from_secs(30),
            0,
        );
        assert_eq!(exact.points, 1000);

        let subset = score_answer(
            &question,
            &config(),
            &BTreeSet::from([0, 2]),
            Duration::from_secs(30),
            0,
        );
        assert_eq!(subset.points, 0);
    }

    #[test]
    fn test_partial_credit_scales_with_subset_size() {
        let question = multi_select_question().with_partial_credit();
        let verdict = score_answer(
            &question,
            &config(),
            &BTreeSet::from([0, 2]),
            Duration::from_secs(30),
            0,
        );
        // 1000 × 2/3 at the deadline, rounded
        assert_eq!(verdict.points, 667);
        assert!(verdict.credited);
    }

    #[test]
    fn test_partial_credit_zeroes_on_any_wrong_pick() {
        let question = multi_select_question().with_partial_credit();
        let verdict = score_answer(
            &question,
            &config(),
            &BTreeSet::from([0, 1]),
            Duration::ZERO,
            0,
        );
        assert_eq!(verdict.points, 0);
        assert!(!verdict.credited);
    }

    #[test]
    fn test_partial_credit_enabled_session_wide() {
        let mut session_config = config();
        session_config.partial_credit = true;

        let verdict = score_answer(
            &multi_select_question(),
            &session_config,
            &BTreeSet::from([3]),
            Duration::from_secs(30),
            0,
        );
        assert_eq!(verdict.points, 333);
    }

    #[test]
    fn test_streak_bonus_is_flat_per_preceding_answer() {
        let mut session_config = config();
        session_config.streak_bonus_points = 100;

        let verdict = score_answer(
            &single_answer_question(),
            &session_config,
            &BTreeSet::from([0]),
            Duration::from_secs(30),
            3,
        );
        assert_eq!(verdict.points, 1300);
    }

    #[test]
    fn test_question_base_points_override() {
        let question = single_answer_question().with_base_points(500);
        let verdict = score_answer(
            &question,
            &config(),
            &BTreeSet::from([0]),
            Duration::from_secs(30),
            0,
        );
        assert_eq!(verdict.points, 500);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let question = multi_select_question().with_partial_credit();
        let submitted = BTreeSet::from([0, 2]);
        let first = score_answer(&question, &config(), &submitted, Duration::from_secs(7), 2);
        let second = score_answer(&question, &config(), &submitted, Duration::from_secs(7), 2);
        assert_eq!(first, second);
    }
}
