//! Elo rating model.
//!
//!   E_a  = 1 / (1 + 10^((R_b − R_a) / 400))
//!   R_a' = R_a + K·(S_a − E_a)
//!   R_b' = R_b + K·((1 − S_a) − (1 − E_a))
//!
//! The update is zero-sum: whatever one side gains the other loses. It must
//! be applied exactly once per settled result; applying it twice double
//! counts the match.

use serde::{Deserialize, Serialize};

use super::params::ModelParams;
use crate::error::{EngineError, EngineResult};

/// Result of a settled match from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl MatchOutcome {
    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Actual score S for the home side.
    pub fn home_score(&self) -> f64 {
        match self {
            MatchOutcome::HomeWin => 1.0,
            MatchOutcome::Draw => 0.5,
            MatchOutcome::AwayWin => 0.0,
        }
    }
}

/// Two-outcome logistic expected score of side A against side B.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / 400.0))
}

fn check_rating(rating: f64) -> EngineResult<f64> {
    if rating.is_finite() {
        Ok(rating)
    } else {
        Err(EngineError::InvalidRating(rating))
    }
}

/// Apply one Elo update given side A's actual score (1.0 / 0.5 / 0.0).
///
/// Returns `(new_rating_a, new_rating_b)`.
pub fn update_with_score(
    rating_a: f64,
    rating_b: f64,
    score_a: f64,
    k_factor: f64,
) -> EngineResult<(f64, f64)> {
    check_rating(rating_a)?;
    check_rating(rating_b)?;
    if score_a != 0.0 && score_a != 0.5 && score_a != 1.0 {
        return Err(EngineError::InvalidScore(score_a));
    }

    let expected_a = expected_score(rating_a, rating_b);
    let expected_b = 1.0 - expected_a;
    let score_b = 1.0 - score_a;

    Ok((
        rating_a + k_factor * (score_a - expected_a),
        rating_b + k_factor * (score_b - expected_b),
    ))
}

/// Post-match update from a final score, using `params.k_factor`.
///
/// Home advantage is not part of the update: ratings move on their base
/// values.
pub fn update_ratings(
    rating_home: f64,
    rating_away: f64,
    home_goals: u32,
    away_goals: u32,
    params: &ModelParams,
) -> EngineResult<(f64, f64)> {
    let outcome = MatchOutcome::from_goals(home_goals, away_goals);
    update_with_score(rating_home, rating_away, outcome.home_score(), params.k_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_equal_ratings_expect_half() {
        for r in [0.0, 1200.0, 1500.0, 2300.5] {
            assert_eq!(expected_score(r, r), 0.5);
        }
    }

    #[test]
    fn test_400_point_gap_is_ten_to_one() {
        let e = expected_score(1900.0, 1500.0);
        assert_relative_eq!(e, 10.0 / 11.0, epsilon = 1e-12);
        assert_relative_eq!(expected_score(1500.0, 1900.0), 1.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_draw_between_equals_changes_nothing() {
        let (h, a) = update_ratings(1500.0, 1500.0, 1, 1, &ModelParams::v2()).unwrap();
        assert_eq!(h, 1500.0);
        assert_eq!(a, 1500.0);
    }

    #[test]
    fn test_win_between_equals_moves_half_k() {
        let (h, a) = update_ratings(1500.0, 1500.0, 2, 0, &ModelParams::v2()).unwrap();
        assert_relative_eq!(h, 1516.0, epsilon = 1e-9);
        assert_relative_eq!(a, 1484.0, epsilon = 1e-9);
    }

    #[test]
    fn test_upset_moves_more_than_expected_win() {
        let params = ModelParams::v2();
        let (fav_win, _) = update_ratings(1700.0, 1500.0, 1, 0, &params).unwrap();
        let (_, dog_win) = update_ratings(1700.0, 1500.0, 0, 1, &params).unwrap();
        assert!(fav_win - 1700.0 < dog_win - 1500.0);
    }

    #[test]
    fn test_update_is_zero_sum() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let ra = rng.gen_range(1000.0..2200.0);
            let rb = rng.gen_range(1000.0..2200.0);
            let score = [0.0, 0.5, 1.0][rng.gen_range(0..3)];
            let (na, nb) = update_with_score(ra, rb, score, 32.0).unwrap();
            assert_relative_eq!(na - ra, -(nb - rb), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_same_inputs_same_delta() {
        let first = update_with_score(1620.0, 1480.0, 0.0, 20.0).unwrap();
        let second = update_with_score(1620.0, 1480.0, 0.0, 20.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_invalid_score() {
        assert_eq!(
            update_with_score(1500.0, 1500.0, 0.7, 32.0),
            Err(EngineError::InvalidScore(0.7))
        );
        assert!(update_with_score(1500.0, 1500.0, -1.0, 32.0).is_err());
    }

    #[test]
    fn test_rejects_non_finite_rating() {
        assert!(matches!(
            update_with_score(f64::NAN, 1500.0, 1.0, 32.0),
            Err(EngineError::InvalidRating(_))
        ));
        assert!(matches!(
            update_ratings(1500.0, f64::INFINITY, 0, 0, &ModelParams::v1()),
            Err(EngineError::InvalidRating(_))
        ));
    }

    #[test]
    fn test_outcome_from_goals() {
        assert_eq!(MatchOutcome::from_goals(3, 1), MatchOutcome::HomeWin);
        assert_eq!(MatchOutcome::from_goals(0, 2), MatchOutcome::AwayWin);
        assert_eq!(MatchOutcome::from_goals(2, 2), MatchOutcome::Draw);
        assert_eq!(MatchOutcome::Draw.home_score(), 0.5);
    }
}
