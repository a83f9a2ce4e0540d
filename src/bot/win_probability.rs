//! Pre-match 3-way (home / draw / away) probability estimation.
//!
//! Pipeline:
//! 1. **Adjusted ratings**: base Elo + home advantage (home side only)
//!    + form + capped goal difference.
//! 2. **Two-way strength**: logistic expected score between the adjusted
//!    ratings.
//! 3. **Three-way split**: draw mass peaks when the sides are level and
//!    shrinks as the expected score moves away from 0.5; the rest is split
//!    home/away in proportion to the two-way expected scores.
//! 4. **Calibration**: shrink toward the de-vigged market and clamp (see
//!    `super::calibration`).
//!
//! Every step is a pure function of its arguments: calling the estimator
//! twice with the same inputs yields the same triple.

use serde::{Deserialize, Serialize};

use super::calibration::calibrate;
use super::odds::ProbabilityTriple;
use super::params::ModelParams;
use super::rating::expected_score;
use crate::error::{EngineError, EngineResult};

/// Situational inputs for one match. Absent values are 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchAdjustments {
    /// Recent form, expected in [-1, 1].
    pub home_form: f64,
    pub away_form: f64,
    /// Season goal difference; clamped to ±`goal_diff_cap` before weighting.
    pub home_goal_diff: f64,
    pub away_goal_diff: f64,
}

impl MatchAdjustments {
    pub fn validate(&self) -> EngineResult<()> {
        for (field, value) in [("home_form", self.home_form), ("away_form", self.away_form)] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidAdjustment { field, value });
            }
        }
        for (field, value) in [
            ("home_goal_diff", self.home_goal_diff),
            ("away_goal_diff", self.away_goal_diff),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidAdjustment { field, value });
            }
        }
        Ok(())
    }
}

/// Everything the estimator computed for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub adjusted_home: f64,
    pub adjusted_away: f64,
    /// Two-way expected score of the home side on adjusted ratings.
    pub expected_home: f64,
    /// Uncalibrated 3-way model output.
    pub model: ProbabilityTriple,
    /// Model shrunk toward the market and clamped.
    pub calibrated: ProbabilityTriple,
    /// De-vigged market view, untouched.
    pub market: ProbabilityTriple,
}

// ── Adjusted ratings ─────────────────────────────────────────────────────────

fn side_adjustment(form: f64, goal_diff: f64, params: &ModelParams) -> f64 {
    let gd = goal_diff.clamp(-params.goal_diff_cap, params.goal_diff_cap);
    params.form_elo_per_unit * form + params.goal_diff_elo_per_goal * gd
}

/// Returns `(adjusted_home, adjusted_away)`.
pub fn adjusted_ratings(
    rating_home: f64,
    rating_away: f64,
    adj: &MatchAdjustments,
    params: &ModelParams,
) -> (f64, f64) {
    let home = rating_home
        + params.home_advantage.elo_points()
        + side_adjustment(adj.home_form, adj.home_goal_diff, params);
    let away = rating_away + side_adjustment(adj.away_form, adj.away_goal_diff, params);
    (home, away)
}

// ── Three-way split ──────────────────────────────────────────────────────────

/// Draw probability for a given two-way expected score.
///
/// `draw_base` at e = 0.5, reduced by `draw_decay` per unit of |e − 0.5|.
pub fn draw_probability(expected_home: f64, params: &ModelParams) -> f64 {
    let gap = (expected_home - 0.5).abs();
    (params.draw_base * (1.0 - params.draw_decay * gap)).max(0.0)
}

/// Split a two-way expected score into home / draw / away. Sums to 1.
pub fn three_way_split(expected_home: f64, params: &ModelParams) -> ProbabilityTriple {
    let draw = draw_probability(expected_home, params).min(1.0);
    let remaining = 1.0 - draw;
    ProbabilityTriple::new(
        remaining * expected_home,
        draw,
        remaining * (1.0 - expected_home),
    )
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Estimate calibrated home / draw / away probabilities for one match.
///
/// `market` is the de-vigged triple from `convert_odds` and is passed
/// through unchanged in the result for edge computation.
pub fn estimate_probabilities(
    rating_home: f64,
    rating_away: f64,
    adj: &MatchAdjustments,
    market: &ProbabilityTriple,
    params: &ModelParams,
) -> EngineResult<Estimate> {
    for rating in [rating_home, rating_away] {
        if !rating.is_finite() {
            return Err(EngineError::InvalidRating(rating));
        }
    }
    adj.validate()?;

    let (adjusted_home, adjusted_away) = adjusted_ratings(rating_home, rating_away, adj, params);
    let expected_home = expected_score(adjusted_home, adjusted_away);
    let model = three_way_split(expected_home, params);
    let calibrated = calibrate(&model, market, params);

    Ok(Estimate {
        adjusted_home,
        adjusted_away,
        expected_home,
        model,
        calibrated,
        market: *market,
    })
}
