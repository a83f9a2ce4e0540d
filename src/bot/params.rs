//! Model and staking parameters.
//!
//! A `ModelParams` value is built once per invocation (see `crate::config`)
//! and passed by reference into every core function. Nothing in the core
//! reads a process-wide default.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Elo scale used when a home advantage is expressed as a share of the
/// logistic scale rather than as raw rating points.
const ELO_SCALE: f64 = 400.0;

/// How the home side's rating boost is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HomeAdvantage {
    /// Flat additive boost in Elo points.
    Elo(f64),
    /// Fraction of the 400-point Elo scale (0.15 → 60 points).
    RatingShare(f64),
}

impl HomeAdvantage {
    pub fn elo_points(&self) -> f64 {
        match *self {
            HomeAdvantage::Elo(points) => points,
            HomeAdvantage::RatingShare(share) => share * ELO_SCALE,
        }
    }
}

/// Named parameter sets. The two documented revisions disagree on production
/// defaults, so both are kept and the caller picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// First revision: half Kelly, 2.5% edge threshold, no market shrinkage.
    V1,
    /// Second revision: quarter Kelly, 5% edge threshold, 40% market shrinkage.
    V2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub home_advantage: HomeAdvantage,
    /// Elo K-factor applied to each settled result.
    pub k_factor: f64,
    /// Rating assigned to a team the store has never seen.
    pub initial_rating: f64,
    /// Fractional Kelly multiplier (0.25 = quarter Kelly).
    pub kelly_fraction: f64,
    /// Hard cap on any single stake, percent of bankroll.
    pub max_stake_percent: f64,
    /// Stake used in flat mode, percent of bankroll.
    pub flat_stake_percent: f64,
    pub use_flat_staking: bool,
    /// Weight α of the market probability in the calibrated blend.
    pub market_shrink: f64,
    /// Lower clamp for calibrated probabilities, percent.
    pub min_probability: f64,
    /// Upper clamp for calibrated probabilities, percent.
    pub max_probability: f64,
    /// Minimum edge (percentage points) for a bet.
    pub edge_threshold: f64,
    /// Redistribute clamped mass so the calibrated triple sums to 1.
    pub renormalize_after_clamp: bool,
    /// Draw probability between two identically rated sides.
    pub draw_base: f64,
    /// Relative draw reduction per unit of |expected score − 0.5|.
    pub draw_decay: f64,
    /// Elo points per unit of form (0.1 form ≈ 10 points).
    pub form_elo_per_unit: f64,
    /// Elo points per goal of goal difference.
    pub goal_diff_elo_per_goal: f64,
    /// Goal difference is clamped to ±this many goals before weighting.
    pub goal_diff_cap: f64,
}

impl ModelParams {
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::V1 => Self::v1(),
            Preset::V2 => Self::v2(),
        }
    }

    pub fn v1() -> Self {
        ModelParams {
            home_advantage: HomeAdvantage::RatingShare(0.15),
            k_factor: 32.0,
            initial_rating: 1500.0,
            kelly_fraction: 0.5,
            max_stake_percent: 25.0,
            flat_stake_percent: 1.5,
            use_flat_staking: false,
            market_shrink: 0.0,
            min_probability: 5.0,
            max_probability: 85.0,
            edge_threshold: 2.5,
            renormalize_after_clamp: false,
            draw_base: 0.25,
            draw_decay: 0.5,
            form_elo_per_unit: 100.0,
            goal_diff_elo_per_goal: 5.0,
            goal_diff_cap: 5.0,
        }
    }

    pub fn v2() -> Self {
        ModelParams {
            home_advantage: HomeAdvantage::Elo(70.0),
            kelly_fraction: 0.25,
            max_stake_percent: 5.0,
            market_shrink: 0.4,
            edge_threshold: 5.0,
            ..Self::v1()
        }
    }

    pub fn min_probability_fraction(&self) -> f64 {
        self.min_probability / 100.0
    }

    pub fn max_probability_fraction(&self) -> f64 {
        self.max_probability / 100.0
    }

    pub fn edge_threshold_fraction(&self) -> f64 {
        self.edge_threshold / 100.0
    }

    pub fn max_stake_fraction(&self) -> f64 {
        self.max_stake_percent / 100.0
    }

    pub fn flat_stake_fraction(&self) -> f64 {
        self.flat_stake_percent / 100.0
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::v2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_home_advantage_share_converts_to_elo() {
        assert_relative_eq!(HomeAdvantage::RatingShare(0.15).elo_points(), 60.0, epsilon = 1e-9);
        assert_relative_eq!(HomeAdvantage::Elo(70.0).elo_points(), 70.0, epsilon = 1e-9);
    }

    #[test]
    fn test_presets_differ_where_revisions_disagree() {
        let v1 = ModelParams::v1();
        let v2 = ModelParams::v2();
        assert_relative_eq!(v1.edge_threshold, 2.5);
        assert_relative_eq!(v2.edge_threshold, 5.0);
        assert_relative_eq!(v1.kelly_fraction, 0.5);
        assert_relative_eq!(v2.kelly_fraction, 0.25);
        assert_relative_eq!(v1.market_shrink, 0.0);
        assert_relative_eq!(v2.market_shrink, 0.4);
        assert_eq!(v2.home_advantage, HomeAdvantage::Elo(70.0));
        // Shared values come from the same base.
        assert_relative_eq!(v1.k_factor, v2.k_factor);
        assert_relative_eq!(v1.initial_rating, 1500.0);
        assert!(!v1.renormalize_after_clamp && !v2.renormalize_after_clamp);
    }

    #[test]
    fn test_default_is_v2() {
        assert_eq!(ModelParams::default(), ModelParams::preset(Preset::V2));
    }

    #[test]
    fn test_percent_helpers() {
        let p = ModelParams::v2();
        assert_relative_eq!(p.edge_threshold_fraction(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(p.max_stake_fraction(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(p.min_probability_fraction(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(p.max_probability_fraction(), 0.85, epsilon = 1e-12);
        assert_relative_eq!(p.flat_stake_fraction(), 0.015, epsilon = 1e-12);
    }

    #[test]
    fn test_params_serialize_with_tagged_home_advantage() {
        let json = serde_json::to_value(ModelParams::v1()).unwrap();
        assert_eq!(json["home_advantage"]["kind"], "rating_share");
        let back: ModelParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, ModelParams::v1());
    }
}
