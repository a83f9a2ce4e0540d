use serde::{Deserialize, Serialize};

use super::kelly::{best_edge, edges, kelly_fraction};
use super::odds::{OddsTriple, Outcome, ProbabilityTriple};
use super::params::ModelParams;
use crate::error::{EngineError, EngineResult};

/// Why `recommend_bet` declined to stake anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoBetReason {
    /// Best edge is below the configured threshold.
    BelowThreshold,
    /// Edge cleared the threshold but the Kelly fraction is not positive
    /// (small edges at short odds).
    NonPositiveKelly,
}

/// Decision for one match: at most one outcome is backed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeDecision {
    /// Outcome backed, `None` for no bet.
    pub outcome: Option<Outcome>,
    /// Outcome with the largest edge, even when it was not backed.
    pub candidate: Outcome,
    pub odds: f64,
    /// Calibrated probability of the candidate.
    pub probability: f64,
    pub market_probability: f64,
    pub edge: f64,
    /// Full Kelly fraction of the candidate (0 in flat mode).
    pub kelly_fraction: f64,
    /// Fraction of bankroll actually staked, after the multiplier and cap.
    pub stake_fraction: f64,
    pub stake: f64,
    pub potential_return: f64,
    pub potential_profit: f64,
    pub no_bet_reason: Option<NoBetReason>,
}

impl StakeDecision {
    pub fn is_bet(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Select the best-edge outcome and size it.
///
/// # Arguments
/// * `calibrated` – Calibrated probabilities from `estimate_probabilities`.
/// * `market`     – De-vigged market probabilities.
/// * `odds`       – Decimal odds the market probabilities came from.
/// * `bankroll`   – Current bankroll, must be positive.
///
/// Kelly mode stakes `bankroll · min(f*·kelly_fraction, max_stake%)`; flat
/// mode stakes `bankroll · min(flat_stake%, max_stake%)`. Either way the stake
/// never exceeds `bankroll · max_stake_percent / 100`.
pub fn recommend_bet(
    calibrated: &ProbabilityTriple,
    market: &ProbabilityTriple,
    odds: &OddsTriple,
    bankroll: f64,
    params: &ModelParams,
) -> EngineResult<StakeDecision> {
    if !bankroll.is_finite() || bankroll <= 0.0 {
        return Err(EngineError::InvalidBankroll(bankroll));
    }
    odds.validate()?;

    let edge_triple = edges(calibrated, market);
    let (candidate, edge) = best_edge(&edge_triple);
    let price = odds.get(candidate);
    let probability = calibrated.get(candidate);

    let mut decision = StakeDecision {
        outcome: None,
        candidate,
        odds: price,
        probability,
        market_probability: market.get(candidate),
        edge,
        kelly_fraction: 0.0,
        stake_fraction: 0.0,
        stake: 0.0,
        potential_return: 0.0,
        potential_profit: 0.0,
        no_bet_reason: None,
    };

    // Negated so a NaN edge never clears the threshold.
    if !(edge >= params.edge_threshold_fraction()) {
        decision.no_bet_reason = Some(NoBetReason::BelowThreshold);
        return Ok(decision);
    }

    let cap = params.max_stake_fraction();
    let stake_fraction = if params.use_flat_staking {
        params.flat_stake_fraction().min(cap)
    } else {
        match kelly_fraction(probability, price) {
            Some(full) if full > 0.0 => {
                decision.kelly_fraction = full;
                (full * params.kelly_fraction).min(cap)
            }
            Some(full) => {
                decision.kelly_fraction = full;
                decision.no_bet_reason = Some(NoBetReason::NonPositiveKelly);
                return Ok(decision);
            }
            None => {
                decision.no_bet_reason = Some(NoBetReason::NonPositiveKelly);
                return Ok(decision);
            }
        }
    };

    let stake = bankroll * stake_fraction;
    decision.outcome = Some(candidate);
    decision.stake_fraction = stake_fraction;
    decision.stake = stake;
    decision.potential_return = stake * price;
    decision.potential_profit = decision.potential_return - stake;
    Ok(decision)
}
