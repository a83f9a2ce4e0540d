//! Decimal odds and the three-way outcome types shared by the core.
//!
//! Bookmaker prices carry a margin (the overround): the raw implied
//! probabilities `1/odds` sum to slightly more than 1. De-vigging rescales
//! them proportionally so the market view sums to exactly 1.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    /// Iteration order; also the tie-break order for best-edge selection.
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "away",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "home" | "1" => Some(Outcome::Home),
            "draw" | "x" => Some(Outcome::Draw),
            "away" | "2" => Some(Outcome::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three decimal odds quoted for one match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsTriple {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OddsTriple {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        OddsTriple { home, draw, away }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        for outcome in Outcome::ALL {
            let value = self.get(outcome);
            if !value.is_finite() || value <= 1.0 {
                return Err(EngineError::InvalidOdds {
                    outcome: outcome.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// One value per outcome. Used for probabilities (market, model, calibrated)
/// and for edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OutcomeValues {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

pub type ProbabilityTriple = OutcomeValues;
pub type EdgeTriple = OutcomeValues;

impl OutcomeValues {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        OutcomeValues { home, draw, away }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Apply `f` to each component.
    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Self {
        OutcomeValues {
            home: f(self.home),
            draw: f(self.draw),
            away: f(self.away),
        }
    }

    /// Combine two triples component-wise.
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        OutcomeValues {
            home: f(self.home, other.home),
            draw: f(self.draw, other.draw),
            away: f(self.away, other.away),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Outcome, f64)> + '_ {
        Outcome::ALL.into_iter().map(move |o| (o, self.get(o)))
    }
}

/// Sum of raw implied probabilities. A fair book is exactly 1.0.
pub fn overround(odds: &OddsTriple) -> EngineResult<f64> {
    odds.validate()?;
    Ok(1.0 / odds.home + 1.0 / odds.draw + 1.0 / odds.away)
}

/// Convert decimal odds into de-vigged market probabilities.
///
/// Each raw implied probability `1/odds` is divided by the overround so the
/// result sums to 1. Fails with `InvalidOdds` when any price is ≤ 1.0 or not
/// finite.
pub fn convert_odds(odds: &OddsTriple) -> EngineResult<ProbabilityTriple> {
    let total = overround(odds)?;
    Ok(OutcomeValues {
        home: (1.0 / odds.home) / total,
        draw: (1.0 / odds.draw) / total,
        away: (1.0 / odds.away) / total,
    })
}

/// Fair decimal odds for a probability (fraction). `None` outside (0, 1).
pub fn implied_probability_to_odds(probability: f64) -> Option<f64> {
    if probability <= 0.0 || probability >= 1.0 || !probability.is_finite() {
        return None;
    }
    Some(1.0 / probability)
}
