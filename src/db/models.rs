use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A recorded bet in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: Option<i64>,
    pub placed_at: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    /// "home" | "draw" | "away"
    pub outcome: String,
    /// Decimal odds taken
    pub odds: f64,
    /// Amount staked (currency units)
    pub stake: f64,
    /// Calibrated probability at placement (0.0–1.0)
    pub true_probability: f64,
    /// De-vigged market probability at placement (0.0–1.0)
    pub market_probability: f64,
    /// true_probability − market_probability
    pub edge: f64,
    /// "win" | "loss" | "push", `None` while pending
    pub result: Option<String>,
    pub profit_loss: Option<f64>,
    pub settled_at: Option<DateTime<Utc>>,
    pub match_date: Option<NaiveDate>,
    /// Parameter preset the recommendation came from ("v1" | "v2"), if any
    pub preset: Option<String>,
}

impl BetRecord {
    pub fn is_pending(&self) -> bool {
        self.result.is_none()
    }
}

/// Persisted Elo rating for one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team_name: String,
    pub rating: f64,
    pub last_updated: DateTime<Utc>,
}

/// A settled match result that moved ratings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: Option<i64>,
    pub match_date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    /// Ratings before the update was applied
    pub home_rating_before: f64,
    pub away_rating_before: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate ledger statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettingStats {
    pub total_bets: i64,
    pub settled_bets: i64,
    pub pending_bets: i64,
    pub wins: i64,
    pub losses: i64,
    pub pushes: i64,
    /// Wins / (wins + losses), percent
    pub win_rate: f64,
    pub total_staked: f64,
    pub pending_stake: f64,
    pub total_profit_loss: f64,
    /// total_profit_loss / settled stake, percent
    pub roi: f64,
}

/// A final score to be applied to the rating store
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub match_date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
}

/// Ratings on both sides of one applied result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedMatch {
    pub match_id: i64,
    pub home_before: f64,
    pub away_before: f64,
    pub home_after: f64,
    pub away_after: f64,
}
