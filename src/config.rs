use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::bot::odds::Outcome;
use crate::bot::params::{HomeAdvantage, ModelParams, Preset};
use crate::bot::settlement::BetResult;

/// Soccer 1X2 value-betting engine: Elo ratings, de-vigged odds, fractional Kelly
#[derive(Parser, Debug, Clone)]
#[command(name = "soccer-edge-bot", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "soccer_bets.db")]
    pub database_path: String,

    /// Bankroll used for stake sizing (currency units)
    #[arg(long, env = "BANKROLL", default_value = "1000.0")]
    pub bankroll: f64,

    /// Parameter preset
    #[arg(long, env = "MODEL_PRESET", value_enum, default_value = "v2")]
    pub preset: Preset,

    /// Minimum edge to bet, percentage points (overrides preset)
    #[arg(long, env = "EDGE_THRESHOLD")]
    pub edge_threshold: Option<f64>,

    /// Fractional Kelly multiplier, 0.0–1.0 (overrides preset)
    #[arg(long, env = "KELLY_FRACTION")]
    pub kelly_fraction: Option<f64>,

    /// Max stake, percent of bankroll (overrides preset)
    #[arg(long, env = "MAX_STAKE_PERCENT")]
    pub max_stake_percent: Option<f64>,

    /// Flat stake, percent of bankroll (overrides preset)
    #[arg(long, env = "FLAT_STAKE_PERCENT")]
    pub flat_stake_percent: Option<f64>,

    /// Use flat staking instead of Kelly
    #[arg(long, env = "USE_FLAT_STAKING")]
    pub use_flat_staking: Option<bool>,

    /// Market shrinkage α, 0.0–1.0 (overrides preset)
    #[arg(long, env = "MARKET_SHRINK")]
    pub market_shrink: Option<f64>,

    /// Home advantage in Elo points (overrides preset)
    #[arg(long, env = "HOME_ADVANTAGE_ELO")]
    pub home_advantage_elo: Option<f64>,

    /// Elo K-factor (overrides preset)
    #[arg(long, env = "ELO_K_FACTOR")]
    pub k_factor: Option<f64>,

    /// Lower probability clamp, percent (overrides preset)
    #[arg(long, env = "MIN_PROBABILITY")]
    pub min_probability: Option<f64>,

    /// Upper probability clamp, percent (overrides preset)
    #[arg(long, env = "MAX_PROBABILITY")]
    pub max_probability: Option<f64>,

    /// Renormalize calibrated probabilities after clamping
    #[arg(long, env = "RENORMALIZE_AFTER_CLAMP")]
    pub renormalize_after_clamp: Option<bool>,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "127.0.0.1:8080")]
    pub dashboard_addr: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Price a match and recommend a stake
    Analyze {
        home: String,
        away: String,
        home_odds: f64,
        draw_odds: f64,
        away_odds: f64,
        /// Recent form of the home side, -1.0–1.0
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        home_form: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        away_form: f64,
        /// Recent goal difference of the home side
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        home_gd: f64,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        away_gd: f64,
        /// Price with this home rating instead of the stored one
        #[arg(long)]
        home_rating: Option<f64>,
        #[arg(long)]
        away_rating: Option<f64>,
        /// Write the recommended bet to the ledger
        #[arg(long)]
        record: bool,
        /// Match date (YYYY-MM-DD)
        #[arg(long)]
        match_date: Option<NaiveDate>,
        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a bet placed by hand
    Bet {
        home: String,
        away: String,
        #[arg(value_parser = parse_outcome)]
        outcome: Outcome,
        odds: f64,
        stake: f64,
        /// Model probability, percent
        true_prob: f64,
        /// Market probability, percent
        market_prob: f64,
        #[arg(long)]
        match_date: Option<NaiveDate>,
    },
    /// Settle a pending bet
    Settle {
        bet_id: i64,
        #[arg(value_enum)]
        result: BetResult,
    },
    /// Apply a final score to both teams' ratings
    UpdateRatings {
        home: String,
        away: String,
        home_goals: u32,
        away_goals: u32,
        #[arg(long)]
        match_date: Option<NaiveDate>,
    },
    /// Ledger summary
    Stats,
    /// List recorded bets
    ListBets {
        #[arg(long)]
        pending: bool,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Current team ratings
    Ratings,
    /// Serve the read-only dashboard
    Serve,
}

fn parse_outcome(s: &str) -> Result<Outcome, String> {
    Outcome::parse(s).ok_or_else(|| format!("unknown outcome '{}', expected home|draw|away", s))
}

impl Config {
    /// Preset values with any explicit overrides applied.
    pub fn model_params(&self) -> ModelParams {
        let mut p = ModelParams::preset(self.preset);
        if let Some(v) = self.edge_threshold {
            p.edge_threshold = v;
        }
        if let Some(v) = self.kelly_fraction {
            p.kelly_fraction = v;
        }
        if let Some(v) = self.max_stake_percent {
            p.max_stake_percent = v;
        }
        if let Some(v) = self.flat_stake_percent {
            p.flat_stake_percent = v;
        }
        if let Some(v) = self.use_flat_staking {
            p.use_flat_staking = v;
        }
        if let Some(v) = self.market_shrink {
            p.market_shrink = v;
        }
        if let Some(v) = self.home_advantage_elo {
            p.home_advantage = HomeAdvantage::Elo(v);
        }
        if let Some(v) = self.k_factor {
            p.k_factor = v;
        }
        if let Some(v) = self.min_probability {
            p.min_probability = v;
        }
        if let Some(v) = self.max_probability {
            p.max_probability = v;
        }
        if let Some(v) = self.renormalize_after_clamp {
            p.renormalize_after_clamp = v;
        }
        p
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.bankroll.is_finite() || self.bankroll <= 0.0 {
            anyhow::bail!("bankroll must be positive");
        }
        let p = self.model_params();
        if !(0.0..=1.0).contains(&p.kelly_fraction) {
            anyhow::bail!("kelly_fraction must be between 0.0 and 1.0");
        }
        if !(0.0..=1.0).contains(&p.market_shrink) {
            anyhow::bail!("market_shrink must be between 0.0 and 1.0");
        }
        if !(0.0..=100.0).contains(&p.max_stake_percent) || p.max_stake_percent == 0.0 {
            anyhow::bail!("max_stake_percent must be in (0, 100]");
        }
        if !(0.0..=100.0).contains(&p.flat_stake_percent) {
            anyhow::bail!("flat_stake_percent must be between 0 and 100");
        }
        if !(0.0..=100.0).contains(&p.edge_threshold) {
            anyhow::bail!("edge_threshold must be between 0 and 100");
        }
        if !(0.0..=100.0).contains(&p.min_probability)
            || !(0.0..=100.0).contains(&p.max_probability)
            || p.min_probability >= p.max_probability
        {
            anyhow::bail!(
                "probability clamp must satisfy 0 <= min < max <= 100 (got {} / {})",
                p.min_probability,
                p.max_probability
            );
        }
        if p.renormalize_after_clamp
            && (3.0 * p.min_probability > 100.0 || 3.0 * p.max_probability < 100.0)
        {
            anyhow::bail!("probability clamp cannot hold three outcomes summing to 100%");
        }
        if !p.k_factor.is_finite() || p.k_factor <= 0.0 {
            anyhow::bail!("k_factor must be positive");
        }
        if !p.home_advantage.elo_points().is_finite() {
            anyhow::bail!("home advantage must be finite");
        }
        Ok(())
    }
}
