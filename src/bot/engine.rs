use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::models::{AppliedMatch, BetRecord, BettingStats, MatchResult, TeamRating};
use crate::db::{team_key, Database, RatingStore};

use super::kelly::edges;
use super::odds::{
    convert_odds, implied_probability_to_odds, overround, EdgeTriple, OddsTriple, Outcome,
    OutcomeValues,
};
use super::params::{ModelParams, Preset};
use super::rating::update_ratings;
use super::recommendation::{recommend_bet, StakeDecision};
use super::settlement::{settle, BetResult, Settlement};
use super::win_probability::{estimate_probabilities, Estimate, MatchAdjustments};

/// One match to price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub home_team: String,
    pub away_team: String,
    pub odds: OddsTriple,
    #[serde(default)]
    pub adjustments: MatchAdjustments,
}

/// Full output of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub home_team: String,
    pub away_team: String,
    pub home_rating: f64,
    pub away_rating: f64,
    pub odds: OddsTriple,
    /// Sum of raw implied probabilities (1.0 = no margin).
    pub overround: f64,
    pub estimate: Estimate,
    pub edges: EdgeTriple,
    /// Fair decimal odds implied by the calibrated probabilities.
    pub fair_odds: OutcomeValues,
    pub decision: StakeDecision,
    pub preset: Option<Preset>,
}

/// A manually entered bet.
#[derive(Debug, Clone)]
pub struct NewBet {
    pub home_team: String,
    pub away_team: String,
    pub outcome: Outcome,
    pub odds: f64,
    pub stake: f64,
    /// Fractions (0.0–1.0)
    pub true_probability: f64,
    pub market_probability: f64,
    pub match_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub home_team: String,
    pub away_team: String,
    pub home_before: f64,
    pub away_before: f64,
    pub home_after: f64,
    pub away_after: f64,
    pub match_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSummary {
    #[serde(flatten)]
    pub stats: BettingStats,
    pub starting_bankroll: f64,
    /// starting bankroll + realised P/L − stake still at risk
    pub current_bankroll: f64,
}

/// Orchestrates the pricing core against the rating store and the bet ledger.
///
/// The core functions stay pure; this type does the reads before and the
/// writes after them.
pub struct BettingEngine<R: RatingStore> {
    params: ModelParams,
    preset: Option<Preset>,
    ratings: R,
    ledger: Database,
    bankroll: f64,
}

impl<R: RatingStore> BettingEngine<R> {
    pub fn new(
        params: ModelParams,
        preset: Option<Preset>,
        ratings: R,
        ledger: Database,
        bankroll: f64,
    ) -> Self {
        BettingEngine {
            params,
            preset,
            ratings,
            ledger,
            bankroll,
        }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    /// Rating for `team`, or the configured initial rating for a new team.
    pub fn rating_or_initial(&self, team: &str) -> Result<f64> {
        Ok(self
            .ratings
            .rating(team)?
            .unwrap_or(self.params.initial_rating))
    }

    pub fn ratings(&self) -> Result<Vec<TeamRating>> {
        self.ratings.ratings()
    }

    /// Price one match and size the best bet, if any.
    pub fn analyze(&self, request: &MatchRequest) -> Result<MatchAnalysis> {
        let (home_team, away_team) = match_teams(&request.home_team, &request.away_team)?;

        let home_rating = self.rating_or_initial(&home_team)?;
        let away_rating = self.rating_or_initial(&away_team)?;

        let market = convert_odds(&request.odds).context("converting market odds")?;
        let overround = overround(&request.odds)?;
        let estimate = estimate_probabilities(
            home_rating,
            away_rating,
            &request.adjustments,
            &market,
            &self.params,
        )
        .context("estimating match probabilities")?;
        let edge_triple = edges(&estimate.calibrated, &market);
        let decision = recommend_bet(
            &estimate.calibrated,
            &market,
            &request.odds,
            self.bankroll,
            &self.params,
        )
        .context("sizing stake")?;
        let fair_odds = estimate
            .calibrated
            .map(|p| implied_probability_to_odds(p).unwrap_or(f64::INFINITY));

        debug!(
            "{} vs {}: adjusted {:.0}/{:.0}, expected {:.3}, margin {:.2}%",
            home_team,
            away_team,
            estimate.adjusted_home,
            estimate.adjusted_away,
            estimate.expected_home,
            (overround - 1.0) * 100.0
        );
        match decision.outcome {
            Some(outcome) => info!(
                "📈 {} vs {}: back {} @ {:.2} – edge {:+.2}%, stake ${:.2}",
                home_team,
                away_team,
                outcome,
                decision.odds,
                decision.edge * 100.0,
                decision.stake
            ),
            None => info!(
                "{} vs {}: no bet (best edge {:+.2}% on {}, reason {:?})",
                home_team,
                away_team,
                decision.edge * 100.0,
                decision.candidate,
                decision.no_bet_reason
            ),
        }

        Ok(MatchAnalysis {
            home_team,
            away_team,
            home_rating,
            away_rating,
            odds: request.odds,
            overround,
            estimate,
            edges: edge_triple,
            fair_odds,
            decision,
            preset: self.preset,
        })
    }

    /// Write the recommended bet of `analysis` to the ledger. Returns `None`
    /// when the analysis recommended no bet.
    pub fn record_recommendation(
        &self,
        analysis: &MatchAnalysis,
        match_date: Option<NaiveDate>,
    ) -> Result<Option<i64>> {
        let decision = &analysis.decision;
        let Some(outcome) = decision.outcome else {
            return Ok(None);
        };
        let id = self.ledger.insert_bet(&BetRecord {
            id: None,
            placed_at: Utc::now(),
            home_team: analysis.home_team.clone(),
            away_team: analysis.away_team.clone(),
            outcome: outcome.as_str().to_string(),
            odds: decision.odds,
            stake: decision.stake,
            true_probability: decision.probability,
            market_probability: decision.market_probability,
            edge: decision.edge,
            result: None,
            profit_loss: None,
            settled_at: None,
            match_date,
            preset: self.preset.map(preset_label),
        })?;
        info!("Recorded bet #{} ({} @ {:.2}, ${:.2})", id, outcome, decision.odds, decision.stake);
        Ok(Some(id))
    }

    /// Record a bet entered by hand.
    pub fn place_bet(&self, bet: &NewBet) -> Result<i64> {
        let (home_team, away_team) = match_teams(&bet.home_team, &bet.away_team)?;
        if !bet.stake.is_finite() || bet.stake <= 0.0 {
            bail!("stake must be positive, got {}", bet.stake);
        }
        if !bet.odds.is_finite() || bet.odds <= 1.0 {
            bail!("decimal odds must be > 1.0, got {}", bet.odds);
        }
        for p in [bet.true_probability, bet.market_probability] {
            if !(0.0..=1.0).contains(&p) {
                bail!("probabilities must be between 0 and 100%, got {}", p * 100.0);
            }
        }
        if bet.stake > self.bankroll * self.params.max_stake_fraction() {
            warn!(
                "Manual stake ${:.2} exceeds the {:.1}% cap (${:.2})",
                bet.stake,
                self.params.max_stake_percent,
                self.bankroll * self.params.max_stake_fraction()
            );
        }
        let id = self.ledger.insert_bet(&BetRecord {
            id: None,
            placed_at: Utc::now(),
            home_team,
            away_team,
            outcome: bet.outcome.as_str().to_string(),
            odds: bet.odds,
            stake: bet.stake,
            true_probability: bet.true_probability,
            market_probability: bet.market_probability,
            edge: bet.true_probability - bet.market_probability,
            result: None,
            profit_loss: None,
            settled_at: None,
            match_date: bet.match_date,
            preset: None,
        })?;
        info!("Recorded manual bet #{}", id);
        Ok(id)
    }

    pub fn settle_bet(&self, id: i64, result: BetResult) -> Result<Settlement> {
        let bet = self
            .ledger
            .get_bet(id)?
            .with_context(|| format!("bet {} not found", id))?;
        if let Some(existing) = &bet.result {
            bail!("bet {} already settled as {}", id, existing);
        }
        let settlement = settle(bet.stake, bet.odds, result);
        self.ledger
            .settle_bet(id, result.as_str(), settlement.profit_loss)?;
        info!(
            "Settled bet #{} as {} (P/L ${:+.2})",
            id,
            result.as_str(),
            settlement.profit_loss
        );
        Ok(settlement)
    }

    /// Apply a final score to both teams' ratings. Call exactly once per
    /// match.
    pub fn update_ratings_from_result(
        &self,
        home_team: &str,
        away_team: &str,
        home_goals: u32,
        away_goals: u32,
        match_date: Option<NaiveDate>,
    ) -> Result<RatingUpdate> {
        let (home_team, away_team) = match_teams(home_team, away_team)?;
        let result = MatchResult {
            match_date,
            home_team: home_team.clone(),
            away_team: away_team.clone(),
            home_goals,
            away_goals,
        };
        let applied = self
            .ratings
            .apply_match_result(&result, self.params.initial_rating, |home, away| {
                update_ratings(home, away, home_goals, away_goals, &self.params)
            })
            .context("updating ratings")?;
        let AppliedMatch {
            match_id,
            home_before,
            away_before,
            home_after,
            away_after,
        } = applied;

        info!(
            "⚽ {} {}-{} {}: {:.0} → {:.0}, {:.0} → {:.0}",
            home_team, home_goals, away_goals, away_team, home_before, home_after, away_before, away_after
        );

        Ok(RatingUpdate {
            home_team,
            away_team,
            home_before,
            away_before,
            home_after,
            away_after,
            match_id,
        })
    }

    pub fn stats(&self) -> Result<LedgerSummary> {
        let stats = self.ledger.get_stats()?;
        let current_bankroll = self.bankroll + stats.total_profit_loss - stats.pending_stake;
        Ok(LedgerSummary {
            stats,
            starting_bankroll: self.bankroll,
            current_bankroll,
        })
    }

    pub fn list_bets(&self, pending_only: bool, limit: i64) -> Result<Vec<BetRecord>> {
        self.ledger.list_bets(pending_only, limit)
    }
}

/// Canonical keys for both sides of a fixture. Rejects blank names and a team
/// playing itself.
fn match_teams(home: &str, away: &str) -> Result<(String, String)> {
    let home = team_key(home);
    let away = team_key(away);
    if home.is_empty() || away.is_empty() {
        bail!("team names must not be empty");
    }
    if home.eq_ignore_ascii_case(&away) {
        bail!("home and away team are the same: {}", home);
    }
    Ok((home, away))
}

pub fn preset_label(preset: Preset) -> String {
    match preset {
        Preset::V1 => "v1".to_string(),
        Preset::V2 => "v2".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryRatings;
    use approx::assert_relative_eq;

    fn engine(params: ModelParams) -> BettingEngine<InMemoryRatings> {
        BettingEngine::new(
            params,
            Some(Preset::V2),
            InMemoryRatings::new(),
            Database::open_in_memory().unwrap(),
            1000.0,
        )
    }

    fn request(home: &str, away: &str, odds: (f64, f64, f64)) -> MatchRequest {
        MatchRequest {
            home_team: home.into(),
            away_team: away.into(),
            odds: OddsTriple::new(odds.0, odds.1, odds.2),
            adjustments: MatchAdjustments::default(),
        }
    }

    #[test]
    fn test_new_teams_start_at_initial_rating() {
        let e = engine(ModelParams::v2());
        let a = e.analyze(&request("Leeds", "Burnley", (1.8, 3.8, 4.5))).unwrap();
        assert_eq!(a.home_rating, 1500.0);
        assert_eq!(a.away_rating, 1500.0);
        assert_relative_eq!(a.overround, 1.040_936, epsilon = 1e-6);
    }

    #[test]
    fn test_scenario_fixture_end_to_end_v2() {
        // Equal ratings: the market prices the home side far above what a
        // 70-point home advantage supports, so home has negative edge and the
        // away price clears 5%.
        let e = engine(ModelParams::v2());
        let a = e.analyze(&request("Leeds", "Burnley", (1.8, 3.8, 4.5))).unwrap();
        assert!(a.edges.home < 0.0);
        assert_relative_eq!(a.edges.away, 0.055_168, epsilon = 1e-5);
        assert_eq!(a.decision.outcome, Some(Outcome::Away));
        assert!(a.decision.stake <= 50.0 + 1e-9);
    }

    #[test]
    fn test_scenario_fixture_end_to_end_v1() {
        let params = ModelParams::v1();
        let e = BettingEngine::new(
            params,
            Some(Preset::V1),
            InMemoryRatings::new(),
            Database::open_in_memory().unwrap(),
            1000.0,
        );
        let a = e.analyze(&request("Leeds", "Burnley", (1.8, 3.8, 4.5))).unwrap();
        // α = 0: calibrated is the raw model.
        assert_eq!(a.estimate.calibrated, a.estimate.model);
        assert_eq!(a.decision.outcome, Some(Outcome::Away));
        assert_eq!(a.preset, Some(Preset::V1));
    }

    #[test]
    fn test_stronger_home_side_gets_home_bet() {
        let ratings = InMemoryRatings::from_ratings([
            ("Bayern".to_string(), 1850.0),
            ("Bochum".to_string(), 1400.0),
        ]);
        let e = BettingEngine::new(
            ModelParams::v2(),
            None,
            ratings,
            Database::open_in_memory().unwrap(),
            1000.0,
        );
        let a = e.analyze(&request("bayern", "Bochum", (1.60, 4.20, 5.50))).unwrap();
        assert_eq!(a.home_team, "bayern");
        assert_eq!(a.home_rating, 1850.0);
        assert_eq!(a.decision.outcome, Some(Outcome::Home));
        assert!(a.decision.stake > 0.0);
    }

    #[test]
    fn test_rejects_same_team_and_bad_odds() {
        let e = engine(ModelParams::v2());
        assert!(e.analyze(&request("Ajax", " ajax ", (2.0, 3.0, 4.0))).is_err());
        assert!(e.analyze(&request("Ajax", "PSV", (1.0, 3.0, 4.0))).is_err());
    }

    #[test]
    fn test_record_and_settle_recommendation() {
        let e = engine(ModelParams::v2());
        let a = e.analyze(&request("Leeds", "Burnley", (1.8, 3.8, 4.5))).unwrap();
        let id = e.record_recommendation(&a, None).unwrap().expect("bet recorded");

        let pending = e.list_bets(true, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].outcome, "away");
        assert_eq!(pending[0].preset.as_deref(), Some("v2"));

        let s = e.settle_bet(id, BetResult::Win).unwrap();
        assert_relative_eq!(s.profit_loss, a.decision.stake * 3.5, epsilon = 1e-9);
        assert!(e.settle_bet(id, BetResult::Loss).is_err());

        let summary = e.stats().unwrap();
        assert_eq!(summary.stats.wins, 1);
        assert_relative_eq!(summary.current_bankroll, 1000.0 + s.profit_loss, epsilon = 1e-9);
    }

    #[test]
    fn test_no_bet_records_nothing() {
        let mut params = ModelParams::v2();
        params.edge_threshold = 50.0;
        let e = engine(params);
        let a = e.analyze(&request("Leeds", "Burnley", (1.8, 3.8, 4.5))).unwrap();
        assert!(!a.decision.is_bet());
        assert_eq!(e.record_recommendation(&a, None).unwrap(), None);
        assert!(e.list_bets(false, 10).unwrap().is_empty());
    }

    #[test]
    fn test_manual_bet_validation_and_pending_exposure() {
        let e = engine(ModelParams::v2());
        let bet = NewBet {
            home_team: "Porto".into(),
            away_team: "Benfica".into(),
            outcome: Outcome::Draw,
            odds: 3.3,
            stake: 20.0,
            true_probability: 0.33,
            market_probability: 0.29,
            match_date: NaiveDate::from_ymd_opt(2026, 5, 2),
        };
        e.place_bet(&bet).unwrap();
        assert!(e.place_bet(&NewBet { stake: 0.0, ..bet.clone() }).is_err());
        assert!(e.place_bet(&NewBet { odds: 1.0, ..bet.clone() }).is_err());
        assert!(e.place_bet(&NewBet { true_probability: 1.4, ..bet }).is_err());

        let summary = e.stats().unwrap();
        assert_relative_eq!(summary.stats.pending_stake, 20.0);
        assert_relative_eq!(summary.current_bankroll, 980.0);
    }

    #[test]
    fn test_rating_update_persists_and_feeds_next_analysis() {
        let e = engine(ModelParams::v2());
        let u = e
            .update_ratings_from_result("Leeds", "Burnley", 3, 1, None)
            .unwrap();
        assert_relative_eq!(u.home_after, 1516.0, epsilon = 1e-9);
        assert_relative_eq!(u.away_after, 1484.0, epsilon = 1e-9);
        assert_relative_eq!(u.home_after - u.home_before, u.away_before - u.away_after, epsilon = 1e-9);

        let a = e.analyze(&request("leeds", "BURNLEY", (1.8, 3.8, 4.5))).unwrap();
        assert_relative_eq!(a.home_rating, 1516.0, epsilon = 1e-9);
        assert_relative_eq!(a.away_rating, 1484.0, epsilon = 1e-9);
    }

    #[test]
    fn test_draw_between_equal_teams_leaves_store_unchanged() {
        let e = engine(ModelParams::v2());
        let u = e.update_ratings_from_result("Lyon", "Lille", 0, 0, None).unwrap();
        assert_eq!(u.home_after, 1500.0);
        assert_eq!(e.rating_or_initial("Lille").unwrap(), 1500.0);
        assert_eq!(e.ratings().unwrap().len(), 2);
    }

    fn concurrent_home_wins<R: RatingStore + Sync>(e: &BettingEngine<R>, threads: usize, wins: usize) {
        let barrier = std::sync::Barrier::new(threads);
        std::thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..wins {
                        e.update_ratings_from_result("Leeds", "Burnley", 1, 0, None)
                            .unwrap();
                    }
                });
            }
        });
    }

    fn sequential_home_wins(n: usize, params: &ModelParams) -> (f64, f64) {
        let (mut home, mut away) = (1500.0, 1500.0);
        for _ in 0..n {
            (home, away) = update_ratings(home, away, 1, 0, params).unwrap();
        }
        (home, away)
    }

    #[test]
    fn test_concurrent_rating_updates_are_not_lost_sqlite() {
        let e = engine(ModelParams::v2());
        concurrent_home_wins(&e, 4, 10);

        let (home, away) = sequential_home_wins(40, e.params());
        assert_relative_eq!(e.rating_or_initial("Leeds").unwrap(), home, epsilon = 1e-9);
        assert_relative_eq!(e.rating_or_initial("Burnley").unwrap(), away, epsilon = 1e-9);

        // Every update saw the previous one: no two results start from the
        // same pre-match rating.
        let history = e.ledger.list_match_results(100).unwrap();
        assert_eq!(history.len(), 40);
        let mut befores: Vec<f64> = history.iter().map(|m| m.home_rating_before).collect();
        befores.sort_by(f64::total_cmp);
        befores.dedup();
        assert_eq!(befores.len(), 40);
    }

    #[test]
    fn test_concurrent_rating_updates_are_not_lost_in_memory() {
        let e = BettingEngine::new(
            ModelParams::v2(),
            None,
            InMemoryRatings::new(),
            Database::open_in_memory().unwrap(),
            1000.0,
        );
        concurrent_home_wins(&e, 4, 10);
        let (home, _) = sequential_home_wins(40, e.params());
        assert_relative_eq!(e.rating_or_initial("leeds").unwrap(), home, epsilon = 1e-9);
    }

    #[test]
    fn test_blank_team_names_are_rejected() {
        let e = engine(ModelParams::v2());
        assert!(e.update_ratings_from_result("   ", "Leeds", 2, 0, None).is_err());
        assert!(e.update_ratings_from_result("Leeds", "", 2, 0, None).is_err());
        assert!(e.ratings().unwrap().is_empty());

        let bet = NewBet {
            home_team: "".into(),
            away_team: " ".into(),
            outcome: Outcome::Home,
            odds: 2.0,
            stake: 10.0,
            true_probability: 0.55,
            market_probability: 0.48,
            match_date: None,
        };
        assert!(e.place_bet(&bet).is_err());
        let same_team = NewBet {
            home_team: "Leeds".into(),
            away_team: "LEEDS ".into(),
            ..bet
        };
        assert!(e.place_bet(&same_team).is_err());
        assert!(e.list_bets(false, 10).unwrap().is_empty());
    }
}
