use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

mod bot;
mod config;
mod dashboard;
mod db;
mod error;

use bot::{BettingEngine, MatchAdjustments, MatchAnalysis, MatchRequest, NewBet, OddsTriple, Outcome};
use config::{Cli, Command};
use dashboard::AppState;
use db::{Database, InMemoryRatings};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    config.validate()?;
    let params = config.model_params();

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    let engine = BettingEngine::new(
        params.clone(),
        Some(config.preset),
        db.clone(),
        db.clone(),
        config.bankroll,
    );

    match cli.command {
        Command::Analyze {
            home,
            away,
            home_odds,
            draw_odds,
            away_odds,
            home_form,
            away_form,
            home_gd,
            away_gd,
            home_rating,
            away_rating,
            record,
            match_date,
            json,
        } => {
            let request = MatchRequest {
                home_team: home,
                away_team: away,
                odds: OddsTriple::new(home_odds, draw_odds, away_odds),
                adjustments: MatchAdjustments {
                    home_form,
                    away_form,
                    home_goal_diff: home_gd,
                    away_goal_diff: away_gd,
                },
            };
            let analysis = if home_rating.is_some() || away_rating.is_some() {
                // What-if pricing against a snapshot; stored ratings stay untouched.
                let mut snapshot: Vec<(String, f64)> = engine
                    .ratings()?
                    .into_iter()
                    .map(|r| (r.team_name, r.rating))
                    .collect();
                snapshot.extend(home_rating.map(|r| (request.home_team.clone(), r)));
                snapshot.extend(away_rating.map(|r| (request.away_team.clone(), r)));
                let what_if = BettingEngine::new(
                    params.clone(),
                    Some(config.preset),
                    InMemoryRatings::from_ratings(snapshot),
                    db.clone(),
                    config.bankroll,
                );
                what_if.analyze(&request)?
            } else {
                engine.analyze(&request)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
            if record {
                match engine.record_recommendation(&analysis, match_date)? {
                    Some(id) => println!("Recorded as bet #{}", id),
                    None => println!("Nothing to record."),
                }
            }
        }
        Command::Bet {
            home,
            away,
            outcome,
            odds,
            stake,
            true_prob,
            market_prob,
            match_date,
        } => {
            let id = engine.place_bet(&NewBet {
                home_team: home,
                away_team: away,
                outcome,
                odds,
                stake,
                true_probability: true_prob / 100.0,
                market_probability: market_prob / 100.0,
                match_date,
            })?;
            println!("Recorded bet #{}", id);
        }
        Command::Settle { bet_id, result } => {
            let s = engine.settle_bet(bet_id, result)?;
            println!(
                "Bet #{} settled as {}: P/L {:+.2}, returned {:.2}",
                bet_id,
                s.result.as_str(),
                s.profit_loss,
                s.returned
            );
        }
        Command::UpdateRatings {
            home,
            away,
            home_goals,
            away_goals,
            match_date,
        } => {
            let u = engine
                .update_ratings_from_result(&home, &away, home_goals, away_goals, match_date)?;
            println!(
                "{}: {:.1} → {:.1} ({:+.1})",
                u.home_team,
                u.home_before,
                u.home_after,
                u.home_after - u.home_before
            );
            println!(
                "{}: {:.1} → {:.1} ({:+.1})",
                u.away_team,
                u.away_before,
                u.away_after,
                u.away_after - u.away_before
            );
        }
        Command::Stats => {
            let summary = engine.stats()?;
            let s = &summary.stats;
            println!("Bets:          {} ({} settled, {} pending)", s.total_bets, s.settled_bets, s.pending_bets);
            println!("Record:        {}W-{}L-{}P", s.wins, s.losses, s.pushes);
            println!("Win rate:      {:.1}%", s.win_rate);
            println!("Staked:        {:.2}", s.total_staked);
            println!("P/L:           {:+.2}", s.total_profit_loss);
            println!("ROI:           {:+.1}%", s.roi);
            println!("Bankroll:      {:.2} (start {:.2}, at risk {:.2})", summary.current_bankroll, summary.starting_bankroll, s.pending_stake);
        }
        Command::ListBets { pending, limit } => {
            let bets = engine.list_bets(pending, limit)?;
            if bets.is_empty() {
                println!("No bets.");
            }
            for b in bets {
                println!(
                    "#{:<4} {} vs {} – {} @ {:.2}, stake {:.2}, edge {:+.1}%, {}",
                    b.id.unwrap_or_default(),
                    b.home_team,
                    b.away_team,
                    b.outcome,
                    b.odds,
                    b.stake,
                    b.edge * 100.0,
                    if b.is_pending() {
                        "pending".to_string()
                    } else {
                        format!(
                            "{} ({:+.2})",
                            b.result.as_deref().unwrap_or_default(),
                            b.profit_loss.unwrap_or_default()
                        )
                    }
                );
            }
        }
        Command::Ratings => {
            let ratings = engine.ratings()?;
            if ratings.is_empty() {
                println!("No ratings yet.");
            }
            for (rank, r) in ratings.iter().enumerate() {
                println!("{:>3}. {:<28} {:.1}", rank + 1, r.team_name, r.rating);
            }
            let recent = db.list_match_results(10)?;
            if !recent.is_empty() {
                println!("\nRecent results:");
                for m in recent {
                    println!(
                        "  {} {}-{} {}",
                        m.home_team, m.home_goals, m.away_goals, m.away_team
                    );
                }
            }
        }
        Command::Serve => {
            let app = dashboard::router(AppState { engine });
            let addr: SocketAddr = config.dashboard_addr.parse()?;
            info!("Dashboard listening on http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn print_analysis(a: &MatchAnalysis) {
    let e = &a.estimate;
    println!("{} ({:.0}) vs {} ({:.0})", a.home_team, a.home_rating, a.away_team, a.away_rating);
    println!(
        "Adjusted ratings {:.0} / {:.0}, expected home score {:.3}, bookmaker margin {:.2}%",
        e.adjusted_home,
        e.adjusted_away,
        e.expected_home,
        (a.overround - 1.0) * 100.0
    );
    println!("{:<6} {:>7} {:>8} {:>8} {:>8} {:>8} {:>8}", "", "odds", "market", "model", "calib", "edge", "fair");
    for outcome in Outcome::ALL {
        println!(
            "{:<6} {:>7.2} {:>7.1}% {:>7.1}% {:>7.1}% {:>+7.1}% {:>8.2}",
            outcome.as_str(),
            a.odds.get(outcome),
            e.market.get(outcome) * 100.0,
            e.model.get(outcome) * 100.0,
            e.calibrated.get(outcome) * 100.0,
            a.edges.get(outcome) * 100.0,
            a.fair_odds.get(outcome)
        );
    }
    let calibrated_total = e.calibrated.sum();
    if (calibrated_total - 1.0).abs() > 1e-9 {
        println!("(calibrated probabilities sum to {:.1}% after clamping)", calibrated_total * 100.0);
    }
    let d = &a.decision;
    if d.is_bet() {
        println!(
            "BET {} @ {:.2}: stake {:.2} ({:.2}% of bankroll), Kelly f* {:.4}, potential profit {:.2}",
            d.candidate,
            d.odds,
            d.stake,
            d.stake_fraction * 100.0,
            d.kelly_fraction,
            d.potential_profit
        );
    } else {
        println!(
            "NO BET: best edge {:+.2}% on {} ({:?})",
            d.edge * 100.0,
            d.candidate,
            d.no_bet_reason
        );
    }
}
