use anyhow::{anyhow, bail, Result};

use crate::error::EngineResult;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod memory;
pub mod models;
pub use memory::InMemoryRatings;
use models::*;

/// Canonical store key for a team name: trimmed, inner whitespace collapsed.
/// Lookups are case-insensitive on top of this.
pub fn team_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key-value contract between the engine and whatever persists ratings.
///
/// The store owns atomicity: `apply_match_result` reads both ratings, runs
/// `update` and writes both ratings plus the match row as one step. No other
/// update of the same store may interleave with it.
pub trait RatingStore {
    /// Current rating for `team`, `None` if never rated.
    fn rating(&self, team: &str) -> Result<Option<f64>>;

    /// All stored ratings, highest first.
    fn ratings(&self) -> Result<Vec<TeamRating>>;

    /// Read-modify-write of both teams' ratings. Teams never rated start at
    /// `initial_rating`. Nothing is written when `update` fails.
    fn apply_match_result<F>(
        &self,
        result: &MatchResult,
        initial_rating: f64,
        update: F,
    ) -> Result<AppliedMatch>
    where
        F: FnOnce(f64, f64) -> EngineResult<(f64, f64)>;
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        self.conn()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Bets ──────────────────────────────────────────────────────────────────

    /// Insert a new bet
    pub fn insert_bet(&self, bet: &BetRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bets (
                placed_at, home_team, away_team, outcome, odds, stake,
                true_probability, market_probability, edge,
                result, profit_loss, settled_at, match_date, preset
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                bet.placed_at,
                bet.home_team,
                bet.away_team,
                bet.outcome,
                bet.odds,
                bet.stake,
                bet.true_probability,
                bet.market_probability,
                bet.edge,
                bet.result,
                bet.profit_loss,
                bet.settled_at,
                bet.match_date,
                bet.preset,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_bet(&self, id: i64) -> Result<Option<BetRecord>> {
        let conn = self.conn()?;
        let bet = conn
            .query_row(
                &format!("SELECT {BET_COLUMNS} FROM bets WHERE id=?1"),
                params![id],
                map_bet,
            )
            .optional()?;
        Ok(bet)
    }

    /// Record the result of a pending bet. Fails if the bet does not exist or
    /// was already settled.
    pub fn settle_bet(&self, id: i64, result: &str, profit_loss: f64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE bets SET result=?1, profit_loss=?2, settled_at=?3
             WHERE id=?4 AND result IS NULL",
            params![result, profit_loss, Utc::now(), id],
        )?;
        if changed != 1 {
            bail!("bet {} not found or already settled", id);
        }
        Ok(())
    }

    /// List bets, newest first
    pub fn list_bets(&self, pending_only: bool, limit: i64) -> Result<Vec<BetRecord>> {
        let conn = self.conn()?;
        let filter = if pending_only { "WHERE result IS NULL" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {BET_COLUMNS} FROM bets {filter} ORDER BY placed_at DESC, id DESC LIMIT ?1"
        ))?;
        let bets = stmt
            .query_map(params![limit], map_bet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    // ── Match results ─────────────────────────────────────────────────────────

    pub fn list_match_results(&self, limit: i64) -> Result<Vec<MatchRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, match_date, home_team, away_team, home_goals, away_goals,
                    home_rating_before, away_rating_before, recorded_at
             FROM match_results ORDER BY recorded_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], map_match)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ── Stats ─────────────────────────────────────────────────────────────────

    /// Get aggregate ledger stats
    pub fn get_stats(&self) -> Result<BettingStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
        let sum = |sql: &str| -> Result<f64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };

        let total_bets = count("SELECT COUNT(*) FROM bets")?;
        let settled_bets = count("SELECT COUNT(*) FROM bets WHERE result IS NOT NULL")?;
        let wins = count("SELECT COUNT(*) FROM bets WHERE result='win'")?;
        let losses = count("SELECT COUNT(*) FROM bets WHERE result='loss'")?;
        let pushes = count("SELECT COUNT(*) FROM bets WHERE result='push'")?;
        let total_staked = sum("SELECT COALESCE(SUM(stake),0) FROM bets")?;
        let settled_stake = sum("SELECT COALESCE(SUM(stake),0) FROM bets WHERE result IS NOT NULL")?;
        let total_profit_loss =
            sum("SELECT COALESCE(SUM(profit_loss),0) FROM bets WHERE profit_loss IS NOT NULL")?;

        let decided = wins + losses;
        Ok(BettingStats {
            total_bets,
            settled_bets,
            pending_bets: total_bets - settled_bets,
            wins,
            losses,
            pushes,
            win_rate: if decided > 0 {
                wins as f64 / decided as f64 * 100.0
            } else {
                0.0
            },
            total_staked,
            pending_stake: total_staked - settled_stake,
            total_profit_loss,
            roi: if settled_stake > 0.0 {
                total_profit_loss / settled_stake * 100.0
            } else {
                0.0
            },
        })
    }
}

impl RatingStore for Database {
    fn rating(&self, team: &str) -> Result<Option<f64>> {
        let conn = self.conn()?;
        Ok(stored_rating(&conn, team)?)
    }

    fn ratings(&self) -> Result<Vec<TeamRating>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT team_name, rating, last_updated FROM team_ratings
             ORDER BY rating DESC, team_name ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TeamRating {
                    team_name: row.get(0)?,
                    rating: row.get(1)?,
                    last_updated: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn apply_match_result<F>(
        &self,
        result: &MatchResult,
        initial_rating: f64,
        update: F,
    ) -> Result<AppliedMatch>
    where
        F: FnOnce(f64, f64) -> EngineResult<(f64, f64)>,
    {
        let home = team_key(&result.home_team);
        let away = team_key(&result.away_team);
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front, so other connections to the
        // same file cannot read stale ratings in between.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let home_before = stored_rating(&tx, &home)?.unwrap_or(initial_rating);
        let away_before = stored_rating(&tx, &away)?.unwrap_or(initial_rating);
        let (home_after, away_after) = update(home_before, away_before)?;

        let now = Utc::now();
        for (team, rating) in [(&home, home_after), (&away, away_after)] {
            tx.execute(
                "INSERT INTO team_ratings (team_name, rating, last_updated) VALUES (?1,?2,?3)
                 ON CONFLICT(team_name) DO UPDATE SET
                    rating=excluded.rating,
                    last_updated=excluded.last_updated",
                params![team, rating, now],
            )?;
        }
        tx.execute(
            "INSERT INTO match_results (
                match_date, home_team, away_team, home_goals, away_goals,
                home_rating_before, away_rating_before, recorded_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            params![
                result.match_date,
                home,
                away,
                result.home_goals,
                result.away_goals,
                home_before,
                away_before,
                now,
            ],
        )?;
        let match_id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(AppliedMatch {
            match_id,
            home_before,
            away_before,
            home_after,
            away_after,
        })
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn stored_rating(conn: &Connection, team: &str) -> rusqlite::Result<Option<f64>> {
    conn.query_row(
        "SELECT rating FROM team_ratings WHERE team_name=?1",
        params![team_key(team)],
        |row| row.get(0),
    )
    .optional()
}

const BET_COLUMNS: &str = "id, placed_at, home_team, away_team, outcome, odds, stake,
    true_probability, market_probability, edge, result, profit_loss,
    settled_at, match_date, preset";

fn map_bet(row: &rusqlite::Row) -> rusqlite::Result<BetRecord> {
    Ok(BetRecord {
        id: row.get(0)?,
        placed_at: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        outcome: row.get(4)?,
        odds: row.get(5)?,
        stake: row.get(6)?,
        true_probability: row.get(7)?,
        market_probability: row.get(8)?,
        edge: row.get(9)?,
        result: row.get(10)?,
        profit_loss: row.get(11)?,
        settled_at: row.get(12)?,
        match_date: row.get(13)?,
        preset: row.get(14)?,
    })
}

fn map_match(row: &rusqlite::Row) -> rusqlite::Result<MatchRecord> {
    Ok(MatchRecord {
        id: row.get(0)?,
        match_date: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        home_goals: row.get(4)?,
        away_goals: row.get(5)?,
        home_rating_before: row.get(6)?,
        away_rating_before: row.get(7)?,
        recorded_at: row.get(8)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bets (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    placed_at          TEXT    NOT NULL,
    home_team          TEXT    NOT NULL,
    away_team          TEXT    NOT NULL,
    outcome            TEXT    NOT NULL,
    odds               REAL    NOT NULL,
    stake              REAL    NOT NULL,
    true_probability   REAL    NOT NULL,
    market_probability REAL    NOT NULL,
    edge               REAL    NOT NULL,
    result             TEXT,
    profit_loss        REAL,
    settled_at         TEXT,
    match_date         TEXT,
    preset             TEXT
);

CREATE TABLE IF NOT EXISTS team_ratings (
    team_name    TEXT PRIMARY KEY COLLATE NOCASE,
    rating       REAL NOT NULL,
    last_updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS match_results (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    match_date         TEXT,
    home_team          TEXT    NOT NULL,
    away_team          TEXT    NOT NULL,
    home_goals         INTEGER NOT NULL,
    away_goals         INTEGER NOT NULL,
    home_rating_before REAL    NOT NULL,
    away_rating_before REAL    NOT NULL,
    recorded_at        TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bets_result ON bets(result);
"#;
