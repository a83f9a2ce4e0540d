use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use super::models::{AppliedMatch, MatchResult, TeamRating};
use super::{team_key, RatingStore};
use crate::error::EngineResult;

/// Process-local rating store. Used for what-if analyses that must not touch
/// the persisted ratings, and in tests.
#[derive(Default)]
pub struct InMemoryRatings {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Lower-cased key → rating
    ratings: HashMap<String, TeamRating>,
    matches_applied: i64,
}

impl InMemoryRatings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing ratings (e.g. a snapshot of the persisted store).
    pub fn from_ratings(ratings: impl IntoIterator<Item = (String, f64)>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            let now = Utc::now();
            for (team, rating) in ratings {
                let name = team_key(&team);
                inner.ratings.insert(
                    name.to_lowercase(),
                    TeamRating {
                        team_name: name,
                        rating,
                        last_updated: now,
                    },
                );
            }
        }
        store
    }

    #[cfg(test)]
    pub fn match_count(&self) -> Result<i64> {
        Ok(self.lock()?.matches_applied)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("rating store mutex poisoned"))
    }
}

impl RatingStore for InMemoryRatings {
    fn rating(&self, team: &str) -> Result<Option<f64>> {
        let key = team_key(team).to_lowercase();
        Ok(self.lock()?.ratings.get(&key).map(|r| r.rating))
    }

    fn ratings(&self) -> Result<Vec<TeamRating>> {
        let mut all: Vec<TeamRating> = self.lock()?.ratings.values().cloned().collect();
        all.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        Ok(all)
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
        // One guard for the whole read-modify-write.
        let mut inner = self.lock()?;
        let home = team_key(&result.home_team);
        let away = team_key(&result.away_team);
        let current = |inner: &Inner, team: &str| {
            inner
                .ratings
                .get(&team.to_lowercase())
                .map_or(initial_rating, |r| r.rating)
        };
        let home_before = current(&*inner, &home);
        let away_before = current(&*inner, &away);
        let (home_after, away_after) = update(home_before, away_before)?;

        let now = Utc::now();
        for (team, rating) in [(home, home_after), (away, away_after)] {
            inner
                .ratings
                .entry(team.to_lowercase())
                .and_modify(|r| {
                    r.rating = rating;
                    r.last_updated = now;
                })
                .or_insert(TeamRating {
                    team_name: team,
                    rating,
                    last_updated: now,
                });
        }
        inner.matches_applied += 1;
        Ok(AppliedMatch {
            match_id: inner.matches_applied,
            home_before,
            away_before,
            home_after,
            away_after,
        })
    }
}
