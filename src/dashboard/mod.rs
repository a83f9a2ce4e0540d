use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::bot::engine::{preset_label, BettingEngine, LedgerSummary};
use crate::bot::params::ModelParams;
use crate::db::models::{BetRecord, TeamRating};
use crate::db::Database;

pub struct AppState {
    pub engine: BettingEngine<Database>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConfigView {
    preset: Option<String>,
    bankroll: f64,
    params: ModelParams,
}

/// Build the Axum router for the dashboard. All routes are read-only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/bets", get(bets_handler))
        .route("/api/bets/pending", get(pending_bets_handler))
        .route("/api/ratings", get(ratings_handler))
        .route("/api/config", get(config_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

async fn index_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// GET /api/stats
async fn stats_handler(State(s): State<Arc<AppState>>) -> ApiResult<LedgerSummary> {
    s.engine.stats().map(Json).map_err(internal)
}

/// GET /api/bets?limit=50
async fn bets_handler(
    State(s): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Vec<BetRecord>> {
    s.engine
        .list_bets(false, q.limit.unwrap_or(50))
        .map(Json)
        .map_err(internal)
}

/// GET /api/bets/pending
async fn pending_bets_handler(
    State(s): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Vec<BetRecord>> {
    s.engine
        .list_bets(true, q.limit.unwrap_or(200))
        .map(Json)
        .map_err(internal)
}

/// GET /api/ratings
async fn ratings_handler(State(s): State<Arc<AppState>>) -> ApiResult<Vec<TeamRating>> {
    s.engine.ratings().map(Json).map_err(internal)
}

/// GET /api/config
async fn config_handler(State(s): State<Arc<AppState>>) -> Json<ConfigView> {
    Json(ConfigView {
        preset: s.engine.preset().map(preset_label),
        bankroll: s.engine.bankroll(),
        params: s.engine.params().clone(),
    })
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Soccer Edge Bot</title>
<style>
  :root { --bg:#0f1117; --card:#1a1d27; --border:#2a2d3a; --accent:#6c63ff; --green:#00c896; --red:#ff4f6a; --text:#e0e0e0; --muted:#8888aa; }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  .badge { padding: .2rem .6rem; border-radius: 4px; font-size: .75rem; font-weight: 700; text-transform: uppercase; background: var(--accent); }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .stats-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
  .stat-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.2rem; }
  .stat-card .label { color: var(--muted); font-size: .8rem; text-transform: uppercase; margin-bottom: .4rem; }
  .stat-card .value { font-size: 1.7rem; font-weight: 700; }
  .pos { color: var(--green); }
  .neg { color: var(--red); }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  .two-col { display: grid; grid-template-columns: 2fr 1fr; gap: 1.5rem; }
  @media (max-width: 768px) { .two-col { grid-template-columns: 1fr; } }
  .empty { color: var(--muted); text-align: center; padding: 2rem; }
</style>
</head>
<body>
<header>
  <h1>⚽ Soccer Edge Bot</h1>
  <span class="badge" id="preset-badge">…</span>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="last-updated"></span>
</header>
<main>
  <div class="stats-grid">
    <div class="stat-card"><div class="label">Bankroll</div><div class="value" id="s-bankroll">–</div></div>
    <div class="stat-card"><div class="label">Bets</div><div class="value" id="s-bets">–</div></div>
    <div class="stat-card"><div class="label">Pending</div><div class="value" id="s-pending">–</div></div>
    <div class="stat-card"><div class="label">Win Rate</div><div class="value" id="s-winrate">–</div></div>
    <div class="stat-card"><div class="label">P&L</div><div class="value" id="s-pnl">–</div></div>
    <div class="stat-card"><div class="label">ROI</div><div class="value" id="s-roi">–</div></div>
  </div>
  <div class="two-col">
    <div class="panel">
      <div class="panel-header">Recent Bets</div>
      <table>
        <thead><tr><th>Match</th><th>Pick</th><th>Odds</th><th>Stake</th><th>Edge</th><th>Result</th><th>P&L</th></tr></thead>
        <tbody id="bets-tbody"><tr><td colspan="7" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
    <div class="panel">
      <div class="panel-header">Ratings</div>
      <table>
        <thead><tr><th>Team</th><th>Elo</th></tr></thead>
        <tbody id="ratings-tbody"><tr><td colspan="2" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
  </div>
</main>
<script>
const fmt = new Intl.NumberFormat('en-US', { style:'currency', currency:'USD', minimumFractionDigits:2 });
const signed = v => (v >= 0 ? '+' : '') + fmt.format(v);
const esc = v => String(v ?? '').replace(/[&<>"']/g, c => ({ '&':'&amp;', '<':'&lt;', '>':'&gt;', '"':'&quot;', "'":'&#39;' }[c]));

async function loadStats() {
  const r = await fetch('/api/stats');
  if (!r.ok) return;
  const s = await r.json();
  document.getElementById('s-bankroll').textContent = fmt.format(s.current_bankroll);
  document.getElementById('s-bets').textContent = s.total_bets;
  document.getElementById('s-pending').textContent = s.pending_bets;
  document.getElementById('s-winrate').textContent = s.win_rate.toFixed(1) + '%';
  const pnl = document.getElementById('s-pnl');
  pnl.textContent = signed(s.total_profit_loss);
  pnl.className = 'value ' + (s.total_profit_loss >= 0 ? 'pos' : 'neg');
  document.getElementById('s-roi').textContent = s.roi.toFixed(1) + '%';
}

async function loadBets() {
  const r = await fetch('/api/bets?limit=30');
  if (!r.ok) return;
  const bets = await r.json();
  const tbody = document.getElementById('bets-tbody');
  if (!bets.length) { tbody.innerHTML = '<tr><td colspan="7" class="empty">No bets yet</td></tr>'; return; }
  tbody.innerHTML = bets.map(b => `<tr>
    <td>${esc(b.home_team)} vs ${esc(b.away_team)}</td>
    <td>${esc(b.outcome)}</td>
    <td>${b.odds.toFixed(2)}</td>
    <td>${fmt.format(b.stake)}</td>
    <td>${(b.edge*100).toFixed(1)}%</td>
    <td>${esc(b.result || 'pending')}</td>
    <td class="${(b.profit_loss||0) >= 0 ? 'pos' : 'neg'}">${b.profit_loss != null ? signed(b.profit_loss) : '–'}</td>
  </tr>`).join('');
}

async function loadRatings() {
  const r = await fetch('/api/ratings');
  if (!r.ok) return;
  const ratings = await r.json();
  const tbody = document.getElementById('ratings-tbody');
  if (!ratings.length) { tbody.innerHTML = '<tr><td colspan="2" class="empty">No ratings yet</td></tr>'; return; }
  tbody.innerHTML = ratings.slice(0,40).map(t => `<tr><td>${esc(t.team_name)}</td><td>${t.rating.toFixed(0)}</td></tr>`).join('');
}

async function loadConfig() {
  const r = await fetch('/api/config');
  if (!r.ok) return;
  const c = await r.json();
  document.getElementById('preset-badge').textContent = c.preset || 'custom';
}

async function loadAll() {
  await Promise.all([loadStats(), loadBets(), loadRatings(), loadConfig()]);
  document.getElementById('last-updated').textContent = 'Updated ' + new Date().toLocaleTimeString();
}

loadAll();
setInterval(loadAll, 15000);
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::engine::{MatchRequest, NewBet};
    use crate::bot::odds::{OddsTriple, Outcome};
    use crate::bot::params::Preset;
    use crate::bot::win_probability::MatchAdjustments;

    fn shared() -> Arc<AppState> {
        let db = Database::open_in_memory().unwrap();
        let engine = BettingEngine::new(ModelParams::v2(), Some(Preset::V2), db.clone(), db, 1000.0);
        Arc::new(AppState { engine })
    }

    #[tokio::test]
    async fn test_stats_reflect_ledger() {
        let s = shared();
        s.engine
            .place_bet(&NewBet {
                home_team: "Celtic".into(),
                away_team: "Rangers".into(),
                outcome: Outcome::Home,
                odds: 2.1,
                stake: 25.0,
                true_probability: 0.52,
                market_probability: 0.46,
                match_date: None,
            })
            .unwrap();

        let Json(summary) = stats_handler(State(s.clone())).await.unwrap();
        assert_eq!(summary.stats.pending_bets, 1);
        assert_eq!(summary.current_bankroll, 975.0);

        let Json(pending) = pending_bets_handler(State(s.clone()), Query(ListQuery { limit: None }))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].home_team, "Celtic");
    }

    #[tokio::test]
    async fn test_ratings_and_config_endpoints() {
        let s = shared();
        s.engine
            .update_ratings_from_result("Celtic", "Rangers", 2, 0, None)
            .unwrap();
        let analysis = s
            .engine
            .analyze(&MatchRequest {
                home_team: "Celtic".into(),
                away_team: "Rangers".into(),
                odds: OddsTriple::new(2.0, 3.5, 3.6),
                adjustments: MatchAdjustments::default(),
            })
            .unwrap();
        assert!(analysis.home_rating > analysis.away_rating);

        let Json(ratings) = ratings_handler(State(s.clone())).await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].team_name, "Celtic");

        let Json(view) = config_handler(State(s)).await;
        assert_eq!(view.preset.as_deref(), Some("v2"));
        assert_eq!(view.params, ModelParams::v2());
    }

    #[tokio::test]
    async fn test_index_serves_html() {
        let Html(body) = index_handler().await;
        assert!(body.contains("/api/stats"));
    }

    #[test]
    fn test_team_names_are_escaped_before_insertion() {
        for field in ["b.home_team", "b.away_team", "b.outcome", "t.team_name"] {
            assert!(DASHBOARD_HTML.contains(&format!("esc({})", field)), "{} not escaped", field);
            assert!(!DASHBOARD_HTML.contains(&format!("${{{}}}", field)), "{} inserted raw", field);
        }
    }
}
