use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::bias::{anon_hash, dev_logging_enabled, BiasHandle};
use crate::journal::{now_unix, EntryStore};
use crate::pipeline::EntryAnalysis;
use crate::sentiment::{ScoreResult, SentimentScorer};
use crate::summary::{self, WeeklySummary};
use crate::trend::{analyze_series, TrendParams, TrendReport};

const WEEK_SECS: u64 = 7 * 24 * 3600;

#[derive(Clone)]
pub struct AppState {
    scorer: Arc<SentimentScorer>,
    bias: BiasHandle,
    journal: Arc<EntryStore>,
}

impl AppState {
    pub fn new(bias: BiasHandle) -> Self {
        Self {
            scorer: Arc::new(SentimentScorer::new()),
            bias,
            journal: Arc::new(EntryStore::with_capacity(2000)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/entries", post(submit_entry))
        .route("/timeline", get(timeline))
        .route("/summary/weekly", get(weekly_summary))
        .route("/debug/recent", get(debug_recent))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct AnalyzeReq {
    text: String,
}

/// Score only, nothing recorded. Used by the editor's live preview.
async fn analyze(State(state): State<AppState>, Json(body): Json<AnalyzeReq>) -> Json<ScoreResult> {
    Json(state.scorer.score(&body.text))
}

#[derive(serde::Deserialize)]
struct EntryReq {
    text: String,
    #[serde(default)]
    ts_unix: Option<u64>, // submission time when absent
}

#[derive(serde::Serialize)]
struct EntryResp {
    id: u64,
    #[serde(flatten)]
    analysis: EntryAnalysis,
}

/// Score + classify an entry and record it in the journal. Entries are scored
/// exactly once here; nothing downstream rescores them.
async fn submit_entry(
    State(state): State<AppState>,
    Json(body): Json<EntryReq>,
) -> Json<EntryResp> {
    let score = state.scorer.score(&body.text);
    let findings = state.bias.classify(&body.text, score.valence);
    let analysis = EntryAnalysis { score, findings };

    let id = state.journal.push(&body.text, &analysis, body.ts_unix);

    if dev_logging_enabled() {
        // Never log raw entry text; hashed id + scores only.
        info!(
            target: "journal",
            id,
            text_id = %anon_hash(&body.text),
            valence = analysis.score.valence,
            findings = analysis.findings.len(),
            "entry scored"
        );
    }

    Json(EntryResp { id, analysis })
}

#[derive(serde::Deserialize)]
struct TimelineQuery {
    #[serde(default)]
    window_days: Option<i64>,
    #[serde(default)]
    volatility_threshold: Option<f64>,
    #[serde(default)]
    shift_threshold: Option<f64>,
}

/// Rolling statistics over the journal's full valence series.
async fn timeline(
    State(state): State<AppState>,
    Query(q): Query<TimelineQuery>,
) -> Result<Json<TrendReport>, (StatusCode, String)> {
    let mut params = TrendParams::default();
    if let Some(d) = q.window_days {
        params.window_days = d.max(1);
    }
    if let Some(v) = q.volatility_threshold {
        params.volatility_threshold = v;
    }
    if let Some(s) = q.shift_threshold {
        params.shift_threshold = s;
    }

    let series = state.journal.series();
    analyze_series(&series, &params)
        .map(Json)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn weekly_summary(State(state): State<AppState>) -> Json<WeeklySummary> {
    let since = now_unix().saturating_sub(WEEK_SECS);
    let entries = state.journal.snapshot_since(since);
    Json(summary::generate_summary(&entries))
}

#[derive(serde::Serialize)]
struct RecentOut {
    id: u64,
    ts_unix: u64,
    text_id: String,
    valence: f64,
    sentiment_score: f64,
    dominant_emotion: String,
    finding_categories: Vec<String>,
}

/// Last few scored entries for diagnostics. Raw text stays private; only the
/// anonymous hash leaves the store.
async fn debug_recent(State(state): State<AppState>) -> Json<Vec<RecentOut>> {
    let rows = state.journal.snapshot_last_n(10);
    let out = rows
        .into_iter()
        .map(|r| RecentOut {
            id: r.id,
            ts_unix: r.ts_unix,
            text_id: anon_hash(&r.text),
            valence: r.valence,
            sentiment_score: r.sentiment_score,
            dominant_emotion: r.dominant_emotion,
            finding_categories: r.finding_categories,
        })
        .collect::<Vec<_>>();
    Json(out)
}
