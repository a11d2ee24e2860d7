// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze
// - POST /entries
// - GET /timeline
// - GET /summary/weekly
// - GET /debug/recent

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use mirror_insight::api::{self, AppState};
use mirror_insight::bias::{BiasEngine, BiasHandle};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, on the built-in catalog.
fn test_router() -> Router {
    let state = AppState::new(BiasHandle::new(BiasEngine::builtin()));
    api::router(state)
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

fn post(uri: &str, payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok");
}

#[tokio::test]
async fn api_analyze_returns_expected_json_fields() {
    let app = test_router();

    let payload = json!({ "text": "I am grateful for a calm, happy day." });
    let resp = app.oneshot(post("/analyze", payload)).await.expect("oneshot");
    assert!(resp.status().is_success(), "got {}", resp.status());

    let v = read_json(resp).await;
    // Contract checks for UI consumers
    for key in [
        "sentiment_score",
        "valence",
        "confidence",
        "dominant_emotion",
        "emotions",
        "word_count",
    ] {
        assert!(v.get(key).is_some(), "missing '{key}' in {v}");
    }
    assert!(v["valence"].as_f64().unwrap() > 0.0);
    assert_eq!(v["dominant_emotion"], json!("joy"));
}

#[tokio::test]
async fn api_submit_entry_returns_analysis_with_findings() {
    let app = test_router();

    let payload = json!({
        "text": "I always fail at everything and it's going to be a disaster"
    });
    let resp = app.oneshot(post("/entries", payload)).await.expect("oneshot");
    assert!(resp.status().is_success());

    let v = read_json(resp).await;
    assert!(v["id"].as_u64().is_some(), "missing entry id: {v}");
    assert!(v["score"]["valence"].as_f64().unwrap() < -0.15);

    let findings = v["findings"].as_array().expect("findings array");
    assert!(!findings.is_empty() && findings.len() <= 5);
    for f in findings {
        assert!(f.get("category").is_some());
        assert!(f.get("excerpt").is_some());
        assert!(f.get("explanation").is_some());
        let c = f["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&c));
    }
}

#[tokio::test]
async fn api_timeline_reports_rolling_stats_after_submissions() {
    let app = test_router();

    let texts = [
        "A wonderful, happy day with friends.",
        "Everything is terrible and ruined, I feel hopeless.",
        "A quiet, ordinary day.",
    ];
    for (i, text) in texts.iter().enumerate() {
        let payload = json!({ "text": text, "ts_unix": 1_700_000_000u64 + i as u64 * 86_400 });
        let resp = app
            .clone()
            .oneshot(post("/entries", payload))
            .await
            .expect("oneshot /entries");
        assert!(resp.status().is_success());
    }

    let resp = app.oneshot(get("/timeline")).await.expect("oneshot /timeline");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["rolling_avg"].as_array().unwrap().len(), 3);
    assert_eq!(v["volatility"].as_array().unwrap().len(), 3);
    assert!(v["volatility"][0].is_null(), "first volatility undefined");
    assert_eq!(v["shifts"].as_array().unwrap().len(), 3);
    assert!(v["trend_label"].is_string());
}

#[tokio::test]
async fn api_timeline_accepts_threshold_overrides() {
    let app = test_router();

    let resp = app
        .oneshot(get(
            "/timeline?window_days=3&volatility_threshold=0.2&shift_threshold=0.1",
        ))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    // Empty journal: empty statistics, Stable label.
    assert_eq!(v["rolling_avg"].as_array().unwrap().len(), 0);
    assert_eq!(v["trend_label"], json!("Stable"));
}

#[tokio::test]
async fn api_weekly_summary_covers_recent_entries() {
    let app = test_router();

    // Empty journal first.
    let resp = app
        .clone()
        .oneshot(get("/summary/weekly"))
        .await
        .expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["entry_count"], json!(0));
    assert_eq!(v["summary_text"], json!("No entries this week to summarize."));

    // Submit one fresh entry (default timestamp = now, inside the week).
    let payload = json!({ "text": "Grateful for my friend and family, work went well." });
    let resp = app
        .clone()
        .oneshot(post("/entries", payload))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app.oneshot(get("/summary/weekly")).await.expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["entry_count"], json!(1));
    assert!(v["themes"].as_array().unwrap().len() <= 3);
}

#[tokio::test]
async fn api_debug_recent_never_exposes_raw_text() {
    let app = test_router();

    let secret = "My private thought about my colleague.";
    let resp = app
        .clone()
        .oneshot(post("/entries", json!({ "text": secret })))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let resp = app.oneshot(get("/debug/recent")).await.expect("oneshot");
    let v = read_json(resp).await;
    let rows = v.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    let serialized = v.to_string();
    assert!(!serialized.contains("private thought"), "raw text leaked: {serialized}");
    assert!(rows[0]["text_id"].as_str().unwrap().len() == 12);
}
