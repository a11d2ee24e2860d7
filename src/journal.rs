//! journal.rs — in-memory, capacity-bounded store of scored entries.
//!
//! Entries are append-only: an entry is scored once at submission and never
//! rescored, so readers only ever see immutable rows. The persisted-store
//! integration lives outside this crate; this is the engine-side accumulation
//! point that the timeline and weekly summary derive their series from.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::pipeline::EntryAnalysis;
use crate::trend::SeriesPoint;

#[derive(Debug, Clone)]
pub struct EntryRecord {
    pub id: u64,
    pub ts_unix: u64,
    pub text: String,
    pub sentiment_score: f64,
    pub valence: f64,
    pub dominant_emotion: String,
    pub finding_categories: Vec<String>,
}

#[derive(Debug)]
pub struct EntryStore {
    inner: Mutex<Inner>,
    cap: usize,
}

#[derive(Debug)]
struct Inner {
    rows: Vec<EntryRecord>,
    next_id: u64,
}

impl EntryStore {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.min(10_000);
        Self {
            inner: Mutex::new(Inner {
                rows: Vec::with_capacity(cap),
                next_id: 1,
            }),
            cap,
        }
    }

    /// Record a scored entry. If `ts_unix` is `None`, current time is used.
    /// Oldest rows are dropped once the capacity is exceeded.
    pub fn push(&self, text: &str, analysis: &EntryAnalysis, ts_unix: Option<u64>) -> u64 {
        let ts = ts_unix.unwrap_or_else(now_unix);
        let mut inner = self.inner.lock().expect("journal mutex poisoned");

        let id = inner.next_id;
        inner.next_id += 1;

        inner.rows.push(EntryRecord {
            id,
            ts_unix: ts,
            text: text.to_string(),
            sentiment_score: analysis.score.sentiment_score,
            valence: analysis.score.valence,
            dominant_emotion: analysis.score.dominant_emotion.clone(),
            finding_categories: analysis
                .findings
                .iter()
                .map(|f| f.category.clone())
                .collect(),
        });

        if inner.rows.len() > self.cap {
            let excess = inner.rows.len() - self.cap;
            inner.rows.drain(0..excess);
        }
        id
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<EntryRecord> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        let len = inner.rows.len();
        let start = len.saturating_sub(n);
        inner.rows[start..].to_vec()
    }

    /// Entries recorded at or after `since_unix`.
    pub fn snapshot_since(&self, since_unix: u64) -> Vec<EntryRecord> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        inner
            .rows
            .iter()
            .filter(|r| r.ts_unix >= since_unix)
            .cloned()
            .collect()
    }

    /// The full (timestamp, valence) series, ordered by timestamp. Rows are
    /// appended with caller-supplied timestamps, so a sort keeps the series
    /// valid for the analyzer even when entries arrived out of order.
    pub fn series(&self) -> Vec<SeriesPoint> {
        let inner = self.inner.lock().expect("journal mutex poisoned");
        let mut points: Vec<SeriesPoint> = inner
            .rows
            .iter()
            .map(|r| SeriesPoint {
                timestamp: to_datetime(r.ts_unix),
                valence: r.valence,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("journal mutex poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_datetime(ts_unix: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(ts_unix as i64, 0).unwrap_or_default()
}

pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
