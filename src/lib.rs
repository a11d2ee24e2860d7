// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod bias;
pub mod journal;
pub mod pipeline;
pub mod sentiment;
pub mod summary;
pub mod trend;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::bias::{BiasEngine, BiasFinding, BiasHandle};
pub use crate::pipeline::{analyze_entry, EntryAnalysis};
pub use crate::sentiment::{ScoreResult, SentimentScorer};
pub use crate::summary::{generate_summary, WeeklySummary};
pub use crate::trend::{analyze_series, SeriesError, SeriesPoint, TrendLabel, TrendParams};
