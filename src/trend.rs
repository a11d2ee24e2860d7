//! # Trend / Volatility Analyzer
//! Rolling statistics over an ordered (timestamp, valence) series: trailing
//! time-window mean, trailing sample standard deviation, mood-shift events,
//! and a summary trend label. Pure computation over an immutable slice.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observation in a user's sentiment series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub valence: f64,
}

/// Tunable thresholds. Defaults match the dashboard contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendParams {
    /// Trailing time window for the rolling mean, in days.
    pub window_days: i64,
    /// Trailing sample count for the rolling standard deviation.
    pub volatility_window: usize,
    /// Rolling std above this marks a volatile period.
    pub volatility_threshold: f64,
    /// Absolute valence change from the previous entry that counts as a shift.
    pub shift_threshold: f64,
    /// How many of the latest entries feed the trend label.
    pub recent_entries: usize,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            window_days: 7,
            volatility_window: 7,
            volatility_threshold: 0.5,
            shift_threshold: 0.3,
            recent_entries: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendLabel::Improving => "Improving",
            TrendLabel::Declining => "Declining",
            TrendLabel::Stable => "Stable",
        };
        f.write_str(s)
    }
}

/// Invalid series input. Rolling statistics would silently corrupt on NaN or
/// unordered timestamps, so the analyzer rejects the whole series instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    #[error("non-finite valence at series index {0}")]
    NonFiniteValence(usize),
    #[error("valence out of [-1, 1] at series index {0}")]
    ValenceOutOfRange(usize),
    #[error("timestamps not in ascending order at series index {0}")]
    Unordered(usize),
}

/// Per-point rolling statistics plus the summary trend label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    /// Mean valence over the trailing time window, one value per point.
    pub rolling_avg: Vec<f64>,
    /// Rolling sample std; `None` until two samples are available.
    pub volatility: Vec<Option<f64>>,
    /// Whether each point sits in a volatile period.
    pub volatile: Vec<bool>,
    /// Whether each point is a mood shift from its predecessor.
    pub shifts: Vec<bool>,
    /// Absolute change from the previous point (0.0 for the first).
    pub shift_magnitude: Vec<f64>,
    pub trend_label: TrendLabel,
    pub overall_mean: f64,
    pub recent_mean: f64,
}

/// Analyze a time-ordered series. Empty input yields empty statistics and a
/// `Stable` label; a single point yields its own valence as the rolling
/// average and undefined volatility.
pub fn analyze_series(
    series: &[SeriesPoint],
    params: &TrendParams,
) -> Result<TrendReport, SeriesError> {
    validate(series)?;

    let n = series.len();
    if n == 0 {
        return Ok(TrendReport {
            rolling_avg: Vec::new(),
            volatility: Vec::new(),
            volatile: Vec::new(),
            shifts: Vec::new(),
            shift_magnitude: Vec::new(),
            trend_label: TrendLabel::Stable,
            overall_mean: 0.0,
            recent_mean: 0.0,
        });
    }

    let window = Duration::days(params.window_days);

    let mut rolling_avg = Vec::with_capacity(n);
    let mut volatility = Vec::with_capacity(n);
    let mut volatile = Vec::with_capacity(n);
    let mut shifts = Vec::with_capacity(n);
    let mut shift_magnitude = Vec::with_capacity(n);

    for i in 0..n {
        // Trailing time window (left boundary open): minimum one sample.
        let cutoff = series[i].timestamp - window;
        let start = series[..=i]
            .iter()
            .position(|p| p.timestamp > cutoff)
            .unwrap_or(i);
        rolling_avg.push(mean(&series[start..=i]));

        // Trailing count window for volatility: minimum two samples.
        let from = (i + 1).saturating_sub(params.volatility_window);
        let std = sample_std(&series[from..=i]);
        volatile.push(std.map(|s| s > params.volatility_threshold).unwrap_or(false));
        volatility.push(std);

        // Mood shift vs. the immediately preceding point.
        let magnitude = if i == 0 {
            0.0
        } else {
            (series[i].valence - series[i - 1].valence).abs()
        };
        shifts.push(i > 0 && magnitude > params.shift_threshold);
        shift_magnitude.push(magnitude);
    }

    let overall_mean = mean(series);
    let recent_from = n.saturating_sub(params.recent_entries);
    let recent_mean = mean(&series[recent_from..]);
    let trend_label = classify_trend(recent_mean, overall_mean);

    Ok(TrendReport {
        rolling_avg,
        volatility,
        volatile,
        shifts,
        shift_magnitude,
        trend_label,
        overall_mean,
        recent_mean,
    })
}

/// Strict comparisons against a 0.1 band: a recent mean exactly at the
/// boundary is `Stable`.
fn classify_trend(recent_mean: f64, overall_mean: f64) -> TrendLabel {
    if recent_mean > overall_mean + 0.1 {
        TrendLabel::Improving
    } else if recent_mean < overall_mean - 0.1 {
        TrendLabel::Declining
    } else {
        TrendLabel::Stable
    }
}

fn validate(series: &[SeriesPoint]) -> Result<(), SeriesError> {
    for (i, p) in series.iter().enumerate() {
        if !p.valence.is_finite() {
            return Err(SeriesError::NonFiniteValence(i));
        }
        if !(-1.0..=1.0).contains(&p.valence) {
            return Err(SeriesError::ValenceOutOfRange(i));
        }
        if i > 0 && p.timestamp < series[i - 1].timestamp {
            return Err(SeriesError::Unordered(i));
        }
    }
    Ok(())
}

fn mean(points: &[SeriesPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.valence).sum::<f64>() / points.len() as f64
}

/// Sample standard deviation (n - 1 denominator); `None` below two samples.
fn sample_std(points: &[SeriesPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let m = mean(points);
    let var = points
        .iter()
        .map(|p| (p.valence - m).powi(2))
        .sum::<f64>()
        / (points.len() - 1) as f64;
    Some(var.sqrt())
}
