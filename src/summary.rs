//! # Weekly Summary
//! Rule-based weekly rollup: keyword theme extraction, emotional-pattern
//! labels derived from the valence series, bias-category frequencies, and a
//! composed human-readable summary text. Pure computation over snapshots.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::journal::EntryRecord;

/// Theme keyword banks; the top three themes by hit count are reported.
const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "work",
        &["work", "job", "career", "office", "boss", "colleague", "project"],
    ),
    (
        "relationships",
        &["friend", "family", "partner", "love", "relationship", "people"],
    ),
    (
        "health",
        &["health", "exercise", "fitness", "illness", "pain", "sleep", "energy"],
    ),
    (
        "goals",
        &["goal", "plan", "future", "dream", "want", "hope", "aspiration"],
    ),
    (
        "challenges",
        &["difficult", "hard", "challenge", "struggle", "problem", "issue"],
    ),
    (
        "gratitude",
        &["thankful", "grateful", "appreciate", "blessed", "lucky"],
    ),
    (
        "stress",
        &["stress", "anxious", "worried", "overwhelmed", "pressure"],
    ),
    (
        "growth",
        &["learn", "grow", "improve", "develop", "progress", "better"],
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub summary_text: String,
    pub themes: Vec<String>,
    pub emotions: Vec<String>,
    pub entry_count: usize,
    /// How often each bias category was flagged across the week's entries.
    pub bias_frequency: BTreeMap<String, usize>,
}

/// Build the weekly rollup from the week's entry snapshots.
pub fn generate_summary(entries: &[EntryRecord]) -> WeeklySummary {
    if entries.is_empty() {
        return WeeklySummary {
            summary_text: "No entries this week to summarize.".to_string(),
            themes: Vec::new(),
            emotions: Vec::new(),
            entry_count: 0,
            bias_frequency: BTreeMap::new(),
        };
    }

    let themes = extract_themes(entries);
    let valences: Vec<f64> = entries.iter().map(|e| e.valence).collect();
    let emotions = emotional_patterns(&valences);
    let bias_frequency = bias_frequency(entries);
    let summary_text = compose_text(entries, &themes, &emotions);

    WeeklySummary {
        summary_text,
        themes,
        emotions,
        entry_count: entries.len(),
        bias_frequency,
    }
}

/// Count findings per bias category across a set of entries.
pub fn bias_frequency(entries: &[EntryRecord]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for e in entries {
        for cat in &e.finding_categories {
            *out.entry(cat.clone()).or_insert(0) += 1;
        }
    }
    out
}

/// Top three themes by number of distinct keywords present anywhere in the
/// week's combined text.
fn extract_themes(entries: &[EntryRecord]) -> Vec<String> {
    let all_text = entries
        .iter()
        .map(|e| e.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut counts: Vec<(&str, usize)> = THEME_KEYWORDS
        .iter()
        .map(|(theme, keywords)| {
            let count = keywords.iter().filter(|kw| all_text.contains(*kw)).count();
            (*theme, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(3)
        .map(|(theme, _)| theme.to_string())
        .collect()
}

/// Emotional-pattern labels from the valence series: overall tone, a
/// volatility flag, and a week-internal direction when enough entries exist.
fn emotional_patterns(valences: &[f64]) -> Vec<String> {
    let mut out = Vec::new();
    if valences.is_empty() {
        return out;
    }

    let mean = valences.iter().sum::<f64>() / valences.len() as f64;
    if mean > 0.3 {
        out.push("Positive".to_string());
    } else if mean < -0.3 {
        out.push("Negative".to_string());
    } else {
        out.push("Neutral".to_string());
    }

    if valences.len() > 1 {
        let var = valences.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (valences.len() - 1) as f64;
        if var.sqrt() > 0.4 {
            out.push("Volatile".to_string());
        }
    }

    if valences.len() >= 3 {
        let recent = valences[valences.len() - 3..].iter().sum::<f64>() / 3.0;
        let earlier = valences[..3].iter().sum::<f64>() / 3.0;
        if recent > earlier + 0.2 {
            out.push("Improving".to_string());
        } else if recent < earlier - 0.2 {
            out.push("Declining".to_string());
        }
    }

    out
}

fn compose_text(entries: &[EntryRecord], themes: &[String], emotions: &[String]) -> String {
    let mut parts = Vec::new();

    let n = entries.len();
    let plural = if n != 1 { "s" } else { "" };
    parts.push(format!("This week, you journaled {n} time{plural}."));

    if !themes.is_empty() {
        parts.push(format!(
            "Your entries frequently touched on: {}.",
            themes.join(", ")
        ));
    }

    if let Some(dominant) = emotions.first() {
        parts.push(format!(
            "Your emotional landscape was primarily {}.",
            dominant.to_lowercase()
        ));
        if emotions.len() > 1 {
            parts.push(format!(
                "You also experienced {} patterns.",
                emotions[1..].join(", ").to_lowercase()
            ));
        }
    }

    // A reflection from the most substantial entry of the week.
    if let Some(sample) = entries.iter().max_by_key(|e| e.text.len()) {
        let preview: String = sample.text.chars().take(200).collect();
        let ellipsis = if sample.text.chars().count() > 200 { "..." } else { "" };
        parts.push("Here's a reflection from your week:".to_string());
        parts.push(format!("\"{preview}{ellipsis}\""));
    }

    parts.push("Continue reflecting to discover deeper patterns in your emotional journey.".to_string());
    parts.join(" ")
}
