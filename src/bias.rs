// src/bias.rs
//! Cognitive-bias classifier: catalog config types, regex compilation,
//! contextual confidence dampening, and finding extraction.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

// --- env defaults & names ---
pub const DEFAULT_BIAS_CONFIG_PATH: &str = "config/bias.toml";
pub const DEFAULT_BIAS_THRESHOLD: f64 = 0.5;

pub const ENV_BIAS_CONFIG_PATH: &str = "BIAS_CONFIG_PATH";
pub const ENV_BIAS_THRESHOLD: &str = "BIAS_THRESHOLD";

/// Catalog shipped with the binary; used when no config file is present.
const BUILTIN_BIAS_TOML: &str = include_str!("../config/bias.toml");

// Dev logging gate: MIRROR_DEV_LOG=1 AND dev env (debug build or APP_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("MIRROR_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("APP_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short anonymous id for an entry text. Journal entries are private; logs
/// carry only this hash, never the raw text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for classifier events.
fn dev_log_findings(text: &str, valence: f64, findings: &[BiasFinding]) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let categories: Vec<&str> = findings.iter().map(|f| f.category.as_str()).collect();
    info!(target: "bias", %id, valence, count = findings.len(), ?categories);
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
}

/// One detected cognitive-bias pattern in an entry. At most one per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFinding {
    pub category: String,
    /// Matched text with surrounding context, ellipsis-marked if truncated.
    pub excerpt: String,
    pub explanation: String,
    /// Adjusted confidence in [0, 1].
    pub confidence: f64,
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct BiasRoot {
    pub classifier: ClassifierSection,
    pub categories: Vec<CategoryCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    pub threshold: f64,
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_excerpt_context")]
    pub excerpt_context: usize,
    #[serde(default = "default_negation_factor")]
    pub negation_factor: f64,
    #[serde(default = "default_qualifier_factor")]
    pub qualifier_factor: f64,
    #[serde(default)]
    pub negations: Vec<String>,
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

fn default_max_findings() -> usize {
    5
}
fn default_context_window() -> usize {
    50
}
fn default_excerpt_context() -> usize {
    40
}
fn default_negation_factor() -> f64 {
    0.7
}
fn default_qualifier_factor() -> f64 {
    0.85
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCfg {
    pub id: String,
    pub label: String,
    pub explanation: String,
    /// Category is evaluated only when entry valence is strictly below this.
    #[serde(default)]
    pub max_valence: Option<f64>,
    pub patterns: Vec<PatternCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternCfg {
    pub pattern: String,
    pub confidence: f64,
}

/* ----------------------------
Compiled engine structures
---------------------------- */

#[derive(Debug)]
struct CompiledCategory {
    cfg: CategoryCfg,
    rules: Vec<(Regex, f64)>,
}

/// Holds the compiled catalog and classifies entry text against it.
#[derive(Debug)]
pub struct BiasEngine {
    pub cfg: ClassifierSection,
    categories: Vec<CompiledCategory>,
}

impl BiasEngine {
    /// Load from BIAS_CONFIG_PATH (default "config/bias.toml"); fall back to
    /// the built-in catalog when the file does not exist.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_BIAS_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BIAS_CONFIG_PATH));

        let mut eng = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("failed to read bias catalog at {}: {}", path.display(), e)
            })?;
            Self::from_toml_str(&content)?
        } else {
            Self::builtin()
        };

        // optional: override threshold from env
        if let Some(t) = parse_threshold_env(std::env::var(ENV_BIAS_THRESHOLD).ok()) {
            eng.cfg.threshold = t;
        } else if !eng.cfg.threshold.is_finite() {
            eng.cfg.threshold = DEFAULT_BIAS_THRESHOLD;
        }

        Ok(eng)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_BIAS_TOML).expect("built-in bias catalog is valid")
    }

    /// Load from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: BiasRoot = toml::from_str(toml_str)?;
        let categories = root
            .categories
            .iter()
            .cloned()
            .map(|c| {
                let rules = c
                    .patterns
                    .iter()
                    .map(|p| {
                        let re = Regex::new(&p.pattern).map_err(|e| {
                            anyhow::anyhow!("category `{}` regex error: {}", c.id, e)
                        })?;
                        Ok((re, p.confidence))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(CompiledCategory { cfg: c, rules })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            cfg: root.classifier,
            categories,
        })
    }

    /// Classify entry text given its sentiment valence. Returns at most
    /// `max_findings` findings, one per category, sorted by confidence
    /// descending. Empty/whitespace text returns no findings.
    pub fn classify(&self, text: &str, valence: f64) -> Vec<BiasFinding> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let lower = text.to_lowercase();
        // Match offsets are relative to the lowercased text; excerpts come
        // from the original text only when lowercasing preserved byte length.
        let excerpt_source = if text.len() == lower.len() { text } else { &lower };

        let mut findings = Vec::new();
        for cat in &self.categories {
            if let Some(max_v) = cat.cfg.max_valence {
                if valence >= max_v {
                    continue;
                }
            }

            let mut best: Option<(f64, (usize, usize))> = None;
            for (re, base) in &cat.rules {
                for m in re.find_iter(&lower) {
                    let adjusted = self.adjust_confidence(&lower, m.start(), m.end(), *base);
                    if best.map(|(c, _)| adjusted > c).unwrap_or(true) {
                        best = Some((adjusted, (m.start(), m.end())));
                    }
                }
            }

            if let Some((confidence, span)) = best {
                if confidence >= self.cfg.threshold {
                    findings.push(BiasFinding {
                        category: cat.cfg.label.clone(),
                        excerpt: self.extract_excerpt(excerpt_source, span),
                        explanation: cat.cfg.explanation.clone(),
                        confidence: round2(confidence),
                    });
                }
            }
        }

        findings.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        findings.truncate(self.cfg.max_findings);

        dev_log_findings(text, valence, &findings);
        findings
    }

    /// Dampen base confidence when a negation or qualifier word appears within
    /// `context_window` bytes of the match (both reductions stack).
    fn adjust_confidence(&self, lower: &str, start: usize, end: usize, base: f64) -> f64 {
        let from = snap_left(lower, start.saturating_sub(self.cfg.context_window));
        let to = snap_right(lower, (end + self.cfg.context_window).min(lower.len()));
        let context = &lower[from..to];

        let mut confidence = base;
        let has_negation = context
            .split_whitespace()
            .any(|w| self.cfg.negations.iter().any(|n| word_matches(w, n)));
        if has_negation {
            confidence *= self.cfg.negation_factor;
        }

        let has_qualifier = context
            .split_whitespace()
            .any(|w| self.cfg.qualifiers.iter().any(|q| w == q));
        if has_qualifier {
            confidence *= self.cfg.qualifier_factor;
        }

        confidence
    }

    /// Matched text plus `excerpt_context` bytes either side, ellipsis-marked
    /// when truncated.
    fn extract_excerpt(&self, source: &str, (start, end): (usize, usize)) -> String {
        let from = snap_left(source, start.saturating_sub(self.cfg.excerpt_context));
        let to = snap_right(source, (end + self.cfg.excerpt_context).min(source.len()));

        let mut excerpt = source[from..to].trim().to_string();
        if from > 0 {
            excerpt = format!("...{excerpt}");
        }
        if to < source.len() {
            excerpt.push_str("...");
        }
        excerpt
    }
}

/// A context word counts as a negation when it equals the configured word, or
/// for the "n't" entry, when it is a negative contraction like "don't".
fn word_matches(word: &str, negation: &str) -> bool {
    if negation == "n't" {
        word.ends_with("n't")
    } else {
        word == negation
    }
}

fn snap_left(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn snap_right(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle that can hot-reload the underlying engine in dev/local.
/// - Enable by setting BIAS_HOT_RELOAD=1
/// - Dev-gated: active only if cfg!(debug_assertions) OR APP_ENV is "local"/"development".
#[derive(Clone)]
pub struct BiasHandle {
    inner: Arc<RwLock<BiasEngine>>,
}

impl BiasHandle {
    pub fn new(engine: BiasEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn classify(&self, text: &str, valence: f64) -> Vec<BiasFinding> {
        if let Ok(eng) = self.inner.read() {
            eng.classify(text, valence)
        } else {
            Vec::new()
        }
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("BIAS_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("APP_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Start a simple polling watcher on `path` to hot-reload into `handle.inner`.
/// Polls mtime every 2s. Uses only std, no external deps.
pub fn start_hot_reload_thread(handle: BiasHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        // Reload file and swap engine atomically
                        if let Ok(content) = fs::read_to_string(&path) {
                            if let Ok(new_engine) = BiasEngine::from_toml_str(&content) {
                                if let Ok(mut guard) = handle.inner.write() {
                                    *guard = new_engine;
                                }
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal, deterministic catalog used only for tests.
    const TEST_TOML: &str = r#"
[classifier]
threshold = 0.5
max_findings = 5
negations = ["not", "no", "never", "n't"]
qualifiers = ["maybe", "sometimes", "might"]

[[categories]]
id = "catastrophizing"
label = "Catastrophizing"
max_valence = -0.15
explanation = "Worst-case framing."
patterns = [
    { pattern = "\\b(everything|nothing)\\b.{0,30}(ruined|terrible)", confidence = 0.9 },
]

[[categories]]
id = "overgeneralization"
label = "Overgeneralization"
explanation = "Broad conclusions from single events."
patterns = [
    { pattern = "\\b(i|we|they) (always|never)\\b", confidence = 0.75 },
]
"#;

    fn eng() -> BiasEngine {
        BiasEngine::from_toml_str(TEST_TOML).expect("load test catalog")
    }

    #[test]
    fn match_produces_single_finding_per_category() {
        let e = eng();
        let out = e.classify("everything is ruined and everything feels ruined again", -0.5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, "Catastrophizing");
        assert!((out[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn negation_in_context_lowers_confidence() {
        let e = eng();
        let plain = e.classify("everything is ruined", -0.5);
        let hedged = e.classify("i don't think everything is ruined", -0.5);
        assert_eq!(plain.len(), 1);
        assert_eq!(hedged.len(), 1);
        assert!(hedged[0].confidence < plain[0].confidence);
        // 0.9 * 0.7
        assert!((hedged[0].confidence - 0.63).abs() < 1e-9);
    }

    #[test]
    fn qualifier_and_negation_stack() {
        let e = eng();
        let out = e.classify("maybe i don't think everything is ruined", -0.5);
        // 0.9 * 0.7 * 0.85 = 0.5355 -> rounds to 0.54
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.54).abs() < 1e-9);
    }

    #[test]
    fn dampened_below_threshold_is_dropped() {
        let e = eng();
        // 0.75 * 0.7 = 0.525 still passes; 0.75 * 0.7 * 0.85 = 0.446 does not.
        let kept = e.classify("i never finish anything, not once", 0.0);
        assert_eq!(kept.len(), 1);
        let dropped = e.classify("maybe i never finish anything, not once", 0.0);
        assert!(dropped.is_empty());
    }

    #[test]
    fn valence_gate_skips_category() {
        let e = eng();
        let out = e.classify("everything is ruined", 0.5);
        assert!(
            out.iter().all(|f| f.category != "Catastrophizing"),
            "gated category must not fire at positive valence: {out:?}"
        );
    }

    #[test]
    fn empty_text_yields_no_findings() {
        let e = eng();
        assert!(e.classify("", -0.9).is_empty());
        assert!(e.classify("   \n", -0.9).is_empty());
    }

    #[test]
    fn excerpt_marks_truncation() {
        let e = eng();
        let text = format!(
            "{} everything is ruined {}",
            "long preamble before the match ".repeat(3),
            "and a long tail after the match".repeat(3)
        );
        let out = e.classify(&text, -0.5);
        assert_eq!(out.len(), 1);
        assert!(out[0].excerpt.starts_with("..."));
        assert!(out[0].excerpt.ends_with("..."));
        assert!(out[0].excerpt.contains("everything is ruined"));
    }

    #[test]
    fn builtin_catalog_compiles() {
        let e = BiasEngine::builtin();
        assert!((e.cfg.threshold - 0.5).abs() < 1e-9);
        assert_eq!(e.cfg.max_findings, 5);
    }
}
