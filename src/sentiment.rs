//! # Sentiment Scorer
//! Combines two independent polarity signals into one normalized valence:
//! - a lexicon/rule-based "compound" score in [-1, 1]
//! - a polarity score in [-1, 1] plus a subjectivity score in [0, 1]
//!
//! On top of that: per-emotion keyword counts, an intensity multiplier from
//! intensifier/downtoner words, subjectivity-adaptive blending, and a
//! confidence estimate. Pure computation, no I/O, safe to call concurrently.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

static COMPOUND_LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../lexicon/compound.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid compound lexicon")
});

static POLARITY_LEXICON: Lazy<HashMap<String, (f64, f64)>> = Lazy::new(|| {
    let raw = include_str!("../lexicon/polarity.json");
    serde_json::from_str::<HashMap<String, (f64, f64)>>(raw).expect("valid polarity lexicon")
});

/// Emotion keyword banks, in fixed order. Ties on hit counts are broken by
/// this enumeration order; no hits at all means "neutral".
const EMOTION_WORDS: &[(&str, &[&str])] = &[
    (
        "joy",
        &[
            "happy", "excited", "joyful", "delighted", "thrilled", "ecstatic", "cheerful",
            "pleased", "content", "satisfied", "grateful", "blessed",
        ],
    ),
    (
        "sadness",
        &[
            "sad", "unhappy", "depressed", "miserable", "gloomy", "heartbroken", "disappointed",
            "discouraged", "hopeless", "lonely", "empty",
        ],
    ),
    (
        "anger",
        &[
            "angry", "furious", "enraged", "irritated", "frustrated", "annoyed", "mad",
            "resentful", "bitter", "hostile", "outraged",
        ],
    ),
    (
        "fear",
        &[
            "afraid", "scared", "anxious", "worried", "nervous", "terrified", "fearful",
            "panicked", "uneasy", "apprehensive", "stressed",
        ],
    ),
    (
        "love",
        &[
            "love", "adore", "cherish", "treasure", "care", "affection", "warmth", "devotion",
            "fondness", "attachment",
        ],
    ),
    (
        "surprise",
        &[
            "surprised", "shocked", "amazed", "astonished", "stunned", "bewildered", "startled",
            "unexpected",
        ],
    ),
];

/// Intensity multipliers, matched by substring against whitespace-split words.
/// All matched multipliers compound multiplicatively; negations flip the sign.
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("absolutely", 1.4),
    ("completely", 1.4),
    ("totally", 1.4),
    ("utterly", 1.5),
    ("so", 1.2),
    ("quite", 1.1),
    ("rather", 1.1),
    ("somewhat", 0.8),
    ("slightly", 0.7),
    ("barely", 0.6),
    ("hardly", 0.6),
    ("not", -1.0),
    ("n't", -1.0),
];

/// Normalization constant for the compound score (score / sqrt(score^2 + ALPHA)).
const COMPOUND_ALPHA: f64 = 15.0;

/// Full output of the scorer. Only `sentiment_score` and `valence` are meant
/// to be persisted by callers; the rest is per-request metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Lexicon/rule-based compound score in [-1, 1].
    pub compound: f64,
    /// Share of tokens whose lexicon hit came out positive / neutral / negative.
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    /// Second model: polarity in [-1, 1] and subjectivity in [0, 1].
    pub polarity: f64,
    pub subjectivity: f64,
    /// Primary persisted score (the compound score).
    pub sentiment_score: f64,
    /// Blended, intensity-adjusted score in [-1, 1].
    pub valence: f64,
    /// Keyword hit counts per detected emotion (absent emotions omitted).
    pub emotions: BTreeMap<String, usize>,
    pub dominant_emotion: String,
    /// Confidence in [0, 1] from model agreement, subjectivity, and length.
    pub confidence: f64,
    pub word_count: usize,
}

impl ScoreResult {
    /// Neutral default for empty or whitespace-only input.
    fn neutral() -> Self {
        Self {
            compound: 0.0,
            positive: 0.0,
            neutral: 1.0,
            negative: 0.0,
            polarity: 0.0,
            subjectivity: 0.0,
            sentiment_score: 0.0,
            valence: 0.0,
            emotions: BTreeMap::new(),
            dominant_emotion: "neutral".to_string(),
            confidence: 0.0,
            word_count: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a journal entry. Empty/whitespace-only text yields the neutral
    /// default (all scores 0.0, confidence 0.0, dominant emotion "neutral").
    pub fn score(&self, text: &str) -> ScoreResult {
        if text.trim().is_empty() {
            return ScoreResult::neutral();
        }

        let lower = text.to_lowercase();
        let word_count = text.split_whitespace().count();

        let (compound, positive, neutral, negative) = compound_score(&lower);
        let (polarity, subjectivity) = polarity_score(&lower);

        let emotions = detect_emotions(&lower);
        let dominant_emotion = dominant_emotion(&emotions);

        let intensity = intensity_multiplier(&lower);
        let valence = blend_valence(compound, polarity, subjectivity, intensity);
        let confidence = confidence(compound, polarity, subjectivity, word_count);

        ScoreResult {
            compound: round3(compound),
            positive: round3(positive),
            neutral: round3(neutral),
            negative: round3(negative),
            polarity: round3(polarity),
            subjectivity: round3(subjectivity),
            sentiment_score: round3(compound),
            valence: round3(valence),
            emotions,
            dominant_emotion,
            confidence: round3(confidence),
            word_count,
        }
    }
}

/// Alphanumeric tokens, lower-cased.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

/// Negator set over alphanumeric tokens. Contractions lose their "'t" during
/// tokenization, so "don't" arrives here as "don" + "t".
fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn"
            | "wasn"
            | "aren"
            | "won"
            | "can"
            | "cannot"
            | "don"
            | "didn"
            | "couldn"
            | "wouldn"
            | "without"
    )
}

/// Lexicon compound score. A negator within the previous 1..=3 tokens inverts
/// the sign of the hit. Returns (compound, pos_share, neu_share, neg_share).
fn compound_score(lower: &str) -> (f64, f64, f64, f64) {
    let tokens: Vec<String> = tokenize(lower).collect();
    let mut sum: i64 = 0;
    let mut pos_hits = 0usize;
    let mut neg_hits = 0usize;

    for i in 0..tokens.len() {
        let base = *COMPOUND_LEXICON.get(tokens[i].as_str()).unwrap_or(&0);
        if base == 0 {
            continue;
        }
        let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
        let adj = if negated { -base } else { base };
        sum += adj as i64;
        if adj > 0 {
            pos_hits += 1;
        } else {
            neg_hits += 1;
        }
    }

    let s = sum as f64;
    let compound = s / (s * s + COMPOUND_ALPHA).sqrt();

    let n = tokens.len().max(1) as f64;
    let positive = pos_hits as f64 / n;
    let negative = neg_hits as f64 / n;
    let neutral = (1.0 - positive - negative).max(0.0);

    (compound, positive, neutral, negative)
}

/// Second model: mean polarity/subjectivity over lexicon hits. Negation flips
/// the polarity of the affected word; subjectivity is unaffected.
fn polarity_score(lower: &str) -> (f64, f64) {
    let tokens: Vec<String> = tokenize(lower).collect();
    let mut pol_sum = 0.0;
    let mut subj_sum = 0.0;
    let mut hits = 0usize;

    for i in 0..tokens.len() {
        if let Some(&(pol, subj)) = POLARITY_LEXICON.get(tokens[i].as_str()) {
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            pol_sum += if negated { -pol } else { pol };
            subj_sum += subj;
            hits += 1;
        }
    }

    if hits == 0 {
        (0.0, 0.0)
    } else {
        (pol_sum / hits as f64, subj_sum / hits as f64)
    }
}

/// Keyword hit counts per emotion; substring match per whitespace word.
fn detect_emotions(lower: &str) -> BTreeMap<String, usize> {
    let words: Vec<&str> = lower.split_whitespace().collect();
    let mut out = BTreeMap::new();
    for (emotion, bank) in EMOTION_WORDS {
        let count = words
            .iter()
            .filter(|w| bank.iter().any(|kw| w.contains(kw)))
            .count();
        if count > 0 {
            out.insert((*emotion).to_string(), count);
        }
    }
    out
}

/// Highest hit count wins; ties break by `EMOTION_WORDS` order.
fn dominant_emotion(emotions: &BTreeMap<String, usize>) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (emotion, _) in EMOTION_WORDS {
        if let Some(&count) = emotions.get(*emotion) {
            if best.map(|(_, c)| count > c).unwrap_or(true) {
                best = Some((emotion, count));
            }
        }
    }
    best.map(|(e, _)| e.to_string())
        .unwrap_or_else(|| "neutral".to_string())
}

/// Product of all matched intensity multipliers; 1.0 if none matched.
fn intensity_multiplier(lower: &str) -> f64 {
    let mut modifier = 1.0;
    let mut count = 0usize;
    for word in lower.split_whitespace() {
        for (key, mult) in INTENSIFIERS {
            if word.contains(key) {
                modifier *= mult;
                count += 1;
            }
        }
    }
    if count > 0 {
        modifier
    } else {
        1.0
    }
}

/// Subjectivity-adaptive blend: the lexicon model is trusted more for highly
/// subjective text. Intensity is applied last, then clamped to [-1, 1].
fn blend_valence(compound: f64, polarity: f64, subjectivity: f64, intensity: f64) -> f64 {
    let (w_compound, w_polarity) = if subjectivity > 0.6 {
        (0.7, 0.3)
    } else if subjectivity < 0.3 {
        (0.5, 0.5)
    } else {
        (0.6, 0.4)
    };
    let base = w_compound * compound + w_polarity * polarity;
    (base * intensity).clamp(-1.0, 1.0)
}

/// 50% model agreement, 30% subjectivity factor, 20% word-count factor.
fn confidence(compound: f64, polarity: f64, subjectivity: f64, word_count: usize) -> f64 {
    let agreement = 1.0 - (compound - polarity).abs() / 2.0;
    let subjectivity_factor = (subjectivity * 1.5).min(1.0);
    let word_factor = (word_count as f64 / 50.0).min(1.0);
    (agreement * 0.5 + subjectivity_factor * 0.3 + word_factor * 0.2).clamp(0.0, 1.0)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
