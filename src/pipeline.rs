//! # Entry Pipeline
//! Pure, testable logic that maps raw entry text → `(ScoreResult, findings)`.
//! No I/O, suitable for unit tests and offline batch re-analysis.
//!
//! Data flow: text → sentiment scorer → valence → bias classifier (valence
//! gates certain categories) → ordered findings.

use serde::Serialize;

use crate::bias::{BiasEngine, BiasFinding};
use crate::sentiment::{ScoreResult, SentimentScorer};

/// Full synchronous analysis of one entry at submission time.
#[derive(Debug, Clone, Serialize)]
pub struct EntryAnalysis {
    pub score: ScoreResult,
    pub findings: Vec<BiasFinding>,
}

/// Same logic as the `/entries` handler but purely functional for testing.
pub fn analyze_entry(scorer: &SentimentScorer, bias: &BiasEngine, text: &str) -> EntryAnalysis {
    let score = scorer.score(text);
    let findings = bias.classify(text, score.valence);
    EntryAnalysis { score, findings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> EntryAnalysis {
        analyze_entry(&SentimentScorer::new(), &BiasEngine::builtin(), text)
    }

    #[test]
    fn negative_spiral_entry_hits_all_expected_categories() {
        let a = run("I always fail at everything and it's going to be a disaster");
        assert!(a.score.valence < -0.15, "valence {}", a.score.valence);

        let categories: Vec<&str> = a.findings.iter().map(|f| f.category.as_str()).collect();
        for expected in [
            "Catastrophizing",
            "Black-and-white Thinking",
            "Overgeneralization",
            "Fortune Telling",
        ] {
            assert!(categories.contains(&expected), "missing {expected}: {categories:?}");
        }
    }

    #[test]
    fn findings_are_capped_sorted_and_unique() {
        let a = run(
            "I always fail at everything, it's going to be a disaster, \
             it's all my fault, they must think I am useless, everyone is \
             against me, I feel worthless so it proves I am worthless.",
        );
        assert!(a.findings.len() <= 5);
        for pair in a.findings.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        let mut categories: Vec<&str> = a.findings.iter().map(|f| f.category.as_str()).collect();
        categories.sort();
        categories.dedup();
        assert_eq!(categories.len(), a.findings.len(), "duplicate category");
    }

    #[test]
    fn positive_entry_produces_no_gated_findings() {
        let a = run("What a wonderful day, everything went perfectly and I am so happy!");
        assert!(a.score.valence > 0.0);
        for f in &a.findings {
            assert!(
                !matches!(
                    f.category.as_str(),
                    "Catastrophizing" | "Fortune Telling" | "Personalization"
                ),
                "gated category fired on positive entry: {f:?}"
            );
        }
    }

    #[test]
    fn empty_entry_is_neutral_with_no_findings() {
        let a = run("   ");
        assert_eq!(a.score.valence, 0.0);
        assert!(a.findings.is_empty());
    }
}
