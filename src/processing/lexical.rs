//! TF-IDF cosine similarity over a two-document corpus

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Stop-word handling for lexical scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopWords {
    #[default]
    English,
    None,
}

/// Lexical similarity scorer.
///
/// IDF is computed over exactly the two documents being compared, so a term
/// shared by both weighs less than a term only one of them uses.
#[derive(Debug, Clone)]
pub struct LexicalScorer {
    stop_words: HashSet<String>,
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(StopWords::English)
    }
}

impl LexicalScorer {
    pub fn new(stop_words: StopWords) -> Self {
        let stop_words = match stop_words {
            StopWords::English => Self::english_stop_words(),
            StopWords::None => HashSet::new(),
        };

        Self { stop_words }
    }

    /// Lower-cased word tokens of at least two characters, stop words removed
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| word.to_lowercase())
            .filter(|word| word.chars().count() > 1)
            .filter(|word| !self.stop_words.contains(word))
            .collect()
    }

    /// Cosine similarity of the TF-IDF vectors of `text_a` and `text_b`, in [0, 1].
    ///
    /// Returns 0.0 when either document has no usable term.
    pub fn lexical_similarity(&self, text_a: &str, text_b: &str) -> f32 {
        let tokens_a = self.tokenize(text_a);
        let tokens_b = self.tokenize(text_b);
        let counts_a = Self::term_counts(&tokens_a);
        let counts_b = Self::term_counts(&tokens_b);

        if counts_a.is_empty() || counts_b.is_empty() {
            log::debug!(
                "Lexical vectorization produced an empty vocabulary ({} / {} terms)",
                counts_a.len(),
                counts_b.len()
            );
            return 0.0;
        }

        let vocabulary: BTreeSet<&str> = counts_a.keys().chain(counts_b.keys()).copied().collect();

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for term in vocabulary {
            let tf_a = counts_a.get(term).copied().unwrap_or(0) as f64;
            let tf_b = counts_b.get(term).copied().unwrap_or(0) as f64;
            let document_frequency = (tf_a > 0.0) as u32 + (tf_b > 0.0) as u32;
            let idf = Self::smooth_idf(2, document_frequency);

            let weight_a = tf_a * idf;
            let weight_b = tf_b * idf;
            dot += weight_a * weight_b;
            norm_a += weight_a * weight_a;
            norm_b += weight_b * weight_b;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
        (cosine as f32).clamp(0.0, 1.0)
    }

    /// `ln((1 + n) / (1 + df)) + 1`
    fn smooth_idf(documents: u32, document_frequency: u32) -> f64 {
        ((1.0 + documents as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
    }

    fn term_counts(tokens: &[String]) -> BTreeMap<&str, u32> {
        let mut counts = BTreeMap::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        counts
    }

    fn english_stop_words() -> HashSet<String> {
        let stop_words = [
            "a", "about", "above", "after", "again", "against", "all", "also", "am", "an",
            "and", "any", "are", "as", "at", "be", "because", "been", "before", "being",
            "below", "between", "both", "but", "by", "can", "could", "did", "do", "does",
            "doing", "down", "during", "each", "either", "etc", "few", "for", "from",
            "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him",
            "his", "how", "however", "i", "if", "in", "into", "is", "it", "its", "itself",
            "just", "may", "me", "might", "more", "most", "must", "my", "no", "nor", "not",
            "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out",
            "over", "own", "per", "same", "shall", "she", "should", "so", "some", "such",
            "than", "that", "the", "their", "theirs", "them", "then", "there", "these",
            "they", "this", "those", "through", "to", "too", "under", "until", "up", "upon",
            "us", "very", "via", "was", "we", "were", "what", "when", "where", "whether",
            "which", "while", "who", "whom", "why", "will", "with", "within", "without",
            "would", "yet", "you", "your", "yours",
        ];

        stop_words.iter().map(|&s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_self_similarity_is_one() {
        let scorer = LexicalScorer::default();
        let texts = [
            "Rust developer with Tokio experience",
            "Python python SQL data pipelines and dashboards",
            "kubernetes",
        ];

        for text in texts {
            assert_eq!(scorer.lexical_similarity(text, text), 1.0, "self similarity for {text:?}");
        }
    }

    #[test]
    fn test_empty_documents() {
        let scorer = LexicalScorer::default();

        assert_eq!(scorer.lexical_similarity("", ""), 0.0);
        assert_eq!(scorer.lexical_similarity("rust developer", ""), 0.0);
        // only stop words and single characters left
        assert_eq!(scorer.lexical_similarity("the and of", "a i"), 0.0);
    }

    #[test]
    fn test_disjoint_documents() {
        let scorer = LexicalScorer::default();

        assert_eq!(scorer.lexical_similarity("rust tokio serde", "accounting payroll audit"), 0.0);
    }

    #[test]
    fn test_partial_overlap_in_unit_range() {
        let scorer = LexicalScorer::default();
        let similarity = scorer.lexical_similarity(
            "Senior Rust engineer, distributed systems",
            "Rust engineer interested in embedded systems",
        );

        assert!(similarity > 0.0);
        assert!(similarity < 1.0);
    }

    #[test]
    fn test_known_value() {
        // shared term "rust" gets idf 1.0, the others ln(3/2) + 1
        let scorer = LexicalScorer::new(StopWords::None);
        let similarity = scorer.lexical_similarity("rust tokio", "rust serde");

        let unique = (1.5f64).ln() + 1.0;
        let expected = 1.0 / (1.0 + unique * unique);
        assert_relative_eq!(similarity as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let scorer = LexicalScorer::default();
        let a = "Data engineer: Spark, Kafka, SQL and Airflow";
        let b = "We need SQL and Python skills for our data platform";

        assert_eq!(scorer.lexical_similarity(a, b), scorer.lexical_similarity(b, a));
    }

    #[test]
    fn test_stop_word_modes() {
        let english = LexicalScorer::new(StopWords::English);
        let none = LexicalScorer::new(StopWords::None);

        assert!(!english.tokenize("the rust book").contains(&"the".to_string()));
        assert!(none.tokenize("the rust book").contains(&"the".to_string()));
        assert!(english.tokenize("a b c").is_empty());
    }
}
