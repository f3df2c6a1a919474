//! Embedding-based semantic similarity

use crate::error::{CvMatcherError, Result};
use std::sync::Arc;

/// Capability that turns text into a fixed-length dense vector.
///
/// Implementations must be deterministic for a given input, otherwise
/// scores stop being reproducible.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts at once; backends with real batching override this.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Name used in logs and reports
    fn name(&self) -> &str;
}

/// Cosine similarity of two vectors in [-1, 1]; zero vectors give 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(CvMatcherError::Embedding(format!(
            "Embedding dimensions don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    if a.is_empty() {
        return Ok(0.0);
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot_product / (norm_a * norm_b))
    }
}

/// Semantic similarity scorer over an optional embedding capability.
///
/// Every failure (no embedder, embedder error, dimension mismatch) degrades
/// to a similarity of 0.0.
#[derive(Clone, Default)]
pub struct SemanticScorer {
    embedder: Option<Arc<dyn Embedder>>,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder: Some(embedder),
        }
    }

    pub fn unavailable() -> Self {
        Self { embedder: None }
    }

    pub fn is_available(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn embedder_name(&self) -> Option<&str> {
        self.embedder.as_deref().map(|e| e.name())
    }

    /// Cosine similarity of the two documents' embeddings, clamped to [0, 1]
    pub fn semantic_similarity(&self, text_a: &str, text_b: &str) -> f32 {
        let (Some(a), Some(b)) = (self.embed(text_a), self.embed(text_b)) else {
            return 0.0;
        };
        Self::similarity_from_embeddings(&a, &b)
    }

    /// Embedding for one document, or `None` when the capability is missing or failed
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text) {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                log::warn!("Embedding with {} failed, semantic signal degraded: {}", embedder.name(), e);
                None
            }
        }
    }

    /// Embeddings for many documents in one call; `None` entries failed.
    ///
    /// A failed or short batch is retried one document at a time so each
    /// entry matches what [`SemanticScorer::embed`] gives for that document.
    pub fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let Some(embedder) = self.embedder.as_ref() else {
            return vec![None; texts.len()];
        };

        match embedder.embed_batch(texts) {
            Ok(embeddings) if embeddings.len() == texts.len() => return embeddings.into_iter().map(Some).collect(),
            Ok(embeddings) => log::warn!(
                "Embedder {} returned {} vectors for {} texts, embedding one by one",
                embedder.name(),
                embeddings.len(),
                texts.len()
            ),
            Err(e) => log::warn!("Batch embedding with {} failed, embedding one by one: {}", embedder.name(), e),
        }

        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Clamped cosine similarity between precomputed embeddings
    pub fn similarity_from_embeddings(a: &[f32], b: &[f32]) -> f32 {
        match cosine_similarity(a, b) {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            Ok(_) => 0.0,
            Err(e) => {
                log::warn!("Semantic similarity unavailable: {}", e);
                0.0
            }
        }
    }
}

impl std::fmt::Debug for SemanticScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScorer")
            .field("embedder", &self.embedder_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Bag-of-letters embedding: deterministic and cheap
    struct LetterEmbedder;

    impl Embedder for LetterEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0; 26];
            for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                vector[(c as u8 - b'a') as usize] += 1.0;
            }
            Ok(vector)
        }

        fn name(&self) -> &str {
            "letters"
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(CvMatcherError::Embedding("model not loaded".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Rejects empty documents, so a batch holding one fails as a whole
    struct NonEmptyEmbedder;

    impl Embedder for NonEmptyEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(CvMatcherError::Embedding("empty document".to_string()));
            }
            LetterEmbedder.embed(text)
        }

        fn name(&self) -> &str {
            "non-empty"
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap(), 1.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert_relative_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap(), -1.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap(), 0.0);
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_negative_cosine_is_clamped() {
        assert_eq!(SemanticScorer::similarity_from_embeddings(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(SemanticScorer::similarity_from_embeddings(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_semantic_similarity_symmetric() {
        let scorer = SemanticScorer::new(Arc::new(LetterEmbedder));
        let a = "Rust systems programmer";
        let b = "Embedded C developer with Rust exposure";

        assert_eq!(scorer.semantic_similarity(a, b), scorer.semantic_similarity(b, a));
        assert_relative_eq!(scorer.semantic_similarity(a, a), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unavailable_or_failing_embedder_degrades_to_zero() {
        let missing = SemanticScorer::unavailable();
        assert!(!missing.is_available());
        assert_eq!(missing.semantic_similarity("rust", "rust"), 0.0);

        let failing = SemanticScorer::new(Arc::new(FailingEmbedder));
        assert_eq!(failing.semantic_similarity("rust", "rust"), 0.0);
        assert!(failing.embed_batch(&["a".to_string(), "b".to_string()]).iter().all(Option::is_none));
    }

    #[test]
    fn test_embed_batch_keeps_order() {
        let scorer = SemanticScorer::new(Arc::new(LetterEmbedder));
        let texts = vec!["aaa".to_string(), "bbb".to_string()];
        let embeddings = scorer.embed_batch(&texts);

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].as_ref().unwrap()[0], 3.0);
        assert_eq!(embeddings[1].as_ref().unwrap()[1], 3.0);
    }

    #[test]
    fn test_failed_batch_falls_back_per_document() {
        let scorer = SemanticScorer::new(Arc::new(NonEmptyEmbedder));
        let texts = vec!["rust".to_string(), String::new(), "go".to_string()];

        let embeddings = scorer.embed_batch(&texts);

        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings[0], scorer.embed("rust"));
        assert!(embeddings[1].is_none());
        assert_eq!(embeddings[2], scorer.embed("go"));
    }
}
