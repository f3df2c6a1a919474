//! Model2Vec static embeddings as an [`Embedder`]

use crate::error::{CvMatcherError, Result};
use crate::processing::semantic::Embedder;
use model2vec_rs::model::StaticModel;
use std::path::Path;
use std::time::Instant;

/// Static-embedding model loaded once and shared read-only
pub struct Model2VecEmbedder {
    model: StaticModel,
    name: String,
}

impl Model2VecEmbedder {
    /// Load from a local model directory or a Hugging Face repo id
    pub fn load(model_path: &Path, name: impl Into<String>) -> Result<Self> {
        let start_time = Instant::now();
        let name = name.into();

        log::info!("Loading Model2Vec embedding model from: {}", model_path.display());

        let model = StaticModel::from_pretrained(
            model_path,
            None, // token
            None, // normalize
            None, // subfolder
        )
        .map_err(|e| CvMatcherError::ModelLoading(format!("Failed to load embedding model {}: {}", name, e)))?;

        log::info!("Embedding model {} loaded in {:.2?}", name, start_time.elapsed());

        Ok(Self { model, name })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.model.encode_single(text);
        if embedding.is_empty() {
            return Err(CvMatcherError::Embedding(format!("{} produced an empty embedding", self.name)));
        }
        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.model.encode(texts))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
