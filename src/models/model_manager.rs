//! Downloading and locating embedding and NER models from the Hugging Face Hub

use crate::config::{AvailableModel, Config, ModelType};
use crate::error::{CvMatcherError, Result};
use hf_hub::api::tokio::Api;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const WEIGHTS_FILE: &str = "model.safetensors";
const TOKENIZER_FILES: [&str; 2] = ["tokenizer.json", "vocab.txt"];

/// A catalogue entry and whether it is present locally
#[derive(Debug, Clone)]
pub struct ModelStatus {
    pub info: AvailableModel,
    pub downloaded: bool,
    pub path: PathBuf,
}

/// Manages model artifacts under `models_dir`, one directory per catalogue name
pub struct ModelManager {
    models_dir: PathBuf,
    available_models: Vec<AvailableModel>,
    downloaded_models: BTreeSet<String>,
}

impl ModelManager {
    pub async fn new(models_dir: PathBuf, available_models: Vec<AvailableModel>) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                CvMatcherError::ModelError(format!("Failed to create models directory: {}", e))
            })?;
        }

        let mut manager = Self {
            models_dir,
            available_models,
            downloaded_models: BTreeSet::new(),
        };
        manager.scan_downloaded_models().await?;

        Ok(manager)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.models.models_dir.clone(), config.models.available_models.clone()).await
    }

    async fn scan_downloaded_models(&mut self) -> Result<()> {
        let mut entries = fs::read_dir(&self.models_dir).await.map_err(|e| {
            CvMatcherError::ModelError(format!("Failed to scan models directory: {}", e))
        })?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && is_valid_model_directory(&entry.path()).await {
                self.downloaded_models
                    .insert(entry.file_name().to_string_lossy().to_string());
            }
        }

        log::debug!("Found {} downloaded models", self.downloaded_models.len());
        Ok(())
    }

    /// Catalogue entry by short name or repo id
    pub fn resolve(&self, name: &str) -> Result<&AvailableModel> {
        self.available_models
            .iter()
            .find(|m| m.name == name || m.repo_id == name)
            .ok_or_else(|| CvMatcherError::ModelNotFound(format!("Unknown model: {}", name)))
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        self.resolve(name)
            .map(|m| self.downloaded_models.contains(&m.name))
            .unwrap_or(false)
    }

    /// Local directory of a downloaded model
    pub fn get_model_path(&self, name: &str) -> Option<PathBuf> {
        let model = self.resolve(name).ok()?;
        self.downloaded_models
            .contains(&model.name)
            .then(|| self.models_dir.join(&model.name))
    }

    pub fn list_models(&self) -> Vec<ModelStatus> {
        self.available_models
            .iter()
            .map(|info| ModelStatus {
                info: info.clone(),
                downloaded: self.downloaded_models.contains(&info.name),
                path: self.models_dir.join(&info.name),
            })
            .collect()
    }

    pub async fn download_model(&mut self, name: &str) -> Result<PathBuf> {
        let model = self.resolve(name)?.clone();
        let model_dir = self.models_dir.join(&model.name);

        if self.downloaded_models.contains(&model.name) {
            log::info!("Model {} already present at {}", model.name, model_dir.display());
            return Ok(model_dir);
        }

        log::info!("Downloading {} ({} MB) from {}", model.name, model.size_mb, model.repo_id);

        fs::create_dir_all(&model_dir).await.map_err(|e| {
            CvMatcherError::ModelError(format!("Failed to create model directory: {}", e))
        })?;

        let api = Api::new()
            .map_err(|e| CvMatcherError::Network(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.model(model.repo_id.clone());

        for file in ["config.json", WEIGHTS_FILE] {
            let cached = repo
                .get(file)
                .await
                .map_err(|e| CvMatcherError::Network(format!("Failed to download {}: {}", file, e)))?;
            copy_into(&cached, &model_dir, file).await?;
        }

        let mut has_tokenizer = false;
        for file in TOKENIZER_FILES {
            match repo.get(file).await {
                Ok(cached) => {
                    copy_into(&cached, &model_dir, file).await?;
                    has_tokenizer = true;
                }
                Err(e) => log::debug!("{} has no {}: {}", model.repo_id, file, e),
            }
        }

        if model.model_type == ModelType::Ner {
            for file in ["tokenizer_config.json", "special_tokens_map.json"] {
                if let Ok(cached) = repo.get(file).await {
                    copy_into(&cached, &model_dir, file).await?;
                }
            }
        }

        if !has_tokenizer {
            return Err(CvMatcherError::ModelLoading(format!(
                "{} provides neither tokenizer.json nor vocab.txt",
                model.repo_id
            )));
        }

        self.downloaded_models.insert(model.name.clone());
        log::info!("Model {} downloaded to {}", model.name, model_dir.display());
        Ok(model_dir)
    }

    pub async fn remove_model(&mut self, name: &str) -> Result<()> {
        let model_name = self.resolve(name)?.name.clone();
        let model_dir = self.models_dir.join(&model_name);

        if !model_dir.exists() {
            return Err(CvMatcherError::ModelNotFound(format!("Model {} is not downloaded", model_name)));
        }

        fs::remove_dir_all(&model_dir).await.map_err(|e| {
            CvMatcherError::ModelError(format!("Failed to remove {}: {}", model_dir.display(), e))
        })?;
        self.downloaded_models.remove(&model_name);

        log::info!("Removed model {}", model_name);
        Ok(())
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }
}

async fn copy_into(cached: &Path, model_dir: &Path, file: &str) -> Result<()> {
    fs::copy(cached, model_dir.join(file))
        .await
        .map_err(|e| CvMatcherError::ModelError(format!("Failed to copy {}: {}", file, e)))?;
    log::debug!("Downloaded {}", file);
    Ok(())
}

/// Config, weights and some tokenizer must all be present
async fn is_valid_model_directory(path: &Path) -> bool {
    let exists = |file: &str| {
        let path = path.join(file);
        async move { fs::metadata(path).await.is_ok() }
    };

    if !exists("config.json").await || !exists(WEIGHTS_FILE).await {
        return false;
    }

    for file in TOKENIZER_FILES {
        if exists(file).await {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalogue() -> Vec<AvailableModel> {
        Config::default().models.available_models
    }

    fn fake_model(dir: &Path, name: &str) {
        let model_dir = dir.join(name);
        std::fs::create_dir_all(&model_dir).unwrap();
        for file in ["config.json", "model.safetensors", "vocab.txt"] {
            std::fs::write(model_dir.join(file), "{}").unwrap();
        }
    }

    #[tokio::test]
    async fn test_model_manager_creation() {
        let temp_dir = TempDir::new().unwrap();
        let models_dir = temp_dir.path().join("models");

        let manager = ModelManager::new(models_dir.clone(), catalogue()).await.unwrap();

        assert!(models_dir.exists());
        assert_eq!(manager.list_models().len(), 4);
        assert!(manager.list_models().iter().all(|m| !m.downloaded));
    }

    #[tokio::test]
    async fn test_resolve_by_name_or_repo() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ModelManager::new(temp_dir.path().to_path_buf(), catalogue()).await.unwrap();

        assert_eq!(manager.resolve("dslim/bert-base-NER").unwrap().name, "bert-base-ner");
        assert_eq!(manager.resolve("potion-base-8M").unwrap().model_type, ModelType::Embedding);
        assert!(matches!(manager.resolve("gpt-2"), Err(CvMatcherError::ModelNotFound(_))));
    }

    #[tokio::test]
    async fn test_scan_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        fake_model(temp_dir.path(), "bert-base-ner");
        // missing weights: not counted
        std::fs::create_dir_all(temp_dir.path().join("potion-base-8M")).unwrap();

        let mut manager = ModelManager::new(temp_dir.path().to_path_buf(), catalogue()).await.unwrap();

        assert!(manager.is_model_downloaded("dslim/bert-base-NER"));
        assert!(!manager.is_model_downloaded("potion-base-8M"));
        assert_eq!(
            manager.get_model_path("bert-base-ner"),
            Some(temp_dir.path().join("bert-base-ner"))
        );

        manager.remove_model("bert-base-ner").await.unwrap();
        assert!(!manager.is_model_downloaded("bert-base-ner"));
        assert!(!temp_dir.path().join("bert-base-ner").exists());
        assert!(manager.remove_model("bert-base-ner").await.is_err());
    }
}
