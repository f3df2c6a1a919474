//! Configuration management for the CV matcher

use crate::error::{CvMatcherError, Result};
use crate::processing::aggregator::{PolicyKind, ScoringPolicy, TextBlend, TextSignal};
use crate::processing::lexical::StopWords;
use crate::processing::ner::DEFAULT_SKILL_LABELS;
use crate::processing::vocabulary::{FuzzyAlgorithm, SkillVocabulary, DEFAULT_FUZZY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub models: ModelConfig,
    pub matching: MatchingConfig,
    pub scoring: ScoringConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub models_dir: PathBuf,
    /// Catalogue name or Hugging Face repo id
    pub embedding_model: String,
    pub ner_model: String,
    pub available_models: Vec<AvailableModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub repo_id: String,
    pub model_type: ModelType,
    pub size_mb: u64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    Embedding,
    Ner,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::Embedding => write!(f, "embedding"),
            ModelType::Ner => write!(f, "ner"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Skill vocabulary file (JSON array or one skill per line); builtin list when unset
    pub vocabulary_path: Option<PathBuf>,
    pub fuzzy_threshold: f32,
    pub fuzzy_algorithm: FuzzyAlgorithm,
    /// Fuzzy fallback when looking vocabulary entries up in text
    pub fuzzy_vocabulary: bool,
    /// Lexical stop words; the scoring policy's default when unset
    pub stop_words: Option<StopWords>,
    /// Entity labels counted as skills
    pub ner_labels: Vec<String>,
    /// Words per NER inference window
    pub ner_chunk_words: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub policy: PolicyKind,
    pub skill_weight: f32,
    pub text_weight: f32,
    pub ner_floor: f32,
    pub text_signal: TextSignal,
    pub blend_lexical_weight: f32,
    pub blend_semantic_weight: f32,
    pub include_ner_skills: bool,
    /// Percent, whatever the policy's score scale
    pub auto_accept_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub detailed: bool,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Console,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".cv-matcher")
            .join("models");

        let policy = ScoringPolicy::skill_coverage();

        Self {
            models: ModelConfig {
                models_dir,
                embedding_model: "minishlab/potion-base-8M".to_string(),
                ner_model: "dslim/bert-base-NER".to_string(),
                available_models: vec![
                    AvailableModel {
                        name: "potion-base-8M".to_string(),
                        repo_id: "minishlab/potion-base-8M".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 30,
                        description: "Small multilingual-friendly Model2Vec static embeddings".to_string(),
                    },
                    AvailableModel {
                        name: "potion-base-32M".to_string(),
                        repo_id: "minishlab/potion-base-32M".to_string(),
                        model_type: ModelType::Embedding,
                        size_mb: 130,
                        description: "Larger Model2Vec embeddings, better quality".to_string(),
                    },
                    AvailableModel {
                        name: "bert-base-ner".to_string(),
                        repo_id: "dslim/bert-base-NER".to_string(),
                        model_type: ModelType::Ner,
                        size_mb: 430,
                        description: "BERT base fine-tuned on CoNLL-2003 (PER, ORG, LOC, MISC)".to_string(),
                    },
                    AvailableModel {
                        name: "bert-large-ner".to_string(),
                        repo_id: "dslim/bert-large-NER".to_string(),
                        model_type: ModelType::Ner,
                        size_mb: 1330,
                        description: "BERT large fine-tuned on CoNLL-2003, slower but more accurate".to_string(),
                    },
                ],
            },
            matching: MatchingConfig {
                vocabulary_path: None,
                fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
                fuzzy_algorithm: FuzzyAlgorithm::Lcs,
                fuzzy_vocabulary: false,
                stop_words: None,
                ner_labels: DEFAULT_SKILL_LABELS.iter().map(|l| l.to_string()).collect(),
                ner_chunk_words: 200,
            },
            scoring: ScoringConfig {
                policy: policy.kind,
                skill_weight: policy.skill_weight,
                text_weight: policy.text_weight,
                ner_floor: policy.ner_floor,
                text_signal: policy.text_signal,
                blend_lexical_weight: policy.text_blend.lexical_weight,
                blend_semantic_weight: policy.text_blend.semantic_weight,
                include_ner_skills: policy.include_ner_skills,
                auto_accept_threshold: 70.0,
            },
            output: OutputConfig {
                format: OutputFormat::Console,
                detailed: false,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load from `path`, writing the defaults there first if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str::<Config>(&content)
                .map_err(|e| CvMatcherError::Configuration(format!("Failed to parse config: {}", e)))?
        } else {
            log::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| CvMatcherError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("cv-matcher")
            .join("config.toml")
    }

    /// Reject weights and thresholds outside their ranges
    pub fn validate(&self) -> Result<()> {
        let unit_values = [
            ("matching.fuzzy_threshold", self.matching.fuzzy_threshold),
            ("scoring.skill_weight", self.scoring.skill_weight),
            ("scoring.text_weight", self.scoring.text_weight),
            ("scoring.ner_floor", self.scoring.ner_floor),
            ("scoring.blend_lexical_weight", self.scoring.blend_lexical_weight),
            ("scoring.blend_semantic_weight", self.scoring.blend_semantic_weight),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(CvMatcherError::Configuration(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.scoring.auto_accept_threshold) {
            return Err(CvMatcherError::Configuration(format!(
                "scoring.auto_accept_threshold must be between 0 and 100, got {}",
                self.scoring.auto_accept_threshold
            )));
        }

        if self.matching.ner_chunk_words == 0 {
            return Err(CvMatcherError::Configuration(
                "matching.ner_chunk_words must be greater than 0".to_string(),
            ));
        }

        let skill_weights = self.scoring.skill_weight + self.scoring.text_weight;
        if (skill_weights - 1.0).abs() > 1e-3 {
            log::warn!("scoring.skill_weight + scoring.text_weight = {:.3}, scores may exceed 100", skill_weights);
        }

        Ok(())
    }

    /// Aggregation policy described by the matching and scoring sections
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            kind: self.scoring.policy,
            skill_weight: self.scoring.skill_weight,
            text_weight: self.scoring.text_weight,
            fuzzy_threshold: self.matching.fuzzy_threshold,
            fuzzy_algorithm: self.matching.fuzzy_algorithm,
            include_ner_skills: self.scoring.include_ner_skills,
            ner_floor: self.scoring.ner_floor,
            text_signal: self.scoring.text_signal,
            text_blend: TextBlend {
                lexical_weight: self.scoring.blend_lexical_weight,
                semantic_weight: self.scoring.blend_semantic_weight,
            },
        }
    }

    /// Configured vocabulary file, or the builtin vocabulary
    pub fn load_vocabulary(&self) -> Result<SkillVocabulary> {
        match &self.matching.vocabulary_path {
            Some(path) => SkillVocabulary::load(path),
            None => Ok(SkillVocabulary::builtin()),
        }
    }

    /// Catalogue entry by short name or repo id
    pub fn get_model_by_name(&self, name: &str) -> Option<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .find(|m| m.name == name || m.repo_id == name)
    }

    pub fn list_models(&self, model_type: ModelType) -> Vec<&AvailableModel> {
        self.models
            .available_models
            .iter()
            .filter(|m| m.model_type == model_type)
            .collect()
    }
}
