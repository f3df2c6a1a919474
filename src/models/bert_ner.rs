//! BERT token-classification NER running on candle

use crate::error::{CvMatcherError, Result};
use crate::processing::ner::{EntityExtractor, EntityGroups};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::time::Instant;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{Tokenizer, TruncationParams};

/// BERT's position embedding window
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Pick the inference device; `CV_MATCHER_DEVICE` (`cpu`, `cuda`, `metal`) overrides auto-detection.
pub fn select_device() -> Result<Device> {
    match std::env::var("CV_MATCHER_DEVICE").map(|v| v.to_lowercase()).as_deref() {
        Ok("cpu") => Ok(Device::Cpu),
        Ok("cuda") => Device::new_cuda(0)
            .map_err(|e| CvMatcherError::ModelError(format!("Failed to initialize CUDA: {}", e))),
        Ok("metal") => Device::new_metal(0)
            .map_err(|e| CvMatcherError::ModelError(format!("Failed to initialize Metal: {}", e))),
        Ok(other) => {
            log::warn!("Unknown device '{}', falling back to auto-detection", other);
            Ok(best_device())
        }
        Err(_) => Ok(best_device()),
    }
}

fn best_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            log::info!("Using CUDA GPU for NER inference");
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            log::info!("Using Metal GPU for NER inference");
            return device;
        }
    }

    Device::Cpu
}

/// Named-entity recognizer backed by a fine-tuned BERT checkpoint
/// (e.g. `dslim/bert-base-NER`).
pub struct BertNerExtractor {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    id2label: Vec<String>,
    device: Device,
    chunk_words: usize,
    name: String,
}

impl BertNerExtractor {
    /// Load config, tokenizer and weights from a downloaded model directory
    pub fn load(model_dir: &Path, name: impl Into<String>, chunk_words: usize) -> Result<Self> {
        let start_time = Instant::now();
        let name = name.into();
        let device = select_device()?;

        log::info!("Loading NER model from: {}", model_dir.display());

        let config_content = std::fs::read_to_string(model_dir.join("config.json"))
            .map_err(|e| CvMatcherError::ModelLoading(format!("Failed to read model config: {}", e)))?;
        let config: BertConfig = serde_json::from_str(&config_content)
            .map_err(|e| CvMatcherError::ModelLoading(format!("Invalid BERT config: {}", e)))?;
        let id2label = parse_id2label(&config_content)?;

        let tokenizer = load_tokenizer(model_dir)?;

        let weights = model_dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let model = BertModel::load(vb.pp("bert"), &config)?;
        let classifier = candle_nn::linear(config.hidden_size, id2label.len(), vb.pp("classifier"))?;

        log::info!(
            "NER model {} loaded in {:.2?} ({} labels)",
            name,
            start_time.elapsed(),
            id2label.len()
        );

        Ok(Self {
            model,
            classifier,
            tokenizer,
            id2label,
            device,
            chunk_words: chunk_words.max(1),
            name,
        })
    }

    fn recognize_chunk(&self, chunk: &str, groups: &mut EntityGroups) -> Result<()> {
        let encoding = self
            .tokenizer
            .encode(chunk, true)
            .map_err(|e| CvMatcherError::EntityRecognition(format!("Tokenization failed: {}", e)))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden)?.squeeze(0)?;
        let predictions = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;

        let labels: Vec<&str> = predictions
            .iter()
            .map(|&id| self.id2label.get(id as usize).map(String::as_str).unwrap_or("O"))
            .collect();

        for (label, entity) in group_entities(
            chunk,
            encoding.get_offsets(),
            &labels,
            encoding.get_special_tokens_mask(),
        ) {
            groups.entry(label).or_default().push(entity);
        }

        Ok(())
    }
}

impl EntityExtractor for BertNerExtractor {
    fn extract_entities(&self, text: &str) -> Result<EntityGroups> {
        let mut groups = EntityGroups::new();

        for chunk in word_chunks(text, self.chunk_words) {
            self.recognize_chunk(&chunk, &mut groups)?;
        }

        Ok(groups)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `tokenizer.json` when shipped, otherwise a BERT WordPiece tokenizer built from `vocab.txt`
fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json = model_dir.join("tokenizer.json");
    let mut tokenizer = if tokenizer_json.exists() {
        Tokenizer::from_file(&tokenizer_json)
            .map_err(|e| CvMatcherError::ModelLoading(format!("Failed to load tokenizer: {}", e)))?
    } else {
        build_wordpiece_tokenizer(model_dir)?
    };

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_SEQUENCE_LENGTH,
            ..Default::default()
        }))
        .map_err(|e| CvMatcherError::ModelLoading(format!("Failed to configure truncation: {}", e)))?;
    tokenizer.with_padding(None);

    Ok(tokenizer)
}

fn build_wordpiece_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let vocab_path = model_dir.join("vocab.txt");
    let vocab = vocab_path.to_string_lossy().to_string();

    let lowercase = std::fs::read_to_string(model_dir.join("tokenizer_config.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|config| config.get("do_lower_case").and_then(|v| v.as_bool()))
        .unwrap_or(false);

    let wordpiece = WordPiece::from_file(&vocab)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| CvMatcherError::ModelLoading(format!("Failed to read {}: {}", vocab, e)))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    let special_id = |token: &str| {
        tokenizer
            .token_to_id(token)
            .ok_or_else(|| CvMatcherError::ModelLoading(format!("Vocabulary has no {} token", token)))
    };
    let cls_id = special_id("[CLS]")?;
    let sep_id = special_id("[SEP]")?;

    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, Some(lowercase), lowercase)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), sep_id),
            ("[CLS]".to_string(), cls_id),
        )));

    Ok(tokenizer)
}

/// Label names ordered by class id, from the `id2label` map of `config.json`
fn parse_id2label(config_content: &str) -> Result<Vec<String>> {
    let config: serde_json::Value = serde_json::from_str(config_content)?;
    let map = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| CvMatcherError::ModelLoading("config.json has no id2label map".to_string()))?;

    let mut labels: Vec<(usize, String)> = Vec::with_capacity(map.len());
    for (id, label) in map {
        let id = id
            .parse::<usize>()
            .map_err(|_| CvMatcherError::ModelLoading(format!("Invalid label id: {}", id)))?;
        let label = label
            .as_str()
            .ok_or_else(|| CvMatcherError::ModelLoading(format!("Label {} is not a string", id)))?;
        labels.push((id, label.to_string()));
    }
    labels.sort_by_key(|(id, _)| *id);

    if labels.iter().enumerate().any(|(index, (id, _))| index != *id) {
        return Err(CvMatcherError::ModelLoading("id2label ids are not contiguous".to_string()));
    }

    Ok(labels.into_iter().map(|(_, label)| label).collect())
}

/// Split text into windows of at most `chunk_words` whitespace-separated words
fn word_chunks(text: &str, chunk_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_words.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// "Simple" aggregation of per-token IOB labels into `(category, entity text)` spans.
///
/// A `B-` tag, a category change or an `O` tag closes the running span;
/// special tokens are skipped.
fn group_entities(
    text: &str,
    offsets: &[(usize, usize)],
    labels: &[&str],
    special_tokens_mask: &[u32],
) -> Vec<(String, String)> {
    let mut entities = Vec::new();
    let mut current: Option<(String, usize, usize)> = None;

    let close = |span: Option<(String, usize, usize)>, entities: &mut Vec<(String, String)>| {
        if let Some((category, start, end)) = span {
            if let Some(entity) = text.get(start..end) {
                let entity = entity.trim();
                if !entity.is_empty() {
                    entities.push((category, entity.to_string()));
                }
            }
        }
    };

    for (index, label) in labels.iter().enumerate() {
        if special_tokens_mask.get(index).copied().unwrap_or(0) == 1 {
            continue;
        }
        let Some(&(start, end)) = offsets.get(index) else {
            break;
        };

        let (prefix, category) = match label.split_once('-') {
            Some((prefix, category)) => (prefix, category),
            None => ("O", *label),
        };

        if prefix == "O" || category == "O" {
            close(current.take(), &mut entities);
            continue;
        }

        match current.as_mut() {
            Some((running, _, running_end)) if prefix == "I" && running.as_str() == category => {
                *running_end = end;
            }
            _ => {
                close(current.take(), &mut entities);
                current = Some((category.to_string(), start, end));
            }
        }
    }
    close(current.take(), &mut entities);

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id2label() {
        let config = r#"{"id2label": {"1": "B-MISC", "0": "O", "2": "I-MISC"}, "hidden_size": 8}"#;
        assert_eq!(parse_id2label(config).unwrap(), vec!["O", "B-MISC", "I-MISC"]);

        assert!(parse_id2label(r#"{"id2label": {"0": "O", "2": "B-PER"}}"#).is_err());
        assert!(parse_id2label(r#"{"hidden_size": 8}"#).is_err());
    }

    #[test]
    fn test_word_chunks() {
        assert_eq!(word_chunks("a b c d e", 2), vec!["a b", "c d", "e"]);
        assert!(word_chunks("   ", 5).is_empty());
        assert_eq!(word_chunks("one two", 0), vec!["one", "two"]);
    }

    #[test]
    fn test_group_entities() {
        let text = "worked at google cloud with john smith";
        // [CLS] worked at google cloud with john smith [SEP]
        let offsets = [
            (0, 0),
            (0, 6),
            (7, 9),
            (10, 16),
            (17, 22),
            (23, 27),
            (28, 32),
            (33, 38),
            (0, 0),
        ];
        let labels = ["O", "O", "O", "B-ORG", "I-ORG", "O", "B-PER", "I-PER", "O"];
        let special = [1, 0, 0, 0, 0, 0, 0, 0, 1];

        let entities = group_entities(text, &offsets, &labels, &special);

        assert_eq!(
            entities,
            vec![
                ("ORG".to_string(), "google cloud".to_string()),
                ("PER".to_string(), "john smith".to_string()),
            ]
        );
    }

    #[test]
    fn test_group_entities_splits_on_new_begin_and_category_change() {
        let text = "rust python berlin";
        let offsets = [(0, 4), (5, 11), (12, 18)];
        let labels = ["B-MISC", "B-MISC", "I-LOC"];
        let special = [0, 0, 0];

        let entities = group_entities(text, &offsets, &labels, &special);

        assert_eq!(
            entities,
            vec![
                ("MISC".to_string(), "rust".to_string()),
                ("MISC".to_string(), "python".to_string()),
                ("LOC".to_string(), "berlin".to_string()),
            ]
        );
    }
}
