//! Named-entity recognition adapter producing AI-detected skills

use crate::error::Result;
use crate::processing::normalizer::{NormalizedText, TextNormalizer};
use crate::processing::skills::{SkillSet, SkillSource};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Entities grouped by category label (e.g. `ORG` -> ["google", "acme"])
pub type EntityGroups = HashMap<String, Vec<String>>;

/// Labels treated as skill-relevant when none are configured
pub const DEFAULT_SKILL_LABELS: [&str; 3] = ["MISC", "ORG", "PER"];

/// Capability that finds named entities in text.
///
/// Must be deterministic for a given input.
pub trait EntityExtractor: Send + Sync {
    fn extract_entities(&self, text: &str) -> Result<EntityGroups>;

    /// Name used in logs and reports
    fn name(&self) -> &str;
}

/// Wraps an optional [`EntityExtractor`] and flattens its output into a skill set.
///
/// NER is a bonus signal: a missing or failing extractor yields an empty set.
#[derive(Clone)]
pub struct NerAdapter {
    extractor: Option<Arc<dyn EntityExtractor>>,
    labels: BTreeSet<String>,
    normalizer: TextNormalizer,
}

impl NerAdapter {
    pub fn new(extractor: Arc<dyn EntityExtractor>) -> Self {
        Self {
            extractor: Some(extractor),
            labels: DEFAULT_SKILL_LABELS.iter().map(|l| l.to_string()).collect(),
            normalizer: TextNormalizer::new(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            extractor: None,
            labels: DEFAULT_SKILL_LABELS.iter().map(|l| l.to_string()).collect(),
            normalizer: TextNormalizer::new(),
        }
    }

    /// Replace the set of skill-relevant category labels (compared case-insensitively)
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_uppercase())
            .filter(|l| !l.is_empty())
            .collect();
        self
    }

    pub fn is_available(&self) -> bool {
        self.extractor.is_some()
    }

    pub fn extractor_name(&self) -> Option<&str> {
        self.extractor.as_deref().map(|e| e.name())
    }

    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.labels.iter()
    }

    /// AI-detected skills of a raw document
    pub fn extract_ai_skills(&self, text: &str) -> SkillSet {
        let normalized = self.normalizer.normalize(text);
        self.extract_from_normalized(&normalized)
    }

    pub fn extract_from_normalized(&self, text: &NormalizedText) -> SkillSet {
        let mut skills = SkillSet::new(SkillSource::FromNer);

        let Some(extractor) = &self.extractor else {
            return skills;
        };
        if text.is_empty() {
            return skills;
        }

        match extractor.extract_entities(text.as_str()) {
            Ok(groups) => {
                for (label, entities) in groups {
                    if self.labels.contains(&label.trim().to_uppercase()) {
                        skills.extend(entities);
                    }
                }
                log::debug!("{} produced {} skill entities", extractor.name(), skills.len());
            }
            Err(e) => {
                log::warn!("Entity extraction with {} failed, NER signal degraded: {}", extractor.name(), e);
            }
        }

        skills
    }
}

impl std::fmt::Debug for NerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NerAdapter")
            .field("extractor", &self.extractor_name())
            .field("labels", &self.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CvMatcherError;

    struct CannedExtractor;

    impl EntityExtractor for CannedExtractor {
        fn extract_entities(&self, text: &str) -> Result<EntityGroups> {
            let mut groups = EntityGroups::new();
            if text.contains("google") {
                groups.insert("ORG".to_string(), vec!["  Google ".to_string()]);
            }
            groups.insert("MISC".to_string(), vec!["Python".to_string(), "".to_string()]);
            groups.insert("LOC".to_string(), vec!["Paris".to_string()]);
            Ok(groups)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct FailingExtractor;

    impl EntityExtractor for FailingExtractor {
        fn extract_entities(&self, _text: &str) -> Result<EntityGroups> {
            Err(CvMatcherError::EntityRecognition("model unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_flattens_relevant_labels() {
        let adapter = NerAdapter::new(Arc::new(CannedExtractor));
        let skills = adapter.extract_ai_skills("Worked at Google on Python tooling");

        assert_eq!(skills.source(), SkillSource::FromNer);
        assert!(skills.contains("google"));
        assert!(skills.contains("python"));
        assert!(!skills.contains("paris"));
        assert_eq!(skills.len(), 2);
    }

    #[test]
    fn test_custom_labels() {
        let adapter = NerAdapter::new(Arc::new(CannedExtractor)).with_labels(["loc"]);
        let skills = adapter.extract_ai_skills("anything");

        assert_eq!(skills.len(), 1);
        assert!(skills.contains("paris"));
    }

    #[test]
    fn test_missing_or_failing_extractor_gives_empty_set() {
        assert!(NerAdapter::unavailable().extract_ai_skills("Google").is_empty());
        assert!(NerAdapter::new(Arc::new(FailingExtractor)).extract_ai_skills("Google").is_empty());
    }

    #[test]
    fn test_empty_text_skips_extractor() {
        let adapter = NerAdapter::new(Arc::new(CannedExtractor));
        assert!(adapter.extract_ai_skills("  !!! ").is_empty());
    }
}
