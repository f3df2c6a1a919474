//! Matching engine combining vocabulary, NER, lexical and semantic signals

use crate::config::Config;
use crate::error::{CvMatcherError, Result};
use crate::processing::aggregator::{aggregate, Decision, MatchScore, ScoringInputs, ScoringPolicy};
use crate::processing::lexical::{LexicalScorer, StopWords};
use crate::processing::ner::{EntityExtractor, NerAdapter};
use crate::processing::normalizer::{NormalizedText, TextNormalizer};
use crate::processing::semantic::{Embedder, SemanticScorer};
use crate::processing::skills::{Provenance, SkillSet, SkillSource};
use crate::processing::vocabulary::{SkillVocabulary, VocabularyMatch, VocabularyMatcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Default auto-accept threshold, in percent
pub const DEFAULT_AUTO_ACCEPT_THRESHOLD: f32 = 70.0;

/// A job posting to score candidates against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub text: String,
    /// Skills listed explicitly on the posting, on top of those found in `text`
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl Posting {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            required_skills: Vec::new(),
        }
    }

    pub fn with_required_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_skills.extend(skills.into_iter().map(Into::into));
        self
    }
}

/// A candidate document (already extracted plain text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub text: String,
}

impl Candidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Score of one candidate plus its auto-accept classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub candidate_id: String,
    pub score: MatchScore,
    pub decision: Decision,
}

impl Evaluation {
    /// Reviewer override forcing acceptance of a pending candidate
    pub fn accept_manually(&mut self) {
        self.decision = self.decision.accept_manually();
    }
}

/// Skills one document yields, with the detector that found each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillExplanation {
    pub vocabulary_matches: Vec<VocabularyMatch>,
    pub ner_skills: Vec<String>,
    pub skills: Vec<ExplainedSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedSkill {
    pub skill: String,
    pub provenance: Provenance,
}

/// Posting-side work shared by every candidate of a batch
struct PreparedPosting {
    text: NormalizedText,
    required_skills: SkillSet,
    embedding: Option<Vec<f32>>,
}

/// Scores candidates against postings.
///
/// Holds only read-only state after construction: share it behind an `Arc`
/// to score from many threads at once.
pub struct MatchEngine {
    normalizer: TextNormalizer,
    vocabulary_matcher: VocabularyMatcher,
    lexical: LexicalScorer,
    semantic: SemanticScorer,
    ner: NerAdapter,
    policy: ScoringPolicy,
    auto_accept_threshold: f32,
}

pub struct MatchEngineBuilder {
    vocabulary: Arc<SkillVocabulary>,
    embedder: Option<Arc<dyn Embedder>>,
    entity_extractor: Option<Arc<dyn EntityExtractor>>,
    policy: ScoringPolicy,
    auto_accept_threshold: f32,
    stop_words: Option<StopWords>,
    ner_labels: Option<Vec<String>>,
    fuzzy_vocabulary: bool,
}

impl MatchEngineBuilder {
    pub fn new(vocabulary: Arc<SkillVocabulary>) -> Self {
        Self {
            vocabulary,
            embedder: None,
            entity_extractor: None,
            policy: ScoringPolicy::default(),
            auto_accept_threshold: DEFAULT_AUTO_ACCEPT_THRESHOLD,
            stop_words: None,
            ner_labels: None,
            fuzzy_vocabulary: false,
        }
    }

    /// Apply the matching and scoring sections of `config`
    pub fn with_config(mut self, config: &Config) -> Self {
        self.policy = config.scoring_policy();
        self.auto_accept_threshold = config.scoring.auto_accept_threshold;
        self.stop_words = config.matching.stop_words;
        self.ner_labels = Some(config.matching.ner_labels.clone());
        self.fuzzy_vocabulary = config.matching.fuzzy_vocabulary;
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn entity_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.entity_extractor = Some(extractor);
        self
    }

    pub fn policy(mut self, policy: ScoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Auto-accept threshold in percent
    pub fn auto_accept_threshold(mut self, threshold: f32) -> Self {
        self.auto_accept_threshold = threshold;
        self
    }

    /// Overrides the policy's own stop-word default
    pub fn stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    pub fn ner_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ner_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn fuzzy_vocabulary(mut self, enabled: bool) -> Self {
        self.fuzzy_vocabulary = enabled;
        self
    }

    pub fn build(self) -> Result<MatchEngine> {
        if !(0.0..=100.0).contains(&self.auto_accept_threshold) {
            return Err(CvMatcherError::InvalidInput(format!(
                "Auto-accept threshold must be between 0 and 100, got {}",
                self.auto_accept_threshold
            )));
        }

        let mut vocabulary_matcher = VocabularyMatcher::new(self.vocabulary)?;
        if self.fuzzy_vocabulary {
            vocabulary_matcher =
                vocabulary_matcher.with_fuzzy_fallback(self.policy.fuzzy_threshold, self.policy.fuzzy_algorithm);
        }

        let semantic = match self.embedder {
            Some(embedder) => SemanticScorer::new(embedder),
            None => SemanticScorer::unavailable(),
        };

        let mut ner = match self.entity_extractor {
            Some(extractor) => NerAdapter::new(extractor),
            None => NerAdapter::unavailable(),
        };
        if let Some(labels) = self.ner_labels {
            ner = ner.with_labels(labels);
        }

        if self.policy.needs_semantic() && !semantic.is_available() {
            log::warn!("Policy uses semantic similarity but no embedder is loaded; it will score 0.0");
        }
        if self.policy.needs_ner() && !ner.is_available() {
            log::warn!("Policy uses NER skills but no entity extractor is loaded");
        }

        let stop_words = self.stop_words.unwrap_or_else(|| self.policy.default_stop_words());

        log::info!(
            "Match engine ready: {} policy, {} vocabulary skills, embedder: {}, ner: {}",
            self.policy.kind,
            vocabulary_matcher.skill_count(),
            semantic.embedder_name().unwrap_or("none"),
            ner.extractor_name().unwrap_or("none")
        );

        Ok(MatchEngine {
            normalizer: TextNormalizer::new(),
            vocabulary_matcher,
            lexical: LexicalScorer::new(stop_words),
            semantic,
            ner,
            policy: self.policy,
            auto_accept_threshold: self.auto_accept_threshold,
        })
    }
}

impl MatchEngine {
    pub fn builder(vocabulary: Arc<SkillVocabulary>) -> MatchEngineBuilder {
        MatchEngineBuilder::new(vocabulary)
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn auto_accept_threshold(&self) -> f32 {
        self.auto_accept_threshold
    }

    /// Score one candidate text against a posting
    pub fn score(&self, posting: &Posting, candidate_text: &str) -> MatchScore {
        let prepared = self.prepare(posting);
        let candidate = self.normalizer.normalize(candidate_text);
        let embedding = self.candidate_embedding(&prepared, &candidate);
        self.score_prepared(&prepared, &candidate, embedding)
    }

    pub fn evaluate(&self, posting: &Posting, candidate: &Candidate) -> Evaluation {
        let score = self.score(posting, &candidate.text);
        self.classify(candidate.id.clone(), score)
    }

    /// Evaluate many candidates against one posting.
    ///
    /// The posting is normalized and embedded once, candidates are embedded
    /// in a single batch. Results keep the input order.
    pub fn score_batch(&self, posting: &Posting, candidates: &[Candidate]) -> Vec<Evaluation> {
        let start = Instant::now();
        let prepared = self.prepare(posting);

        let normalized: Vec<NormalizedText> = candidates
            .iter()
            .map(|candidate| self.normalizer.normalize(&candidate.text))
            .collect();

        let embeddings = if self.policy.needs_semantic() && prepared.embedding.is_some() {
            let texts: Vec<String> = normalized.iter().map(|t| t.as_str().to_string()).collect();
            self.semantic.embed_batch(&texts)
        } else {
            vec![None; candidates.len()]
        };

        let evaluations: Vec<Evaluation> = candidates
            .iter()
            .zip(normalized.iter())
            .zip(embeddings)
            .map(|((candidate, text), embedding)| {
                let score = self.score_prepared(&prepared, text, embedding);
                self.classify(candidate.id.clone(), score)
            })
            .collect();

        log::info!(
            "Scored {} candidates in {}ms",
            evaluations.len(),
            start.elapsed().as_millis()
        );
        evaluations
    }

    /// Evaluate candidates on tokio's blocking pool, one task per candidate.
    ///
    /// Results keep the input order.
    pub async fn score_concurrently(self: Arc<Self>, posting: Posting, candidates: Vec<Candidate>) -> Result<Vec<Evaluation>> {
        let prepared = Arc::new(self.prepare(&posting));
        let total = candidates.len();

        let mut tasks = JoinSet::new();
        for (index, candidate) in candidates.into_iter().enumerate() {
            let engine = Arc::clone(&self);
            let prepared = Arc::clone(&prepared);
            tasks.spawn_blocking(move || {
                let text = engine.normalizer.normalize(&candidate.text);
                let embedding = engine.candidate_embedding(&prepared, &text);
                let score = engine.score_prepared(&prepared, &text, embedding);
                (index, engine.classify(candidate.id, score))
            });
        }

        let mut results: Vec<Option<Evaluation>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (index, evaluation) =
                joined.map_err(|e| CvMatcherError::Processing(format!("Scoring task failed: {}", e)))?;
            results[index] = Some(evaluation);
        }

        Ok(results.into_iter().flatten().collect())
    }

    /// Skills a single document yields, for explaining a score
    pub fn explain_skills(&self, text: &str) -> SkillExplanation {
        let normalized = self.normalizer.normalize(text);
        let vocabulary_matches = self.vocabulary_matcher.find_normalized(&normalized);
        let vocabulary_skills = SkillSet::from_skills(
            SkillSource::FromVocabulary,
            vocabulary_matches.iter().map(|m| m.skill.as_str()),
        );
        let ner_skills = self.ner_skills(&normalized);

        let skills = vocabulary_skills
            .union(&ner_skills)
            .iter()
            .map(|(skill, provenance)| ExplainedSkill {
                skill: skill.clone(),
                provenance: *provenance,
            })
            .collect();

        SkillExplanation {
            vocabulary_matches,
            ner_skills: ner_skills.iter().cloned().collect(),
            skills,
        }
    }

    /// Required skills of a posting: explicit ones plus those found in its text
    pub fn required_skills(&self, posting: &Posting) -> SkillSet {
        let text = self.normalizer.normalize(&posting.text);
        self.required_from_normalized(posting, &text)
    }

    fn required_from_normalized(&self, posting: &Posting, text: &NormalizedText) -> SkillSet {
        let mut required = self.vocabulary_matcher.extract_from_normalized(text);
        for skill in &posting.required_skills {
            required.insert(self.vocabulary_matcher.canonical_skill(skill));
        }
        required
    }

    /// NER skills spelled the way the vocabulary spells them
    fn ner_skills(&self, text: &NormalizedText) -> SkillSet {
        let extracted = self.ner.extract_from_normalized(text);
        SkillSet::from_skills(
            SkillSource::FromNer,
            extracted.iter().map(|skill| self.vocabulary_matcher.canonical_skill(skill)),
        )
    }

    fn prepare(&self, posting: &Posting) -> PreparedPosting {
        let text = self.normalizer.normalize(&posting.text);
        let required_skills = self.required_from_normalized(posting, &text);
        let embedding = if self.policy.needs_semantic() {
            self.semantic.embed(text.as_str())
        } else {
            None
        };

        log::debug!("Posting requires {} skills", required_skills.len());

        PreparedPosting {
            text,
            required_skills,
            embedding,
        }
    }

    fn candidate_embedding(&self, posting: &PreparedPosting, candidate: &NormalizedText) -> Option<Vec<f32>> {
        if self.policy.needs_semantic() && posting.embedding.is_some() {
            self.semantic.embed(candidate.as_str())
        } else {
            None
        }
    }

    fn score_prepared(
        &self,
        posting: &PreparedPosting,
        candidate: &NormalizedText,
        candidate_embedding: Option<Vec<f32>>,
    ) -> MatchScore {
        let vocabulary_skills = self.vocabulary_matcher.extract_from_normalized(candidate);
        let ner_skills = if self.policy.needs_ner() {
            self.ner_skills(candidate)
        } else {
            SkillSet::new(SkillSource::FromNer)
        };

        let lexical = self
            .policy
            .needs_lexical()
            .then(|| self.lexical.lexical_similarity(posting.text.as_str(), candidate.as_str()));

        let semantic = self.policy.needs_semantic().then(|| {
            match (posting.embedding.as_deref(), candidate_embedding.as_deref()) {
                (Some(a), Some(b)) => SemanticScorer::similarity_from_embeddings(a, b),
                _ => 0.0,
            }
        });

        let score = aggregate(
            &self.policy,
            &ScoringInputs {
                required_skills: &posting.required_skills,
                candidate_vocabulary_skills: &vocabulary_skills,
                candidate_ner_skills: &ner_skills,
                lexical,
                semantic,
            },
        );

        log::debug!(
            "skill={:.3} lexical={:?} semantic={:?} ner={:?} final={:.3}",
            score.skill_score,
            score.lexical_score,
            score.semantic_score,
            score.ner_score,
            score.final_score
        );

        score
    }

    fn classify(&self, candidate_id: String, score: MatchScore) -> Evaluation {
        let decision = score.decide(self.auto_accept_threshold);
        Evaluation {
            candidate_id,
            score,
            decision,
        }
    }
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("policy", &self.policy)
            .field("auto_accept_threshold", &self.auto_accept_threshold)
            .field("vocabulary_skills", &self.vocabulary_matcher.skill_count())
            .field("semantic", &self.semantic)
            .field("ner", &self.ner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::aggregator::{PolicyKind, TextSignal};
    use crate::processing::ner::EntityGroups;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn vocabulary() -> Arc<SkillVocabulary> {
        Arc::new(SkillVocabulary::new(["python", "sql", "docker", "java", "go"]))
    }

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 1.0])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct OrgExtractor;

    impl EntityExtractor for OrgExtractor {
        fn extract_entities(&self, text: &str) -> Result<EntityGroups> {
            let mut groups = EntityGroups::new();
            if text.contains("sql") {
                groups.insert("MISC".to_string(), vec!["SQL".to_string()]);
            }
            Ok(groups)
        }

        fn name(&self) -> &str {
            "org"
        }
    }

    #[test]
    fn test_required_skills_include_explicit() {
        let engine = MatchEngine::builder(vocabulary()).build().unwrap();
        let posting = Posting::new("We use Python daily").with_required_skills(["  Kubernetes ", "SQL"]);

        let required = engine.required_skills(&posting);

        assert_eq!(
            required.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["kubernetes", "python", "sql"]
        );
    }

    #[test]
    fn test_skill_coverage_end_to_end() {
        let engine = MatchEngine::builder(vocabulary()).build().unwrap();
        let posting = Posting::new("Python and SQL");

        let score = engine.score(&posting, "Go developer who writes python.");

        assert_relative_eq!(score.skill_score, 0.5);
        assert_eq!(score.missing_skills, vec!["sql".to_string()]);
        assert!(score.lexical_score.is_some());
        assert!(score.semantic_score.is_none());
        assert!(score.final_score >= 35.0);
    }

    #[test]
    fn test_empty_inputs_do_not_fail() {
        let engine = MatchEngine::builder(vocabulary()).build().unwrap();
        let score = engine.score(&Posting::new(""), "");

        assert_eq!(score.final_score, 0.0);
        assert!(score.common_skills.is_empty());
        assert!(score.missing_skills.is_empty());
    }

    #[test]
    fn test_tri_signal_uses_ner() {
        let engine = MatchEngine::builder(vocabulary())
            .entity_extractor(Arc::new(OrgExtractor))
            .policy(ScoringPolicy::tri_signal())
            .build()
            .unwrap();
        let posting = Posting::new("python sql");

        let score = engine.score(&posting, "I know sql");

        assert_eq!(score.policy, PolicyKind::TriSignal);
        assert_relative_eq!(score.skill_score, 0.5);
        assert_relative_eq!(score.ner_score.unwrap(), 0.5);
    }

    #[test]
    fn test_semantic_only_when_needed() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = MatchEngine::builder(vocabulary())
            .embedder(embedder.clone())
            .build()
            .unwrap();

        engine.score(&Posting::new("python"), "python");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        let semantic = MatchEngine::builder(vocabulary())
            .embedder(embedder.clone())
            .policy(ScoringPolicy::skill_coverage().with_text_signal(TextSignal::Semantic))
            .build()
            .unwrap();
        let score = semantic.score(&Posting::new("python"), "python");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_relative_eq!(score.semantic_score.unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_batch_embeds_posting_once() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let engine = MatchEngine::builder(vocabulary())
            .embedder(embedder.clone())
            .policy(ScoringPolicy::tri_signal().with_text_signal(TextSignal::Blend))
            .build()
            .unwrap();
        let candidates = vec![
            Candidate::new("a", "python"),
            Candidate::new("b", "sql docker"),
            Candidate::new("c", ""),
        ];

        let evaluations = engine.score_batch(&Posting::new("python sql"), &candidates);

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
        let ids: Vec<&str> = evaluations.iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_batch_matches_single_scores() {
        let engine = MatchEngine::builder(vocabulary()).build().unwrap();
        let posting = Posting::new("Python, SQL and Docker");
        let candidates = vec![
            Candidate::new("one", "python and docker"),
            Candidate::new("two", "java"),
        ];

        let evaluations = engine.score_batch(&posting, &candidates);

        for (evaluation, candidate) in evaluations.iter().zip(&candidates) {
            assert_eq!(evaluation.score, engine.score(&posting, &candidate.text));
        }
    }

    /// Bag-of-vowels embedding with its own batch path; empty documents fail
    struct VowelEmbedder;

    impl VowelEmbedder {
        fn vector(text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(CvMatcherError::Embedding("empty document".to_string()));
            }
            Ok("aeiou"
                .chars()
                .map(|vowel| text.chars().filter(|&c| c == vowel).count() as f32)
                .chain(std::iter::once(1.0))
                .collect())
        }
    }

    impl Embedder for VowelEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Self::vector(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(Self::vector(text)?);
            }
            Ok(embeddings)
        }

        fn name(&self) -> &str {
            "vowels"
        }
    }

    #[test]
    fn test_batch_matches_single_scores_with_embedder() {
        let engine = MatchEngine::builder(vocabulary())
            .embedder(Arc::new(VowelEmbedder))
            .entity_extractor(Arc::new(OrgExtractor))
            .policy(ScoringPolicy::tri_signal().with_text_signal(TextSignal::Blend))
            .build()
            .unwrap();
        let posting = Posting::new("Python, SQL and Docker on a data team");
        let candidates = vec![
            Candidate::new("one", "python and docker"),
            Candidate::new("two", "sql reporting in java"),
            Candidate::new("empty", ""),
        ];

        let evaluations = engine.score_batch(&posting, &candidates);

        assert_eq!(evaluations.len(), candidates.len());
        for (evaluation, candidate) in evaluations.iter().zip(&candidates) {
            let single = engine.score(&posting, &candidate.text);
            assert_eq!(evaluation.score, single, "candidate {}", candidate.id);
            assert!(evaluation.score.semantic_score.is_some());
        }
        assert!(evaluations[0].score.semantic_score.unwrap() > 0.0);
        assert_eq!(evaluations[2].score.semantic_score, Some(0.0));
    }

    fn punctuated_vocabulary() -> Arc<SkillVocabulary> {
        Arc::new(SkillVocabulary::new(["node.js", "python"]))
    }

    #[test]
    fn test_punctuated_explicit_skill_tri_signal() {
        let engine = MatchEngine::builder(punctuated_vocabulary())
            .policy(ScoringPolicy::tri_signal())
            .build()
            .unwrap();
        let posting = Posting::new("We need Node.js and Python").with_required_skills(["Node.js"]);

        let required = engine.required_skills(&posting);
        assert_eq!(
            required.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["node.js", "python"]
        );

        let score = engine.score(&posting, "Node.js and Python expert");
        assert_relative_eq!(score.skill_score, 1.0);
        assert!(score.missing_skills.is_empty());
    }

    #[test]
    fn test_punctuated_explicit_skill_skill_coverage() {
        let engine = MatchEngine::builder(punctuated_vocabulary()).build().unwrap();
        let posting = Posting::new("We need Node.js and Python").with_required_skills(["Node.js"]);

        let score = engine.score(&posting, "Node.js and Python expert");

        assert_relative_eq!(score.skill_score, 1.0);
        assert!(score.missing_skills.is_empty());
        assert_eq!(score.common_skills.len(), 2);
    }

    #[test]
    fn test_stop_words_follow_policy_unless_set() {
        let posting = Posting::new("the and of");

        let coverage = MatchEngine::builder(vocabulary()).build().unwrap();
        assert_eq!(coverage.score(&posting, "the and of").lexical_score, Some(0.0));

        let tri_signal = MatchEngine::builder(vocabulary())
            .policy(ScoringPolicy::tri_signal())
            .build()
            .unwrap();
        assert_relative_eq!(tri_signal.score(&posting, "the and of").lexical_score.unwrap(), 1.0, epsilon = 1e-6);

        let overridden = MatchEngine::builder(vocabulary())
            .policy(ScoringPolicy::tri_signal())
            .stop_words(StopWords::English)
            .build()
            .unwrap();
        assert_eq!(overridden.score(&posting, "the and of").lexical_score, Some(0.0));
    }

    #[test]
    fn test_threshold_decisions() {
        let engine = MatchEngine::builder(vocabulary())
            .auto_accept_threshold(35.0)
            .stop_words(StopWords::English)
            .build()
            .unwrap();
        let posting = Posting::new("python sql");

        let mut evaluation = engine.evaluate(&posting, &Candidate::new("x", "cooking"));
        assert_eq!(evaluation.decision, Decision::PendingManualReview);

        evaluation.accept_manually();
        assert_eq!(evaluation.decision, Decision::ManuallyAccepted);

        let accepted = engine.evaluate(&posting, &Candidate::new("y", "python sql"));
        assert_eq!(accepted.decision, Decision::AutoAccepted);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(MatchEngine::builder(vocabulary()).auto_accept_threshold(120.0).build().is_err());
    }

    #[test]
    fn test_explain_skills_provenance() {
        let engine = MatchEngine::builder(vocabulary())
            .entity_extractor(Arc::new(OrgExtractor))
            .build()
            .unwrap();

        let explanation = engine.explain_skills("Python and SQL, no golang");

        let provenance: Vec<(&str, Provenance)> = explanation
            .skills
            .iter()
            .map(|s| (s.skill.as_str(), s.provenance))
            .collect();
        assert_eq!(provenance, vec![("python", Provenance::Vocabulary), ("sql", Provenance::Both)]);
        assert_eq!(explanation.ner_skills, vec!["sql".to_string()]);
    }

    #[tokio::test]
    async fn test_score_concurrently_keeps_order() {
        let engine = Arc::new(MatchEngine::builder(vocabulary()).build().unwrap());
        let posting = Posting::new("python sql docker");
        let candidates: Vec<Candidate> = (0..16)
            .map(|i| Candidate::new(format!("c{i}"), if i % 2 == 0 { "python" } else { "docker sql" }))
            .collect();

        let sequential = engine.score_batch(&posting, &candidates);
        let concurrent = Arc::clone(&engine)
            .score_concurrently(posting, candidates)
            .await
            .unwrap();

        assert_eq!(sequential, concurrent);
    }
}
