//! Skill vocabulary loading, whole-word vocabulary matching and fuzzy term equality

use crate::error::{CvMatcherError, Result};
use crate::processing::normalizer::{NormalizedText, TextNormalizer};
use crate::processing::skills::{SkillSet, SkillSource};
use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use strsim::{jaro_winkler, normalized_levenshtein};

pub const DEFAULT_FUZZY_THRESHOLD: f32 = 0.8;

/// Minimum length for a term to take part in fuzzy vocabulary lookup
const MIN_FUZZY_TERM_LEN: usize = 4;

/// Immutable set of lower-cased skill strings, loaded once and shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillVocabulary {
    skills: BTreeSet<String>,
}

impl SkillVocabulary {
    pub fn new<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let skills = skills
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self { skills }
    }

    /// Load a vocabulary file: a JSON array of strings, or one skill per line
    /// (blank lines and `#` comments are skipped).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CvMatcherError::Vocabulary(format!("Failed to read vocabulary '{}': {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
            || content.trim_start().starts_with('[');

        let vocabulary = if is_json {
            Self::from_json(&content)?
        } else {
            Self::from_lines(&content)
        };

        log::info!("Loaded {} vocabulary skills from {}", vocabulary.len(), path.display());
        Ok(vocabulary)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let skills: Vec<String> = serde_json::from_str(content)
            .map_err(|e| CvMatcherError::Vocabulary(format!("Invalid vocabulary JSON: {}", e)))?;
        Ok(Self::new(skills))
    }

    pub fn from_lines(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Vocabulary used when no vocabulary file is configured
    pub fn builtin() -> Self {
        let mut skills: Vec<&str> = Vec::new();

        // Programming languages
        skills.extend([
            "rust", "python", "javascript", "typescript", "java", "go", "ruby",
            "php", "swift", "kotlin", "scala", "haskell", "matlab", "sql", "bash",
        ]);

        // Web and backend
        skills.extend([
            "react", "vue", "angular", "html", "css", "node.js", "express", "django", "flask",
            "spring", "rest", "graphql", "grpc", "microservices",
        ]);

        // Infrastructure
        skills.extend([
            "docker", "kubernetes", "aws", "azure", "gcp", "terraform", "ansible", "jenkins",
            "git", "linux", "devops", "ci/cd",
        ]);

        // Data
        skills.extend([
            "postgresql", "mysql", "mongodb", "redis", "elasticsearch", "kafka", "spark",
            "hadoop", "airflow", "pandas", "numpy", "excel", "power bi", "tableau",
            "machine learning", "deep learning", "tensorflow", "pytorch", "scikit-learn", "nlp",
        ]);

        // Methods and soft skills
        skills.extend([
            "agile", "scrum", "jira", "leadership", "communication", "teamwork",
            "problem solving", "project management", "mentoring", "negotiation",
        ]);

        Self::new(skills)
    }

    pub fn contains(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.skills.iter()
    }
}

/// String similarity measure used for approximate term equality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FuzzyAlgorithm {
    /// `2 * LCS(a, b) / (|a| + |b|)`
    #[default]
    Lcs,
    JaroWinkler,
    Levenshtein,
}

/// Similarity ratio in [0, 1] between two terms, compared lower-cased.
/// Every algorithm is symmetric in its arguments.
pub fn similarity_ratio(a: &str, b: &str, algorithm: FuzzyAlgorithm) -> f32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    match algorithm {
        FuzzyAlgorithm::Lcs => lcs_ratio(&a, &b),
        FuzzyAlgorithm::JaroWinkler => jaro_winkler(&a, &b) as f32,
        FuzzyAlgorithm::Levenshtein => normalized_levenshtein(&a, &b) as f32,
    }
}

/// Approximate equality between a required term and an extracted term
pub fn fuzzy_equal(a: &str, b: &str, threshold: f32) -> bool {
    fuzzy_equal_with(a, b, threshold, FuzzyAlgorithm::Lcs)
}

pub fn fuzzy_equal_with(a: &str, b: &str, threshold: f32, algorithm: FuzzyAlgorithm) -> bool {
    similarity_ratio(a, b, algorithm) >= threshold
}

fn lcs_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    let lcs = previous[b.len()];

    (2 * lcs) as f32 / total as f32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
}

/// A vocabulary entry found in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyMatch {
    pub skill: String,
    pub matched_text: String,
    pub method: MatchMethod,
    pub similarity: f32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy)]
struct FuzzyFallback {
    threshold: f32,
    algorithm: FuzzyAlgorithm,
}

/// Looks up a fixed skill vocabulary inside normalized text.
///
/// Entries are normalized the same way as the text and matched as whole
/// words: "go" never matches inside "good", "java" never inside "javascript".
pub struct VocabularyMatcher {
    vocabulary: Arc<SkillVocabulary>,
    normalizer: TextNormalizer,
    exact_matcher: Option<AhoCorasick>,
    patterns: Vec<String>,
    // vocabulary entries sharing one normalized pattern, indexed by pattern id
    entries: Vec<Vec<String>>,
    fuzzy: Option<FuzzyFallback>,
}

impl VocabularyMatcher {
    pub fn new(vocabulary: Arc<SkillVocabulary>) -> Result<Self> {
        let normalizer = TextNormalizer::new();

        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for skill in vocabulary.iter() {
            let pattern = normalizer.normalize(skill).into_string();
            if pattern.is_empty() {
                log::debug!("Skipping vocabulary entry with empty normal form: {:?}", skill);
                continue;
            }
            grouped.entry(pattern).or_default().push(skill.clone());
        }

        let (patterns, entries): (Vec<String>, Vec<Vec<String>>) = grouped.into_iter().unzip();

        let exact_matcher = if patterns.is_empty() {
            None
        } else {
            let matcher = AhoCorasick::builder()
                .match_kind(MatchKind::Standard)
                .build(&patterns)
                .map_err(|e| CvMatcherError::Vocabulary(format!("Failed to build vocabulary matcher: {}", e)))?;
            Some(matcher)
        };

        Ok(Self {
            vocabulary,
            normalizer,
            exact_matcher,
            patterns,
            entries,
            fuzzy: None,
        })
    }

    /// Enable fuzzy lookup for single-word entries that have no exact hit
    pub fn with_fuzzy_fallback(mut self, threshold: f32, algorithm: FuzzyAlgorithm) -> Self {
        self.fuzzy = Some(FuzzyFallback {
            threshold: threshold.clamp(0.0, 1.0),
            algorithm,
        });
        self
    }

    /// Set of vocabulary entries present in `text`
    pub fn extract_vocabulary_skills(&self, text: &str) -> SkillSet {
        let normalized = self.normalizer.normalize(text);
        self.extract_from_normalized(&normalized)
    }

    pub fn extract_from_normalized(&self, text: &NormalizedText) -> SkillSet {
        SkillSet::from_skills(
            SkillSource::FromVocabulary,
            self.find_normalized(text).into_iter().map(|m| m.skill),
        )
    }

    /// Detailed matches (method, matched text, count) for explainability
    pub fn find_matches(&self, text: &str) -> Vec<VocabularyMatch> {
        let normalized = self.normalizer.normalize(text);
        self.find_normalized(&normalized)
    }

    pub fn find_normalized(&self, text: &NormalizedText) -> Vec<VocabularyMatch> {
        let mut matches: BTreeMap<String, VocabularyMatch> = BTreeMap::new();
        if text.is_empty() {
            return Vec::new();
        }

        let hits = self.exact_hits(text.as_str());
        for (pattern_id, count) in &hits {
            for skill in &self.entries[*pattern_id] {
                matches.insert(skill.clone(), VocabularyMatch {
                    skill: skill.clone(),
                    matched_text: self.patterns[*pattern_id].clone(),
                    method: MatchMethod::Exact,
                    similarity: 1.0,
                    count: *count,
                });
            }
        }

        if let Some(fuzzy) = self.fuzzy {
            let tokens: BTreeSet<&str> = text
                .tokens()
                .filter(|t| t.len() >= MIN_FUZZY_TERM_LEN)
                .collect();

            for (pattern_id, pattern) in self.patterns.iter().enumerate() {
                if hits.contains_key(&pattern_id)
                    || pattern.contains(' ')
                    || pattern.len() < MIN_FUZZY_TERM_LEN
                {
                    continue;
                }

                let mut best: Option<(&str, f32)> = None;
                for token in &tokens {
                    let similarity = similarity_ratio(pattern, token, fuzzy.algorithm);
                    if similarity >= fuzzy.threshold && best.map_or(true, |(_, s)| similarity > s) {
                        best = Some((token, similarity));
                    }
                }

                if let Some((token, similarity)) = best {
                    for skill in &self.entries[pattern_id] {
                        matches.entry(skill.clone()).or_insert_with(|| VocabularyMatch {
                            skill: skill.clone(),
                            matched_text: token.to_string(),
                            method: MatchMethod::Fuzzy,
                            similarity,
                            count: 1,
                        });
                    }
                }
            }
        }

        matches.into_values().collect()
    }

    /// Whole-word occurrences per pattern id
    fn exact_hits(&self, text: &str) -> BTreeMap<usize, usize> {
        let mut hits = BTreeMap::new();
        let Some(matcher) = &self.exact_matcher else {
            return hits;
        };

        let bytes = text.as_bytes();
        for mat in matcher.find_overlapping_iter(text) {
            let starts_word = mat.start() == 0 || bytes[mat.start() - 1] == b' ';
            let ends_word = mat.end() == bytes.len() || bytes[mat.end()] == b' ';
            if starts_word && ends_word {
                *hits.entry(mat.pattern().as_usize()).or_insert(0) += 1;
            }
        }

        hits
    }

    /// Vocabulary spelling of `skill` when an entry shares its normal form
    /// ("Node.js" -> "node.js"), otherwise `skill` trimmed and lower-cased
    pub fn canonical_skill(&self, skill: &str) -> String {
        let pattern = self.normalizer.normalize(skill);
        self.patterns
            .binary_search_by(|p| p.as_str().cmp(pattern.as_str()))
            .ok()
            .and_then(|id| self.entries[id].first().cloned())
            .unwrap_or_else(|| skill.trim().to_lowercase())
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        &self.vocabulary
    }

    pub fn skill_count(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn fuzzy_threshold(&self) -> Option<f32> {
        self.fuzzy.map(|f| f.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn matcher(skills: &[&str]) -> VocabularyMatcher {
        VocabularyMatcher::new(Arc::new(SkillVocabulary::new(skills.iter().copied()))).unwrap()
    }

    #[test]
    fn test_exact_whole_word_matching() {
        let matcher = matcher(&["python", "sql", "machine learning", "react"]);
        let skills = matcher.extract_vocabulary_skills(
            "Experienced in Python and SQL; some Machine-Learning and machine learning work.",
        );

        assert!(skills.contains("python"));
        assert!(skills.contains("sql"));
        assert!(skills.contains("machine learning"));
        assert!(!skills.contains("react"));
        assert_eq!(skills.source(), SkillSource::FromVocabulary);
    }

    #[test]
    fn test_token_boundaries() {
        let matcher = matcher(&["java", "go"]);

        assert!(matcher.extract_vocabulary_skills("Senior JavaScript developer").is_empty());
        assert!(matcher.extract_vocabulary_skills("A good engineer").is_empty());

        let skills = matcher.extract_vocabulary_skills("JavaScript, Java and Go");
        assert!(skills.contains("java"));
        assert!(skills.contains("go"));
    }

    #[test]
    fn test_overlapping_occurrence_after_longer_token() {
        // first "java" hit is inside "javascript", the second one stands alone
        let matcher = matcher(&["java"]);
        let skills = matcher.extract_vocabulary_skills("javascript then java");

        assert!(skills.contains("java"));
    }

    #[test]
    fn test_entries_with_punctuation() {
        let matcher = matcher(&["node.js", "ci/cd"]);
        let matches = matcher.find_matches("Built CI/CD pipelines for Node.js services");

        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.method == MatchMethod::Exact));
        assert!(matches.iter().any(|m| m.skill == "node.js" && m.matched_text == "nodejs"));
    }

    #[test]
    fn test_canonical_skill_uses_vocabulary_spelling() {
        let matcher = matcher(&["node.js", "ci/cd", "python"]);

        assert_eq!(matcher.canonical_skill("Node.js"), "node.js");
        assert_eq!(matcher.canonical_skill("  NodeJS "), "node.js");
        assert_eq!(matcher.canonical_skill("CI/CD"), "ci/cd");
        assert_eq!(matcher.canonical_skill(" Kubernetes "), "kubernetes");
    }

    #[test]
    fn test_counts() {
        let matcher = matcher(&["rust"]);
        let matches = matcher.find_matches("Rust, rust and more RUST");

        assert_eq!(matches[0].count, 3);
    }

    #[test]
    fn test_empty_inputs() {
        let empty = matcher(&[]);
        assert!(empty.extract_vocabulary_skills("python sql").is_empty());

        let some = matcher(&["python"]);
        assert!(some.extract_vocabulary_skills("").is_empty());
    }

    #[test]
    fn test_fuzzy_fallback() {
        let strict = matcher(&["kubernetes", "python"]);
        assert!(strict.extract_vocabulary_skills("Deployed on kubernets").is_empty());

        let fuzzy = matcher(&["kubernetes", "python"]).with_fuzzy_fallback(0.8, FuzzyAlgorithm::Lcs);
        let matches = fuzzy.find_matches("Deployed on kubernets");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].skill, "kubernetes");
        assert_eq!(matches[0].method, MatchMethod::Fuzzy);
        assert_eq!(matches[0].matched_text, "kubernets");
        assert!(matches[0].similarity >= 0.8);
    }

    #[test]
    fn test_fuzzy_equal_symmetric_and_deterministic() {
        let pairs = [
            ("javascript", "java script"),
            ("python", "pyhton"),
            ("sql", "nosql"),
            ("", ""),
            ("rust", ""),
        ];

        for (a, b) in pairs {
            for algorithm in [FuzzyAlgorithm::Lcs, FuzzyAlgorithm::JaroWinkler, FuzzyAlgorithm::Levenshtein] {
                assert_eq!(
                    fuzzy_equal_with(a, b, 0.8, algorithm),
                    fuzzy_equal_with(b, a, 0.8, algorithm),
                    "asymmetric for {a:?} / {b:?} with {algorithm:?}"
                );
                assert_eq!(similarity_ratio(a, b, algorithm), similarity_ratio(a, b, algorithm));
            }
        }
    }

    #[test]
    fn test_fuzzy_equal_values() {
        assert!(fuzzy_equal("JavaScript", "java script", DEFAULT_FUZZY_THRESHOLD));
        assert!(fuzzy_equal("Python", "python", DEFAULT_FUZZY_THRESHOLD));
        assert!(!fuzzy_equal("java", "javascript", DEFAULT_FUZZY_THRESHOLD));
        assert!(!fuzzy_equal("python", "sql", DEFAULT_FUZZY_THRESHOLD));
        assert_eq!(similarity_ratio("", "", FuzzyAlgorithm::Lcs), 1.0);
    }

    #[test]
    fn test_vocabulary_from_lines_and_json() {
        let from_lines = SkillVocabulary::from_lines("# skills\nPython\n\n  SQL \npython\n");
        assert_eq!(from_lines.len(), 2);
        assert!(from_lines.contains("python"));
        assert!(from_lines.contains("sql"));

        let from_json = SkillVocabulary::from_json(r#"["Docker", "Kubernetes", "docker"]"#).unwrap();
        assert_eq!(from_json.len(), 2);

        assert!(SkillVocabulary::from_json("{not json").is_err());
    }

    #[test]
    fn test_vocabulary_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"["Rust", "Tokio"]"#).unwrap();

        let vocabulary = SkillVocabulary::load(file.path()).unwrap();
        assert_eq!(vocabulary.len(), 2);
        assert!(vocabulary.contains("tokio"));

        assert!(SkillVocabulary::load(Path::new("does/not/exist.json")).is_err());
    }

    #[test]
    fn test_builtin_vocabulary() {
        let vocabulary = SkillVocabulary::builtin();
        assert!(vocabulary.len() > 50);
        assert!(vocabulary.contains("python"));
        assert!(vocabulary.iter().all(|s| s == &s.to_lowercase()));
    }
}
