//! Weighted aggregation of skill and text signals into a final score

use crate::processing::lexical::StopWords;
use crate::processing::skills::{Provenance, SkillSet, SkillUnion};
use crate::processing::vocabulary::{similarity_ratio, FuzzyAlgorithm, DEFAULT_FUZZY_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Smoothing floor used by the tri-signal policy when NER finds no required skill.
///
/// Keeps a total absence of NER overlap from zeroing that third of the blend.
pub const DEFAULT_NER_FLOOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// `0.7 * fuzzy skill coverage + 0.3 * text similarity`, on 0-100
    SkillCoverage,
    /// `(text similarity + keyword coverage + NER coverage) / 3`, on 0-1
    TriSignal,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::SkillCoverage => write!(f, "skill-coverage"),
            PolicyKind::TriSignal => write!(f, "tri-signal"),
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skill-coverage" | "coverage" | "a" => Ok(PolicyKind::SkillCoverage),
            "tri-signal" | "blend" | "b" => Ok(PolicyKind::TriSignal),
            _ => Err(format!("Invalid scoring policy: {}. Supported: skill-coverage, tri-signal", s)),
        }
    }
}

/// Scale a policy reports its final score on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreScale {
    /// 0 to 100
    Percent,
    /// 0 to 1
    Unit,
}

impl ScoreScale {
    pub fn max(self) -> f32 {
        match self {
            ScoreScale::Percent => 100.0,
            ScoreScale::Unit => 1.0,
        }
    }

    pub fn from_fraction(self, fraction: f32) -> f32 {
        fraction * self.max()
    }

    pub fn to_fraction(self, value: f32) -> f32 {
        value / self.max()
    }

    /// Convert a threshold given in percent to this scale
    pub fn from_percent(self, percent: f32) -> f32 {
        self.from_fraction(percent / 100.0)
    }
}

/// Where a policy's text similarity term comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextSignal {
    #[default]
    Lexical,
    Semantic,
    /// Weighted mix of lexical and semantic similarity, see [`TextBlend`]
    Blend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBlend {
    pub lexical_weight: f32,
    pub semantic_weight: f32,
}

impl Default for TextBlend {
    fn default() -> Self {
        Self {
            lexical_weight: 0.4,
            semantic_weight: 0.6,
        }
    }
}

/// One configurable aggregation strategy covering both scoring policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub kind: PolicyKind,
    /// Skill-coverage weight of the coverage term
    pub skill_weight: f32,
    /// Skill-coverage weight of the text term
    pub text_weight: f32,
    pub fuzzy_threshold: f32,
    pub fuzzy_algorithm: FuzzyAlgorithm,
    /// Let NER-detected candidate skills satisfy requirements under skill-coverage
    pub include_ner_skills: bool,
    /// Tri-signal NER floor
    pub ner_floor: f32,
    pub text_signal: TextSignal,
    pub text_blend: TextBlend,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::skill_coverage()
    }
}

impl ScoringPolicy {
    pub fn skill_coverage() -> Self {
        Self {
            kind: PolicyKind::SkillCoverage,
            skill_weight: 0.7,
            text_weight: 0.3,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            fuzzy_algorithm: FuzzyAlgorithm::Lcs,
            include_ner_skills: false,
            ner_floor: DEFAULT_NER_FLOOR,
            text_signal: TextSignal::Lexical,
            text_blend: TextBlend::default(),
        }
    }

    pub fn tri_signal() -> Self {
        Self {
            kind: PolicyKind::TriSignal,
            ..Self::skill_coverage()
        }
    }

    pub fn for_kind(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::SkillCoverage => Self::skill_coverage(),
            PolicyKind::TriSignal => Self::tri_signal(),
        }
    }

    pub fn with_text_signal(mut self, signal: TextSignal) -> Self {
        self.text_signal = signal;
        self
    }

    /// Stop-word handling for the lexical signal when none is configured:
    /// skill coverage drops English stop words, tri-signal keeps every token
    pub fn default_stop_words(&self) -> StopWords {
        match self.kind {
            PolicyKind::SkillCoverage => StopWords::English,
            PolicyKind::TriSignal => StopWords::None,
        }
    }

    pub fn scale(&self) -> ScoreScale {
        match self.kind {
            PolicyKind::SkillCoverage => ScoreScale::Percent,
            PolicyKind::TriSignal => ScoreScale::Unit,
        }
    }

    pub fn needs_lexical(&self) -> bool {
        matches!(self.text_signal, TextSignal::Lexical | TextSignal::Blend)
    }

    pub fn needs_semantic(&self) -> bool {
        matches!(self.text_signal, TextSignal::Semantic | TextSignal::Blend)
    }

    /// Whether the candidate's NER skills feed this policy at all
    pub fn needs_ner(&self) -> bool {
        match self.kind {
            PolicyKind::SkillCoverage => self.include_ner_skills,
            PolicyKind::TriSignal => true,
        }
    }

    /// Text term from whichever similarities were computed; missing ones count as 0.0
    pub fn text_score(&self, lexical: Option<f32>, semantic: Option<f32>) -> f32 {
        let lexical = lexical.unwrap_or(0.0);
        let semantic = semantic.unwrap_or(0.0);

        let score = match self.text_signal {
            TextSignal::Lexical => lexical,
            TextSignal::Semantic => semantic,
            TextSignal::Blend => {
                self.text_blend.lexical_weight * lexical + self.text_blend.semantic_weight * semantic
            }
        };
        score.clamp(0.0, 1.0)
    }
}

/// Signals computed for one (posting, candidate) pair
#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub required_skills: &'a SkillSet,
    pub candidate_vocabulary_skills: &'a SkillSet,
    pub candidate_ner_skills: &'a SkillSet,
    pub lexical: Option<f32>,
    pub semantic: Option<f32>,
}

/// A required skill the candidate covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub skill: String,
    /// Candidate-side term that satisfied the requirement
    pub matched_as: String,
    pub provenance: Provenance,
    pub similarity: f32,
}

/// Result of comparing one posting against one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub policy: PolicyKind,
    pub scale: ScoreScale,
    /// Required-skill coverage in [0, 1]
    pub skill_score: f32,
    pub lexical_score: Option<f32>,
    pub semantic_score: Option<f32>,
    /// Text term used by the policy, in [0, 1]
    pub text_score: f32,
    /// Tri-signal NER term (floored), in [0, 1]
    pub ner_score: Option<f32>,
    /// Final score on `scale`
    pub final_score: f32,
    pub common_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<String>,
}

impl MatchScore {
    /// Final score in [0, 1] whatever the policy's scale
    pub fn fraction(&self) -> f32 {
        self.scale.to_fraction(self.final_score)
    }

    pub fn percent(&self) -> f32 {
        self.fraction() * 100.0
    }

    pub fn common_skill_names(&self) -> impl Iterator<Item = &str> {
        self.common_skills.iter().map(|m| m.skill.as_str())
    }

    /// Classify against a threshold expressed in percent
    pub fn decide(&self, threshold_percent: f32) -> Decision {
        Decision::classify(self.final_score, self.scale.from_percent(threshold_percent))
    }
}

/// Outcome of the auto-accept threshold policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    AutoAccepted,
    PendingManualReview,
    /// A reviewer forced acceptance of a pending candidate
    ManuallyAccepted,
}

impl Decision {
    /// `final_score >= threshold`; both on the same scale
    pub fn classify(final_score: f32, threshold: f32) -> Self {
        if final_score >= threshold {
            Decision::AutoAccepted
        } else {
            Decision::PendingManualReview
        }
    }

    /// Manual override: pending candidates become accepted, others are unchanged
    pub fn accept_manually(self) -> Self {
        match self {
            Decision::PendingManualReview => Decision::ManuallyAccepted,
            other => other,
        }
    }

    pub fn is_accepted(self) -> bool {
        !matches!(self, Decision::PendingManualReview)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::AutoAccepted => write!(f, "auto-accepted"),
            Decision::PendingManualReview => write!(f, "pending-manual-review"),
            Decision::ManuallyAccepted => write!(f, "manually-accepted"),
        }
    }
}

/// Combine the signals of one comparison under `policy`. Pure and deterministic.
pub fn aggregate(policy: &ScoringPolicy, inputs: &ScoringInputs<'_>) -> MatchScore {
    match policy.kind {
        PolicyKind::SkillCoverage => skill_coverage(policy, inputs),
        PolicyKind::TriSignal => tri_signal(policy, inputs),
    }
}

fn skill_coverage(policy: &ScoringPolicy, inputs: &ScoringInputs<'_>) -> MatchScore {
    let mut candidate = SkillUnion::default();
    candidate.add(inputs.candidate_vocabulary_skills);
    if policy.include_ner_skills {
        candidate.add(inputs.candidate_ner_skills);
    }

    let mut common_skills = Vec::new();
    let mut missing_skills = Vec::new();

    for required in inputs.required_skills.iter() {
        if let Some(provenance) = candidate.provenance(required) {
            common_skills.push(MatchedSkill {
                skill: required.clone(),
                matched_as: required.clone(),
                provenance,
                similarity: 1.0,
            });
            continue;
        }

        // best fuzzy candidate; ties keep the first term in sorted order
        let mut best: Option<(&String, Provenance, f32)> = None;
        for (term, provenance) in candidate.iter() {
            let similarity = similarity_ratio(required, term, policy.fuzzy_algorithm);
            if similarity >= policy.fuzzy_threshold && best.map_or(true, |(_, _, s)| similarity > s) {
                best = Some((term, *provenance, similarity));
            }
        }

        match best {
            Some((term, provenance, similarity)) => common_skills.push(MatchedSkill {
                skill: required.clone(),
                matched_as: term.clone(),
                provenance,
                similarity,
            }),
            None => missing_skills.push(required.clone()),
        }
    }

    let skill_score = coverage(common_skills.len(), inputs.required_skills.len());
    let text_score = policy.text_score(inputs.lexical, inputs.semantic);
    let final_score = policy.skill_weight * (skill_score * 100.0) + policy.text_weight * (text_score * 100.0);

    MatchScore {
        policy: PolicyKind::SkillCoverage,
        scale: ScoreScale::Percent,
        skill_score,
        lexical_score: inputs.lexical,
        semantic_score: inputs.semantic,
        text_score,
        ner_score: None,
        final_score,
        common_skills,
        missing_skills,
    }
}

fn tri_signal(policy: &ScoringPolicy, inputs: &ScoringInputs<'_>) -> MatchScore {
    let offer = inputs.required_skills;
    let candidate = inputs
        .candidate_vocabulary_skills
        .union(inputs.candidate_ner_skills);

    let mut common_skills = Vec::new();
    let mut missing_skills = Vec::new();
    for skill in offer.iter() {
        match candidate.provenance(skill) {
            Some(provenance) => common_skills.push(MatchedSkill {
                skill: skill.clone(),
                matched_as: skill.clone(),
                provenance,
                similarity: 1.0,
            }),
            None => missing_skills.push(skill.clone()),
        }
    }

    let keyword_score = coverage(common_skills.len(), offer.len());
    let ner_coverage = coverage(offer.intersection_count(inputs.candidate_ner_skills), offer.len());
    let ner_score = if ner_coverage > 0.0 { ner_coverage } else { policy.ner_floor };
    let text_score = policy.text_score(inputs.lexical, inputs.semantic);

    let final_score = (text_score + keyword_score + ner_score) / 3.0;

    MatchScore {
        policy: PolicyKind::TriSignal,
        scale: ScoreScale::Unit,
        skill_score: keyword_score,
        lexical_score: inputs.lexical,
        semantic_score: inputs.semantic,
        text_score,
        ner_score: Some(ner_score),
        final_score,
        common_skills,
        missing_skills,
    }
}

fn coverage(matched: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        matched as f32 / total as f32
    }
}
