//! Report structures for a scoring run

use crate::processing::aggregator::{PolicyKind, ScoreScale};
use crate::processing::engine::Evaluation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Result of scoring a set of candidates against one posting, best match first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringReport {
    pub metadata: ReportMetadata,

    /// Required skills of the posting (explicit and detected)
    pub required_skills: Vec<String>,

    pub results: Vec<RankedCandidate>,

    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position after sorting
    pub rank: usize,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub candidates: usize,
    pub auto_accepted: usize,
    pub pending_review: usize,
    /// Best final score, in percent
    pub best_score_percent: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub matcher_version: String,
    pub posting_file: String,
    pub policy: PolicyKind,
    pub scale: ScoreScale,
    /// Auto-accept threshold in percent
    pub threshold_percent: f32,
    pub embedding_model: Option<String>,
    pub ner_model: Option<String>,
    pub processing_time_ms: u64,
}

impl ReportMetadata {
    pub fn new(posting_file: impl Into<String>, policy: PolicyKind, scale: ScoreScale, threshold_percent: f32) -> Self {
        Self {
            generated_at: Utc::now(),
            matcher_version: env!("CARGO_PKG_VERSION").to_string(),
            posting_file: posting_file.into(),
            policy,
            scale,
            threshold_percent,
            embedding_model: None,
            ner_model: None,
            processing_time_ms: 0,
        }
    }
}

impl ScoringReport {
    /// Rank evaluations by final score, ties broken by candidate id
    pub fn new(metadata: ReportMetadata, required_skills: Vec<String>, mut evaluations: Vec<Evaluation>) -> Self {
        evaluations.sort_by(|a, b| {
            b.score
                .fraction()
                .partial_cmp(&a.score.fraction())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });

        let summary = ReportSummary {
            candidates: evaluations.len(),
            auto_accepted: evaluations.iter().filter(|e| e.decision.is_accepted()).count(),
            pending_review: evaluations.iter().filter(|e| !e.decision.is_accepted()).count(),
            best_score_percent: evaluations.first().map(|e| e.score.percent()),
        };

        let results = evaluations
            .into_iter()
            .enumerate()
            .map(|(index, evaluation)| RankedCandidate {
                rank: index + 1,
                evaluation,
            })
            .collect();

        Self {
            metadata,
            required_skills,
            results,
            summary,
        }
    }

    /// Reviewer override for one candidate; returns false when the id is unknown
    pub fn accept_manually(&mut self, candidate_id: &str) -> bool {
        let Some(result) = self
            .results
            .iter_mut()
            .find(|r| r.evaluation.candidate_id == candidate_id)
        else {
            return false;
        };

        if !result.evaluation.decision.is_accepted() {
            result.evaluation.accept_manually();
            self.summary.auto_accepted += 1;
            self.summary.pending_review -= 1;
        }
        true
    }
}
