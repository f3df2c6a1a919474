//! CV matcher library
//!
//! Scores candidate resumes against a job posting by combining skill
//! vocabulary coverage, NER-detected skills, TF-IDF similarity and
//! embedding similarity, then classifies each candidate for auto-acceptance
//! or manual review.

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod processing;

pub use config::Config;
pub use error::{CvMatcherError, Result};
pub use processing::aggregator::{Decision, MatchScore, PolicyKind, ScoreScale, ScoringPolicy, TextSignal};
pub use processing::engine::{Candidate, Evaluation, MatchEngine, Posting};
pub use processing::vocabulary::SkillVocabulary;
