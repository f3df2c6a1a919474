//! CLI interface for the CV matcher

use crate::processing::aggregator::{PolicyKind, TextSignal};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cv-matcher")]
#[command(about = "Score resumes against a job posting")]
#[command(long_about = "Rank candidate resumes against a job posting by combining skill vocabulary coverage, named-entity skills, TF-IDF and embedding similarity, then classify each candidate for auto-acceptance or manual review")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score one or more resumes against a job posting
    Score {
        /// Path to the job posting (TXT, MD)
        #[arg(short, long)]
        posting: PathBuf,

        /// Paths to candidate resumes (TXT, MD)
        #[arg(required = true, num_args = 1..)]
        candidates: Vec<PathBuf>,

        /// Required skills listed on the posting, in addition to those found in its text
        #[arg(short = 'k', long = "skill", value_delimiter = ',')]
        skills: Vec<String>,

        /// Scoring policy: skill-coverage, tri-signal
        #[arg(long)]
        policy: Option<PolicyKind>,

        /// Text similarity signal: lexical, semantic, blend
        #[arg(long, value_parser = parse_text_signal)]
        text_signal: Option<TextSignal>,

        /// Auto-accept threshold in percent (0-100)
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Candidate ids (file stems) to accept manually regardless of score
        #[arg(long, value_delimiter = ',')]
        accept: Vec<String>,

        /// Output detailed signal breakdown
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json
        #[arg(short, long)]
        output: Option<String>,

        /// Save output to a file, or into a directory under a generated name
        #[arg(short, long)]
        save: Option<PathBuf>,

        /// Skip the NER model
        #[arg(long)]
        no_ner: bool,

        /// Skip the embedding model
        #[arg(long)]
        no_embeddings: bool,

        /// Score candidates on parallel worker threads
        #[arg(long)]
        parallel: bool,
    },

    /// Show which skills a document yields and where they come from
    Skills {
        /// Path to a posting or resume (TXT, MD)
        file: PathBuf,

        /// Show vocabulary match details
        #[arg(short, long)]
        detailed: bool,

        /// Output format: console, json
        #[arg(short, long)]
        output: Option<String>,

        /// Skip the NER model
        #[arg(long)]
        no_ner: bool,
    },

    /// Model management commands
    Models {
        #[command(subcommand)]
        action: ModelAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum ModelAction {
    /// List available models
    List {
        /// Show only embedding models
        #[arg(long)]
        embeddings: bool,

        /// Show only NER models
        #[arg(long)]
        ner: bool,
    },

    /// Download a model
    Download {
        /// Model name or Hugging Face repo id
        model: String,

        /// Force re-download if model exists
        #[arg(short, long)]
        force: bool,
    },

    /// Remove a downloaded model
    Remove {
        /// Model name or Hugging Face repo id
        model: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file location
    Path,
}

pub fn parse_text_signal(signal: &str) -> Result<TextSignal, String> {
    match signal.to_lowercase().as_str() {
        "lexical" | "tfidf" | "tf-idf" => Ok(TextSignal::Lexical),
        "semantic" | "embedding" | "embeddings" => Ok(TextSignal::Semantic),
        "blend" | "hybrid" => Ok(TextSignal::Blend),
        _ => Err(format!("Invalid text signal: {}. Supported: lexical, semantic, blend", signal)),
    }
}

/// Validate file extension
pub fn validate_file_extension(path: &Path, allowed_extensions: &[&str]) -> Result<(), String> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => {
            if allowed_extensions.contains(&ext.to_lowercase().as_str()) {
                Ok(())
            } else {
                Err(format!(
                    "Unsupported file extension: .{}. Allowed: {}",
                    ext,
                    allowed_extensions.join(", ")
                ))
            }
        }
        None => Err("File has no extension".to_string()),
    }
}
