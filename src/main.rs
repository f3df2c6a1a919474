//! cv-matcher: rank resumes against a job posting

use clap::Parser;
use colored::Colorize;
use cv_matcher::cli::{self, Cli, Commands, ConfigAction, ModelAction};
use cv_matcher::config::{Config, ModelType};
use cv_matcher::error::{CvMatcherError, Result};
use cv_matcher::input::InputManager;
use cv_matcher::models::bert_ner::BertNerExtractor;
use cv_matcher::models::embedder::Model2VecEmbedder;
use cv_matcher::models::model_manager::ModelManager;
use cv_matcher::output::formatter::{parse_output_format, save_report_to_file, suggest_filename, ReportGenerator};
use cv_matcher::output::report::{ReportMetadata, ScoringReport};
use cv_matcher::processing::engine::{MatchEngine, Posting};
use cv_matcher::processing::ner::EntityExtractor;
use cv_matcher::processing::semantic::Embedder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DOCUMENT_EXTENSIONS: [&str; 4] = ["txt", "text", "md", "markdown"];

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = match Config::load_from(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command, config, &config_path).await {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands, mut config: Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Score {
            posting,
            candidates,
            skills,
            policy,
            text_signal,
            threshold,
            accept,
            detailed,
            output,
            save,
            no_ner,
            no_embeddings,
            parallel,
        } => {
            let start = Instant::now();

            for path in std::iter::once(&posting).chain(candidates.iter()) {
                cli::validate_file_extension(path, &DOCUMENT_EXTENSIONS)
                    .map_err(|e| CvMatcherError::InvalidInput(format!("{}: {}", path.display(), e)))?;
            }

            if let Some(policy) = policy {
                config.scoring.policy = policy;
            }
            if let Some(signal) = text_signal {
                config.scoring.text_signal = signal;
            }
            if let Some(threshold) = threshold {
                config.scoring.auto_accept_threshold = threshold;
            }
            config.validate()?;

            let output_format = match output {
                Some(format) => parse_output_format(&format).map_err(CvMatcherError::InvalidInput)?,
                None => config.output.format,
            };
            let detailed = detailed || config.output.detailed;
            let policy = config.scoring_policy();

            let embedder = if policy.needs_semantic() && !no_embeddings {
                load_embedder(&config).await
            } else {
                None
            };
            let ner = if policy.needs_ner() && !no_ner {
                load_ner(&config).await
            } else {
                None
            };

            let engine = Arc::new(build_engine(&config, embedder.clone(), ner.clone())?);

            let mut input_manager = InputManager::new();
            let posting_text = input_manager.extract_text(&posting).await?;
            let posting_record = Posting::new(posting_text).with_required_skills(skills);
            let candidates = input_manager.load_candidates(&candidates).await?;

            let spinner = spinner(format!("Scoring {} candidates...", candidates.len()));
            let evaluations = if parallel {
                Arc::clone(&engine)
                    .score_concurrently(posting_record.clone(), candidates)
                    .await?
            } else {
                engine.score_batch(&posting_record, &candidates)
            };
            spinner.finish_and_clear();

            let mut metadata = ReportMetadata::new(
                posting.display().to_string(),
                policy.kind,
                policy.scale(),
                config.scoring.auto_accept_threshold,
            );
            metadata.embedding_model = embedder.as_ref().map(|e| e.name().to_string());
            metadata.ner_model = ner.as_ref().map(|n| n.name().to_string());
            metadata.processing_time_ms = start.elapsed().as_millis() as u64;

            let required_skills = engine.required_skills(&posting_record).iter().cloned().collect();
            let mut report = ScoringReport::new(metadata, required_skills, evaluations);

            for candidate_id in &accept {
                if !report.accept_manually(candidate_id) {
                    warn!("Cannot accept unknown candidate '{}'", candidate_id);
                }
            }

            let generator = ReportGenerator::with_options(config.output.color_output, detailed, true);
            let rendered = generator.generate_report(&report, output_format)?;
            println!("{}", rendered);

            if let Some(mut save_path) = save {
                if save_path.is_dir() {
                    save_path.push(suggest_filename(output_format, &report.metadata.posting_file, true));
                }
                // colors never go to files
                let plain = ReportGenerator::with_options(false, detailed, true).generate_report(&report, output_format)?;
                save_report_to_file(&plain, &save_path)?;
                println!("{} {}", "Report saved to".green(), save_path.display());
            }
        }

        Commands::Skills {
            file,
            detailed,
            output,
            no_ner,
        } => {
            cli::validate_file_extension(&file, &DOCUMENT_EXTENSIONS).map_err(CvMatcherError::InvalidInput)?;

            let output_format = match output {
                Some(format) => parse_output_format(&format).map_err(CvMatcherError::InvalidInput)?,
                None => config.output.format,
            };

            let ner = if no_ner { None } else { load_ner(&config).await };
            let engine = build_engine(&config, None, ner)?;

            let text = InputManager::new().extract_text(&file).await?;
            let explanation = engine.explain_skills(&text);

            let generator =
                ReportGenerator::with_options(config.output.color_output, detailed || config.output.detailed, true);
            println!("{}", generator.generate_skills(&explanation, output_format)?);
        }

        Commands::Models { action } => match action {
            ModelAction::List { embeddings, ner } => {
                let manager = ModelManager::from_config(&config).await?;

                println!("{}\n", "Available models".bold());
                for status in manager.list_models() {
                    let show = match status.info.model_type {
                        ModelType::Embedding => embeddings || !ner,
                        ModelType::Ner => ner || !embeddings,
                    };
                    if !show {
                        continue;
                    }

                    let state = if status.downloaded {
                        "downloaded".green()
                    } else {
                        "available".yellow()
                    };
                    println!(
                        "  {:<18} {:<10} {:>6} MB  {:<11} {}",
                        status.info.name,
                        status.info.model_type.to_string(),
                        status.info.size_mb,
                        state,
                        status.info.repo_id
                    );
                    println!("  {:<18} {}", "", status.info.description.dimmed());
                }
                println!("\nModels directory: {}", manager.models_dir().display());
            }

            ModelAction::Download { model, force } => {
                let mut manager = ModelManager::from_config(&config).await?;

                if manager.is_model_downloaded(&model) {
                    if !force {
                        println!("Model '{}' is already downloaded (use --force to re-download)", model);
                        return Ok(());
                    }
                    manager.remove_model(&model).await?;
                }

                let spinner = spinner(format!("Downloading {}...", model));
                let result = manager.download_model(&model).await;
                spinner.finish_and_clear();

                let model_path = result?;
                println!("{} {}", "Model downloaded to".green(), model_path.display());
            }

            ModelAction::Remove { model } => {
                let mut manager = ModelManager::from_config(&config).await?;
                manager.remove_model(&model).await?;
                println!("{} {}", "Removed model".green(), model);
            }
        },

        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                let content = toml::to_string_pretty(&config)
                    .map_err(|e| CvMatcherError::Configuration(format!("Failed to serialize config: {}", e)))?;
                println!("# {}\n{}", config_path.display(), content);
            }

            Some(ConfigAction::Reset) => {
                Config::default().save_to(config_path)?;
                println!("{} {}", "Configuration reset:".green(), config_path.display());
            }

            Some(ConfigAction::Path) => {
                println!("{}", config_path.display());
            }
        },
    }

    Ok(())
}

fn build_engine(
    config: &Config,
    embedder: Option<Arc<dyn Embedder>>,
    ner: Option<Arc<dyn EntityExtractor>>,
) -> Result<MatchEngine> {
    let vocabulary = Arc::new(config.load_vocabulary()?);
    let mut builder = MatchEngine::builder(vocabulary).with_config(config);
    if let Some(embedder) = embedder {
        builder = builder.embedder(embedder);
    }
    if let Some(ner) = ner {
        builder = builder.entity_extractor(ner);
    }
    builder.build()
}

/// Local directory of a downloaded model, or `None` with a hint when missing
async fn downloaded_model_path(config: &Config, name: &str) -> Option<PathBuf> {
    let manager = match ModelManager::from_config(config).await {
        Ok(manager) => manager,
        Err(e) => {
            warn!("Model directory unavailable: {}", e);
            return None;
        }
    };

    let path = manager.get_model_path(name);
    if path.is_none() {
        warn!("Model '{}' is not downloaded; run `cv-matcher models download {}`", name, name);
    }
    path
}

async fn load_embedder(config: &Config) -> Option<Arc<dyn Embedder>> {
    let name = config.models.embedding_model.clone();
    let path = downloaded_model_path(config, &name).await?;

    let spinner = spinner(format!("Loading embedding model {}...", name));
    let loaded = tokio::task::spawn_blocking(move || Model2VecEmbedder::load(&path, name)).await;
    spinner.finish_and_clear();

    match loaded {
        Ok(Ok(embedder)) => Some(Arc::new(embedder)),
        Ok(Err(e)) => {
            warn!("Semantic similarity disabled: {}", e);
            None
        }
        Err(e) => {
            warn!("Embedding model loader panicked: {}", e);
            None
        }
    }
}

async fn load_ner(config: &Config) -> Option<Arc<dyn EntityExtractor>> {
    let name = config.models.ner_model.clone();
    let path = downloaded_model_path(config, &name).await?;
    let chunk_words = config.matching.ner_chunk_words;

    let spinner = spinner(format!("Loading NER model {}...", name));
    let loaded = tokio::task::spawn_blocking(move || BertNerExtractor::load(&path, name, chunk_words)).await;
    spinner.finish_and_clear();

    match loaded {
        Ok(Ok(extractor)) => {
            info!("NER model ready");
            Some(Arc::new(extractor))
        }
        Ok(Err(e)) => {
            warn!("NER skills disabled: {}", e);
            None
        }
        Err(e) => {
            warn!("NER model loader panicked: {}", e);
            None
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
