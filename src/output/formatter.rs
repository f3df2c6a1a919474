//! Console and JSON rendering of scoring reports

use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::report::{RankedCandidate, ScoringReport};
use crate::processing::aggregator::Decision;
use crate::processing::engine::SkillExplanation;
use crate::processing::vocabulary::MatchMethod;
use colored::{Color, Colorize};
use std::path::Path;

/// Trait for formatting scoring reports
pub trait OutputFormatter {
    fn format_report(&self, report: &ScoringReport) -> Result<String>;
    fn format_skills(&self, explanation: &SkillExplanation) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with optional colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for piping results into other tools
pub struct JsonFormatter {
    pretty: bool,
}

/// Picks the formatter for the requested output format
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, percent: f32) -> String {
        let (badge, color) = match percent.round() as u32 {
            90..=u32::MAX => ("EXCELLENT", Color::Green),
            75..=89 => ("STRONG", Color::BrightGreen),
            60..=74 => ("GOOD", Color::Yellow),
            40..=59 => ("PARTIAL", Color::BrightYellow),
            _ => ("WEAK", Color::Red),
        };

        if self.use_colors {
            format!("[{}]", badge.color(color).bold())
        } else {
            format!("[{}]", badge)
        }
    }

    fn format_decision(&self, decision: Decision) -> String {
        let (label, color) = match decision {
            Decision::AutoAccepted => ("AUTO-ACCEPTED", Color::Green),
            Decision::ManuallyAccepted => ("MANUALLY ACCEPTED", Color::Cyan),
            Decision::PendingManualReview => ("PENDING REVIEW", Color::Yellow),
        };
        self.colorize(label, color)
    }

    fn format_candidate(&self, result: &RankedCandidate) -> String {
        let evaluation = &result.evaluation;
        let score = &evaluation.score;
        let mut output = format!(
            "{:>3}. {:<24} {:>6.1}% {} {}\n",
            result.rank,
            evaluation.candidate_id,
            score.percent(),
            self.format_score_badge(score.percent()),
            self.format_decision(evaluation.decision)
        );

        if !self.detailed {
            return output;
        }

        output.push_str(&format!("     Skill coverage: {:.1}%\n", score.skill_score * 100.0));
        if let Some(lexical) = score.lexical_score {
            output.push_str(&format!("     Lexical similarity: {:.3}\n", lexical));
        }
        if let Some(semantic) = score.semantic_score {
            output.push_str(&format!("     Semantic similarity: {:.3}\n", semantic));
        }
        if let Some(ner) = score.ner_score {
            output.push_str(&format!("     NER coverage: {:.3}\n", ner));
        }

        if !score.common_skills.is_empty() {
            let matched: Vec<String> = score
                .common_skills
                .iter()
                .map(|m| {
                    if m.matched_as == m.skill {
                        format!("{} ({})", m.skill, m.provenance)
                    } else {
                        format!("{} ~ {} ({:.2})", m.skill, m.matched_as, m.similarity)
                    }
                })
                .collect();
            output.push_str(&format!("     {} {}\n", self.colorize("Matched:", Color::Green), matched.join(", ")));
        }

        if !score.missing_skills.is_empty() {
            output.push_str(&format!(
                "     {} {}\n",
                self.colorize("Missing:", Color::Red),
                score.missing_skills.join(", ")
            ));
        }

        output
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &ScoringReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("CV MATCHING RESULTS", 1));
        output.push_str(&format!(
            "Generated: {} | Processing time: {}ms\n",
            report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.metadata.processing_time_ms
        ));
        output.push_str(&format!(
            "Posting: {} | Policy: {} | Auto-accept threshold: {:.0}%\n",
            report.metadata.posting_file, report.metadata.policy, report.metadata.threshold_percent
        ));

        if self.detailed {
            output.push_str(&format!(
                "Embedding model: {} | NER model: {}\n",
                report.metadata.embedding_model.as_deref().unwrap_or("none"),
                report.metadata.ner_model.as_deref().unwrap_or("none")
            ));
        }

        output.push_str(&self.format_header("Required Skills", 2));
        if report.required_skills.is_empty() {
            output.push_str(&self.colorize("No required skills detected in the posting\n", Color::Yellow));
        } else {
            output.push_str(&format!("{}\n", report.required_skills.join(", ")));
        }

        output.push_str(&self.format_header("Ranking", 2));
        if report.results.is_empty() {
            output.push_str("No candidates scored\n");
        }
        for result in &report.results {
            output.push_str(&self.format_candidate(result));
        }

        output.push_str(&self.format_header("Summary", 3));
        output.push_str(&format!(
            "{} candidates, {} accepted, {} pending review\n",
            report.summary.candidates, report.summary.auto_accepted, report.summary.pending_review
        ));

        Ok(output)
    }

    fn format_skills(&self, explanation: &SkillExplanation) -> Result<String> {
        let mut output = self.format_header("Detected Skills", 1);

        if explanation.skills.is_empty() {
            output.push_str("No skills detected\n");
            return Ok(output);
        }

        for skill in &explanation.skills {
            output.push_str(&format!("  {:<28} {}\n", skill.skill, self.colorize(&skill.provenance.to_string(), Color::Cyan)));
        }

        if self.detailed && !explanation.vocabulary_matches.is_empty() {
            output.push_str(&self.format_header("Vocabulary Matches", 2));
            for m in &explanation.vocabulary_matches {
                match m.method {
                    MatchMethod::Exact => {
                        output.push_str(&format!("  {:<28} exact x{}\n", m.skill, m.count));
                    }
                    MatchMethod::Fuzzy => {
                        output.push_str(&format!(
                            "  {:<28} fuzzy '{}' ({:.2}) x{}\n",
                            m.skill, m.matched_text, m.similarity, m.count
                        ));
                    }
                }
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &ScoringReport) -> Result<String> {
        self.to_json(report)
    }

    fn format_skills(&self, explanation: &SkillExplanation) -> Result<String> {
        self.to_json(explanation)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::with_options(true, false, true)
    }

    pub fn with_options(use_colors: bool, detailed: bool, pretty_json: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
        }
    }

    fn formatter(&self, format: OutputFormat) -> &dyn OutputFormatter {
        match format {
            OutputFormat::Console => &self.console_formatter,
            OutputFormat::Json => &self.json_formatter,
        }
    }

    pub fn generate_report(&self, report: &ScoringReport, format: OutputFormat) -> Result<String> {
        self.formatter(format).format_report(report)
    }

    pub fn generate_skills(&self, explanation: &SkillExplanation, format: OutputFormat) -> Result<String> {
        self.formatter(format).format_skills(explanation)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

pub fn suggest_filename(format: OutputFormat, posting_name: &str, timestamp: bool) -> String {
    let base_name = Path::new(posting_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("{}_matches{}.txt", base_name, timestamp_suffix),
        OutputFormat::Json => format!("{}_matches{}.json", base_name, timestamp_suffix),
    }
}

/// Parse an output format name
pub fn parse_output_format(format: &str) -> std::result::Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" | "text" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid output format: {}. Supported: console, json", format)),
    }
}
