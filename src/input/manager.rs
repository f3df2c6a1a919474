//! Input manager routing files to the right extractor

use crate::error::{CvMatcherError, Result};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{MarkdownExtractor, PlainTextExtractor, TextExtractor};
use crate::processing::engine::Candidate;
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct InputManager {
    cache: HashMap<PathBuf, String>,
    enable_cache: bool,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            enable_cache: true,
        }
    }

    pub fn with_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    pub async fn extract_text(&mut self, path: &Path) -> Result<String> {
        if self.enable_cache {
            if let Some(cached_text) = self.cache.get(path) {
                info!("Using cached text for: {}", path.display());
                return Ok(cached_text.clone());
            }
        }

        if !path.exists() {
            return Err(CvMatcherError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let text = match FileType::from_path(path) {
            FileType::Text => {
                info!("Reading plain text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            FileType::Pdf => {
                return Err(CvMatcherError::UnsupportedFormat(format!(
                    "{} is a PDF; extract its text to a .txt file first",
                    path.display()
                )));
            }
            FileType::Unknown => {
                return Err(CvMatcherError::UnsupportedFormat(format!(
                    "Unsupported file type for: {}",
                    path.display()
                )));
            }
        };

        if self.enable_cache {
            self.cache.insert(path.to_path_buf(), text.clone());
        }

        Ok(text)
    }

    /// Read candidate files; the file stem becomes the candidate id
    pub async fn load_candidates(&mut self, paths: &[PathBuf]) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            let text = self.extract_text(path).await?;
            let id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            candidates.push(Candidate::new(id, text));
        }
        Ok(candidates)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
