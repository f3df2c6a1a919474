//! Text normalization shared by every extractor

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-folds, strips accents and punctuation, and collapses whitespace.
///
/// The output only ever contains `[a-z0-9]` and single spaces, with no
/// leading or trailing space, so normalizing twice is a no-op.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    disallowed_regex: Regex,
    whitespace_regex: Regex,
}

/// Text produced by [`TextNormalizer::normalize`]. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-separated tokens of the normalized text
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        let disallowed_regex = Regex::new(r"[^a-z0-9\s]").expect("Invalid character class regex");
        let whitespace_regex = Regex::new(r"\s+").expect("Invalid whitespace regex");

        Self {
            disallowed_regex,
            whitespace_regex,
        }
    }

    /// Normalize raw text. Never fails; may return an empty string.
    pub fn normalize(&self, text: &str) -> NormalizedText {
        // NFD, then drop combining marks (accents)
        let stripped: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
        let lowered = stripped.to_lowercase();

        let ascii_only = self.disallowed_regex.replace_all(&lowered, "");
        let collapsed = self.whitespace_regex.replace_all(&ascii_only, " ");

        NormalizedText(collapsed.trim().to_string())
    }
}
