//! Text extraction from plain-text and markdown files

use crate::error::Result;
use pulldown_cmark::{Event, Parser, Tag};
use std::path::Path;
use tokio::fs;

pub trait TextExtractor {
    fn extract(&self, path: &Path) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path).await?)
    }
}

pub struct MarkdownExtractor;

impl TextExtractor for MarkdownExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let markdown_content = fs::read_to_string(path).await?;
        Ok(Self::markdown_to_text(&markdown_content))
    }
}

impl MarkdownExtractor {
    /// Drop markdown syntax, keeping text, inline code and block boundaries
    pub fn markdown_to_text(markdown: &str) -> String {
        let mut text = String::with_capacity(markdown.len());

        for event in Parser::new(markdown) {
            match event {
                Event::Text(content) | Event::Code(content) => text.push_str(&content),
                Event::SoftBreak | Event::HardBreak | Event::Rule => text.push('\n'),
                Event::Start(Tag::Item) => text.push_str("- "),
                // inline tags (emphasis, links, images) must not split their line
                Event::End(
                    Tag::Paragraph
                    | Tag::Heading(..)
                    | Tag::BlockQuote
                    | Tag::CodeBlock(_)
                    | Tag::List(_)
                    | Tag::Item
                    | Tag::FootnoteDefinition(_)
                    | Tag::Table(_)
                    | Tag::TableHead
                    | Tag::TableRow,
                ) => text.push('\n'),
                Event::End(Tag::TableCell) => text.push(' '),
                _ => {}
            }
        }

        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_text() {
        let markdown = "# Backend Engineer\n\nWe need **Rust** and `tokio`.\n\n- PostgreSQL\n- Docker\n";

        let text = MarkdownExtractor::markdown_to_text(markdown);

        assert!(text.contains("Backend Engineer"));
        assert!(text.contains("We need Rust and tokio."));
        assert!(text.contains("- PostgreSQL"));
        assert!(!text.contains('#'));
        assert!(!text.contains("**"));
    }

    #[test]
    fn test_inline_markup_stays_on_its_line() {
        let markdown = "Experience with *distributed* [systems](https://example.com) and **Go** required.\n\n> Remote friendly\n";

        let text = MarkdownExtractor::markdown_to_text(markdown);

        assert_eq!(
            text,
            "Experience with distributed systems and Go required.\nRemote friendly"
        );
    }
}
