//! Cited-document text extraction and section splitting.
//!
//! A `DocumentParser` turns a downloaded PDF into text where section headings
//! are marked with a leading `#`; `split_sections` then cuts that text into
//! `(heading, body)` pairs for scoring.

use crate::error::{CitationError, Result};
use crate::models::CitedSection;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

/// Heading given to text that precedes the first marked heading.
pub const PREAMBLE_HEADING: &str = "Document";

/// Converts a cited document into heading-marked text. Runs on the blocking
/// thread pool.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<String>;
}

// ============================================================================
// PDF Text Extraction
// ============================================================================

/// Extracts PDF text with `pdf-extract`, falling back to poppler's `pdftotext`,
/// then marks lines that look like section headings.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextParser;

impl DocumentParser for PdfTextParser {
    fn parse(&self, path: &Path) -> Result<String> {
        let text = match run_pdf_extract(path) {
            Ok(text) if !text.trim().is_empty() => text,
            first => {
                let first_err = first.err().unwrap_or_else(|| "no text extracted".to_string());
                tracing::debug!(path = %path.display(), error = %first_err, "pdf-extract failed, trying pdftotext");
                run_pdftotext(path).map_err(|e| CitationError::Parse {
                    path: path.to_path_buf(),
                    reason: format!("{}; {}", first_err, e),
                })?
            }
        };

        if text.trim().is_empty() {
            return Err(CitationError::Parse {
                path: path.to_path_buf(),
                reason: "document has no extractable text".to_string(),
            });
        }
        Ok(mark_headings(&text))
    }
}

/// Extract text using the `pdf-extract` crate (no external dependency).
fn run_pdf_extract(path: &Path) -> std::result::Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read PDF: {}", e))?;
    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| format!("pdf-extract failed: {}", e))
}

/// Run `pdftotext` and return stdout as a String.
fn run_pdftotext(path: &Path) -> std::result::Result<String, String> {
    let output = Command::new("pdftotext")
        .arg(path.as_os_str())
        .arg("-")
        .output()
        .map_err(|e| format!("Failed to run pdftotext: {}. Is poppler installed?", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("pdftotext failed: {}", stderr.trim()));
    }

    String::from_utf8(output.stdout).map_err(|e| format!("pdftotext output not valid UTF-8: {}", e))
}

// ============================================================================
// Heading Detection
// ============================================================================

/// Prefix `# ` to lines that look like section headings: numbered titles
/// ("3 Model Architecture", "4.2. Training") and well-known unnumbered ones
/// ("Abstract", "RELATED WORK").
pub fn mark_headings(text: &str) -> String {
    static NUMBERED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(?:\d{1,2}(?:\.\d{1,2}){0,2}\.?|[IVX]{1,4}\.)\s+[A-Z][A-Za-z0-9\-:,' ]{2,70}$").unwrap()
    });
    static NAMED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^(?:abstract|introduction|background|related work|preliminaries|methods?|methodology|approach|experiments?|experimental setup|evaluation|results|discussion|limitations|conclusions?|future work|references|bibliography|appendix(?: [A-Z])?)$",
        )
        .unwrap()
    });

    let mut out = String::with_capacity(text.len() + 64);
    for line in text.lines() {
        let trimmed = line.trim();
        let is_heading = heading_text(trimmed).is_none()
            && (NAMED.is_match(trimmed)
                || (NUMBERED.is_match(trimmed)
                    && trimmed.split_whitespace().count() <= 9
                    && !trimmed.ends_with('.')));
        if is_heading {
            out.push_str("# ");
            out.push_str(trimmed);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Heading text of a marked line (`# Intro`, `### 2.1 Setup`), or `None`.
fn heading_text(line: &str) -> Option<&str> {
    let rest = line.trim_start();
    let after = rest.trim_start_matches('#');
    if after.len() == rest.len() {
        return None;
    }
    if !after.is_empty() && !after.starts_with(char::is_whitespace) {
        return None;
    }
    Some(after.trim())
}

// ============================================================================
// Section Splitting
// ============================================================================

/// Split heading-marked text into sections. Text before the first heading (or
/// all text, when there is none) is titled `PREAMBLE_HEADING`; sections whose
/// body is blank are dropped.
pub fn split_sections(text: &str) -> Vec<CitedSection> {
    let mut sections = Vec::new();
    let mut heading = PREAMBLE_HEADING.to_string();
    let mut body = String::new();

    for line in text.lines() {
        match heading_text(line) {
            Some(next) => {
                push_section(&mut sections, heading, &body);
                heading = if next.is_empty() {
                    "Untitled section".to_string()
                } else {
                    next.to_string()
                };
                body.clear();
            }
            None => {
                body.push_str(line);
                body.push('\n');
            }
        }
    }
    push_section(&mut sections, heading, &body);
    sections
}

fn push_section(sections: &mut Vec<CitedSection>, heading: String, body: &str) {
    let body = body.trim();
    if !body.is_empty() {
        sections.push(CitedSection {
            heading,
            body: body.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn load_fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Cannot load fixture {}: {}", path.display(), e))
    }

    #[test]
    fn test_split_fixture_document() {
        let sections = split_sections(&load_fixture("cited_transformer.txt"));
        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(
            headings,
            vec!["Document", "Abstract", "1 Introduction", "3 Model Architecture", "6 Results"]
        );
        assert_eq!(sections[0].body, "Attention Is All You Need");
        assert!(sections[3].body.contains("stacked self-attention"));
    }

    #[test]
    fn test_no_headings_is_one_document_section() {
        let sections = split_sections("just some text\nover two lines");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, PREAMBLE_HEADING);
        assert_eq!(sections[0].body, "just some text\nover two lines");
    }

    #[test]
    fn test_blank_sections_dropped() {
        let sections = split_sections("# Empty\n\n## Filled\nbody\n#\nmore");
        let headings: Vec<&str> = sections.iter().map(|s| s.heading.as_str()).collect();
        assert_eq!(headings, vec!["Filled", "Untitled section"]);
    }

    #[test]
    fn test_hashtag_is_not_a_heading() {
        let sections = split_sections("#hashtag in text\nmore");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, PREAMBLE_HEADING);
    }

    #[test]
    fn test_empty_text_has_no_sections() {
        assert!(split_sections("").is_empty());
        assert!(split_sections("   \n\n").is_empty());
    }

    #[test]
    fn test_mark_headings() {
        let text = "Title line\nAbstract\nWe do things.\n3 Model Architecture\nBody text here.\n2 pages were used in total for this long sentence that ends.\nRELATED WORK\n# Already marked";
        let marked = mark_headings(text);
        let lines: Vec<&str> = marked.lines().collect();
        assert_eq!(lines[0], "Title line");
        assert_eq!(lines[1], "# Abstract");
        assert_eq!(lines[3], "# 3 Model Architecture");
        assert_eq!(lines[4], "Body text here.");
        assert!(!lines[5].starts_with('#'));
        assert_eq!(lines[6], "# RELATED WORK");
        assert_eq!(lines[7], "# Already marked");
    }

    #[test]
    fn test_missing_pdf_is_parse_error() {
        let err = PdfTextParser
            .parse(Path::new("/nonexistent/definitely-missing.pdf"))
            .unwrap_err();
        assert!(matches!(err, CitationError::Parse { .. }));
    }
}
