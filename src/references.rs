//! Reference list parsing: locate the manuscript's bibliography and turn each
//! numbered entry into a `ReferenceEntry` with heuristically guessed metadata.

use crate::models::ReferenceEntry;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;

#[cfg(test)]
#[path = "references_test.rs"]
mod references_test;

/// Larger leading integers are wrapped years or page numbers, not entry numbers.
const MAX_REFERENCE_NUMBER: u32 = 999;
const MAX_TITLE_CHARS: usize = 200;

/// Optional markdown marker and section numbering: "## 7. References", "VII. BIBLIOGRAPHY".
const SECTION_PREFIX: &str = r"(?:#+[ \t]*)?(?:\d+[\.\)]?[ \t]*|[IVXLC]+[\.\)][ \t]*)?";

static REFERENCES_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?im)^[ \t]*{SECTION_PREFIX}(?:references|bibliography)[ \t]*:?[ \t]*\r?$"
    ))
    .unwrap()
});

/// Headings that end the reference list when they follow it.
static TRAILING_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?im)^[ \t]*{SECTION_PREFIX}(?:appendix|appendices|acknowledge?ments?|supplementary|conclusions?)\b[^\n.]{{0,40}}$"
    ))
    .unwrap()
});

static ENTRY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\[)?(\d+)\b(\])?[ \t]*([\.:\-])?[ \t]*(\S.*)$").unwrap()
});

// ============================================================================
// Reference Section Detection
// ============================================================================

/// Slice of `text` holding the reference list: everything after the first
/// standalone "References"/"Bibliography" heading, up to the next appendix,
/// acknowledgments, supplementary or conclusion heading.
pub fn reference_section(text: &str) -> Option<&str> {
    let heading = REFERENCES_HEADING.find(text)?;
    let rest = &text[heading.end()..];
    let end = TRAILING_HEADING
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parse the manuscript's reference list. Returns an empty list when the
/// manuscript has no reference heading; that is not an error.
pub fn extract_references(text: &str) -> Vec<ReferenceEntry> {
    let section = match reference_section(text) {
        Some(s) => s,
        None => {
            tracing::info!("no References/Bibliography heading found, skipping reference extraction");
            return Vec::new();
        }
    };

    let raw = collect_entry_lines(section);

    let mut entries: Vec<ReferenceEntry> = raw
        .par_iter()
        .map(|(number, text)| parse_reference(*number, text))
        .collect();

    // A number printed twice keeps its first entry.
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.number));
    entries.sort_by_key(|e| e.number);

    tracing::debug!(count = entries.len(), "parsed reference list");
    entries
}

/// Split the reference section into `(number, text)` pairs. Lines that do not
/// open an entry continue the previous one until a blank line closes it;
/// anything before the first entry is dropped.
fn collect_entry_lines(section: &str) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = Vec::new();
    let mut open = false;

    for line in section.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            open = false;
            continue;
        }
        match parse_entry_line(trimmed) {
            Some((number, text)) => {
                entries.push((number, text.to_string()));
                open = true;
            }
            None if open => {
                if let Some((_, text)) = entries.last_mut() {
                    text.push(' ');
                    text.push_str(trimmed);
                }
            }
            None => {}
        }
    }
    entries
}

/// Recognise `[N] text`, `[N]. text`, `N. text`, `N: text` and `N - text`.
fn parse_entry_line(line: &str) -> Option<(u32, &str)> {
    let caps = ENTRY_LINE.captures(line)?;
    let bracketed = match (caps.get(1).is_some(), caps.get(3).is_some()) {
        (true, true) => true,
        (false, false) => false,
        _ => return None,
    };
    let separator = caps.get(4).map(|m| m.as_str());
    if !bracketed && separator.is_none() {
        return None;
    }

    let number: u32 = caps[2].parse().ok()?;
    if number == 0 || number > MAX_REFERENCE_NUMBER {
        return None;
    }

    let text = caps.get(5)?.as_str().trim();
    // "10.1145/..." or "3.5 million" is a wrapped line, not entry 10 or 3.
    if separator == Some(".") && !bracketed && text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some((number, text))
}

// ============================================================================
// Reference Text Parsing
// ============================================================================

/// Build a `ReferenceEntry` from one entry's text. Every field besides the
/// number and text is a best-effort guess.
pub fn parse_reference(number: u32, text: &str) -> ReferenceEntry {
    ReferenceEntry {
        number,
        text: text.to_string(),
        arxiv_id: extract_arxiv_id(text),
        doi: extract_doi(text),
        title: extract_title(text),
        year: extract_year(text),
        authors: extract_author_lastnames(text),
    }
}

/// arXiv identifier (`2101.12345`) with any version suffix stripped.
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
        [
            r"(?i)arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5})(?:v\d+)?",
            r"(?i)arxiv:\s*(\d{4}\.\d{4,5})(?:v\d+)?\b",
            r"\b(\d{4}\.\d{4,5})(?:v\d+)?\b",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

    PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

pub fn extract_doi(text: &str) -> Option<String> {
    static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
        [
            r#"(?i)\bdoi:\s*([^\s"'<>]+)"#,
            r#"(?i)(?:dx\.)?doi\.org/(10\.\d{4,}/[^\s"'<>\]]+)"#,
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

    PATTERNS.iter().find_map(|re| {
        let m = re.captures(text)?.get(1)?;
        let doi = m
            .as_str()
            .trim_end_matches(|c| c == '.' || c == ',' || c == ';' || c == ')');
        (!doi.is_empty()).then(|| doi.to_string())
    })
}

/// First 4-digit year in 1900-2099. Identifiers are blanked out first so the
/// "2012" of `arXiv:2012.01234` is not mistaken for a year.
pub fn extract_year(text: &str) -> Option<i32> {
    static IDENTIFIERS: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(?:arxiv:\s*)?\d{4}\.\d{4,5}(?:v\d+)?|(?:doi:\s*|doi\.org/)\S+").unwrap()
    });
    static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})[a-z]?\b").unwrap());

    let scrubbed = IDENTIFIERS.replace_all(text, " ");
    YEAR.captures(&scrubbed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Quoted title if the entry has one, otherwise the text before the first
/// period, capped at `MAX_TITLE_CHARS`.
pub fn extract_title(text: &str) -> Option<String> {
    static QUOTED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"["\u{201c}]([^"\u{201c}\u{201d}]+)["\u{201d}]"#).unwrap());

    if let Some(m) = QUOTED.captures(text).and_then(|caps| caps.get(1)) {
        let title = m.as_str().trim().trim_end_matches(|c| c == ',' || c == '.');
        if !title.is_empty() {
            return Some(title.to_string());
        }
    }

    let head = text.split('.').next().unwrap_or("").trim();
    if head.is_empty() {
        return None;
    }
    Some(head.chars().take(MAX_TITLE_CHARS).collect::<String>().trim_end().to_string())
}

/// Lower-cased author last names from the start of an entry.
pub fn extract_author_lastnames(text: &str) -> Vec<String> {
    static CUTOFF: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"(?:19|20)\d{2}|["\u{201c}\u{201d}]"#).unwrap());
    static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s+[A-Z][a-z]").unwrap());
    static COMMA_INITIAL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b([A-Z][a-z]{1,20}(?:-[A-Z][a-z]{1,20})?)\s*,\s*[A-Z]\.").unwrap()
    });
    static CAPITALIZED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\b([A-Z][a-z]{1,20}(?:-[A-Z][a-z]{1,20})?)\b").unwrap());

    let author_part = match CUTOFF.find(text) {
        Some(m) => &text[..m.start()],
        None => match SENTENCE_END.find(text) {
            Some(m) => &text[..m.start() + 1],
            None => text,
        },
    };
    let author_part = match author_part.find("et al") {
        Some(pos) => &author_part[..pos],
        None => author_part,
    };

    let collect = |re: &Regex| -> Vec<String> {
        re.captures_iter(author_part)
            .filter_map(|c| {
                let name = c.get(1)?.as_str();
                (!is_author_skip_word(name)).then(|| name.to_lowercase())
            })
            .collect()
    };

    let mut names = collect(&*COMMA_INITIAL);
    if names.len() < 2 {
        names = collect(&*CAPITALIZED);
    }

    let mut seen = HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
    names
}

/// Capitalized words that show up in author blocks but are not names.
fn is_author_skip_word(name: &str) -> bool {
    const SKIP: &[&str] = &[
        "The", "And", "For", "With", "From", "This", "That", "Vol", "Proc", "In",
        "Proceedings", "Conference", "International", "Workshop", "Journal",
        "University", "Technical", "Report", "Available", "Accessed", "Retrieved",
        "Springer", "Press", "Preprint", "Advances", "Neural", "Information",
    ];
    SKIP.contains(&name)
}
