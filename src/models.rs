//! Data models for the citation validator.
//!
//! Everything the pipeline produces or exchanges with its HTTP surface lives
//! here: parsed bibliography entries, scanned occurrences, cited-document
//! sections, the per-citation checklist and the final `CitationUse` record.

use serde::{Deserialize, Serialize};

// ============================================================================
// Extraction Types
// ============================================================================

/// One numbered entry of the manuscript's reference list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEntry {
    /// Number as printed in the bibliography (`[12]`, `12.`).
    pub number: u32,
    /// Raw reference text, without the number prefix.
    pub text: String,
    pub arxiv_id: Option<String>,
    pub doi: Option<String>,
    /// Heuristic guess; quoted title if present, else the first sentence.
    pub title: Option<String>,
    pub year: Option<i32>,
    /// Lower-cased author last names, best effort.
    #[serde(default)]
    pub authors: Vec<String>,
}

/// An in-text citation marker. `offset` is the byte offset of the opening
/// bracket; every number of a group like `[1,3-5]` shares it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Occurrence {
    pub number: u32,
    pub offset: usize,
}

/// A titled slice of a cited document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitedSection {
    pub heading: String,
    pub body: String,
}

// ============================================================================
// Validation Output
// ============================================================================

/// Deterministic quality checklist for one citation use. Serializes as a flat
/// map of booleans plus the reference metadata it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checklist {
    pub supports_claim: bool,
    pub source_credible: bool,
    pub fair_representation: bool,
    pub proper_formatting: bool,
    pub current_and_accessible: bool,
    /// Support score rounded to 3 decimals.
    pub support_score: f64,
    pub year: Option<i32>,
    pub arxiv_id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
}

/// Validation result for one citation number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitationUse {
    pub citation_number: u32,
    pub claim_context: String,
    pub reference: Option<ReferenceEntry>,
    pub used_section_title: Option<String>,
    pub support_score: f64,
    pub checklist: Checklist,
    pub suggestions: Vec<String>,
    /// Why this use carries no evidence (missing reference, download or
    /// parse failure, ...). `None` when scoring completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unverified_reason: Option<String>,
}

/// A candidate replacement source returned by the alternative-source search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlternativeSource {
    pub title: String,
    pub arxiv_id: Option<String>,
    pub score: f64,
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub text: String,
    pub file_tag: String,
    #[serde(default)]
    pub force: bool,
}

/// Cached outcome of validating one manuscript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub file_tag: String,
    /// SHA-256 of the manuscript text the report was computed from.
    pub manuscript_hash: String,
    pub timestamp: String,
    pub citations: Vec<CitationUse>,
}

#[derive(Debug, Deserialize)]
pub struct IndexSourceRequest {
    pub title: String,
    pub arxiv_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexSourceResponse {
    pub success: bool,
    pub error: Option<String>,
}
