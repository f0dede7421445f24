//! Sled persistence for validation reports, keyed by file tag and invalidated
//! by the manuscript hash.

use crate::models::{CitationUse, ValidationReport};

use chrono::Utc;
use sha2::{Digest, Sha256};

const VALIDATIONS_TREE: &str = "validations";

/// SHA256 of the manuscript text, used to detect edits between runs.
pub fn hash_manuscript(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn new_report(file_tag: &str, text: &str, citations: Vec<CitationUse>) -> ValidationReport {
    ValidationReport {
        file_tag: file_tag.to_string(),
        manuscript_hash: hash_manuscript(text),
        timestamp: Utc::now().to_rfc3339(),
        citations,
    }
}

pub fn load_report(db: &sled::Db, file_tag: &str) -> Option<ValidationReport> {
    let tree = db.open_tree(VALIDATIONS_TREE).ok()?;
    let data = tree.get(file_tag.as_bytes()).ok()??;
    serde_json::from_slice(&data).ok()
}

/// Cached report for `file_tag`, but only if it was computed from `text`.
pub fn load_fresh_report(db: &sled::Db, file_tag: &str, text: &str) -> Option<ValidationReport> {
    load_report(db, file_tag).filter(|r| r.manuscript_hash == hash_manuscript(text))
}

pub fn save_report(db: &sled::Db, report: &ValidationReport) -> Result<(), String> {
    let tree = db
        .open_tree(VALIDATIONS_TREE)
        .map_err(|e| format!("Cannot open validations tree: {}", e))?;
    let json = serde_json::to_vec(report).map_err(|e| format!("JSON serialize error: {}", e))?;
    tree.insert(report.file_tag.as_bytes(), json)
        .map_err(|e| format!("Sled insert error: {}", e))?;
    Ok(())
}
