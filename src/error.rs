//! Failure causes of the individual pipeline steps.
//!
//! None of these ever escape `CitationValidator::validate_all`: the
//! orchestrator turns them into zero-evidence citation uses, keeping the
//! display string in `CitationUse::unverified_reason`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CitationError {
    #[error("archive lookup failed for {arxiv_id}: {reason}")]
    Resolution { arxiv_id: String, reason: String },

    #[error("cannot read cited document {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("embedding provider failed: {reason}")]
    Embedding { reason: String },

    #[error("alternative source search failed: {reason}")]
    Search { reason: String },

    #[error("citation cache I/O error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CitationError {
    pub fn embedding(reason: impl Into<String>) -> Self {
        CitationError::Embedding {
            reason: reason.into(),
        }
    }

    pub fn search(reason: impl Into<String>) -> Self {
        CitationError::Search {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CitationError>;
