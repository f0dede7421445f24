//! Citation validator library - re-exports for testing and external use.
//!
//! Given a manuscript's text, the pipeline finds its numbered reference list
//! and in-text markers, downloads the cited arXiv papers, scores how well the
//! best-matching section of each paper supports the citing claim, and rates
//! every citation with a fixed checklist plus improvement suggestions.

use anyhow::Context;
use sled::Db;
use std::fs;
use std::sync::Arc;

pub mod alternatives;
pub mod archive;
pub mod checklist;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod handlers;
pub mod models;
pub mod occurrences;
pub mod pipeline;
pub mod references;
pub mod resolver;
pub mod scorer;
pub mod sections;
pub mod store;
pub mod suggestions;

use alternatives::SledSourceIndex;
use archive::ArxivClient;
use config::Config;
use embeddings::{EmbeddingProvider, HttpEmbeddingProvider};
use pipeline::CitationValidator;
use sections::PdfTextParser;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub validator: Arc<CitationValidator>,
    pub sources: SledSourceIndex,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    pub fn new(
        db: Db,
        validator: Arc<CitationValidator>,
        sources: SledSourceIndex,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            db,
            validator,
            sources,
            embedder,
        }
    }

    /// Wire the production collaborators: arXiv downloads, PDF text
    /// extraction, the HTTP embedding API and the sled source index.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        fs::create_dir_all(&config.storage_root).with_context(|| {
            format!("Cannot create storage root {}", config.storage_root.display())
        })?;
        let db = sled::open(&config.db_path)
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

        let archive = ArxivClient::new(&config.arxiv_base_url).context("Invalid ARXIV_BASE_URL")?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HttpEmbeddingProvider::new(
            config.embedding_api_url.clone(),
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
        ));
        let sources = SledSourceIndex::open(&db)?;

        let validator = CitationValidator::new(
            config.storage_root.clone(),
            Arc::new(archive),
            Arc::new(PdfTextParser),
            Arc::clone(&embedder),
        )
        .with_alternatives(Arc::new(sources.clone()))
        .with_max_concurrency(config.max_concurrency);

        Ok(Self::new(db, Arc::new(validator), sources, embedder))
    }
}

// Re-export commonly used types
pub use error::CitationError;

pub use models::{
    AlternativeSource, Checklist, CitationUse, CitedSection, IndexSourceRequest,
    IndexSourceResponse, Occurrence, ReferenceEntry, ValidateRequest, ValidationReport,
};

pub use references::{
    extract_arxiv_id, extract_doi, extract_references, extract_title, extract_year,
    parse_reference, reference_section,
};

pub use occurrences::scan_occurrences;

pub use checklist::checklist_verdict;

pub use pipeline::dedup_by_number;
