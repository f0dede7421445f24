//! Section-level support scoring: how well does the best-matching section of
//! the cited document cover the claim around the citation marker?

use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::error::{CitationError, Result};
use crate::models::CitedSection;
use crate::sections::{split_sections, DocumentParser};

use std::path::Path;
use std::sync::Arc;

/// Section bodies are cut to this many characters before embedding.
pub const MAX_SECTION_CHARS: usize = 8000;

/// Best-matching section of a cited document and its cosine similarity to
/// the claim.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportEvidence {
    pub section: Option<String>,
    pub score: f64,
}

impl SupportEvidence {
    /// No document, or nothing in it could be compared.
    pub fn none() -> Self {
        Self {
            section: None,
            score: 0.0,
        }
    }
}

pub struct SupportScorer {
    parser: Arc<dyn DocumentParser>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SupportScorer {
    pub fn new(parser: Arc<dyn DocumentParser>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { parser, embedder }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Score `claim` against a resolved document. A missing document is not an
    /// error; it simply carries no evidence.
    pub async fn score(&self, document: Option<&Path>, claim: &str) -> Result<SupportEvidence> {
        let path = match document {
            Some(path) => path,
            None => return Ok(SupportEvidence::none()),
        };
        let sections = self.load_sections(path).await?;
        self.score_sections(claim, &sections).await
    }

    /// Parse a document on the blocking pool and split it into sections.
    pub async fn load_sections(&self, path: &Path) -> Result<Vec<CitedSection>> {
        let parser = Arc::clone(&self.parser);
        let owned = path.to_path_buf();
        let text = match tokio::task::spawn_blocking(move || parser.parse(&owned)).await {
            Ok(parsed) => parsed?,
            Err(e) => {
                // pdf-extract panics on some malformed PDFs.
                let reason = if e.is_panic() {
                    format!("parser panicked: {}", panic_message(e.into_panic()))
                } else {
                    format!("parser task cancelled: {}", e)
                };
                return Err(CitationError::Parse {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        };
        Ok(split_sections(&text))
    }

    /// Embed the claim and every section body in one batch and pick the most
    /// similar section. The first section wins ties.
    pub async fn score_sections(&self, claim: &str, sections: &[CitedSection]) -> Result<SupportEvidence> {
        if sections.is_empty() {
            return Ok(SupportEvidence::none());
        }

        let mut inputs = Vec::with_capacity(sections.len() + 1);
        inputs.push(claim.to_string());
        inputs.extend(sections.iter().map(|s| truncate_chars(&s.body, MAX_SECTION_CHARS)));

        let vectors = self.embedder.embed(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(CitationError::embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        let (claim_vector, section_vectors) = vectors
            .split_first()
            .ok_or_else(|| CitationError::embedding("empty embedding response"))?;

        Ok(match best_match(claim_vector, section_vectors) {
            Some((index, score)) => SupportEvidence {
                section: Some(sections[index].heading.clone()),
                score,
            },
            None => SupportEvidence::none(),
        })
    }
}

/// Index and similarity of the candidate most similar to `query`; the first
/// maximum wins.
pub fn best_match(query: &[f32], candidates: &[Vec<f32>]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
