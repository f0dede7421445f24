//! Alternative-source search: a small vector index of known papers used to
//! propose replacements for citations that do not support their claim.

use crate::embeddings::cosine_similarity;
use crate::error::{CitationError, Result};
use crate::models::AlternativeSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SOURCES_TREE: &str = "alternative_sources";

/// Ranked nearest-neighbour lookup over indexed sources. Purely advisory.
#[async_trait]
pub trait AlternativeSourceSearch: Send + Sync {
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<AlternativeSource>>;
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexedSource {
    title: String,
    arxiv_id: Option<String>,
    embedding: Vec<f32>,
}

/// Sources stored in a sled tree, searched by linear cosine scan (the index
/// holds a curated reading list, not a corpus).
#[derive(Clone)]
pub struct SledSourceIndex {
    tree: sled::Tree,
}

impl SledSourceIndex {
    pub fn open(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(SOURCES_TREE)
            .map_err(|e| CitationError::search(format!("Cannot open sources tree: {}", e)))?;
        Ok(Self { tree })
    }

    /// Add or replace a source. Keyed by arXiv id when known, else by title.
    pub fn insert(&self, title: &str, arxiv_id: Option<&str>, embedding: Vec<f32>) -> Result<()> {
        let key = match arxiv_id {
            Some(id) => format!("arxiv:{}", id),
            None => format!("title:{}", title.trim().to_lowercase()),
        };
        let record = IndexedSource {
            title: title.trim().to_string(),
            arxiv_id: arxiv_id.map(str::to_string),
            embedding,
        };
        let json = serde_json::to_vec(&record)
            .map_err(|e| CitationError::search(format!("JSON serialize error: {}", e)))?;
        self.tree
            .insert(key.as_bytes(), json)
            .map_err(|e| CitationError::search(format!("Sled insert error: {}", e)))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl AlternativeSourceSearch for SledSourceIndex {
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<AlternativeSource>> {
        let mut scored = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| CitationError::search(format!("Sled read error: {}", e)))?;
            let source: IndexedSource = match serde_json::from_slice(&value) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable indexed source");
                    continue;
                }
            };
            scored.push(AlternativeSource {
                score: cosine_similarity(query, &source.embedding),
                title: source.title,
                arxiv_id: source.arxiv_id,
            });
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}
