//! Suggestion generation from a citation's checklist.

use crate::alternatives::AlternativeSourceSearch;
use crate::embeddings::EmbeddingProvider;
use crate::error::{CitationError, Result};
use crate::models::{Checklist, ReferenceEntry};

use std::sync::Arc;

/// Matches requested from the alternative-source search.
const ALTERNATIVE_TOP_K: usize = 3;
/// Alternatives named in the suggestion.
const ALTERNATIVES_SHOWN: usize = 2;

pub struct SuggestionGenerator {
    embedder: Arc<dyn EmbeddingProvider>,
    alternatives: Option<Arc<dyn AlternativeSourceSearch>>,
}

impl SuggestionGenerator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        alternatives: Option<Arc<dyn AlternativeSourceSearch>>,
    ) -> Self {
        Self {
            embedder,
            alternatives,
        }
    }

    /// Advice for one citation use, most important first. The alternative
    /// source lookup never affects the other suggestions: its failures are
    /// logged and dropped.
    pub async fn suggest(
        &self,
        checklist: &Checklist,
        reference: Option<&ReferenceEntry>,
        used_section: Option<&str>,
    ) -> Vec<String> {
        let mut suggestions = checklist_suggestions(checklist, used_section);

        if checklist.supports_claim {
            return suggestions;
        }
        let title = match reference.and_then(|r| r.title.as_deref()) {
            Some(t) => t,
            None => return suggestions,
        };
        match self.alternative_titles(title).await {
            Ok(titles) if !titles.is_empty() => {
                suggestions.push(format!(
                    "Possible alternative sources: {}.",
                    titles
                        .iter()
                        .map(|t| format!("\"{}\"", t))
                        .collect::<Vec<_>>()
                        .join("; ")
                ));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(title, error = %e, "alternative source lookup failed"),
        }
        suggestions
    }

    /// Titles of the closest indexed sources to `title`, excluding the title
    /// itself.
    pub async fn alternative_titles(&self, title: &str) -> Result<Vec<String>> {
        let search = match &self.alternatives {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let vectors = self.embedder.embed(&[title.to_string()]).await?;
        let query = vectors
            .into_iter()
            .next()
            .ok_or_else(|| CitationError::embedding("empty embedding response"))?;

        let hits = search.search(&query, ALTERNATIVE_TOP_K).await?;
        let own = title.trim().to_lowercase();
        Ok(hits
            .into_iter()
            .map(|hit| hit.title)
            .filter(|t| t.trim().to_lowercase() != own)
            .take(ALTERNATIVES_SHOWN)
            .collect())
    }
}

/// Suggestions that follow from the checklist flags alone.
pub fn checklist_suggestions(checklist: &Checklist, used_section: Option<&str>) -> Vec<String> {
    let mut suggestions = Vec::new();
    if !checklist.supports_claim {
        suggestions.push(match used_section {
            Some(section) => format!(
                "The cited source only weakly supports this claim; cite its most relevant section (\"{}\") explicitly or choose a source whose methodology is more closely aligned with the claim.",
                section
            ),
            None => "The cited source could not be shown to support this claim; cite the specific section that backs it or choose a more methodologically aligned source.".to_string(),
        });
    }
    if !checklist.fair_representation {
        suggestions.push(
            "Avoid over-claiming: make sure the sentence does not go beyond the findings the cited source actually reports.".to_string(),
        );
    }
    if !checklist.current_and_accessible {
        suggestions.push(
            "Consider citing a more recent or openly accessible version of this source (for example an arXiv preprint or an updated edition).".to_string(),
        );
    }
    suggestions
}
