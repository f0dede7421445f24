//! Citation validation pipeline: extract references and markers, score every
//! occurrence against its cited document, and keep the best-supported use of
//! each citation number.

use crate::alternatives::AlternativeSourceSearch;
use crate::archive::ArchiveClient;
use crate::checklist::checklist_verdict;
use crate::context::{claim_window, CLAIM_RADIUS};
use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::models::{CitationUse, Occurrence, ReferenceEntry};
use crate::occurrences::scan_occurrences;
use crate::references::extract_references;
use crate::resolver::DocumentResolver;
use crate::scorer::{SupportEvidence, SupportScorer};
use crate::sections::DocumentParser;
use crate::suggestions::SuggestionGenerator;

use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Validates every in-text citation of a manuscript. Collaborators are
/// injected so tests can substitute fakes.
pub struct CitationValidator {
    resolver: DocumentResolver,
    scorer: SupportScorer,
    suggester: SuggestionGenerator,
    max_concurrency: usize,
}

impl CitationValidator {
    pub fn new(
        storage_root: impl Into<PathBuf>,
        archive: Arc<dyn ArchiveClient>,
        parser: Arc<dyn DocumentParser>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            resolver: DocumentResolver::new(storage_root, archive),
            scorer: SupportScorer::new(parser, Arc::clone(&embedder)),
            suggester: SuggestionGenerator::new(embedder, None),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Enable alternative-source suggestions for unsupported citations.
    pub fn with_alternatives(mut self, search: Arc<dyn AlternativeSourceSearch>) -> Self {
        self.suggester = SuggestionGenerator::new(Arc::clone(self.scorer.embedder()), Some(search));
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn resolver(&self) -> &DocumentResolver {
        &self.resolver
    }

    /// Validate all citations of `text`, caching downloads under `file_tag`.
    ///
    /// Never fails: a citation whose document cannot be fetched, parsed or
    /// embedded is reported with a zero score. The result holds one
    /// `CitationUse` per cited number, sorted by number.
    pub async fn validate_all(&self, text: &str, file_tag: &str) -> Vec<CitationUse> {
        let references: HashMap<u32, ReferenceEntry> = extract_references(text)
            .into_iter()
            .map(|r| (r.number, r))
            .collect();
        let occurrences = scan_occurrences(text);
        if occurrences.is_empty() {
            tracing::info!(file_tag, "no citation markers found");
            return Vec::new();
        }
        tracing::info!(
            file_tag,
            references = references.len(),
            occurrences = occurrences.len(),
            "validating citations"
        );

        let references = &references;
        let mut scored: Vec<(usize, CitationUse)> = stream::iter(occurrences.into_iter().enumerate())
            .map(|(index, occurrence)| async move {
                let reference = references.get(&occurrence.number);
                (index, self.validate_occurrence(text, occurrence, reference, file_tag).await)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        scored.sort_by_key(|(index, _)| *index);
        let uses = dedup_by_number(scored.into_iter().map(|(_, u)| u));

        tracing::info!(file_tag, citations = uses.len(), "citation validation complete");
        uses
    }

    /// Build the `CitationUse` for one occurrence. Step failures become zero
    /// evidence with the cause kept in `unverified_reason`.
    pub async fn validate_occurrence(
        &self,
        text: &str,
        occurrence: Occurrence,
        reference: Option<&ReferenceEntry>,
        file_tag: &str,
    ) -> CitationUse {
        let claim_context = claim_window(text, occurrence.offset, CLAIM_RADIUS);

        let (evidence, unverified_reason) = match reference {
            None => (
                SupportEvidence::none(),
                Some(format!("no bibliography entry numbered {}", occurrence.number)),
            ),
            Some(r) if r.arxiv_id.is_none() => (
                SupportEvidence::none(),
                Some("reference has no arXiv identifier".to_string()),
            ),
            Some(r) => match self.gather_evidence(file_tag, r, &claim_context).await {
                Ok(evidence) => (evidence, None),
                Err(e) => {
                    tracing::warn!(citation = occurrence.number, error = %e, "citation could not be verified");
                    (SupportEvidence::none(), Some(e.to_string()))
                }
            },
        };

        let checklist = checklist_verdict(evidence.score, reference);
        let suggestions = self
            .suggester
            .suggest(&checklist, reference, evidence.section.as_deref())
            .await;

        CitationUse {
            citation_number: occurrence.number,
            claim_context,
            reference: reference.cloned(),
            used_section_title: evidence.section,
            support_score: evidence.score,
            checklist,
            suggestions,
            unverified_reason,
        }
    }

    async fn gather_evidence(
        &self,
        file_tag: &str,
        reference: &ReferenceEntry,
        claim: &str,
    ) -> Result<SupportEvidence> {
        let document = self.resolver.resolve_reference(file_tag, reference).await?;
        self.scorer.score(document.as_deref(), claim).await
    }
}

/// Keep the highest-scoring use of each citation number (the earliest one on
/// exact ties) and sort by number.
pub fn dedup_by_number(uses: impl IntoIterator<Item = CitationUse>) -> Vec<CitationUse> {
    let mut best: HashMap<u32, CitationUse> = HashMap::new();
    for candidate in uses {
        match best.get(&candidate.citation_number) {
            Some(current) if current.support_score >= candidate.support_score => {}
            _ => {
                best.insert(candidate.citation_number, candidate);
            }
        }
    }
    let mut kept: Vec<CitationUse> = best.into_values().collect();
    kept.sort_by_key(|u| u.citation_number);
    kept
}
