//! Reference resolution: map a reference's arXiv id to a cached PDF on disk,
//! downloading it through the archive client on first use.
//!
//! Layout: `<storage_root>/downloads/citations/<file_tag>/<arxiv_id>.pdf`.

use crate::archive::ArchiveClient;
use crate::error::{CitationError, Result};
use crate::models::ReferenceEntry;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const DOWNLOADS_DIR: &str = "downloads";
const CITATIONS_DIR: &str = "citations";
const DOCUMENT_EXT: &str = "pdf";

pub struct DocumentResolver {
    root: PathBuf,
    archive: Arc<dyn ArchiveClient>,
    /// One lock per cache path so concurrent occurrences of the same reference
    /// download it once.
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentResolver {
    pub fn new(storage_root: impl Into<PathBuf>, archive: Arc<dyn ArchiveClient>) -> Self {
        Self {
            root: storage_root.into(),
            archive,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Cache directory for one source manuscript.
    pub fn tag_dir(&self, file_tag: &str) -> PathBuf {
        self.root
            .join(DOWNLOADS_DIR)
            .join(CITATIONS_DIR)
            .join(sanitize_file_tag(file_tag))
    }

    pub fn cached_path(&self, file_tag: &str, arxiv_id: &str) -> PathBuf {
        self.tag_dir(file_tag)
            .join(format!("{}.{}", sanitize_file_tag(arxiv_id), DOCUMENT_EXT))
    }

    /// Local path of the cited document, downloading it if it is not cached yet.
    pub async fn resolve(&self, file_tag: &str, arxiv_id: &str) -> Result<PathBuf> {
        let path = self.cached_path(file_tag, arxiv_id);
        if path.exists() {
            return Ok(path);
        }

        let lock = self.lock_for(&path);
        let result = {
            let _guard = lock.lock().await;
            self.download(file_tag, arxiv_id, &path).await
        };
        self.release_lock(&path, lock);
        result.map(|()| path)
    }

    /// Fetch and persist one document. Caller holds the path's lock.
    async fn download(&self, file_tag: &str, arxiv_id: &str, path: &Path) -> Result<()> {
        // Another occurrence may have finished the download while we waited.
        if path.exists() {
            return Ok(());
        }

        let bytes = self.archive.fetch_pdf(arxiv_id).await?;
        write_atomically(path, &bytes).await?;
        tracing::info!(arxiv_id, file_tag, path = %path.display(), "cached cited document");
        Ok(())
    }

    /// Resolve a bibliography entry. References without an arXiv id resolve
    /// to `None` without touching the archive; failures are logged at warn
    /// level and returned.
    pub async fn resolve_reference(
        &self,
        file_tag: &str,
        reference: &ReferenceEntry,
    ) -> Result<Option<PathBuf>> {
        let arxiv_id = match reference.arxiv_id.as_deref() {
            Some(id) => id,
            None => return Ok(None),
        };
        match self.resolve(file_tag, arxiv_id).await {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                tracing::warn!(citation = reference.number, arxiv_id, error = %e, "could not resolve cited document");
                Err(e)
            }
        }
    }

    /// arXiv ids already cached for a manuscript, sorted.
    pub fn cached_documents(&self, file_tag: &str) -> Vec<String> {
        let entries = match std::fs::read_dir(self.tag_dir(file_tag)) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXT))
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        ids.sort();
        ids
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Drop the map entry once no other caller holds or waits on the lock.
    /// Clones are only handed out under the map mutex, so a count of two (the
    /// map plus `lock`) means nobody else can be waiting.
    fn release_lock(&self, path: &Path, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let idle = locks
            .get(path)
            .map_or(false, |entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        if idle {
            locks.remove(path);
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Write to a sibling temp file and rename it into place, so readers never see
/// a partial download.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let cache_err = |source| CitationError::Cache {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(cache_err)?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let tmp = path.with_file_name(format!(".{}.{}.part", file_name, std::process::id()));

    tokio::fs::write(&tmp, bytes).await.map_err(cache_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(cache_err(e));
    }
    Ok(())
}

/// Keep a caller-supplied name inside its cache directory: anything outside
/// `[A-Za-z0-9._-]` becomes `_`, and empty or dot-only names become `default`.
pub fn sanitize_file_tag(tag: &str) -> String {
    let cleaned: String = tag
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        "default".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingArchive {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingArchive {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl ArchiveClient for CountingArchive {
        async fn fetch_pdf(&self, arxiv_id: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(CitationError::Resolution {
                    arxiv_id: arxiv_id.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(format!("%PDF {}", arxiv_id).into_bytes())
        }
    }

    fn reference(arxiv_id: Option<&str>) -> ReferenceEntry {
        ReferenceEntry {
            number: 1,
            text: "A. Author. Title. 2020.".to_string(),
            arxiv_id: arxiv_id.map(str::to_string),
            doi: None,
            title: Some("Title".to_string()),
            year: Some(2020),
            authors: vec![],
        }
    }

    #[test]
    fn test_cache_layout() {
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new("/data", archive);
        assert_eq!(
            resolver.cached_path("paper-1", "2101.12345"),
            PathBuf::from("/data/downloads/citations/paper-1/2101.12345.pdf")
        );
    }

    #[test]
    fn test_sanitize_file_tag() {
        assert_eq!(sanitize_file_tag("my paper.v2"), "my_paper.v2");
        assert_eq!(sanitize_file_tag("../../etc"), ".._.._etc");
        assert_eq!(sanitize_file_tag(".."), "default");
        assert_eq!(sanitize_file_tag(""), "default");
    }

    #[tokio::test]
    async fn test_resolve_downloads_once() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new(dir.path(), archive.clone());

        let first = resolver.resolve("tag", "2101.12345").await.unwrap();
        let second = resolver.resolve("tag", "2101.12345").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(archive.calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(&first).unwrap(), b"%PDF 2101.12345");
        assert_eq!(resolver.cached_documents("tag"), vec!["2101.12345".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_download() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new(dir.path(), archive.clone());

        let (a, b, c) = tokio::join!(
            resolver.resolve("tag", "1706.03762"),
            resolver.resolve("tag", "1706.03762"),
            resolver.resolve("tag", "1706.03762"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(archive.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_tags_are_separate_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new(dir.path(), archive.clone());

        resolver.resolve("a", "1706.03762").await.unwrap();
        resolver.resolve("b", "1706.03762").await.unwrap();
        assert_eq!(archive.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_no_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(true));
        let resolver = DocumentResolver::new(dir.path(), archive);

        let err = resolver.resolve("tag", "2101.12345").await.unwrap_err();
        assert!(matches!(err, CitationError::Resolution { .. }));
        assert!(resolver.cached_documents("tag").is_empty());
        assert_eq!(resolver.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_locks_released_after_many_documents() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new(dir.path(), archive.clone());

        for i in 0..20 {
            let id = format!("2101.{:05}", i);
            resolver.resolve("tag", &id).await.unwrap();
            resolver.resolve("other", &id).await.unwrap();
        }
        assert_eq!(archive.calls.load(Ordering::SeqCst), 40);
        assert_eq!(resolver.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_reference_without_arxiv_id_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Arc::new(CountingArchive::new(false));
        let resolver = DocumentResolver::new(dir.path(), archive.clone());

        let resolved = resolver.resolve_reference("tag", &reference(None)).await.unwrap();
        assert!(resolved.is_none());
        assert_eq!(archive.calls.load(Ordering::SeqCst), 0);

        let resolved = resolver
            .resolve_reference("tag", &reference(Some("2101.12345")))
            .await
            .unwrap();
        assert!(resolved.is_some());
    }
}
