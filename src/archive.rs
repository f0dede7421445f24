//! Academic archive access: fetch a cited paper's PDF by arXiv identifier.

use crate::error::{CitationError, Result};

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ARXIV_BASE_URL: &str = "https://arxiv.org";

/// Source of cited documents. Fetching the same id twice must return the same
/// document.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Raw PDF bytes for an arXiv identifier such as `2101.12345`.
    async fn fetch_pdf(&self, arxiv_id: &str) -> Result<Vec<u8>>;
}

/// Downloads PDFs from arXiv (or a mirror with the same `/pdf/<id>` layout).
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ArxivClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !matches!(base_url.scheme(), "https" | "http") {
            anyhow::bail!("archive URL must be http(s): {}", base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("citecheck/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn pdf_url(&self, arxiv_id: &str) -> Result<Url> {
        self.base_url
            .join(&format!("pdf/{}", arxiv_id))
            .map_err(|e| resolution_error(arxiv_id, e))
    }
}

fn resolution_error(arxiv_id: &str, reason: impl std::fmt::Display) -> CitationError {
    CitationError::Resolution {
        arxiv_id: arxiv_id.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ArchiveClient for ArxivClient {
    async fn fetch_pdf(&self, arxiv_id: &str) -> Result<Vec<u8>> {
        let url = self.pdf_url(arxiv_id)?;
        tracing::debug!(%url, "downloading cited document");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| resolution_error(arxiv_id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(resolution_error(arxiv_id, format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| resolution_error(arxiv_id, e))?;

        // Unknown ids come back as an HTML landing page, not a 404.
        if !bytes.starts_with(b"%PDF") {
            return Err(resolution_error(arxiv_id, "response is not a PDF"));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_url_layout() {
        let client = ArxivClient::new("https://arxiv.org").unwrap();
        assert_eq!(
            client.pdf_url("2101.12345").unwrap().as_str(),
            "https://arxiv.org/pdf/2101.12345"
        );
    }

    #[test]
    fn test_mirror_with_path_prefix() {
        let client = ArxivClient::new("https://mirror.example.org/arxiv").unwrap();
        assert_eq!(
            client.pdf_url("1706.03762").unwrap().as_str(),
            "https://mirror.example.org/arxiv/pdf/1706.03762"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(ArxivClient::new("ftp://arxiv.org").is_err());
        assert!(ArxivClient::new("not a url").is_err());
    }
}
