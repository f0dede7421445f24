use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::archive::DEFAULT_ARXIV_BASE_URL;
use crate::embeddings::{DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL};
use crate::pipeline::DEFAULT_MAX_CONCURRENCY;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Root of the downloaded-document cache.
    pub storage_root: PathBuf,
    pub db_path: PathBuf,
    pub arxiv_base_url: String,
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub max_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            bind_addr: env::var("CITECHECK_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .context("CITECHECK_BIND_ADDR must be a socket address like 127.0.0.1:3000")?,
            storage_root: env::var("CITECHECK_STORAGE_ROOT")
                .unwrap_or_else(|_| "storage".to_string())
                .into(),
            db_path: env::var("CITECHECK_DB_PATH")
                .unwrap_or_else(|_| ".citecheck_db".to_string())
                .into(),
            arxiv_base_url: env::var("ARXIV_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ARXIV_BASE_URL.to_string()),
            embedding_api_url: env::var("EMBEDDING_API_URL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_URL.to_string()),
            embedding_api_key: env::var("EMBEDDING_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            max_concurrency: match env::var("CITECHECK_MAX_CONCURRENCY") {
                Ok(v) => v
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .context("CITECHECK_MAX_CONCURRENCY must be a positive number")?,
                Err(_) => DEFAULT_MAX_CONCURRENCY,
            },
        })
    }
}
