//! Typed failures raised by the ingestion connectors.
//!
//! The chunking and retrieval engine itself never fails; everything here
//! originates in I/O. Any of these errors moves a source into the `error`
//! state.

use thiserror::Error;

use crate::extract::ExtractError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid GitHub URL: {0}")]
    InvalidRepoUrl(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("repository not found or private: {0}")]
    RepoNotFound(String),

    #[error("failed to fetch URL content: {0}")]
    EmptyContent(String),

    #[error("file too large: {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("response too large: {url} is {size} bytes (limit {limit})")]
    ResponseTooLarge { url: String, size: u64, limit: u64 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {message}")]
    BadResponse { url: String, message: String },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
