//! TOML configuration.
//!
//! Only `[db]` is required; every other section falls back to the
//! defaults below. See `config/ctxbox.example.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::CHUNK_SIZE;
use crate::models::MAX_CHUNKS_PER_SOURCE;
use crate::retrieve::DEFAULT_MAX_TOKENS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub files: FilesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_max_chunks_per_source")]
    pub max_chunks_per_source: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: CHUNK_SIZE,
            max_chunks_per_source: MAX_CHUNKS_PER_SOURCE,
        }
    }
}

fn default_chunk_tokens() -> usize {
    CHUNK_SIZE
}
fn default_max_chunks_per_source() -> usize {
    MAX_CHUNKS_PER_SOURCE
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_retrieval_tokens")]
    pub max_tokens: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

fn default_retrieval_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_github_api")]
    pub api_base: String,
    /// Maximum number of files fetched per repository.
    #[serde(default = "default_github_max_files")]
    pub max_files: usize,
    /// Files of this size or larger are skipped.
    #[serde(default = "default_github_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Name of the environment variable holding an API token.
    #[serde(default = "default_github_token_env")]
    pub token_env: String,
    #[serde(default = "default_github_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api(),
            max_files: default_github_max_files(),
            max_file_bytes: default_github_max_file_bytes(),
            token_env: default_github_token_env(),
            include_globs: default_github_include_globs(),
        }
    }
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}
fn default_github_max_files() -> usize {
    20
}
fn default_github_max_file_bytes() -> u64 {
    100_000
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_github_include_globs() -> Vec<String> {
    [
        "**/README*",
        "**/package.json",
        "**/*.md",
        "**/*.js",
        "**/*.ts",
        "**/*.jsx",
        "**/*.tsx",
        "**/*.py",
        "**/*.java",
        "**/*.cpp",
        "**/*.c",
        "**/*.go",
        "**/*.rs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Largest response body accepted from a page, in bytes.
    #[serde(default = "default_max_page_bytes")]
    pub max_bytes: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_bytes: default_max_page_bytes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("ctxbox/{}", env!("CARGO_PKG_VERSION"))
}
fn default_max_page_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_bytes: u64,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_file_bytes(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Defaults only, with an in-directory database path. Used by commands
    /// that never touch the database.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/ctxbox.sqlite"),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            github: GithubConfig::default(),
            web: WebConfig::default(),
            files: FilesConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
///
/// A file that exists but fails to parse or validate is still an error.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }
    if config.chunking.max_chunks_per_source == 0 {
        anyhow::bail!("chunking.max_chunks_per_source must be > 0");
    }
    if config.retrieval.max_tokens == 0 {
        anyhow::bail!("retrieval.max_tokens must be > 0");
    }
    if config.github.max_files == 0 {
        anyhow::bail!("github.max_files must be > 0");
    }
    if config.web.max_bytes == 0 {
        anyhow::bail!("web.max_bytes must be > 0");
    }

    Ok(config)
}
