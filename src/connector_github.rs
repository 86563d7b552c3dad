//! GitHub repository fetcher.
//!
//! Uses the GitHub REST API directly; no local clone is made.
//!
//! # Workflow
//!
//! 1. Parse `owner/repo` out of the repository URL.
//! 2. Read the repository record to find the default branch.
//! 3. List the full tree of that branch.
//! 4. Keep blobs matching the include globs, capped at `max_files`.
//! 5. Download each kept file, decode its base64 content, and return it as
//!    a `code` document. Failures on individual files are logged and
//!    skipped.

use base64::Engine;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::sync::OnceLock;

use crate::config::GithubConfig;
use crate::error::{IngestError, IngestResult};
use crate::models::{ContentKind, Fetched, FetchedDocument};

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    size: u64,
}

/// Extract `owner/repo` from a GitHub URL. A trailing `.git` is dropped.
pub fn parse_repo_url(url: &str) -> IngestResult<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"github\.com/([^/\s]+/[^/\s?#]+)").expect("static repo url regex")
    });

    let repo = re
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(".git").to_string())
        .ok_or_else(|| IngestError::InvalidRepoUrl(url.to_string()))?;

    if repo.ends_with('/') {
        return Err(IngestError::InvalidRepoUrl(url.to_string()));
    }
    Ok(repo)
}

/// Build the matcher for files worth fetching.
pub fn build_include_set(patterns: &[String]) -> IngestResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Decode the base64 payload of a contents response. GitHub wraps the
/// encoded text at 60 columns.
fn decode_content(encoded: &str) -> Option<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Build an API URL under `api_base`. Each segment is percent-encoded, so
/// repository paths containing `#`, `?` or spaces stay part of the path.
fn api_url<'s>(
    api_base: &str,
    segments: impl IntoIterator<Item = &'s str>,
) -> IngestResult<reqwest::Url> {
    let mut url = reqwest::Url::parse(api_base)
        .map_err(|e| IngestError::InvalidUrl(format!("{}: {}", api_base, e)))?;
    url.path_segments_mut()
        .map_err(|_| IngestError::InvalidUrl(api_base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

struct GithubClient<'a> {
    http: &'a reqwest::Client,
    api_base: &'a str,
    token: Option<String>,
}

impl GithubClient<'_> {
    fn repo_url<'s>(
        &self,
        repo: &'s str,
        rest: impl IntoIterator<Item = &'s str>,
    ) -> IngestResult<reqwest::Url> {
        api_url(
            self.api_base,
            ["repos"].into_iter().chain(repo.split('/')).chain(rest),
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: reqwest::Url) -> IngestResult<T> {
        let mut req = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(IngestError::BadResponse {
                url: url.to_string(),
                message: format!("status {}", resp.status()),
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

/// Fetch the important files of a repository as `code` documents.
pub async fn fetch_github_repo(
    config: &GithubConfig,
    http: &reqwest::Client,
    repo_url: &str,
) -> IngestResult<Fetched> {
    let repo = parse_repo_url(repo_url)?;
    let include_set = build_include_set(&config.include_globs)?;
    let client = GithubClient {
        http,
        api_base: &config.api_base,
        token: std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty()),
    };

    let info: RepoInfo = match client.get_json(client.repo_url(&repo, [])?).await {
        Ok(info) => info,
        Err(IngestError::BadResponse { .. }) => return Err(IngestError::RepoNotFound(repo)),
        Err(e) => return Err(e),
    };

    let mut tree_url = client.repo_url(
        &repo,
        ["git", "trees"].into_iter().chain(info.default_branch.split('/')),
    )?;
    tree_url.set_query(Some("recursive=1"));
    let tree: TreeResponse = client.get_json(tree_url).await?;

    let paths: Vec<String> = tree
        .tree
        .into_iter()
        .filter(|entry| entry.kind == "blob" && include_set.is_match(&entry.path))
        .map(|entry| entry.path)
        .take(config.max_files)
        .collect();

    tracing::debug!(
        repo = %repo,
        branch = %info.default_branch,
        files = paths.len(),
        "fetching repository files"
    );

    let mut documents = Vec::new();
    for path in paths {
        let contents_url =
            client.repo_url(&repo, ["contents"].into_iter().chain(path.split('/')))?;
        let file: FileContent = match client.get_json(contents_url).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(repo = %repo, path = %path, error = %e, "failed to fetch file");
                continue;
            }
        };

        if file.size >= config.max_file_bytes {
            tracing::debug!(path = %path, size = file.size, "skipping large file");
            continue;
        }

        let Some(content) = file.content.as_deref().and_then(decode_content) else {
            tracing::warn!(repo = %repo, path = %path, "file has no decodable content");
            continue;
        };

        documents.push(FetchedDocument {
            locator: path,
            content,
            kind: ContentKind::Code,
        });
    }

    Ok(Fetched {
        title: repo,
        documents,
        file_type: None,
        size: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;

    #[test]
    fn test_parse_repo_url() {
        assert_eq!(
            parse_repo_url("https://github.com/rust-lang/cargo").unwrap(),
            "rust-lang/cargo"
        );
        assert_eq!(
            parse_repo_url("https://github.com/rust-lang/cargo.git").unwrap(),
            "rust-lang/cargo"
        );
        assert_eq!(
            parse_repo_url("github.com/owner/repo/tree/main/src").unwrap(),
            "owner/repo"
        );
        assert!(matches!(
            parse_repo_url("https://gitlab.com/owner/repo"),
            Err(IngestError::InvalidRepoUrl(_))
        ));
        assert!(parse_repo_url("https://github.com/owner").is_err());
    }

    #[test]
    fn test_default_include_globs() {
        let set = build_include_set(&GithubConfig::default().include_globs).unwrap();
        let matching = [
            "README.md",
            "docs/README",
            "package.json",
            "src/lib.rs",
            "app/main.tsx",
            "a/b/c.py",
        ];
        for path in matching {
            assert!(set.is_match(path), "expected match: {}", path);
        }
        for path in ["Cargo.lock", "image.png", "src/style.css"] {
            assert!(!set.is_match(path), "unexpected match: {}", path);
        }
    }

    #[test]
    fn test_api_url_encodes_path_segments() {
        let url = api_url(
            "https://api.github.com",
            ["repos", "acme", "widget", "contents", "docs", "c#notes?.md"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widget/contents/docs/c%23notes%3F.md"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = api_url("http://127.0.0.1:9000/api/", ["repos", "my file.md"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/repos/my%20file.md");

        assert!(matches!(
            api_url("not a base", ["repos"]),
            Err(IngestError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_decode_wrapped_base64() {
        assert_eq!(decode_content("aGVsbG8g\nd29ybGQ=\n").as_deref(), Some("hello world"));
        assert!(decode_content("!!!").is_none());
    }
}
