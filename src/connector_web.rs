//! Web page fetcher.
//!
//! Downloads a page and converts it to markdown text with `htmd`. Scripts,
//! styles and the document head are skipped. Bodies larger than
//! `[web].max_bytes` are rejected, both from the declared length and while
//! streaming.

use crate::config::WebConfig;
use crate::error::{IngestError, IngestResult};
use crate::models::{ContentKind, Fetched, FetchedDocument};

/// Tags whose content never reaches the converted text.
const SKIPPED_TAGS: [&str; 5] = ["head", "script", "style", "noscript", "template"];

/// Convert an HTML document to readable markdown text.
pub fn html_to_text(html: &str) -> IngestResult<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    let markdown = converter.convert(html)?;
    Ok(markdown.trim().to_string())
}

/// Fetch a page and return its visible text as one `text` document.
pub async fn fetch_url(
    config: &WebConfig,
    http: &reqwest::Client,
    url: &str,
) -> IngestResult<Fetched> {
    let parsed =
        reqwest::Url::parse(url).map_err(|e| IngestError::InvalidUrl(format!("{}: {}", url, e)))?;
    let title = parsed
        .host_str()
        .map(str::to_string)
        .unwrap_or_else(|| url.to_string());

    let mut resp = http.get(parsed).send().await?;
    if !resp.status().is_success() {
        return Err(IngestError::BadResponse {
            url: url.to_string(),
            message: format!("status {}", resp.status()),
        });
    }

    let too_large = |size: u64| IngestError::ResponseTooLarge {
        url: url.to_string(),
        size,
        limit: config.max_bytes,
    };
    if let Some(len) = resp.content_length() {
        if len > config.max_bytes {
            return Err(too_large(len));
        }
    }

    let is_html = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("html"))
        .unwrap_or(false);

    let mut body = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > config.max_bytes {
            return Err(too_large(body.len() as u64));
        }
    }
    let raw = String::from_utf8_lossy(&body);

    let content = if is_html || raw.trim_start().starts_with('<') {
        html_to_text(&raw)?
    } else {
        raw.into_owned()
    };

    if content.trim().is_empty() {
        return Err(IngestError::EmptyContent(url.to_string()));
    }

    tracing::debug!(url = %url, bytes = body.len(), chars = content.len(), "fetched page");

    Ok(Fetched {
        title,
        documents: vec![FetchedDocument {
            locator: url.to_string(),
            content,
            kind: ContentKind::Text,
        }],
        file_type: None,
        size: None,
    })
}
