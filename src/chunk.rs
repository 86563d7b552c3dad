//! Content-aware chunker.
//!
//! Splits raw ingested text into [`ContextChunk`]s bounded by a token
//! budget. Three strategies exist and one is picked per document:
//!
//! | Kind | Condition | Strategy |
//! |------|-----------|----------|
//! | `code` | always | line walk, split at declaration openers or when over budget |
//! | `documentation` | content contains `#` | split at markdown headings |
//! | anything else | | greedy packing of blank-line separated paragraphs |
//!
//! Every chunk's `tokens` is [`estimate_tokens`] of its stored content.
//! Chunks are never empty after trimming, and chunking is pure apart from
//! generating a fresh UUID per chunk.
//!
//! # Example
//!
//! ```rust
//! use context_toolbox::chunk::chunk;
//! use context_toolbox::models::ContentKind;
//!
//! let chunks = chunk("function a(){}\nfunction b(){}\n", "app.js", ContentKind::Code);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[0].metadata.language.as_deref(), Some("javascript"));
//! ```

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::language::Language;
use crate::models::{ChunkMetadata, ContentKind, ContextChunk};

/// Default per-chunk budget, in estimated tokens.
pub const CHUNK_SIZE: usize = 1000;

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` as `ceil(chars / 4)`.
///
/// Counts Unicode scalar values, not bytes. This is a heuristic and does
/// not match any particular model tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_chars(text.chars().count())
}

fn tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Chunk `content` with the default [`CHUNK_SIZE`] budget.
pub fn chunk(content: &str, source: &str, kind: ContentKind) -> Vec<ContextChunk> {
    chunk_with_budget(content, source, kind, CHUNK_SIZE)
}

/// Chunk `content` using the strategy selected by `kind`.
///
/// Returns an empty vector for empty or whitespace-only input. A
/// `documentation` document without any `#` falls back to paragraph
/// chunking.
pub fn chunk_with_budget(
    content: &str,
    source: &str,
    kind: ContentKind,
    max_tokens: usize,
) -> Vec<ContextChunk> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    match kind {
        ContentKind::Code => chunk_code(content, source, max_tokens),
        ContentKind::Documentation if content.contains('#') => {
            chunk_markdown(content, source, max_tokens)
        }
        _ => chunk_paragraphs(content, source, kind, max_tokens),
    }
}

/// Lines accumulated for the chunk currently being built.
struct LineBuffer<'a> {
    lines: Vec<&'a str>,
    first_line: usize,
    chars: usize,
}

impl<'a> LineBuffer<'a> {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            first_line: 1,
            chars: 0,
        }
    }

    fn push(&mut self, line_no: usize, line: &'a str) {
        if self.lines.is_empty() {
            self.first_line = line_no;
        }
        self.lines.push(line);
        // Each buffered line carries its trailing newline.
        self.chars += line.chars().count() + 1;
    }

    fn tokens(&self) -> usize {
        tokens_for_chars(self.chars)
    }

    /// Emit the buffered lines as a chunk and reset. Blank lines at either
    /// edge are excluded from the line range; an all-blank buffer yields
    /// nothing.
    fn flush(&mut self, source: &str, language: Language) -> Option<ContextChunk> {
        let lines = std::mem::take(&mut self.lines);
        self.chars = 0;

        let first = lines.iter().position(|l| !l.trim().is_empty())?;
        let last = lines.iter().rposition(|l| !l.trim().is_empty())?;
        let content = lines[first..=last].join("\n");

        let mut metadata = ChunkMetadata::new(source, ContentKind::Code);
        metadata.language = Some(language.as_str().to_string());
        metadata.file_path = Some(source.to_string());
        metadata.start_line = Some(self.first_line + first);
        metadata.end_line = Some(self.first_line + last);

        Some(make_chunk(content.trim(), metadata))
    }
}

/// Walk `content` line by line. A line matching a boundary pattern of the
/// detected language starts a new chunk; a buffer whose estimate exceeds
/// `max_tokens` is flushed including the line that pushed it over.
fn chunk_code(content: &str, source: &str, max_tokens: usize) -> Vec<ContextChunk> {
    let language = Language::from_locator(source);
    let mut chunks = Vec::new();
    let mut buf = LineBuffer::new();

    for (i, line) in content.split('\n').enumerate() {
        let line_no = i + 1;

        if language.is_boundary(line) && !buf.lines.is_empty() {
            chunks.extend(buf.flush(source, language));
        }

        buf.push(line_no, line);

        if buf.tokens() > max_tokens {
            chunks.extend(buf.flush(source, language));
        }
    }

    chunks.extend(buf.flush(source, language));
    chunks
}

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^#+\s").expect("static heading regex"))
}

fn paragraph_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("static paragraph regex"))
}

/// Split on heading markers. Each section after the first keeps the exact
/// marker that introduced it; the preamble before the first heading is
/// kept as-is. Oversized sections go through paragraph chunking.
fn chunk_markdown(content: &str, source: &str, max_tokens: usize) -> Vec<ContextChunk> {
    let mut sections: Vec<(&str, &str)> = Vec::new();
    let mut prefix = "";
    let mut last = 0;

    for m in heading_regex().find_iter(content) {
        sections.push((prefix, &content[last..m.start()]));
        prefix = m.as_str();
        last = m.end();
    }
    sections.push((prefix, &content[last..]));

    let mut chunks = Vec::new();
    for (prefix, body) in sections {
        if body.trim().is_empty() {
            continue;
        }
        let section = format!("{}{}", prefix, body);
        if estimate_tokens(&section) > max_tokens {
            chunks.extend(chunk_paragraphs(
                &section,
                source,
                ContentKind::Documentation,
                max_tokens,
            ));
        } else {
            chunks.push(make_chunk(
                section.trim(),
                ChunkMetadata::new(source, ContentKind::Documentation),
            ));
        }
    }
    chunks
}

/// Greedily pack blank-line separated paragraphs, joined by `"\n\n"`.
///
/// A single paragraph larger than the budget is emitted whole; it is not
/// subdivided.
fn chunk_paragraphs(
    content: &str,
    source: &str,
    kind: ContentKind,
    max_tokens: usize,
) -> Vec<ContextChunk> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    let flush = |buf: &mut String, chunks: &mut Vec<ContextChunk>| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            chunks.push(make_chunk(trimmed, ChunkMetadata::new(source, kind)));
        }
        buf.clear();
    };

    for para in paragraph_break_regex().split(content) {
        if para.trim().is_empty() {
            continue;
        }
        let para_chars = para.chars().count();

        if buf.is_empty() {
            buf.push_str(para);
            buf_chars = para_chars;
            continue;
        }

        if tokens_for_chars(buf_chars + 2 + para_chars) > max_tokens {
            flush(&mut buf, &mut chunks);
            buf.push_str(para);
            buf_chars = para_chars;
        } else {
            buf.push_str("\n\n");
            buf.push_str(para);
            buf_chars += 2 + para_chars;
        }
    }

    flush(&mut buf, &mut chunks);
    chunks
}

fn make_chunk(content: &str, metadata: ChunkMetadata) -> ContextChunk {
    ContextChunk {
        id: Uuid::new_v4().to_string(),
        content: content.to_string(),
        metadata,
        tokens: estimate_tokens(content),
    }
}
