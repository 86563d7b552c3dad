//! Keyword-overlap relevance retrieval.
//!
//! Picks a token-budgeted subset of chunks to prepend to an outgoing chat
//! message. Pure and synchronous: inputs are only read.
//!
//! # Algorithm
//!
//! 1. Collect chunks from sources in the `ready` state only.
//! 2. Lowercase the query and split it on whitespace.
//! 3. Score = total case-insensitive substring occurrences of every query
//!    word in the chunk content.
//! 4. Multiply by 1.5 for `code` chunks when the query contains one of
//!    [`CODE_QUERY_WORDS`].
//! 5. Stable sort by score, descending. Ties keep collection order.
//! 6. Walk the ranking, accumulating token estimates, and stop at the first
//!    chunk that would push the total over `max_tokens`.
//!
//! There is no minimum score: a zero-scoring chunk is still selected if
//! it fits the budget.

use crate::models::{ContentKind, ContextChunk, ContextSource, SourceStatus};

/// Default retrieval budget, in estimated tokens.
pub const DEFAULT_MAX_TOKENS: usize = 4000;

/// Query words that make code chunks more relevant.
pub const CODE_QUERY_WORDS: [&str; 6] =
    ["function", "class", "method", "variable", "import", "export"];

/// Multiplier applied to code chunks for code-flavoured queries.
pub const CODE_BOOST: f64 = 1.5;

/// A chunk paired with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a ContextChunk,
    pub score: f64,
}

/// Lowercase whitespace tokenization. No stemming, no stop words.
pub fn query_words(query: &str) -> Vec<String> {
    query.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Relevance of `chunk` for the already-tokenized `words`.
pub fn score_chunk(chunk: &ContextChunk, words: &[String]) -> f64 {
    let content = chunk.content.to_lowercase();
    let base: usize = words
        .iter()
        .filter(|w| !w.is_empty())
        .map(|w| content.matches(w.as_str()).count())
        .sum();

    let code_query = words.iter().any(|w| CODE_QUERY_WORDS.contains(&w.as_str()));
    if chunk.metadata.kind == ContentKind::Code && code_query {
        base as f64 * CODE_BOOST
    } else {
        base as f64
    }
}

/// Score every chunk of every `ready` source, ranked best first.
pub fn rank_chunks<'a>(query: &str, sources: &'a [ContextSource]) -> Vec<ScoredChunk<'a>> {
    let words = query_words(query);
    let mut scored: Vec<ScoredChunk<'a>> = sources
        .iter()
        .filter(|s| s.status == SourceStatus::Ready)
        .flat_map(|s| s.chunks.iter())
        .map(|chunk| ScoredChunk {
            chunk,
            score: score_chunk(chunk, &words),
        })
        .collect();

    // `sort_by` is stable, so equal scores keep collection order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Select the most relevant chunks whose combined estimate fits
/// `max_tokens`. A query with no words selects nothing.
pub fn select_relevant_chunks(
    query: &str,
    sources: &[ContextSource],
    max_tokens: usize,
) -> Vec<ContextChunk> {
    if query_words(query).is_empty() {
        return Vec::new();
    }

    let mut selected = Vec::new();
    let mut total = 0usize;

    for scored in rank_chunks(query, sources) {
        if total + scored.chunk.tokens > max_tokens {
            break;
        }
        total += scored.chunk.tokens;
        selected.push(scored.chunk.clone());
    }

    selected
}

/// Render selected chunks as a prompt preamble.
///
/// Each chunk becomes a block headed by its origin, language and line
/// range when known.
pub fn format_context(chunks: &[ContextChunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        let meta = &chunk.metadata;
        out.push_str("### ");
        out.push_str(meta.file_path.as_deref().unwrap_or(&meta.source));
        if let (Some(start), Some(end)) = (meta.start_line, meta.end_line) {
            out.push_str(&format!(" (lines {}-{})", start, end));
        }
        out.push('\n');

        match meta.language.as_deref() {
            Some(lang) if meta.kind == ContentKind::Code => {
                out.push_str(&format!("```{}\n{}\n```\n\n", lang, chunk.content));
            }
            _ => {
                out.push_str(&chunk.content);
                out.push_str("\n\n");
            }
        }
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::estimate_tokens;
    use crate::models::{ChunkMetadata, SourceKind};

    fn make_chunk(id: &str, content: &str, kind: ContentKind) -> ContextChunk {
        ContextChunk {
            id: id.to_string(),
            content: content.to_string(),
            metadata: ChunkMetadata::new("src", kind),
            tokens: estimate_tokens(content),
        }
    }

    fn source_with(status: SourceStatus, chunks: Vec<ContextChunk>) -> ContextSource {
        let mut s = ContextSource::new(SourceKind::File, "src", "src");
        s.status = status;
        s.chunks = chunks;
        s
    }

    fn ids(chunks: &[ContextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_query_words() {
        assert_eq!(query_words("  Import React\tcomponent "), vec!["import", "react", "component"]);
        assert!(query_words("   ").is_empty());
    }

    #[test]
    fn test_score_counts_substrings_case_insensitively() {
        let c = make_chunk("c", "Deploy, deployment, DEPLOYED", ContentKind::Text);
        assert_eq!(score_chunk(&c, &query_words("deploy")), 3.0);
        assert_eq!(score_chunk(&c, &query_words("deploy ment")), 4.0);
    }

    #[test]
    fn test_query_words_are_literal() {
        let c = make_chunk("c", "call a.b() then a+b", ContentKind::Text);
        assert_eq!(score_chunk(&c, &query_words("a.b() a+b")), 2.0);
        assert_eq!(score_chunk(&c, &query_words(".*")), 0.0);
    }

    #[test]
    fn test_code_boost() {
        let code = make_chunk("code", "import a\nimport b\nimport c", ContentKind::Code);
        let text = make_chunk("text", "nothing relevant here", ContentKind::Text);
        let words = query_words("import React component");
        assert_eq!(score_chunk(&code, &words), 4.5);
        assert_eq!(score_chunk(&text, &words), 0.0);

        // No code word in the query: no boost.
        assert_eq!(score_chunk(&code, &query_words("import2 b")), 1.0);
    }

    #[test]
    fn test_zero_score_chunks_still_selected() {
        let sources = vec![source_with(
            SourceStatus::Ready,
            vec![
                make_chunk("text", "nothing relevant here", ContentKind::Text),
                make_chunk("code", "import a\nimport b\nimport c", ContentKind::Code),
            ],
        )];
        let selected = select_relevant_chunks("import React component", &sources, 1000);
        assert_eq!(ids(&selected), vec!["code", "text"]);
    }

    #[test]
    fn test_only_ready_sources() {
        let sources = vec![
            source_with(
                SourceStatus::Loading,
                vec![make_chunk("l", "rust rust", ContentKind::Text)],
            ),
            source_with(
                SourceStatus::Error,
                vec![make_chunk("e", "rust rust", ContentKind::Text)],
            ),
            source_with(
                SourceStatus::Ready,
                vec![make_chunk("r", "python", ContentKind::Text)],
            ),
        ];
        let selected = select_relevant_chunks("rust", &sources, DEFAULT_MAX_TOKENS);
        assert_eq!(ids(&selected), vec!["r"]);
    }

    #[test]
    fn test_budget_stops_at_first_overflow() {
        let sources = vec![source_with(
            SourceStatus::Ready,
            vec![
                make_chunk("a", &"rust ".repeat(8), ContentKind::Text), // 10 tokens, score 8
                make_chunk("b", &"rust ".repeat(16), ContentKind::Text), // 20 tokens, score 16
                make_chunk("c", "rust", ContentKind::Text),             // 1 token, score 1
            ],
        )];
        let selected = select_relevant_chunks("rust", &sources, 25);
        // b fits (20), a would make 30: stop. c is never reached.
        assert_eq!(ids(&selected), vec!["b"]);
        let total: usize = selected.iter().map(|c| c.tokens).sum();
        assert!(total <= 25);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let sources = vec![
            source_with(
                SourceStatus::Ready,
                vec![
                    make_chunk("first", "alpha", ContentKind::Text),
                    make_chunk("second", "alpha", ContentKind::Text),
                ],
            ),
            source_with(SourceStatus::Ready, vec![make_chunk("third", "alpha", ContentKind::Text)]),
        ];
        let selected = select_relevant_chunks("alpha", &sources, 100);
        assert_eq!(ids(&selected), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(select_relevant_chunks("anything", &[], 4000).is_empty());
        let sources = vec![source_with(
            SourceStatus::Ready,
            vec![make_chunk("a", "abc", ContentKind::Text)],
        )];
        assert!(select_relevant_chunks("abc", &sources, 0).is_empty());
    }

    #[test]
    fn test_blank_query_selects_nothing() {
        let sources = vec![source_with(
            SourceStatus::Ready,
            vec![
                make_chunk("a", "abc", ContentKind::Text),
                make_chunk("b", "def", ContentKind::Code),
            ],
        )];
        assert!(select_relevant_chunks("", &sources, 4000).is_empty());
        assert!(select_relevant_chunks("   \n\t", &sources, 4000).is_empty());
        assert_eq!(select_relevant_chunks("abc", &sources, 4000).len(), 2);
    }

    #[test]
    fn test_format_context() {
        let mut code = make_chunk("c", "fn main() {}", ContentKind::Code);
        code.metadata.language = Some("rust".to_string());
        code.metadata.file_path = Some("src/main.rs".to_string());
        code.metadata.start_line = Some(1);
        code.metadata.end_line = Some(1);
        let text = make_chunk("t", "Plain words.", ContentKind::Text);

        let out = format_context(&[code, text]);
        assert_eq!(
            out,
            "### src/main.rs (lines 1-1)\n```rust\nfn main() {}\n```\n\n### src\nPlain words."
        );
        assert_eq!(format_context(&[]), "");
    }
}
