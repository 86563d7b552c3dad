//! # Context Toolbox
//!
//! Turns code repositories, web pages and local files into token-bounded
//! chunks, and picks the chunks most relevant to a query so they fit an
//! LLM context window.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────────┐
//! │  Connectors  │──▶│  Chunker │──▶│ SourceStore  │
//! │ GitHub/Web/  │   │ code/md/ │   │ SQLite or    │
//! │ File         │   │ paragraph│   │ in-memory    │
//! └──────────────┘   └──────────┘   └──────┬───────┘
//!                                          │
//!                                   ┌──────▼───────┐
//!                                   │  Retrieval   │
//!                                   │ score+budget │
//!                                   └──────┬───────┘
//!                         ┌────────────────┤
//!                         ▼                ▼
//!                   ┌──────────┐     ┌──────────┐
//!                   │   CLI    │     │   HTTP   │
//!                   │ (ctxbox) │     │  (axum)  │
//!                   └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ctxbox init
//! ctxbox add github https://github.com/owner/repo
//! ctxbox add file ./docs/guide.md ./src/main.rs
//! ctxbox select "how is the config loaded" --format prompt
//! ctxbox serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chunk`] | Content-aware chunking and token estimation |
//! | [`retrieve`] | Relevance scoring and budgeted selection |
//! | [`language`] | Extension lookup and declaration boundaries |
//! | [`models`] | Core data types |
//! | [`connector_github`] | GitHub repository fetcher |
//! | [`connector_web`] | Web page fetcher |
//! | [`connector_file`] | Local file reader |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`ingest`] | Source lifecycle: add, refresh, remove, select |
//! | [`store`] | Persistence port and in-memory store |
//! | [`sqlite_store`] | SQLite store |
//! | [`server`] | JSON HTTP API |
//! | [`config`] | TOML configuration |

pub mod chunk;
pub mod config;
pub mod connector_file;
pub mod connector_github;
pub mod connector_web;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod language;
pub mod migrate;
pub mod models;
pub mod preview;
pub mod retrieve;
pub mod select;
pub mod server;
pub mod sources;
pub mod sqlite_store;
pub mod store;
