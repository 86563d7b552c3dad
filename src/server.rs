//! JSON HTTP API.
//!
//! Exposes the same operations as the CLI over axum so editors and agents
//! can manage sources and pull context without shelling out.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/sources` | All sources with totals |
//! | `POST`   | `/sources` | Add a source: `{ "kind", "locator" }` |
//! | `GET`    | `/sources/{id}` | One source with its chunks |
//! | `DELETE` | `/sources/{id}` | Remove a source |
//! | `POST`   | `/sources/{id}/refresh` | Re-ingest a source |
//! | `POST`   | `/context/select` | Pick chunks: `{ "query", "max_tokens"? }` |
//! | `POST`   | `/chunk` | Chunk raw content without storing it |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "source not found: 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `ingest_failed` (422),
//! `internal` (500).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::chunk::chunk_with_budget;
use crate::config::Config;
use crate::error::IngestError;
use crate::ingest::{self, Totals};
use crate::models::{ContentKind, ContextChunk, ContextSource, SourceKind};
use crate::retrieve::format_context;
use crate::sqlite_store::SqliteStore;
use crate::store::SourceStore;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn SourceStore>,
}

/// Build the router over any [`SourceStore`].
pub fn router(config: Arc<Config>, store: Arc<dyn SourceStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sources", get(handle_list_sources).post(handle_add_source))
        .route(
            "/sources/{id}",
            get(handle_get_source).delete(handle_delete_source),
        )
        .route("/sources/{id}/refresh", post(handle_refresh_source))
        .route("/context/select", post(handle_select))
        .route("/chunk", post(handle_chunk))
        .layer(cors)
        .with_state(AppState { config, store })
}

/// Serve the API on `[server].bind` backed by the configured SQLite database.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()), Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server started");
    println!("ctxbox server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(ingest) = err.downcast_ref::<IngestError>() {
            let status = match ingest {
                IngestError::InvalidRepoUrl(_) | IngestError::InvalidUrl(_) => {
                    return bad_request(ingest.to_string())
                }
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            };
            return AppError {
                status,
                code: "ingest_failed",
                message: ingest.to_string(),
            };
        }

        let message = err.to_string();
        if message.contains("not found") {
            return not_found(message);
        }
        tracing::error!(error = %message, "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ /sources ============

#[derive(Serialize)]
struct SourceListResponse {
    sources: Vec<ContextSource>,
    totals: Totals,
}

async fn handle_list_sources(
    State(state): State<AppState>,
) -> Result<Json<SourceListResponse>, AppError> {
    let sources = state.store.list_sources().await?;
    let totals = ingest::totals(&sources);
    Ok(Json(SourceListResponse { sources, totals }))
}

#[derive(Deserialize)]
struct AddSourceRequest {
    kind: SourceKind,
    locator: String,
}

async fn handle_add_source(
    State(state): State<AppState>,
    Json(req): Json<AddSourceRequest>,
) -> Result<(StatusCode, Json<ContextSource>), AppError> {
    if req.locator.trim().is_empty() {
        return Err(bad_request("locator must not be empty"));
    }
    let source =
        ingest::add_source(&state.config, state.store.as_ref(), req.kind, &req.locator).await?;
    Ok((StatusCode::CREATED, Json(source)))
}

async fn handle_get_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContextSource>, AppError> {
    state
        .store
        .get_source(&id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("source not found: {}", id)))
}

async fn handle_delete_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if ingest::remove_source(state.store.as_ref(), &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("source not found: {}", id)))
    }
}

async fn handle_refresh_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContextSource>, AppError> {
    let source = ingest::refresh_source(&state.config, state.store.as_ref(), &id).await?;
    Ok(Json(source))
}

// ============ POST /context/select ============

#[derive(Deserialize)]
struct SelectRequest {
    query: String,
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct SelectResponse {
    chunks: Vec<ContextChunk>,
    total_tokens: usize,
    context: String,
}

async fn handle_select(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, AppError> {
    let max_tokens = req.max_tokens.unwrap_or(state.config.retrieval.max_tokens);
    let chunks = ingest::select(state.store.as_ref(), &req.query, max_tokens).await?;
    Ok(Json(SelectResponse {
        total_tokens: chunks.iter().map(|c| c.tokens).sum(),
        context: format_context(&chunks),
        chunks,
    }))
}

// ============ POST /chunk ============

#[derive(Deserialize)]
struct ChunkRequest {
    content: String,
    source: String,
    kind: ContentKind,
}

#[derive(Serialize)]
struct ChunkResponse {
    chunks: Vec<ContextChunk>,
    total_tokens: usize,
}

async fn handle_chunk(
    State(state): State<AppState>,
    Json(req): Json<ChunkRequest>,
) -> Json<ChunkResponse> {
    let chunks = chunk_with_budget(
        &req.content,
        &req.source,
        req.kind,
        state.config.chunking.max_tokens,
    );
    Json(ChunkResponse {
        total_tokens: chunks.iter().map(|c| c.tokens).sum(),
        chunks,
    })
}
