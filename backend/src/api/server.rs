//! HTTP Server for the converter API.
//!
//! Provides REST endpoints to preview and convert uploaded bank exports.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | GET    | `/api/catalog`    | Encodings, delimiters and schemas    |
//! | POST   | `/api/preview`    | Parse an upload, return first rows   |
//! | POST   | `/api/convert`    | Parse an upload, return YNAB CSV     |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! Uploads are multipart forms with a `file` part and optional `options`,
//! `schema` and `mapping` parts holding JSON.

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, str::FromStr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, CatalogResponse, ConversionRequest, PreviewResponse};
use crate::config::{MAX_UPLOAD_SIZE, PREVIEW_ROWS};
use crate::error::ServerError;
use crate::models::{ColumnMapping, ConversionOptions, TargetSchema};
use crate::transform::mapper::transform;
use crate::transform::pipeline::{convert_bytes, load_table};

type ApiError = (StatusCode, Json<Value>);

/// Build the application router.
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/catalog", get(catalog))
        .route("/api/preview", post(preview))
        .route("/api/convert", post(convert))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_info(format!("YNAB converter running on http://localhost:{}", port));
    log_info("POST /api/preview - Preview an upload");
    log_info("POST /api/convert - Download YNAB CSV");
    log_info("GET  /api/catalog - Supported settings");
    log_info("GET  /api/logs    - SSE log stream");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ynab-converter",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "catalog": "GET /api/catalog",
            "preview": "POST /api/preview",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn catalog() -> Json<CatalogResponse> {
    Json(CatalogResponse::current())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// An uploaded file with its conversion settings.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
    request: ConversionRequest,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ServerError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut request = ConversionRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file = Some((file_name, bytes.to_vec()));
            }
            "options" | "schema" | "mapping" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                apply_form_field(&mut request, &name, &text)?;
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    Ok(Upload {
        file_name,
        bytes,
        request,
    })
}

/// Apply one text part of the form to `request`.
fn apply_form_field(request: &mut ConversionRequest, name: &str, text: &str) -> Result<(), ServerError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }

    match name {
        "options" => {
            request.options = serde_json::from_str::<ConversionOptions>(text)
                .map_err(|e| ServerError::BadRequest(format!("Invalid options: {}", e)))?;
        }
        "schema" => {
            // Accept both a JSON string and a bare name
            request.schema = TargetSchema::from_str(text.trim_matches('"')).map_err(ServerError::BadRequest)?;
        }
        "mapping" => {
            let mapping = serde_json::from_str::<ColumnMapping>(text)
                .map_err(|e| ServerError::BadRequest(format!("Invalid mapping: {}", e)))?;
            request.mapping = Some(mapping);
        }
        _ => {}
    }
    Ok(())
}

fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    let status = match err {
        ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ServerError::Convert(_) | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(error_response(&err.to_string())))
}

/// Run synchronous conversion work off the async runtime.
async fn run_blocking<T, F>(work: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// Preview endpoint
async fn preview(multipart: Multipart) -> Result<Json<PreviewResponse>, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    log_info(format!("Preview: {} ({} bytes)", upload.file_name, upload.bytes.len()));

    let response = run_blocking(move || {
        let Upload {
            file_name,
            bytes,
            request,
        } = upload;
        let loaded = load_table(&file_name, &bytes, &request.options)?;
        let rows = transform(
            &loaded.table,
            request.schema,
            &request.effective_mapping(),
            request.options.invert_sign,
            Some(PREVIEW_ROWS),
        );
        Ok(PreviewResponse::new(&file_name, loaded, request.schema, rows))
    })
    .await
    .map_err(reject)?;

    Ok(Json(response))
}

/// Convert endpoint, answers with the CSV as an attachment.
async fn convert(multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    log_info(format!("Convert: {} ({} bytes)", upload.file_name, upload.bytes.len()));

    let result = run_blocking(move || {
        let mapping = upload.request.effective_mapping();
        Ok(convert_bytes(
            &upload.file_name,
            &upload.bytes,
            &upload.request.options,
            upload.request.schema,
            &mapping,
        )?)
    })
    .await
    .map_err(reject)?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.file_name),
        ),
    ];
    Ok((headers, result.csv))
}
