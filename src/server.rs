//! HTTP surface.

use crate::error::ApiError;
use crate::pipeline::{DocumentParser, Upload};
use crate::schema::{format_size, BatchItem, BatchResponse, ParseResponse};
use axum::{
    extract::{multipart::{Field, MultipartRejection}, DefaultBodyLimit, Multipart, State},
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Room for multipart framing on top of the file payloads.
const FRAMING_HEADROOM: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_size_bytes: usize,
    pub batch_concurrency: usize,
    pub max_batch_files: usize,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<DocumentParser>,
    pub limits: UploadLimits,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state
        .limits
        .max_file_size_bytes
        .saturating_mul(state.limits.max_batch_files.max(1))
        .saturating_add(FRAMING_HEADROOM);

    Router::new()
        .route("/health", get(health))
        .route("/parse-document", post(parse_document))
        .route("/parse-documents", post(parse_documents))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Parse a single uploaded document from the `file` field.
async fn parse_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ParseResponse>, ApiError> {
    let mut multipart = multipart.map_err(multipart_failure)?;
    let limit = state.limits.max_file_size_bytes;

    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        if field.name() != Some("file") {
            continue;
        }
        let upload = match read_field(field, limit).await? {
            FieldRead::Complete(upload) => upload,
            FieldRead::TooLarge { file_name } => {
                warn!("Rejected {}: larger than {} bytes", file_name, limit);
                return Err(ApiError::BadRequest(too_large_message(limit)));
            }
        };

        info!("Received file: {} ({} bytes)", upload.file_name, upload.data.len());
        return Ok(Json(state.parser.parse(upload).await));
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

/// Parse every `file`/`files` field with bounded concurrency.
async fn parse_documents(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let mut multipart = multipart.map_err(multipart_failure)?;
    let limits = state.limits;
    let mut slots: Vec<Option<BatchItem>> = Vec::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue;
        }
        if slots.len() >= limits.max_batch_files {
            return Err(ApiError::BadRequest(format!(
                "Too many files. At most {} files can be processed per request",
                limits.max_batch_files
            )));
        }
        match read_field(field, limits.max_file_size_bytes).await? {
            FieldRead::Complete(upload) => {
                slots.push(None);
                uploads.push(upload);
            }
            FieldRead::TooLarge { file_name } => slots.push(Some(BatchItem::Rejected {
                file_name,
                error: too_large_message(limits.max_file_size_bytes),
            })),
        }
    }

    if slots.is_empty() {
        return Err(ApiError::BadRequest("No files provided".to_string()));
    }

    info!("Batch of {} files ({} accepted)", slots.len(), uploads.len());
    let mut parsed = state
        .parser
        .parse_batch(uploads, limits.batch_concurrency)
        .await
        .into_iter();

    let results = slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| parsed.next()))
        .collect();

    Ok(Json(BatchResponse { results }))
}

// ============================================================================
// Helper functions
// ============================================================================

enum FieldRead {
    Complete(Upload),
    TooLarge { file_name: String },
}

/// Stream a file field, stopping as soon as it exceeds `limit` bytes.
async fn read_field(mut field: Field<'_>, limit: usize) -> Result<FieldRead, ApiError> {
    let file_name = field.file_name().unwrap_or("document").to_string();
    let content_type = field.content_type().unwrap_or("").to_string();

    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_failure)? {
        if data.len() + chunk.len() > limit {
            return Ok(FieldRead::TooLarge { file_name });
        }
        data.extend_from_slice(&chunk);
    }

    Ok(FieldRead::Complete(Upload {
        file_name,
        content_type,
        data,
    }))
}

fn too_large_message(limit: usize) -> String {
    format!("File too large. Maximum size is {}", format_size(limit))
}

fn multipart_failure(e: impl std::fmt::Display) -> ApiError {
    error!("Multipart error: {}", e);
    ApiError::internal("Failed to process document", e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_types::FileTypeRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docparse-test-boundary";

    fn app(max_file_size_bytes: usize) -> Router {
        let parser = DocumentParser::new(Arc::new(FileTypeRegistry::builtin().unwrap()), None, Duration::from_secs(1));
        router(AppState {
            parser: Arc::new(parser),
            limits: UploadLimits {
                max_file_size_bytes,
                batch_concurrency: 2,
                max_batch_files: 3,
            },
        })
    }

    fn multipart_body(parts: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, mime, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    field, file_name, mime
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn post(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn test_parse_text_file() {
        let body = multipart_body(&[("file", "notes.txt", "text/plain", b"The cat sat. The dog ran.")]);
        let (status, json) = send(app(1024), post("/parse-document", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], Value::Bool(true));
        assert_eq!(json["content"], "The cat sat. The dog ran.");
        assert_eq!(json["stats"]["sentenceCount"], 2);
        assert_eq!(json["metadata"]["fileName"], "notes.txt");
        assert_eq!(json["metadata"]["extractionMethod"], "plain-text");
        assert_eq!(json["structuredData"], Value::Null);
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let body = multipart_body(&[("attachment", "notes.txt", "text/plain", b"hello")]);
        let (status, json) = send(app(1024), post("/parse-document", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_size_limit_boundary() {
        let limit = 64;
        let at_limit = vec![b'a'; limit];
        let body = multipart_body(&[("file", "a.txt", "text/plain", &at_limit)]);
        let (status, _) = send(app(limit), post("/parse-document", body)).await;
        assert_eq!(status, StatusCode::OK);

        let over = vec![b'a'; limit + 1];
        let body = multipart_body(&[("file", "a.txt", "text/plain", &over)]);
        let (status, json) = send(app(limit), post("/parse-document", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("File too large"));
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_internal_error() {
        for uri in ["/parse-document", "/parse-documents"] {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(r#"{"file":"x"}"#))
                .unwrap();
            let (status, json) = send(app(1024), request).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(json["error"], "Failed to process document");
            assert!(json["details"].is_string());
        }

        let request = Request::builder()
            .method("POST")
            .uri("/parse-document")
            .header("content-type", "multipart/form-data")
            .body(Body::from("no boundary"))
            .unwrap();
        let (status, json) = send(app(1024), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to process document");
    }

    #[tokio::test]
    async fn test_random_pdf_bytes_still_succeed() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8).collect();
        let body = multipart_body(&[("file", "scan.pdf", "application/pdf", &data)]);
        let (status, json) = send(app(1 << 20), post("/parse-document", body)).await;
        assert_eq!(status, StatusCode::OK);
        let confidence = json["metadata"]["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert!(!json["content"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_mixes_results_and_rejections() {
        let big = vec![b'x'; 100];
        let body = multipart_body(&[
            ("files", "a.txt", "text/plain", b"alpha"),
            ("files", "big.txt", "text/plain", &big),
            ("files", "c.json", "application/json", br#"{"k":true}"#),
        ]);
        let (status, json) = send(app(64), post("/parse-documents", body)).await;
        assert_eq!(status, StatusCode::OK);

        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["content"], "alpha");
        assert_eq!(results[1]["fileName"], "big.txt");
        assert!(results[1]["error"].as_str().unwrap().starts_with("File too large"));
        assert_eq!(results[2]["metadata"]["extractionMethod"], "json-parser");
    }

    #[tokio::test]
    async fn test_batch_file_count_limit() {
        let body = multipart_body(&[
            ("file", "1.txt", "text/plain", b"1"),
            ("file", "2.txt", "text/plain", b"2"),
            ("file", "3.txt", "text/plain", b"3"),
            ("file", "4.txt", "text/plain", b"4"),
        ]);
        let (status, json) = send(app(64), post("/parse-documents", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("Too many files"));
    }
}
