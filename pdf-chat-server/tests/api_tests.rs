//! HTTP-level tests of the API router with fake providers and an in-memory store.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pdf_chat_rag::{
    EmbeddingProvider, Generator, InMemoryVectorStore, IngestionPipeline, PdfParser,
    QueryPipeline, RagConfig, RagError, Result,
};
use pdf_chat_server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "pdfchatboundary";
const HEADER: &[u8] = b"%PDF-1.7\n";
const DIM: usize = 26;

/// Reads everything after the PDF header line as text.
struct FakeParser;

impl PdfParser for FakeParser {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = std::fs::read(path)?;
        let body = bytes.strip_prefix(HEADER).unwrap_or(&bytes);
        if body.starts_with(b"CORRUPT") {
            return Err(RagError::Parse("broken xref".into()));
        }
        Ok(vec![String::from_utf8_lossy(body).into_owned()])
    }
}

struct LetterEmbedder;

#[async_trait]
impl EmbeddingProvider for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; DIM];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Echoes the context it was given, so responses show what was retrieved.
#[derive(Default)]
struct EchoGenerator {
    instructions: Mutex<Vec<String>>,
}

impl EchoGenerator {
    fn calls(&self) -> usize {
        self.instructions.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, _query: &str, system_instruction: &str) -> Result<String> {
        self.instructions.lock().unwrap().push(system_instruction.to_string());
        let context = system_instruction.split("context: ").nth(1).unwrap_or_default();
        Ok(format!("From the document: {context}"))
    }
}

struct TestApp {
    app: Router,
    generator: Arc<EchoGenerator>,
    temp_dir: tempfile::TempDir,
}

fn test_app(max_upload_bytes: usize) -> TestApp {
    let generator = Arc::new(EchoGenerator::default());
    let temp_dir = tempfile::tempdir().unwrap();
    let rag = RagConfig::builder().chunk_size(60).chunk_overlap(10).top_k(2).build().unwrap();

    let store = Arc::new(InMemoryVectorStore::new());

    let ingestion = IngestionPipeline::builder()
        .config(rag.clone())
        .parser(Arc::new(FakeParser))
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(store.clone())
        .temp_dir(temp_dir.path())
        .build()
        .unwrap();
    let query = QueryPipeline::builder()
        .config(rag)
        .embedding_provider(Arc::new(LetterEmbedder))
        .vector_store(store)
        .generator(generator.clone())
        .build()
        .unwrap();

    let state = AppState::new(ingestion, query, max_upload_bytes);
    TestApp { app: router(state), generator, temp_dir }
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn pdf(text: &str) -> Vec<u8> {
    let mut bytes = HEADER.to_vec();
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

fn upload_request(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/pdf")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(field, file_name, content)))
        .unwrap()
}

fn chat_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn temp_dir_is_empty(dir: &tempfile::TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

const MANUAL: &str = "The espresso machine must be descaled every two months. \
                      Use only filtered water in the tank. \
                      The grinder burrs are replaced after five hundred kilograms.";

#[tokio::test]
async fn upload_then_chat() {
    let t = test_app(1024 * 1024);

    let (status, body) = send(&t.app, upload_request("pdf", "report.pdf", &pdf(MANUAL))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PDF processed successfully");
    assert_eq!(body["collectionName"], "report.pdf");
    let content = body["content"].as_array().unwrap();
    assert!(content.len() > 1);
    assert_eq!(content[0]["index"], 0);
    assert!(content[0].get("embedding").is_none());
    assert!(temp_dir_is_empty(&t.temp_dir));

    let (status, body) = send(
        &t.app,
        chat_request(json!({ "query": "How often is it descaled?", "collectionName": "report.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chat completed successfully");
    let response = body["response"].as_str().unwrap();
    assert!(response.starts_with("From the document: "));
    assert!(response.len() > "From the document: ".len());
    assert_eq!(t.generator.calls(), 1);
}

#[tokio::test]
async fn chat_against_unknown_collection_fails_without_generation() {
    let t = test_app(1024 * 1024);
    let (status, body) = send(
        &t.app,
        chat_request(json!({ "query": "anything", "collectionName": "nonexistent.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("upload"));
    assert_eq!(t.generator.calls(), 0);
}

#[tokio::test]
async fn reupload_replaces_content() {
    let t = test_app(1024 * 1024);
    let (status, _) =
        send(&t.app, upload_request("pdf", "report.pdf", &pdf("old quarterly numbers"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        send(&t.app, upload_request("pdf", "report.pdf", &pdf("new annual summary"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &t.app,
        chat_request(json!({ "query": "quarterly numbers", "collectionName": "report.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let response = body["response"].as_str().unwrap();
    assert!(response.contains("new annual summary"));
    assert!(!response.contains("old quarterly"));
}

#[tokio::test]
async fn upload_without_pdf_field_is_bad_request() {
    let t = test_app(1024 * 1024);
    let (status, body) = send(&t.app, upload_request("file", "report.pdf", &pdf(MANUAL))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No PDF file uploaded");
}

#[tokio::test]
async fn upload_of_non_pdf_is_bad_request() {
    let t = test_app(1024 * 1024);
    let (status, body) =
        send(&t.app, upload_request("pdf", "notes.txt", b"plain text, not a pdf")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(temp_dir_is_empty(&t.temp_dir));
}

#[tokio::test]
async fn unreadable_pdf_is_server_error_with_details() {
    let t = test_app(1024 * 1024);
    let (status, body) =
        send(&t.app, upload_request("pdf", "broken.pdf", &pdf("CORRUPT stream"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to process PDF");
    assert!(body["details"].is_string());
    assert!(!body["details"].as_str().unwrap().contains("xref"));
    assert!(temp_dir_is_empty(&t.temp_dir));
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let t = test_app(256);
    let big = pdf(&"x".repeat(4096));
    let response = t.app.clone().oneshot(upload_request("pdf", "big.pdf", &big)).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn chat_requires_both_fields() {
    let t = test_app(1024 * 1024);
    for body in [
        json!({ "query": "hello" }),
        json!({ "collectionName": "report.pdf" }),
        json!({ "query": "   ", "collectionName": "report.pdf" }),
        json!({ "query": "hello", "collectionName": "" }),
    ] {
        let (status, body) = send(&t.app, chat_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query and collection name are required");
    }
    assert_eq!(t.generator.calls(), 0);
}

#[tokio::test]
async fn chat_with_invalid_json_is_bad_request() {
    let t = test_app(1024 * 1024);
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query and collection name are required");
}

#[tokio::test]
async fn health_is_ok() {
    let t = test_app(1024);
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
