#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

use zipdesk_api::config::ServerConfig;
use zipdesk_api::router::build_app_router;
use zipdesk_api::state::AppState;

pub const TEST_ORIGIN: &str = "http://localhost:3000";

/// Build a test `ServerConfig` storing everything under `data_dir`.
pub fn test_config(data_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![TEST_ORIGIN.to_string()],
        request_timeout_secs: 30,
        data_dir: data_dir.to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        max_extract_entries: 1000,
        max_extract_bytes: 16 * 1024 * 1024,
        max_walk_depth: 32,
        max_walk_entries: 10_000,
    }
}

/// Build the full application router, with the same middleware stack as
/// production, over a fresh storage layout in `data_dir`.
pub fn build_test_app(data_dir: &Path) -> Router {
    let config = test_config(data_dir);
    let state = AppState::new(config.clone());
    state.store.ensure_layout().unwrap();
    build_app_router(state, &config)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_empty(app: &Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub const BOUNDARY: &str = "zipdesk-test-boundary";

/// Encode a single-file multipart form.
pub fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write!(
        body,
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .unwrap();
    body.extend_from_slice(content);
    write!(body, "\r\n--{BOUNDARY}--\r\n").unwrap();
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn upload_file(app: &Router, file_name: &str, content: &[u8]) -> Response {
    post_multipart(app, "/api/upload", multipart_body("file", file_name, content)).await
}

/// Upload an archive built from `entries` and return the new project id.
pub async fn create_project(app: &Router, entries: &[(&str, Option<&[u8]>)]) -> String {
    let response = upload_file(app, "project.zip", &zip_bytes(entries)).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = body_json(response).await;
    json["uploadId"].as_str().unwrap().to_string()
}

pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Build an in-memory zip; `None` content marks a directory entry.
pub fn zip_bytes(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        match content {
            Some(data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            None => writer.add_directory(*name, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

/// A small web project used across tests.
pub const SAMPLE_ENTRIES: &[(&str, Option<&[u8]>)] = &[
    ("web/", None),
    ("web/index.html", Some(b"<h1>hello</h1>\n")),
    ("web/js/", None),
    ("web/js/app.js", Some(b"console.log('hi');\n")),
    ("README.txt", Some(b"read me\n")),
];

/// Regular files in [`SAMPLE_ENTRIES`].
pub fn sample_file_count() -> usize {
    SAMPLE_ENTRIES.iter().filter(|(_, content)| content.is_some()).count()
}

/// Count nodes in a JSON tree of FileNodes.
pub fn count_nodes(nodes: &serde_json::Value) -> usize {
    nodes
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|node| 1 + node.get("children").map_or(0, count_nodes))
                .sum()
        })
        .unwrap_or(0)
}
