//! Integration tests for `/api/upload`.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, count_nodes, get, upload_file, zip_bytes, SAMPLE_ENTRIES};

fn project_dirs(data_dir: &std::path::Path) -> usize {
    std::fs::read_dir(data_dir.join("extracted")).unwrap().count()
}

// ---------------------------------------------------------------------------
// Test: GET /api/upload describes the constraints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_constraints_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = get(&app, "/api/upload").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["maxFileSize"], 1024 * 1024);
    assert_eq!(json["allowedTypes"], serde_json::json!([".zip"]));
}

// ---------------------------------------------------------------------------
// Test: a valid archive becomes a project whose tree matches the archive
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_upload_is_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let archive = zip_bytes(SAMPLE_ENTRIES);

    let response = upload_file(&app, "site.zip", &archive).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["fileName"], "site.zip");
    assert_eq!(json["fileSize"], archive.len());
    assert_eq!(json["extractedFileCount"], SAMPLE_ENTRIES.len());
    assert_eq!(json["extractedFiles"][1], "web/index.html");

    let id = json["uploadId"].as_str().unwrap();
    let tree = body_json(get(&app, &format!("/api/projects/{id}")).await).await;
    assert_eq!(count_nodes(&tree["contents"]), SAMPLE_ENTRIES.len());
    assert_eq!(tree["contents"][0]["name"], "web");
    assert_eq!(tree["contents"][1]["name"], "README.txt");
    assert_eq!(
        tree["contents"][0]["children"][1]["path"],
        "web/index.html"
    );
}

// ---------------------------------------------------------------------------
// Test: directories implied by file paths are counted like listed ones
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_count_matches_listing_without_directory_entries() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let archive = zip_bytes(&[("deep/er/file.txt", Some(b"x")), ("top.txt", Some(b"y"))]);

    let uploaded = body_json(upload_file(&app, "implicit.zip", &archive).await).await;
    let id = uploaded["uploadId"].as_str().unwrap();
    let listed = body_json(get(&app, "/api/projects").await).await;
    let tree = body_json(get(&app, &format!("/api/projects/{id}")).await).await;

    // deep, deep/er, deep/er/file.txt, top.txt
    assert_eq!(count_nodes(&tree["contents"]), 4);
    assert_eq!(uploaded["extractedFileCount"], 4);
    assert_eq!(listed["files"][0]["extractedFileCount"], 4);
}

// ---------------------------------------------------------------------------
// Test: rejected uploads create nothing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_zip_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = upload_file(&app, "notes.txt", b"just text").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Only .zip files are allowed");
    assert_eq!(project_dirs(dir.path()), 0);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = upload_file(&app, "empty.zip", b"").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(project_dirs(dir.path()), 0);
}

#[tokio::test]
async fn oversize_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let oversize = vec![0u8; 1024 * 1024 + 1];

    let response = upload_file(&app, "big.zip", &oversize).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File size exceeds 1MB limit");
    assert_eq!(project_dirs(dir.path()), 0);
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let body = common::multipart_body("attachment", "site.zip", &zip_bytes(SAMPLE_ENTRIES));

    let response = common::post_multipart(&app, "/api/upload", body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No file provided");
}

#[tokio::test]
async fn body_over_the_limit_keeps_cors_and_request_id_headers() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let body = common::multipart_body("file", "huge.zip", &vec![0u8; 3 * 1024 * 1024]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header("Origin", common::TEST_ORIGIN)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", common::BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = common::send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], common::TEST_ORIGIN);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(project_dirs(dir.path()), 0);
}

// ---------------------------------------------------------------------------
// Test: broken or hostile archives leave no project behind
// ---------------------------------------------------------------------------

#[tokio::test]
async fn corrupt_archive_fails_without_a_project() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = upload_file(&app, "broken.zip", b"PK but not really").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to upload and extract file");
    assert_eq!(project_dirs(dir.path()), 0);
    assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 0);
}

#[tokio::test]
async fn escaping_entry_fails_without_a_project() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let archive = zip_bytes(&[
        ("fine.txt", Some(b"ok")),
        ("../../escaped.txt", Some(b"pwned")),
    ]);

    let response = upload_file(&app, "evil.zip", &archive).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(project_dirs(dir.path()), 0);
    assert!(!dir.path().join("escaped.txt").exists());
    assert!(!dir.path().parent().unwrap().join("escaped.txt").exists());

    let list = body_json(get(&app, "/api/projects").await).await;
    assert_eq!(list["count"], 0);
}
