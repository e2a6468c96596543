//! Integration tests for building, downloading and deleting packages.

mod common;

use std::io::{Cursor, Read};

use axum::http::StatusCode;
use common::{body_bytes, body_json, count_nodes, create_project, delete, get, post_empty, put_json, SAMPLE_ENTRIES};
use serde_json::json;

async fn build(app: &axum::Router, id: &str) -> serde_json::Value {
    let response = post_empty(app, &format!("/api/projects/{id}/package")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).unwrap();
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf).unwrap();
    buf
}

// ---------------------------------------------------------------------------
// Test: build then download
// ---------------------------------------------------------------------------

#[tokio::test]
async fn built_package_downloads_with_project_files_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;

    let built = build(&app, &id).await;
    assert_eq!(built["success"], true);
    let package_id = built["package"]["id"].as_str().unwrap().to_string();
    let download_url = built["downloadUrl"].as_str().unwrap().to_string();
    assert_eq!(
        download_url,
        format!("/api/projects/{id}/package/download/{package_id}")
    );

    let response = get(&app, &download_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["content-type"], "application/zip");
    assert_eq!(
        headers["cache-control"],
        "no-cache, no-store, must-revalidate"
    );
    let disposition = headers["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"project-"));
    assert!(disposition.contains(&package_id[..8]));

    let bytes = body_bytes(response).await.to_vec();
    assert_eq!(built["package"]["fileSize"], bytes.len());
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

    let tree = body_json(get(&app, &format!("/api/projects/{id}")).await).await;
    assert_eq!(archive.len(), common::sample_file_count() + 2);
    assert!(count_nodes(&tree["contents"]) > common::sample_file_count());
    assert!(archive.file_names().all(|name| !name.ends_with('/')));
    assert_eq!(built["package"]["fileCount"], archive.len());

    for (name, content) in SAMPLE_ENTRIES {
        if let Some(expected) = content {
            assert_eq!(read_entry(&mut archive, &format!("{id}/{name}")), *expected);
        }
    }

    let metadata: serde_json::Value =
        serde_json::from_slice(&read_entry(&mut archive, "package.json")).unwrap();
    assert_eq!(metadata["projectId"], id.as_str());
    assert_eq!(metadata["version"], "1.0.0");
    let notice = String::from_utf8(read_entry(&mut archive, "README.md")).unwrap();
    assert!(notice.contains(&id));
}

#[tokio::test]
async fn package_reflects_edits_made_before_building() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;
    let response = put_json(
        &app,
        &format!("/api/projects/{id}/files/web/index.html"),
        json!({ "content": "<h1>edited</h1>" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let built = build(&app, &id).await;
    let bytes = body_bytes(get(&app, built["downloadUrl"].as_str().unwrap()).await).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();

    assert_eq!(
        read_entry(&mut archive, &format!("{id}/web/index.html")),
        b"<h1>edited</h1>"
    );
}

// ---------------------------------------------------------------------------
// Test: package info
// ---------------------------------------------------------------------------

#[tokio::test]
async fn package_info_estimates_the_archive() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;

    let response = get(&app, &format!("/api/projects/{id}/package")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let info = &json["package"];
    assert_eq!(info["canPackage"], true);
    assert_eq!(info["fileCount"], common::sample_file_count() + 2);
    let expected_size: usize = SAMPLE_ENTRIES
        .iter()
        .filter_map(|(_, content)| content.map(<[u8]>::len))
        .sum();
    assert_eq!(info["estimatedSize"], expected_size);
}

// ---------------------------------------------------------------------------
// Test: missing projects and packages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn packaging_unknown_project_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());

    let response = post_empty(&app, "/api/projects/nope/package").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, "/api/projects/nope/package").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_package_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;

    let uri = format!("/api/projects/{id}/package/download/0000000000");
    assert_eq!(get(&app, &uri).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleted_package_can_no_longer_be_downloaded() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;
    let built = build(&app, &id).await;
    let url = built["downloadUrl"].as_str().unwrap().to_string();

    let response = delete(&app, &url).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["packageId"], built["package"]["id"]);
    assert_eq!(get(&app, &url).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(dir.path().join("packages")).unwrap().count(), 0);
}

#[tokio::test]
async fn package_outlives_its_project() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path());
    let id = create_project(&app, SAMPLE_ENTRIES).await;
    let built = build(&app, &id).await;

    let response = delete(&app, &format!("/api/projects/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let download = get(&app, built["downloadUrl"].as_str().unwrap()).await;
    assert_eq!(download.status(), StatusCode::OK);
}
