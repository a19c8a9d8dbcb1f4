//! E2E tests for image uploads

mod common;

use common::TestServer;
use reqwest::multipart::{Form, Part};

fn png_part(name: &str) -> Part {
    Part::bytes(b"\x89PNG\r\n\x1a\nfake-image-data".to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .expect("valid mime type")
}

#[tokio::test]
async fn test_upload_requires_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/api/upload"))
        .multipart(Form::new().part("file", png_part("logo.png")))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_upload_stores_and_serves_publicly() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .post(server.url("/api/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().part("file", png_part("logo.png")))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["ok"], true);
    let url = body["url"].as_str().expect("public url");
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with("-logo.png"));

    // The stored file is publicly reachable without a session.
    let response = server
        .client
        .get(server.url(url))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 200);
    let served = response.bytes().await.expect("file body");
    assert!(served.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .post(server.url("/api/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "missing file");
}

#[tokio::test]
async fn test_upload_rejects_non_image_types() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let part = Part::bytes(b"#!/bin/sh\necho hi".to_vec())
        .file_name("script.sh".to_string())
        .mime_str("application/x-sh")
        .expect("valid mime type");

    let response = server
        .client
        .post(server.url("/api/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().part("file", part))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_upload_sanitizes_hostile_filenames() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let response = server
        .client
        .post(server.url("/api/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().part("file", png_part("../../../evil file!.png")))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    let url = body["url"].as_str().expect("public url");
    assert!(!url.contains(".."));
    assert!(url.ends_with("-evil_file_.png"));
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_with_413() {
    let server = TestServer::new().await;
    let cookie = server.login().await;

    let oversized = Part::bytes(vec![0_u8; 8 * 1024 * 1024 + 1])
        .file_name("huge.png".to_string())
        .mime_str("image/png")
        .expect("valid mime type");

    let response = server
        .client
        .post(server.url("/api/upload"))
        .header("Cookie", &cookie)
        .multipart(Form::new().part("file", oversized))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 413);
}
