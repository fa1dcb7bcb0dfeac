// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Caption endpoint tests for POST /caption
//!
//! These verify that the caption handler correctly:
//! - Rejects requests without an `image` multipart field (400, fixed body)
//! - Surfaces malformed image bytes as a server error, not a crash
//! - Produces a caption for a valid image when model files are present

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use caption_node::{build_router, AppState, CaptionModelConfig};
use http_body_util::BodyExt;
use image::{ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use tower::ServiceExt;

const BOUNDARY: &str = "test-boundary-7a91";

/// State whose model directory exists but holds no artifacts, so no
/// load can succeed and nothing touches the network
fn state_without_model() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(CaptionModelConfig {
        model_dir: Some(dir.path().to_string_lossy().to_string()),
        hub_repo: "Xenova/blip-image-captioning-base".to_string(),
    });
    (state, dir)
}

/// Build a multipart/form-data body with a single binary field
fn multipart_body(field_name: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field_name, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(field_name: &str, bytes: &[u8]) -> Request<Body> {
    Request::post("/caption")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field_name, "upload.bin", bytes)))
        .unwrap()
}

/// A small valid PNG built in memory
fn test_png_bytes() -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(100, 100, |x, y| Rgb([x as u8, y as u8, 128u8]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

#[tokio::test]
async fn test_missing_image_field_returns_400() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    // Multipart body with a wrongly named field
    let response = app
        .oneshot(multipart_request("file", &test_png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"error": "No image file"}));
}

#[tokio::test]
async fn test_empty_multipart_returns_400() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    let body = format!("--{}--\r\n", BOUNDARY);
    let request = Request::post("/caption")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"error": "No image file"}));
}

#[tokio::test]
async fn test_malformed_image_bytes_returns_server_error() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    let response = app
        .oneshot(multipart_request("image", b"this is not an image"))
        .await
        .unwrap();

    // Decode failure is a server error; the process keeps serving
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_truncated_image_bytes_returns_server_error() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    // Valid PNG magic bytes, corrupt remainder
    let response = app
        .oneshot(multipart_request(
            "image",
            &[0x89, 0x50, 0x4E, 0x47, 0x00, 0x00, 0x00, 0x00],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_server_survives_bad_request() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(multipart_request("image", b"garbage"))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::OK);

    // A follow-up probe on the same router still answers
    let ping = app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ping.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_happy_path_returns_caption() {
    let state = AppState::new(CaptionModelConfig::default());
    let app = build_router(state);

    let response = app
        .oneshot(multipart_request("image", &test_png_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let caption = json["caption"].as_str().unwrap();
    assert!(!caption.is_empty());
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_second_request_reuses_loaded_model() {
    let state = AppState::new(CaptionModelConfig::default());
    let app = build_router(state.clone());

    let first = app
        .clone()
        .oneshot(multipart_request("image", &test_png_bytes()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert!(state.captioner.is_loaded());

    let second = app
        .oneshot(multipart_request("image", &test_png_bytes()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
}
