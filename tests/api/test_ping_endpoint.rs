// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Liveness probe tests for GET /ping
//!
//! The probe must return the fixed success body regardless of model
//! load state.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use caption_node::{build_router, AppState, CaptionModelConfig};
use http_body_util::BodyExt;
use tower::ServiceExt;

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

#[tokio::test]
async fn test_ping_returns_200() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ping_fixed_body() {
    let (state, _dir) = state_without_model();
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"status": "ok", "message": "Server is running"})
    );
}

#[tokio::test]
async fn test_ping_works_without_model() {
    // The probe has no model dependency at all; state here can never
    // load one
    let (state, _dir) = state_without_model();
    assert!(!state.captioner.is_loaded());

    let app = build_router(state);
    let response = app
        .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
