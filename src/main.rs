// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use caption_node::{serve, ApiConfig, AppState, CaptionModelConfig};
use std::env;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // Parse environment variables for configuration
    let api_port = env::var("API_PORT").unwrap_or_else(|_| "3000".to_string());

    let mut model_config = CaptionModelConfig::default();
    if let Ok(dir) = env::var("MODEL_DIR") {
        model_config.model_dir = Some(dir);
    }

    let state = AppState::new(model_config);

    // Eager load attempt; the server starts either way and the caption
    // endpoint retries lazily
    if let Err(e) = state.captioner.ensure_loaded().await {
        warn!("Model load failed at startup, will retry on first request: {:#}", e);
    }

    let config = ApiConfig {
        listen_addr: format!("127.0.0.1:{}", api_port),
    };

    serve(&config, state).await
}
