// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lazy loader for the BLIP captioning model
//!
//! The model handle is process-wide state created once on first use.
//! Concurrent first requests await a single in-flight load instead of
//! each loading the model redundantly.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::vision::blip::BlipModel;
use crate::vision::hub::{resolve_model_files, HUB_REPO};

/// Configuration for loading the captioning model
#[derive(Debug, Clone)]
pub struct CaptionModelConfig {
    /// Local model directory, used when it exists; otherwise the hub
    /// repository is fetched
    pub model_dir: Option<String>,
    /// Hugging Face hub repository id
    pub hub_repo: String,
}

impl Default for CaptionModelConfig {
    fn default() -> Self {
        Self {
            model_dir: Some("./models/blip-captioning-onnx".to_string()),
            hub_repo: HUB_REPO.to_string(),
        }
    }
}

/// Manager for the captioning model
///
/// Holds the model handle behind a one-time async initialization
/// barrier. A failed load leaves the cell empty so the next call
/// retries.
pub struct CaptionModelManager {
    config: CaptionModelConfig,
    model: OnceCell<Arc<BlipModel>>,
}

impl CaptionModelManager {
    /// Create a new manager; no model is loaded yet
    pub fn new(config: CaptionModelConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Idempotently load the model, returning the shared handle
    ///
    /// The first call resolves the artifacts (downloading from the hub
    /// if needed) and builds the ONNX sessions on a blocking thread;
    /// subsequent calls return the cached handle immediately.
    pub async fn ensure_loaded(&self) -> Result<Arc<BlipModel>> {
        self.model
            .get_or_try_init(|| async {
                info!("Loading image captioning model...");

                let config = self.config.clone();
                let model = tokio::task::spawn_blocking(move || -> Result<BlipModel> {
                    let files = resolve_model_files(
                        config.model_dir.as_deref().map(std::path::Path::new),
                        &config.hub_repo,
                    )?;
                    BlipModel::load(&files)
                })
                .await??;

                info!("Captioning model loaded.");
                Ok(Arc::new(model))
            })
            .await
            .cloned()
    }

    /// Whether the model handle has been created
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

impl std::fmt::Debug for CaptionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionModelManager")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
