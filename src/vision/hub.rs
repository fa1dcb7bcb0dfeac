// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model artifact resolution
//!
//! Locates the BLIP ONNX files and tokenizer either in a local model
//! directory or in the Hugging Face hub cache, downloading on first use.

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fixed captioning model repository on the Hugging Face hub
pub const HUB_REPO: &str = "Xenova/blip-image-captioning-base";

/// Candidate file names for the vision encoder (exports vary)
const VISION_ENCODER_CANDIDATES: &[&str] = &[
    "onnx/vision_model.onnx",
    "onnx/encoder_model.onnx",
    "onnx/vision_encoder.onnx",
];

/// Candidate file names for the text decoder
const TEXT_DECODER_CANDIDATES: &[&str] = &[
    "onnx/text_decoder_model.onnx",
    "onnx/decoder_model.onnx",
    "onnx/decoder_model_merged.onnx",
    "onnx/text_decoder_model_merged.onnx",
];

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Resolved paths for the BLIP pipeline artifacts
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Vision encoder ONNX file
    pub vision_encoder: PathBuf,
    /// Text decoder ONNX file
    pub text_decoder: PathBuf,
    /// Tokenizer config (tokenizer.json)
    pub tokenizer: PathBuf,
}

/// Resolve the BLIP model artifacts
///
/// If `model_dir` points at an existing directory, the files must be
/// present there. Otherwise the fixed hub repository is fetched into the
/// Hugging Face cache (downloading only on first use).
///
/// Blocking: performs filesystem probes and possibly network downloads;
/// call from `spawn_blocking`.
pub fn resolve_model_files(model_dir: Option<&Path>, repo_id: &str) -> Result<ModelFiles> {
    if let Some(dir) = model_dir {
        if dir.exists() {
            info!("Loading captioning model files from {}", dir.display());
            return resolve_local(dir);
        }
    }

    fetch_from_hub(repo_id)
}

/// Locate artifacts in a local model directory
fn resolve_local(dir: &Path) -> Result<ModelFiles> {
    let vision_encoder = find_model_file(dir, VISION_ENCODER_CANDIDATES)?;
    let text_decoder = find_model_file(dir, TEXT_DECODER_CANDIDATES)?;
    let tokenizer = find_model_file(dir, &[TOKENIZER_FILE])?;

    Ok(ModelFiles {
        vision_encoder,
        text_decoder,
        tokenizer,
    })
}

/// Find a model file by trying multiple possible names
///
/// Each candidate is probed both as given and by its bare file name, so
/// a flat local directory works as well as a hub-shaped one.
fn find_model_file(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    for name in names {
        let path = dir.join(name);
        if path.exists() {
            return Ok(path);
        }
        if let Some(file_name) = Path::new(name).file_name() {
            let flat = dir.join(file_name);
            if flat.exists() {
                return Ok(flat);
            }
        }
    }
    anyhow::bail!("Model file not found in {}. Tried: {:?}", dir.display(), names);
}

/// Fetch artifacts from the Hugging Face hub cache
fn fetch_from_hub(repo_id: &str) -> Result<ModelFiles> {
    info!("Fetching captioning model '{}' from the hub", repo_id);

    let api = Api::new().context("Failed to initialize hub API")?;
    let repo = api.model(repo_id.to_string());

    let vision_encoder = fetch_first(&repo, VISION_ENCODER_CANDIDATES)
        .with_context(|| format!("No vision encoder found in '{}'", repo_id))?;
    let text_decoder = fetch_first(&repo, TEXT_DECODER_CANDIDATES)
        .with_context(|| format!("No text decoder found in '{}'", repo_id))?;
    let tokenizer = repo
        .get(TOKENIZER_FILE)
        .with_context(|| format!("No tokenizer found in '{}'", repo_id))?;

    Ok(ModelFiles {
        vision_encoder,
        text_decoder,
        tokenizer,
    })
}

/// Download the first candidate file the repository actually has
fn fetch_first(repo: &hf_hub::api::sync::ApiRepo, names: &[&str]) -> Result<PathBuf> {
    let mut last_err = None;
    for name in names {
        match repo.get(name) {
            Ok(path) => return Ok(path),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(e).context(format!("Tried: {:?}", names)),
        None => anyhow::bail!("No candidate file names given"),
    }
}
