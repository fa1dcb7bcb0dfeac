// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP model wrapper for image captioning
//!
//! This module provides the complete BLIP pipeline combining:
//! - Vision encoder (image feature extraction)
//! - Text decoder (caption generation)

use anyhow::{Context, Result};
use image::DynamicImage;
use std::time::Instant;
use tracing::{debug, info};

use super::decoder::BlipTextDecoder;
use super::encoder::BlipVisionEncoder;
use super::preprocessing::preprocess_for_blip;
use crate::vision::hub::ModelFiles;

/// BLIP model for image captioning
///
/// Combines the vision encoder and text decoder. Runs on CPU only.
#[derive(Clone)]
pub struct BlipModel {
    /// Vision encoder
    encoder: BlipVisionEncoder,
    /// Text decoder
    decoder: BlipTextDecoder,
}

impl std::fmt::Debug for BlipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipModel")
            .field("encoder", &self.encoder)
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl BlipModel {
    /// Build the BLIP pipeline from resolved model files
    ///
    /// # Errors
    /// Returns error if either ONNX session or the tokenizer fails to load.
    pub fn load(files: &ModelFiles) -> Result<Self> {
        let encoder = BlipVisionEncoder::new(&files.vision_encoder)
            .context("Failed to load BLIP vision encoder")?;

        let decoder = BlipTextDecoder::new(&files.text_decoder, &files.tokenizer)
            .context("Failed to load BLIP text decoder")?;

        info!("BLIP captioning pipeline ready (CPU-only)");

        Ok(Self { encoder, decoder })
    }

    /// Generate a caption for an image
    ///
    /// # Process
    /// 1. Preprocess image for the encoder (resize, normalize)
    /// 2. Extract visual features with the encoder
    /// 3. Generate caption tokens with the decoder
    /// 4. Return the decoded text
    pub fn caption(&self, image: &DynamicImage) -> Result<String> {
        let start = Instant::now();

        debug!(
            "Captioning image {}x{}",
            image.width(),
            image.height()
        );

        let preprocessed = preprocess_for_blip(image);

        let hidden_states = self
            .encoder
            .encode(&preprocessed)
            .context("Failed to encode image")?;
        debug!(
            "Encoded to {} positions x {} dimensions",
            hidden_states.nrows(),
            hidden_states.ncols()
        );

        let caption = self
            .decoder
            .generate(&hidden_states)
            .context("Failed to generate caption")?;

        info!(
            "Caption complete: {} chars, {}ms",
            caption.len(),
            start.elapsed().as_millis()
        );

        Ok(caption)
    }
}
