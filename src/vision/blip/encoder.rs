// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP vision encoder model
//!
//! Extracts visual features from a preprocessed image for the text decoder.

use anyhow::{Context, Result};
use ndarray::{Array2, Array4, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::BLIP_INPUT_SIZE;

/// Expected input size for the BLIP vision encoder
pub const ENCODER_INPUT_SIZE: u32 = BLIP_INPUT_SIZE; // 384x384

/// BLIP vision encoder model
///
/// Runs on CPU only.
#[derive(Clone)]
pub struct BlipVisionEncoder {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Embedding dimension
    embedding_dim: usize,
}

impl std::fmt::Debug for BlipVisionEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipVisionEncoder")
            .field("input_name", &self.input_name)
            .field("embedding_dim", &self.embedding_dim)
            .finish_non_exhaustive()
    }
}

impl BlipVisionEncoder {
    /// Load the BLIP vision encoder from an ONNX file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("BLIP vision encoder not found: {}", model_path.display());
        }

        info!("Loading BLIP vision encoder from {}", model_path.display());

        // CPU-only execution
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load BLIP vision encoder from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        debug!("BLIP vision encoder loaded - input: {}", input_name);

        // BLIP-base hidden size
        let embedding_dim = 768;

        info!(
            "BLIP vision encoder ready (CPU-only, {}D hidden states)",
            embedding_dim
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            embedding_dim,
        })
    }

    /// Get the embedding dimension
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// Encode an image into visual features
    ///
    /// # Arguments
    /// - `input`: Preprocessed image tensor of shape [1, 3, 384, 384] (NCHW)
    ///
    /// # Returns
    /// - `Result<Array2<f32>>`: Image hidden states of shape [seq_len, embedding_dim]
    pub fn encode(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        let shape = input.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        if shape[2] != ENCODER_INPUT_SIZE as usize || shape[3] != ENCODER_INPUT_SIZE as usize {
            debug!(
                "Input size {}x{} differs from expected {}x{}",
                shape[2], shape[3], ENCODER_INPUT_SIZE, ENCODER_INPUT_SIZE
            );
        }

        let mut session = self.session.lock().unwrap();

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Encoder inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Encoder output shape: {:?}", output_tensor.shape());

        Self::parse_encoder_output(&output_tensor)
    }

    /// Parse encoder output into 2D hidden states [seq_len, embedding_dim]
    fn parse_encoder_output(
        output: &ndarray::ArrayBase<ndarray::ViewRepr<&f32>, ndarray::Dim<ndarray::IxDynImpl>>,
    ) -> Result<Array2<f32>> {
        let shape = output.shape();

        // Expected shapes:
        // - [batch, seq_len, embedding_dim] -> extract [seq_len, embedding_dim]
        // - [seq_len, embedding_dim] -> use directly
        let (seq_len, embed_dim) = match shape.len() {
            3 => (shape[1], shape[2]),
            2 => (shape[0], shape[1]),
            _ => anyhow::bail!("Unexpected encoder output shape: {:?}", shape),
        };

        let mut hidden_states = Array2::<f32>::zeros((seq_len, embed_dim));

        for s in 0..seq_len {
            for e in 0..embed_dim {
                let value = match shape.len() {
                    3 => output[IxDyn(&[0, s, e])],
                    _ => output[IxDyn(&[s, e])],
                };
                hidden_states[[s, e]] = value;
            }
        }

        debug!(
            "Parsed encoder output: {} positions x {} dimensions",
            seq_len, embed_dim
        );

        Ok(hidden_states)
    }
}
