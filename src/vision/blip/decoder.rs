// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP text decoder model
//!
//! Generates the caption token sequence from the vision encoder's
//! hidden states.

use anyhow::{Context, Result};
use ndarray::{Array2, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Default maximum tokens to generate for a caption
pub const DEFAULT_MAX_TOKENS: usize = 50;

/// Fallback decoder BOS token id ("[DEC]" in the BLIP vocabulary)
const FALLBACK_BOS_TOKEN_ID: u32 = 30522;

/// Fallback EOS token id ("[SEP]" in the BERT vocabulary)
const FALLBACK_EOS_TOKEN_ID: u32 = 102;

/// BLIP text decoder model
///
/// Cross-attends over image hidden states and generates caption tokens
/// autoregressively with greedy decoding. Runs on CPU only.
#[derive(Clone)]
pub struct BlipTextDecoder {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Tokenizer for caption decoding
    tokenizer: Arc<Tokenizer>,
    /// Maximum tokens to generate
    max_tokens: usize,
    /// Vocabulary size
    vocab_size: usize,
    /// Special token IDs
    bos_token_id: u32,
    eos_token_id: u32,
}

impl std::fmt::Debug for BlipTextDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlipTextDecoder")
            .field("max_tokens", &self.max_tokens)
            .field("vocab_size", &self.vocab_size)
            .field("bos_token_id", &self.bos_token_id)
            .field("eos_token_id", &self.eos_token_id)
            .finish_non_exhaustive()
    }
}

impl BlipTextDecoder {
    /// Load the BLIP text decoder from files
    ///
    /// # Arguments
    /// - `model_path`: Path to the decoder ONNX file
    /// - `tokenizer_path`: Path to the tokenizer file (tokenizer.json)
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - Tokenizer file not found
    /// - ONNX Runtime initialization fails
    pub fn new<P: AsRef<Path>>(model_path: P, tokenizer_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("BLIP text decoder not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("BLIP tokenizer not found: {}", tokenizer_path.display());
        }

        info!("Loading BLIP text decoder from {}", model_path.display());

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vocab_size = tokenizer.get_vocab_size(true);
        info!("Loaded tokenizer with {} tokens", vocab_size);

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
                "Failed to load BLIP text decoder from {}",
                model_path.display()
            ))?;

        let input_names: Vec<_> = session.inputs.iter().map(|i| &i.name).collect();
        debug!("Decoder inputs: {:?}", input_names);

        // BLIP generation starts from its dedicated [DEC] token and
        // stops at [SEP]
        let bos_token_id = tokenizer
            .token_to_id("[DEC]")
            .or_else(|| tokenizer.token_to_id("[CLS]"))
            .unwrap_or(FALLBACK_BOS_TOKEN_ID);
        let eos_token_id = tokenizer
            .token_to_id("[SEP]")
            .unwrap_or(FALLBACK_EOS_TOKEN_ID);

        debug!(
            "Special tokens - BOS: {}, EOS: {}",
            bos_token_id, eos_token_id
        );

        info!("BLIP text decoder ready (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            max_tokens: DEFAULT_MAX_TOKENS,
            vocab_size,
            bos_token_id,
            eos_token_id,
        })
    }

    /// Get the vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Get the maximum tokens setting
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Generate caption text from image hidden states
    ///
    /// # Arguments
    /// - `image_hidden_states`: Visual features from the encoder [seq_len, embed_dim]
    ///
    /// # Process
    /// 1. Start from the decoder BOS token
    /// 2. Run the autoregressive greedy loop
    /// 3. Stop at EOS token or max tokens
    /// 4. Decode tokens to text, stripping special tokens
    pub fn generate(&self, image_hidden_states: &Array2<f32>) -> Result<String> {
        let mut tokens = vec![self.bos_token_id];

        debug!(
            "Starting generation with BOS={}, EOS={}",
            self.bos_token_id, self.eos_token_id
        );

        for step in 0..self.max_tokens {
            let logits = self.forward(image_hidden_states, &tokens)?;
            let next_token = self.argmax(&logits)?;

            if next_token == self.eos_token_id {
                debug!("Generation stopped at EOS after {} steps", step + 1);
                break;
            }

            tokens.push(next_token);
        }

        // Drop the BOS token before detokenizing; skip_special_tokens
        // strips any remaining control tokens
        let caption_tokens = &tokens[1..];
        let output_text = self
            .tokenizer
            .decode(caption_tokens, true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;

        let caption = output_text.trim().to_string();
        debug!("Generated {} tokens: '{}'", tokens.len(), caption);

        Ok(caption)
    }

    /// Run a single forward pass through the decoder
    fn forward(&self, encoder_hidden_states: &Array2<f32>, input_ids: &[u32]) -> Result<Vec<f32>> {
        let mut session = self.session.lock().unwrap();

        // Encoder hidden states [1, seq_len, embed_dim]
        let (seq_len, embed_dim) = (encoder_hidden_states.nrows(), encoder_hidden_states.ncols());
        let mut encoder_input = ndarray::Array3::<f32>::zeros((1, seq_len, embed_dim));
        for s in 0..seq_len {
            for e in 0..embed_dim {
                encoder_input[[0, s, e]] = encoder_hidden_states[[s, e]];
            }
        }

        // All image positions are valid
        let encoder_attention_mask = ndarray::Array2::<i64>::ones((1, seq_len));

        // Token IDs generated so far [1, token_len]
        let token_len = input_ids.len();
        let mut input_ids_array = ndarray::Array2::<i64>::zeros((1, token_len));
        for (i, &token) in input_ids.iter().enumerate() {
            input_ids_array[[0, i]] = token as i64;
        }
        let attention_mask = ndarray::Array2::<i64>::ones((1, token_len));

        let input_ids_value =
            Value::from_array(input_ids_array).context("Failed to create input_ids tensor")?;
        let attention_mask_value =
            Value::from_array(attention_mask).context("Failed to create attention_mask tensor")?;
        let encoder_value = Value::from_array(encoder_input)
            .context("Failed to create encoder hidden states tensor")?;
        let encoder_mask_value = Value::from_array(encoder_attention_mask)
            .context("Failed to create encoder attention mask tensor")?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value,
                "encoder_hidden_states" => encoder_value,
                "encoder_attention_mask" => encoder_mask_value
            ])
            .context("Decoder inference failed")?;

        // Logits for the last token position [vocab_size]
        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let output_shape = output_tensor.shape();

        let last_pos = if output_shape.len() >= 2 {
            output_shape[output_shape.len() - 2] - 1
        } else {
            0
        };

        let vocab_size = match output_shape.len() {
            3 => output_shape[2],
            2 => output_shape[1],
            _ => self.vocab_size,
        };

        let mut logits = vec![0.0f32; vocab_size];

        for v in 0..vocab_size {
            logits[v] = match output_shape.len() {
                3 => output_tensor[IxDyn(&[0, last_pos, v])],
                2 => output_tensor[IxDyn(&[last_pos, v])],
                _ => 0.0,
            };
        }

        Ok(logits)
    }

    /// Find the index of the maximum value (greedy decoding)
    ///
    /// The BOS token is masked out since it must never be emitted mid-sequence.
    fn argmax(&self, logits: &[f32]) -> Result<u32> {
        let (max_idx, _) = logits
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx as u32 != self.bos_token_id)
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| anyhow::anyhow!("Empty logits vector after filtering"))?;

        Ok(max_idx as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_tokens() {
        assert_eq!(DEFAULT_MAX_TOKENS, 50);
    }

    #[test]
    fn test_fallback_token_ids() {
        // BERT-style vocabulary with the appended [DEC] token
        assert_eq!(FALLBACK_BOS_TOKEN_ID, 30522);
        assert_eq!(FALLBACK_EOS_TOKEN_ID, 102);
    }

    #[test]
    fn test_model_not_found_error() {
        let result = BlipTextDecoder::new(
            "/nonexistent/path/text_decoder.onnx",
            "/nonexistent/path/tokenizer.json",
        );
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_argmax_simple() {
        let logits = vec![0.1, 0.5, 0.3, 0.9, 0.2];
        let (max_idx, _) = logits
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        assert_eq!(max_idx, 3);
    }

    #[test]
    fn test_argmax_negative() {
        let logits = vec![-0.5, -0.1, -0.3];
        let (max_idx, _) = logits
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        assert_eq!(max_idx, 1);
    }
}
