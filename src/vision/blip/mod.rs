// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! BLIP image captioning pipeline
//!
//! Vision encoder + text decoder, both as CPU-only ONNX sessions.

pub mod decoder;
pub mod encoder;
pub mod model;
pub mod preprocessing;

pub use decoder::BlipTextDecoder;
pub use encoder::BlipVisionEncoder;
pub use model::BlipModel;
pub use preprocessing::{preprocess_for_blip, BLIP_INPUT_SIZE};
