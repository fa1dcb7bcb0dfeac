// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image captioning
//!
//! This module provides:
//! - Image decoding and format detection
//! - The BLIP captioning pipeline (ONNX encoder + decoder)
//! - Lazy model loading from a local directory or the Hugging Face hub
//!
//! Everything runs on CPU only.

pub mod blip;
pub mod hub;
pub mod image_utils;
pub mod model_manager;

pub use blip::BlipModel;
pub use hub::{resolve_model_files, ModelFiles, HUB_REPO};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo, MAX_IMAGE_SIZE};
pub use model_manager::{CaptionModelConfig, CaptionModelManager};
