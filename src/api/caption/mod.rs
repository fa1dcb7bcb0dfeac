// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption API endpoint module
//!
//! Provides POST /caption for generating image captions.

pub mod handler;
pub mod response;

pub use handler::caption_handler;
pub use response::CaptionResponse;
