// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP API for the captioning node

pub mod caption;
pub mod errors;
pub mod server;

pub use caption::{caption_handler, CaptionResponse};
pub use errors::ApiError;
pub use server::{build_router, serve, ApiConfig, AppState, PingResponse};
