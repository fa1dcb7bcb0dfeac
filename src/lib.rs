// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod vision;

pub use api::{build_router, serve, ApiConfig, AppState};
pub use vision::{BlipModel, CaptionModelConfig, CaptionModelManager};
