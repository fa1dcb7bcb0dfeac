// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption response types

use serde::{Deserialize, Serialize};

/// Response from the caption endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionResponse {
    /// Generated caption text
    pub caption: String,
}
