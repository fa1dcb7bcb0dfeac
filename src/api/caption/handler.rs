// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Caption endpoint handler

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{debug, warn};

use super::response::CaptionResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::vision::image_utils::decode_image_bytes;

/// POST /caption - Generate a caption for an uploaded image
///
/// Accepts a multipart form with a binary `image` field and returns the
/// generated caption as JSON. The model is loaded lazily on first use;
/// field validation and image decoding run before the load so malformed
/// requests never trigger it.
pub async fn caption_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CaptionResponse>, ApiError> {
    // Walk the form for the image field
    let mut image_bytes: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    {
        if field.name() == Some("image") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
            image_bytes = Some(bytes);
            break;
        }
    }

    let bytes = image_bytes.ok_or(ApiError::MissingImage)?;

    // Decode and normalize; corrupt bytes surface as a server error
    let (image, info) = decode_image_bytes(&bytes).map_err(|e| {
        warn!("Image decode failed: {}", e);
        ApiError::InternalError(e.to_string())
    })?;
    debug!(
        "Decoded {}x{} {:?} image ({} bytes)",
        info.width, info.height, info.format, info.size_bytes
    );

    let model = state
        .captioner
        .ensure_loaded()
        .await
        .map_err(|e| ApiError::InternalError(format!("model load failed: {:#}", e)))?;

    // ort sessions are CPU-bound; keep them off the async workers
    let caption = tokio::task::spawn_blocking(move || model.caption(&image))
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .map_err(|e| ApiError::InternalError(format!("caption generation failed: {:#}", e)))?;

    Ok(Json(CaptionResponse { caption }))
}
