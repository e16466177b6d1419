//! Photography listing handler
//!
//! Author: hephaex@gmail.com

use crate::error::{AppError, ErrorResponse};
use crate::state::AppState;
use axum::{extract::State, Json};
use folio_parser::{scan_photos, Photo};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Photography listing response
#[derive(Debug, Serialize, ToSchema)]
pub struct PhotoList {
    /// Photos in name order, metadata derived from each file name
    #[schema(value_type = Vec<Object>, example = json!([{
        "id": 1,
        "title": "Sunset Over Lake 2023 07 14",
        "category": "Landscape",
        "imageUrl": "/photography/sunset-over-lake_2023-07-14.jpg",
        "tags": ["sunset", "over", "lake", "2023"],
        "filename": "sunset-over-lake_2023-07-14.jpg",
        "date": "July 2023"
    }]))]
    pub photos: Vec<Photo>,
}

/// List gallery photos
#[utoipa::path(
    get,
    path = "/api/photography",
    tag = "photography",
    responses(
        (status = 200, description = "Photos found in the gallery directory", body = PhotoList),
        (status = 500, description = "Directory could not be read", body = ErrorResponse)
    )
)]
pub async fn list_photos(State(state): State<Arc<AppState>>) -> Result<Json<PhotoList>, AppError> {
    let dir = state.config.server.photography_dir.clone();
    let photos = tokio::task::spawn_blocking(move || scan_photos(&dir))
        .await
        .map_err(|e| AppError::PhotoScan(format!("scan task failed: {e}")))?
        .map_err(|e| AppError::PhotoScan(e.to_string()))?;

    tracing::debug!("Listed {} photos", photos.len());
    Ok(Json(PhotoList { photos }))
}
