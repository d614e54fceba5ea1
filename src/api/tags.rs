//! Tag API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{created, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTagRequest, Tag, UpdateTagRequest};
use crate::AppState;

/// GET /api/v1/tags - List all tags with task counts.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<Tag>> {
    let tags = state.repo.list_tags().await?;
    success(tags)
}

/// GET /api/v1/tags/{id} - Get a single tag.
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Tag> {
    let tag = state
        .repo
        .get_tag(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;
    success(tag)
}

/// POST /api/v1/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> ApiResult<Tag> {
    request.validate()?;
    let tag = state.repo.create_tag(&request).await?;
    created(tag)
}

/// PATCH /api/v1/tags/{id} - Update a tag.
pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTagRequest>,
) -> ApiResult<Tag> {
    request.validate()?;
    let tag = state.repo.update_tag(&id, &request).await?;
    success(tag)
}

/// DELETE /api/v1/tags/{id} - Delete a tag. Associated tasks are kept.
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_tag(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
