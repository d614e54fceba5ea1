//! Task API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{created, paginated, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    BulkActionRequest, BulkActionResult, CreateTaskRequest, ReorderItem, Task, TaskQuery,
    UpdateTaskRequest,
};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCompletedResponse {
    pub success: bool,
    pub deleted_count: u64,
}

/// GET /api/v1/tasks - List tasks with filtering, sorting, and pagination.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Vec<Task>> {
    query.validate()?;
    let (tasks, pagination) = state.repo.list_tasks(&query).await?;
    paginated(tasks, pagination)
}

/// GET /api/v1/tasks/{id} - Get a single task.
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    let task = state
        .repo
        .get_task(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;
    success(task)
}

/// POST /api/v1/tasks - Create a task.
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    request.validate()?;
    let task = state.repo.create_task(&request).await?;
    created(task)
}

/// PATCH /api/v1/tasks/{id} - Partially update a task.
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    request.validate()?;
    let task = state.repo.update_task(&id, &request).await?;
    success(task)
}

/// PATCH /api/v1/tasks/{id}/toggle - Flip completion state.
pub async fn toggle_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    let task = state.repo.toggle_task(&id).await?;
    success(task)
}

/// DELETE /api/v1/tasks/{id} - Delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/tasks/reorder - Persist a client-computed ordering.
pub async fn reorder_tasks(
    State(state): State<AppState>,
    Json(items): Json<Vec<ReorderItem>>,
) -> ApiResult<serde_json::Value> {
    if items.is_empty() {
        return Err(AppError::validation("Task list must not be empty"));
    }
    state.repo.reorder_tasks(&items).await?;
    success(serde_json::json!({ "success": true }))
}

/// POST /api/v1/tasks/bulk - Apply one action to many tasks.
pub async fn bulk_action(
    State(state): State<AppState>,
    Json(request): Json<BulkActionRequest>,
) -> ApiResult<BulkActionResult> {
    let action = request.parse()?;
    let result = state.repo.bulk_action(&action).await?;
    success(result)
}

/// DELETE /api/v1/tasks/completed - Delete all completed tasks.
pub async fn clear_completed(State(state): State<AppState>) -> ApiResult<ClearCompletedResponse> {
    let deleted_count = state.repo.clear_completed().await?;
    success(ClearCompletedResponse {
        success: true,
        deleted_count,
    })
}
