//! REST API module.
//!
//! Contains all API routes and handlers following the client contract.

mod tags;
mod tasks;

pub use tags::*;
pub use tasks::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::Pagination;

/// Success response envelope. List endpoints attach pagination metadata;
/// everything else ships the payload bare under `data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
    #[serde(skip)]
    status: StatusCode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub pagination: Pagination,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a 200 response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        data,
        meta: None,
        status: StatusCode::OK,
    })
}

/// Create a 201 response for newly created resources.
pub fn created<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        data,
        meta: None,
        status: StatusCode::CREATED,
    })
}

/// Create a 200 response carrying pagination metadata.
pub fn paginated<T: Serialize>(data: T, pagination: Pagination) -> ApiResult<T> {
    Ok(ApiResponse {
        data,
        meta: Some(ResponseMeta { pagination }),
        status: StatusCode::OK,
    })
}
