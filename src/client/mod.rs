//! Client core: HTTP API client, query cache, reorder planner, and UI
//! session state. Frontends drive these; nothing here touches the database.

mod cache;
mod reorder;
mod session;

pub use cache::{CacheSnapshot, FetchTicket, QueryCache, TaskPage};
pub use reorder::{plan_reorder, submit_reorder};
pub use session::{
    view_retains, FileSessionStore, FilterState, SessionStore, UiSession, ViewMode,
};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::api::ClearCompletedResponse;
use crate::errors::ErrorResponse;
use crate::models::{
    BulkActionRequest, BulkActionResult, CreateTagRequest, CreateTaskRequest, Pagination,
    ReorderItem, Tag, Task, TaskQuery, UpdateTagRequest, UpdateTaskRequest,
};

/// Errors surfaced to client callers.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("session store: {0}")]
    Store(#[from] std::io::Error),
    #[error("session encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// The server's success envelope, as seen from the client side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataEnvelope<T> {
    data: T,
    #[serde(default)]
    meta: Option<EnvelopeMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeMeta {
    pagination: Pagination,
}

/// HTTP client for the task API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Fetch one page of tasks for a query.
    pub async fn fetch_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ClientError> {
        let response = self
            .http
            .get(self.url("/tasks"))
            .query(query)
            .send()
            .await?;
        let envelope: DataEnvelope<Vec<Task>> = decode(response).await?;
        let pagination = envelope
            .meta
            .map(|m| m.pagination)
            .ok_or_else(|| ClientError::Protocol("task list missing pagination".to_string()))?;
        Ok(TaskPage {
            tasks: envelope.data,
            pagination,
        })
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        Ok(decode::<Task>(response).await?.data)
    }

    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ClientError> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(request)
            .send()
            .await?;
        Ok(decode::<Task>(response).await?.data)
    }

    pub async fn update_task(
        &self,
        id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/tasks/{}", id)))
            .json(request)
            .send()
            .await?;
        Ok(decode::<Task>(response).await?.data)
    }

    pub async fn toggle_task(&self, id: &str) -> Result<Task, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/tasks/{}/toggle", id)))
            .send()
            .await?;
        Ok(decode::<Task>(response).await?.data)
    }

    /// Delete a task. The server replies 204 with no body.
    pub async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/tasks/{}", id)))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(api_error(response).await)
    }

    /// Persist a new manual ordering. All-or-nothing on the server side.
    pub async fn reorder_tasks(&self, items: &[ReorderItem]) -> Result<(), ClientError> {
        let response = self
            .http
            .patch(self.url("/tasks/reorder"))
            .json(items)
            .send()
            .await?;
        decode::<serde_json::Value>(response).await?;
        Ok(())
    }

    pub async fn bulk_action(
        &self,
        request: &BulkActionRequest,
    ) -> Result<BulkActionResult, ClientError> {
        let response = self
            .http
            .post(self.url("/tasks/bulk"))
            .json(request)
            .send()
            .await?;
        Ok(decode::<BulkActionResult>(response).await?.data)
    }

    pub async fn clear_completed(&self) -> Result<u64, ClientError> {
        let response = self
            .http
            .delete(self.url("/tasks/completed"))
            .send()
            .await?;
        Ok(decode::<ClearCompletedResponse>(response).await?.data.deleted_count)
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ClientError> {
        let response = self.http.get(self.url("/tags")).send().await?;
        Ok(decode::<Vec<Tag>>(response).await?.data)
    }

    pub async fn get_tag(&self, id: &str) -> Result<Tag, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/tags/{}", id)))
            .send()
            .await?;
        Ok(decode::<Tag>(response).await?.data)
    }

    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, ClientError> {
        let response = self
            .http
            .post(self.url("/tags"))
            .json(request)
            .send()
            .await?;
        Ok(decode::<Tag>(response).await?.data)
    }

    pub async fn update_tag(
        &self,
        id: &str,
        request: &UpdateTagRequest,
    ) -> Result<Tag, ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/tags/{}", id)))
            .json(request)
            .send()
            .await?;
        Ok(decode::<Tag>(response).await?.data)
    }

    /// Delete a tag. The server replies 204 with no body.
    pub async fn delete_tag(&self, id: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/tags/{}", id)))
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(api_error(response).await)
    }
}

/// Parse a response, turning the server's error envelope into
/// [`ClientError::Api`].
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<DataEnvelope<T>, ClientError> {
    if response.status().is_success() {
        return Ok(response.json::<DataEnvelope<T>>().await?);
    }
    Err(api_error(response).await)
}

/// Read a non-success response's error envelope.
async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (err.error, err.message),
        Err(_) => ("UNKNOWN".to_string(), body),
    };
    ClientError::Api {
        status,
        code,
        message,
    }
}
