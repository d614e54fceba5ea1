//! Task model, query parameters, and request types for the task API.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

use super::tag::validate_tag_name;
use crate::errors::AppError;
use crate::models::Tag;

/// A unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Position in the manual (drag-and-drop) ordering. Only relative order
    /// matters; values need not be contiguous.
    pub order_index: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Field the task list can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    OrderIndex,
}

impl SortBy {
    /// Column name used in ORDER BY clauses.
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::CreatedAt => "created_at",
            SortBy::DueDate => "due_date",
            SortBy::Priority => "priority",
            SortBy::OrderIndex => "order_index",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Query parameters for GET /tasks.
///
/// Hashable so the client cache can key fetched pages by the exact query
/// that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            q: None,
            completed: None,
            priority: None,
            tag: None,
            sort_by: SortBy::default(),
            order: SortOrder::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl TaskQuery {
    /// Check range constraints before any store access.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if let Some(priority) = self.priority {
            if !(1..=3).contains(&priority) {
                issues.push("priority must be between 1 and 3".to_string());
            }
        }
        if self.page < 1 {
            issues.push("page must be at least 1".to_string());
        }
        if self.page_size < 1 || self.page_size > 100 {
            issues.push("pageSize must be between 1 and 100".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_issues(issues))
        }
    }
}

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn compute(page: u32, page_size: u32, total: u64) -> Self {
        let total_pages = total.div_ceil(page_size as u64) as u32;
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Request body for creating a new task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_priority() -> i64 {
    2
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if self.title.trim().is_empty() {
            issues.push("Title is required".to_string());
        }
        if self.title.chars().count() > 500 {
            issues.push("Title exceeds 500 characters".to_string());
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 2000 {
                issues.push("Description exceeds 2000 characters".to_string());
            }
        }
        if !(1..=3).contains(&self.priority) {
            issues.push("priority must be between 1 and 3".to_string());
        }
        if let Some(due) = &self.due_date {
            if DateTime::parse_from_rfc3339(due).is_err() {
                issues.push("dueDate must be an RFC 3339 datetime".to_string());
            }
        }
        for name in &self.tags {
            validate_tag_name(name, &mut issues);
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_issues(issues))
        }
    }
}

/// Request body for partially updating a task.
///
/// `description` and `dueDate` distinguish "field not present" (outer None,
/// leave unchanged) from "explicitly set to null" (Some(None), clear).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
    /// When supplied, fully replaces the task's tag associations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// An absent key keeps the outer None via `default`; an explicit JSON null
/// deserializes to Some(None).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                issues.push("Title must not be empty".to_string());
            }
            if title.chars().count() > 500 {
                issues.push("Title exceeds 500 characters".to_string());
            }
        }
        if let Some(Some(description)) = &self.description {
            if description.chars().count() > 2000 {
                issues.push("Description exceeds 2000 characters".to_string());
            }
        }
        if let Some(priority) = self.priority {
            if !(1..=3).contains(&priority) {
                issues.push("priority must be between 1 and 3".to_string());
            }
        }
        if let Some(Some(due)) = &self.due_date {
            if DateTime::parse_from_rfc3339(due).is_err() {
                issues.push("dueDate must be an RFC 3339 datetime".to_string());
            }
        }
        if let Some(tags) = &self.tags {
            for name in tags {
                validate_tag_name(name, &mut issues);
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_issues(issues))
        }
    }
}

/// One entry in a reorder batch: a task and its new manual position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItem {
    pub id: String,
    pub order_index: i64,
}

/// Raw bulk request body as received on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionRequest {
    pub action: BulkActionKind,
    pub ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkActionKind {
    Complete,
    Incomplete,
    SetPriority,
    SetTags,
    Delete,
}

/// A bulk mutation with its payload structurally guaranteed present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    Complete(Vec<String>),
    Incomplete(Vec<String>),
    SetPriority { ids: Vec<String>, priority: i64 },
    SetTags { ids: Vec<String>, tags: Vec<String> },
    Delete(Vec<String>),
}

impl BulkActionRequest {
    /// Lift the wire shape into a checked action. Missing variant payloads
    /// are a validation error before any store access.
    pub fn parse(self) -> Result<BulkAction, AppError> {
        if self.ids.is_empty() {
            return Err(AppError::validation("At least one task ID is required"));
        }
        match self.action {
            BulkActionKind::Complete => Ok(BulkAction::Complete(self.ids)),
            BulkActionKind::Incomplete => Ok(BulkAction::Incomplete(self.ids)),
            BulkActionKind::SetPriority => {
                let priority = self.priority.ok_or_else(|| {
                    AppError::validation("Priority is required for setPriority action")
                })?;
                if !(1..=3).contains(&priority) {
                    return Err(AppError::validation("priority must be between 1 and 3"));
                }
                Ok(BulkAction::SetPriority {
                    ids: self.ids,
                    priority,
                })
            }
            BulkActionKind::SetTags => {
                let tags = self
                    .tags
                    .ok_or_else(|| AppError::validation("Tags are required for setTags action"))?;
                let mut issues = Vec::new();
                for name in &tags {
                    validate_tag_name(name, &mut issues);
                }
                if !issues.is_empty() {
                    return Err(AppError::validation_issues(issues));
                }
                Ok(BulkAction::SetTags {
                    ids: self.ids,
                    tags,
                })
            }
            BulkActionKind::Delete => Ok(BulkAction::Delete(self.ids)),
        }
    }
}

/// Outcome of a bulk action or clear-completed call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<u64>,
}

impl BulkActionResult {
    pub fn updated(count: u64) -> Self {
        Self {
            success: true,
            updated_count: Some(count),
            deleted_count: None,
        }
    }

    pub fn deleted(count: u64) -> Self {
        Self {
            success: true,
            updated_count: None,
            deleted_count: Some(count),
        }
    }
}
