//! Tag model for categorizing tasks.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Display color assigned to tags created implicitly during task writes.
pub const DEFAULT_TAG_COLOR: &str = "slate";

/// A named label attached to tasks through a many-to-many join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: String,
    /// Number of tasks currently associated. Computed on list/get, absent
    /// when the tag is embedded in a task response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_count: Option<i64>,
}

/// Request body for creating a new tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CreateTagRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        validate_tag_name(&self.name, &mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_issues(issues))
        }
    }
}

/// Request body for updating an existing tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl UpdateTagRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut issues = Vec::new();
        if let Some(name) = &self.name {
            validate_tag_name(name, &mut issues);
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_issues(issues))
        }
    }
}

/// Shared name constraint: non-empty, at most 50 characters.
pub(crate) fn validate_tag_name(name: &str, issues: &mut Vec<String>) {
    if name.trim().is_empty() {
        issues.push("Tag name must not be empty".to_string());
    }
    if name.chars().count() > 50 {
        issues.push(format!("Tag name '{}' exceeds 50 characters", name));
    }
}
