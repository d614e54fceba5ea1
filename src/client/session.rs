//! UI session state: view mode, filters, selection, and a small persistence
//! layer so sessions survive restarts.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use super::ClientError;
use crate::models::{SortBy, SortOrder, Task, TaskQuery};

/// A named view over the task list. Today and Upcoming are date buckets the
/// server cannot filter on; the session narrows those server-side to
/// incomplete tasks and [`view_retains`] finishes the job client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    All,
    Today,
    Upcoming,
    Completed,
    HighPriority,
}

/// User-adjustable filters, on top of whatever the view mode imposes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
}

/// Everything a frontend needs to rebuild its task list view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSession {
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default = "default_session_page")]
    pub page: u32,
}

fn default_session_page() -> u32 {
    1
}

impl Default for UiSession {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::default(),
            filters: FilterState::default(),
            selected: Vec::new(),
            page: 1,
        }
    }
}

impl UiSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch views. Filters reset and paging rewinds; a stale page number
    /// from another view would land past the end of this one.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.filters = FilterState::default();
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Toggle a task in or out of the bulk-action selection.
    pub fn toggle_selection(&mut self, id: &str) {
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Build the server query for the current view and filters.
    pub fn task_query(&self) -> TaskQuery {
        let mut query = TaskQuery {
            q: self.filters.q.clone(),
            completed: None,
            priority: self.filters.priority,
            tag: self.filters.tag.clone(),
            sort_by: self.filters.sort_by,
            order: self.filters.order,
            page: self.page,
            ..TaskQuery::default()
        };

        match self.view_mode {
            ViewMode::All => {}
            ViewMode::Today | ViewMode::Upcoming => query.completed = Some(false),
            ViewMode::Completed => query.completed = Some(true),
            ViewMode::HighPriority => {
                query.completed = Some(false);
                query.priority = Some(1);
            }
        }
        query
    }
}

/// Client-side half of the date-bucket views: decide whether a fetched task
/// belongs in the view at all.
///
/// Today keeps tasks due on the current day or already overdue; Upcoming
/// keeps tasks due more than a day out, plus tasks with no due date.
pub fn view_retains(mode: ViewMode, task: &Task, now: DateTime<Utc>) -> bool {
    match mode {
        ViewMode::Today => match parse_due(task) {
            Some(due) => due.date_naive() == now.date_naive() || due < now,
            None => false,
        },
        ViewMode::Upcoming => match &task.due_date {
            None => true,
            Some(_) => match parse_due(task) {
                Some(due) => {
                    let cutoff = now.checked_add_days(Days::new(1)).unwrap_or(now);
                    due > cutoff
                }
                None => false,
            },
        },
        ViewMode::All | ViewMode::Completed | ViewMode::HighPriority => true,
    }
}

fn parse_due(task: &Task) -> Option<DateTime<Utc>> {
    task.due_date
        .as_deref()
        .and_then(|due| DateTime::parse_from_rfc3339(due).ok())
        .map(|due| due.with_timezone(&Utc))
}

/// Persistence for [`UiSession`].
pub trait SessionStore {
    fn load(&self) -> Result<Option<UiSession>, ClientError>;
    fn save(&self, session: &UiSession) -> Result<(), ClientError>;
}

/// JSON-file-backed session store.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<UiSession>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, session: &UiSession) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }
}
