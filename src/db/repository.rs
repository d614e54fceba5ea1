//! Database repository for task and tag operations.
//!
//! Multi-row mutations (reorder, bulk actions, tag replacement) run inside a
//! single transaction so concurrent readers never observe a partial write.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    BulkAction, BulkActionResult, CreateTagRequest, CreateTaskRequest, Pagination, ReorderItem,
    SortBy, Tag, Task, TaskQuery, UpdateTagRequest, UpdateTaskRequest, DEFAULT_TAG_COLOR,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== TASK QUERIES ====================

    /// Resolve a task query into one page of tasks plus pagination metadata.
    ///
    /// The page is counted and fetched under the same filter predicate, so
    /// `meta.pagination` stays correct even when `page` points past the end.
    pub async fn list_tasks(
        &self,
        query: &TaskQuery,
    ) -> Result<(Vec<Task>, Pagination), AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) AS total FROM tasks");
        push_filters(&mut count_qb, query);
        let total: i64 = count_qb.build().fetch_one(&self.pool).await?.get("total");

        let mut qb = QueryBuilder::new(
            "SELECT id, title, description, completed, priority, due_date, order_index, created_at, updated_at FROM tasks",
        );
        push_filters(&mut qb, query);

        // Manual order is the structural backbone; the requested sort only
        // breaks ties so pagination stays stable across drag-and-drop moves.
        qb.push(" ORDER BY order_index ASC");
        if query.sort_by != SortBy::OrderIndex {
            qb.push(format!(
                ", {} {}",
                query.sort_by.column(),
                query.order.keyword()
            ));
        }

        let offset = (query.page as i64 - 1) * query.page_size as i64;
        qb.push(" LIMIT ")
            .push_bind(query.page_size as i64)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut tasks: Vec<Task> = rows.iter().map(task_from_row).collect();
        self.attach_tags(&mut tasks).await?;

        let pagination = Pagination::compute(query.page, query.page_size, total as u64);
        Ok((tasks, pagination))
    }

    /// Get a task by ID with its tags resolved.
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError> {
        let row = sqlx::query(
            "SELECT id, title, description, completed, priority, due_date, order_index, created_at, updated_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut tasks = vec![task_from_row(&row)];
        self.attach_tags(&mut tasks).await?;
        Ok(tasks.pop())
    }

    /// Expand the task/tag join into a flat tag list per task.
    async fn attach_tags(&self, tasks: &mut [Task]) -> Result<(), AppError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::new(
            "SELECT tt.task_id AS task_id, t.id AS id, t.name AS name, t.color AS color, t.created_at AS created_at \
             FROM task_tags tt JOIN tags t ON t.id = tt.tag_id WHERE tt.task_id IN (",
        );
        {
            let mut sep = qb.separated(", ");
            for task in tasks.iter() {
                sep.push_bind(task.id.clone());
            }
        }
        qb.push(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut by_task: HashMap<String, Vec<Tag>> = HashMap::new();
        for row in &rows {
            by_task
                .entry(row.get("task_id"))
                .or_default()
                .push(Tag {
                    id: row.get("id"),
                    name: row.get("name"),
                    color: row.get("color"),
                    created_at: row.get("created_at"),
                    task_count: None,
                });
        }

        for task in tasks.iter_mut() {
            task.tags = by_task.remove(&task.id).unwrap_or_default();
        }
        Ok(())
    }

    // ==================== TASK MUTATIONS ====================

    /// Create a task, appending it to the end of the manual order
    /// regardless of any filters in effect.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT COALESCE(MAX(order_index), 0) AS max_order FROM tasks")
            .fetch_one(&mut *tx)
            .await?;
        let order_index: i64 = row.get::<i64, _>("max_order") + 1;

        sqlx::query(
            "INSERT INTO tasks (id, title, description, completed, priority, due_date, order_index, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.priority)
        .bind(&request.due_date)
        .bind(order_index)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        replace_task_tags(&mut tx, &id, &request.tags, &now).await?;

        tx.commit().await?;

        self.get_task(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Task {} missing after insert", id)))
    }

    /// Apply a partial update. A supplied `tags` list fully replaces the
    /// existing associations; omitted fields are left unchanged.
    pub async fn update_task(
        &self,
        id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<Task, AppError> {
        let existing = self
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        let now = Utc::now().to_rfc3339();
        let title = request.title.as_ref().unwrap_or(&existing.title);
        let description = match &request.description {
            Some(value) => value.clone(),
            None => existing.description.clone(),
        };
        let priority = request.priority.unwrap_or(existing.priority);
        let due_date = match &request.due_date {
            Some(value) => value.clone(),
            None => existing.due_date.clone(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, priority = ?, due_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(&description)
        .bind(priority)
        .bind(&due_date)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(names) = &request.tags {
            replace_task_tags(&mut tx, id, names, &now).await?;
        }

        tx.commit().await?;

        self.get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    /// Flip the completion state of a task.
    pub async fn toggle_task(&self, id: &str) -> Result<Task, AppError> {
        let now = Utc::now().to_rfc3339();
        let result =
            sqlx::query("UPDATE tasks SET completed = 1 - completed, updated_at = ? WHERE id = ?")
                .bind(&now)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        self.get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))
    }

    /// Delete a task; the join table cascades.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }

    /// Delete every completed task; reports how many rows went away.
    pub async fn clear_completed(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE completed = 1")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Persist a client-computed ordering. Every pair applies or none do;
    /// an unknown id aborts the whole batch and rolls back.
    pub async fn reorder_tasks(&self, items: &[ReorderItem]) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for item in items {
            let result =
                sqlx::query("UPDATE tasks SET order_index = ?, updated_at = ? WHERE id = ?")
                    .bind(item.order_index)
                    .bind(&now)
                    .bind(&item.id)
                    .execute(&mut *tx)
                    .await?;

            if result.rows_affected() == 0 {
                // Dropping the transaction rolls back the batch.
                return Err(AppError::NotFound(format!("Task {} not found", item.id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Execute a bulk mutation. Ids matching no task are silently skipped;
    /// the result reports rows actually affected, not rows requested.
    pub async fn bulk_action(&self, action: &BulkAction) -> Result<BulkActionResult, AppError> {
        let now = Utc::now().to_rfc3339();
        match action {
            BulkAction::Complete(ids) => self.bulk_set_completed(ids, true, &now).await,
            BulkAction::Incomplete(ids) => self.bulk_set_completed(ids, false, &now).await,
            BulkAction::SetPriority { ids, priority } => {
                let mut qb = QueryBuilder::new("UPDATE tasks SET priority = ");
                qb.push_bind(*priority)
                    .push(", updated_at = ")
                    .push_bind(now.clone())
                    .push(" WHERE id IN (");
                push_id_list(&mut qb, ids);

                let result = qb.build().execute(&self.pool).await?;
                Ok(BulkActionResult::updated(result.rows_affected()))
            }
            BulkAction::SetTags { ids, tags } => {
                let mut tx = self.pool.begin().await?;

                // Only ids that exist take part; associating a tag with a
                // missing task would trip the foreign key.
                let mut qb = QueryBuilder::new("SELECT id FROM tasks WHERE id IN (");
                push_id_list(&mut qb, ids);
                let rows = qb.build().fetch_all(&mut *tx).await?;
                let matched: Vec<String> = rows.iter().map(|r| r.get("id")).collect();

                for task_id in &matched {
                    replace_task_tags(&mut tx, task_id, tags, &now).await?;
                    sqlx::query("UPDATE tasks SET updated_at = ? WHERE id = ?")
                        .bind(&now)
                        .bind(task_id)
                        .execute(&mut *tx)
                        .await?;
                }

                tx.commit().await?;
                Ok(BulkActionResult::updated(matched.len() as u64))
            }
            BulkAction::Delete(ids) => {
                let mut qb = QueryBuilder::new("DELETE FROM tasks WHERE id IN (");
                push_id_list(&mut qb, ids);

                let result = qb.build().execute(&self.pool).await?;
                Ok(BulkActionResult::deleted(result.rows_affected()))
            }
        }
    }

    async fn bulk_set_completed(
        &self,
        ids: &[String],
        completed: bool,
        now: &str,
    ) -> Result<BulkActionResult, AppError> {
        let mut qb = QueryBuilder::new("UPDATE tasks SET completed = ");
        qb.push_bind(completed as i64)
            .push(", updated_at = ")
            .push_bind(now.to_string())
            .push(" WHERE id IN (");
        push_id_list(&mut qb, ids);

        let result = qb.build().execute(&self.pool).await?;
        Ok(BulkActionResult::updated(result.rows_affected()))
    }

    // ==================== TAG OPERATIONS ====================

    /// List all tags with their task counts, sorted by name.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.color, t.created_at, COUNT(tt.task_id) AS task_count \
             FROM tags t LEFT JOIN task_tags tt ON tt.tag_id = t.id \
             GROUP BY t.id ORDER BY t.name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    /// Get a tag by ID with its task count.
    pub async fn get_tag(&self, id: &str) -> Result<Option<Tag>, AppError> {
        let row = sqlx::query(
            "SELECT t.id, t.name, t.color, t.created_at, COUNT(tt.task_id) AS task_count \
             FROM tags t LEFT JOIN task_tags tt ON tt.tag_id = t.id \
             WHERE t.id = ? GROUP BY t.id",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(tag_from_row))
    }

    /// Create a tag directly. Duplicate names are a conflict here, unlike
    /// the resolve-or-create path used by task writes.
    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let color = request
            .color
            .clone()
            .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());

        sqlx::query("INSERT INTO tags (id, name, color, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(&request.name)
            .bind(&color)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, &request.name))?;

        Ok(Tag {
            id,
            name: request.name.clone(),
            color,
            created_at: now,
            task_count: Some(0),
        })
    }

    /// Update a tag's name and/or color. Renaming onto an existing name is
    /// a conflict.
    pub async fn update_tag(&self, id: &str, request: &UpdateTagRequest) -> Result<Tag, AppError> {
        let existing = self
            .get_tag(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let color = request.color.as_ref().unwrap_or(&existing.color);

        sqlx::query("UPDATE tags SET name = ?, color = ? WHERE id = ?")
            .bind(name)
            .bind(color)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_duplicate(e, name))?;

        self.get_tag(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))
    }

    /// Delete a tag; its associations cascade, the tasks stay.
    pub async fn delete_tag(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }
        Ok(())
    }
}

// Helper functions

/// Append the WHERE clause for a task query. Search is OR'd across title
/// and description; every other filter ANDs in.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &TaskQuery) {
    qb.push(" WHERE 1 = 1");
    if let Some(q) = &query.q {
        let pattern = format!("%{}%", q.to_lowercase());
        qb.push(" AND (LOWER(title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(completed) = query.completed {
        qb.push(" AND completed = ").push_bind(completed as i64);
    }
    if let Some(priority) = query.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(tag) = &query.tag {
        qb.push(
            " AND EXISTS (SELECT 1 FROM task_tags tt JOIN tags t ON t.id = tt.tag_id \
             WHERE tt.task_id = tasks.id AND t.name = ",
        )
        .push_bind(tag.clone())
        .push(")");
    }
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    {
        let mut sep = qb.separated(", ");
        for id in ids {
            sep.push_bind(id.clone());
        }
    }
    qb.push(")");
}

/// Drop all tag associations for a task and rebuild them from `names`.
async fn replace_task_tags(
    tx: &mut Transaction<'_, Sqlite>,
    task_id: &str,
    names: &[String],
    now: &str,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM task_tags WHERE task_id = ?")
        .bind(task_id)
        .execute(&mut **tx)
        .await?;

    for name in names {
        let tag_id = ensure_tag(tx, name, now).await?;
        sqlx::query("INSERT OR IGNORE INTO task_tags (task_id, tag_id) VALUES (?, ?)")
            .bind(task_id)
            .bind(&tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Resolve a tag by exact name, creating it when absent. Runs inside the
/// caller's transaction so check-then-create cannot race the task write it
/// supports.
async fn ensure_tag(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    now: &str,
) -> Result<String, AppError> {
    if let Some(row) = sqlx::query("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(row.get("id"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO tags (id, name, color, created_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(name) DO NOTHING",
    )
    .bind(&id)
    .bind(name)
    .bind(DEFAULT_TAG_COLOR)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let row = sqlx::query("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(row.get("id"))
}

fn conflict_on_duplicate(err: sqlx::Error, name: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return AppError::Conflict(format!("Tag name '{}' already exists", name));
        }
    }
    err.into()
}

fn task_from_row(row: &sqlx::sqlite::SqliteRow) -> Task {
    let completed: i64 = row.get("completed");
    Task {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        completed: completed != 0,
        priority: row.get("priority"),
        due_date: row.get("due_date"),
        order_index: row.get("order_index"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        tags: Vec::new(),
    }
}

fn tag_from_row(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        created_at: row.get("created_at"),
        task_count: Some(row.get("task_count")),
    }
}
