use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

use super::project::{normalize_description, Project};
use super::user::User;
use crate::auth::policy::TaskScope;
use crate::error::AppError;

/// Represents the status of a task.
///
/// Any status may move to any other status; there is no enforced workflow.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is yet to be started.
    #[default]
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is completed.
    Done,
}

/// Input structure for creating a task.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Maximum length of 1000 characters if provided.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Defaults to `todo`.
    #[serde(default)]
    pub status: TaskStatus,

    /// The project this task belongs to.
    pub project_id: i64,

    /// Optional initial assignee.
    pub assignee_id: Option<i64>,
}

impl TaskInput {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: normalize_description(self.description),
            ..self
        }
    }
}

/// Partial update for a task. Absent fields are left untouched.
///
/// A blank `description` clears the stored one, the same as omitting it on create.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.map(|title| title.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            ..self
        }
    }
}

/// Body of `PATCH /tasks/{id}/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub project_id: i64,
    pub assignee_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query parameters accepted by `GET /tasks/`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Only tasks of this project.
    pub project_id: Option<i64>,
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Only tasks assigned to the caller.
    #[serde(default)]
    pub assigned_to_me: bool,
}

const TASK_COLUMNS: &str =
    "id, title, description, status, project_id, assignee_id, created_at, updated_at";

impl Task {
    /// Inserts a task after checking that its project and optional assignee exist.
    pub async fn create(pool: &SqlitePool, input: TaskInput) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;

        if !Project::exists(&mut tx, input.project_id).await? {
            return Err(AppError::NotFound("Project not found".into()));
        }
        if let Some(assignee_id) = input.assignee_id {
            if !User::exists(&mut tx, assignee_id).await? {
                return Err(AppError::NotFound("User not found".into()));
            }
        }

        let now = Utc::now();
        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (title, description, status, project_id, assignee_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(input.title)
        .bind(input.description)
        .bind(input.status)
        .bind(input.project_id)
        .bind(input.assignee_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_project(
        pool: &SqlitePool,
        project_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY id",
            TASK_COLUMNS
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Lists the tasks visible under `scope`, narrowed by the query filters.
    pub async fn list(
        pool: &SqlitePool,
        scope: TaskScope,
        filter: &TaskQuery,
        caller_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let visible_to = match scope {
            TaskScope::All => None,
            TaskScope::VisibleTo(user_id) => Some(user_id),
        };
        let assigned_to = filter.assigned_to_me.then_some(caller_id);

        sqlx::query_as::<_, Task>(
            "SELECT t.id, t.title, t.description, t.status, t.project_id, t.assignee_id,
                    t.created_at, t.updated_at
             FROM tasks t
             JOIN projects p ON p.id = t.project_id
             WHERE ($1 IS NULL OR p.creator_id = $1 OR t.assignee_id = $1)
               AND ($2 IS NULL OR t.project_id = $2)
               AND ($3 IS NULL OR t.status = $3)
               AND ($4 IS NULL OR t.assignee_id = $4)
             ORDER BY t.id LIMIT $5 OFFSET $6",
        )
        .bind(visible_to)
        .bind(filter.project_id)
        .bind(filter.status)
        .bind(assigned_to)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await
    }

    /// Applies the supplied fields and refreshes `updated_at`.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        changes: TaskUpdate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET title = COALESCE($1, title),
                 description = CASE
                     WHEN $2 IS NULL THEN description
                     WHEN $2 = '' THEN NULL
                     ELSE $2
                 END,
                 status = COALESCE($3, status),
                 updated_at = $4
             WHERE id = $5
             RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn set_status(
        pool: &SqlitePool,
        id: i64,
        status: TaskStatus,
    ) -> Result<Self, sqlx::Error> {
        Self::update(
            pool,
            id,
            TaskUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Assigns the task to `user_id`.
    ///
    /// Fails with `NotFound("User not found")` without touching the task when the
    /// target user does not exist.
    pub async fn assign(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Self, AppError> {
        let mut tx = pool.begin().await?;

        if !User::exists(&mut tx, user_id).await? {
            return Err(AppError::NotFound("User not found".into()));
        }

        let task = sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET assignee_id = $1, updated_at = $2 WHERE id = $3 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn unassign(pool: &SqlitePool, id: i64) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET assignee_id = NULL, updated_at = $1 WHERE id = $2 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            description: Some("Test Description".to_string()),
            status: TaskStatus::Todo,
            project_id: 1,
            assignee_id: None,
        }
    }

    #[test]
    fn test_task_input_validation() {
        assert!(input("Valid Title").validate().is_ok());
        assert!(input("").validate().is_err(), "empty title");
        assert!(input(&"a".repeat(201)).validate().is_err(), "title too long");

        let long_description = TaskInput {
            description: Some("b".repeat(1001)),
            ..input("Valid title")
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_status_defaults_to_todo() {
        let parsed: TaskInput =
            serde_json::from_str(r#"{"title": "Write tests", "project_id": 3}"#).unwrap();
        assert_eq!(parsed.status, TaskStatus::Todo);
        assert!(parsed.assignee_id.is_none());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            "in_progress"
        );
        assert!(serde_json::from_str::<TaskStatus>("\"review\"").is_err());
    }

    #[test]
    fn test_task_input_normalization() {
        let normalized = TaskInput {
            title: "  Ship it ".to_string(),
            description: Some("  ".to_string()),
            ..input("ignored")
        }
        .normalized();

        assert_eq!(normalized.title, "Ship it");
        assert!(normalized.description.is_none());
        assert_eq!(normalized.project_id, 1);
    }
}
