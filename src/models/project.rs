use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use validator::Validate;

use super::task::Task;

/// Input structure for creating a project.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProjectInput {
    /// Must be between 1 and 100 characters once trimmed.
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Maximum length of 500 characters if provided.
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl ProjectInput {
    /// Trims the name and drops a blank description.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: normalize_description(self.description),
        }
    }
}

/// Partial update for a project. Absent fields are left untouched.
///
/// A blank `description` clears the stored one, the same as omitting it on create.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProjectUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl ProjectUpdate {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
        }
    }
}

/// A project as stored in the `projects` table.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// The user who created the project. Never changes.
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A project together with all of its tasks, returned by `GET /projects/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectWithTasks {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
}

pub(crate) fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

const PROJECT_COLUMNS: &str = "id, name, description, creator_id, created_at, updated_at";

impl Project {
    pub async fn create(
        pool: &SqlitePool,
        input: ProjectInput,
        creator_id: i64,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Project>(&format!(
            "INSERT INTO projects (name, description, creator_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(input.name)
        .bind(input.description)
        .bind(creator_id)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE id = $1")
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(count > 0)
    }

    /// Lists projects, optionally restricted to a single creator.
    pub async fn list(
        pool: &SqlitePool,
        creator_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects
             WHERE ($1 IS NULL OR creator_id = $1)
             ORDER BY id LIMIT $2 OFFSET $3",
            PROJECT_COLUMNS
        ))
        .bind(creator_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await
    }

    /// Applies the supplied fields and refreshes `updated_at`.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        changes: ProjectUpdate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "UPDATE projects
             SET name = COALESCE($1, name),
                 description = CASE
                     WHEN $2 IS NULL THEN description
                     WHEN $2 = '' THEN NULL
                     ELSE $2
                 END,
                 updated_at = $3
             WHERE id = $4
             RETURNING {}",
            PROJECT_COLUMNS
        ))
        .bind(changes.name)
        .bind(changes.description)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Deletes the project. Its tasks go with it (`ON DELETE CASCADE`).
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_validation() {
        let valid = ProjectInput {
            name: "Website Redesign".to_string(),
            description: Some("Modern UI".to_string()),
        };
        assert!(valid.validate().is_ok());

        let empty_name = ProjectInput {
            name: "".to_string(),
            description: None,
        };
        assert!(empty_name.validate().is_err());

        let long_name = ProjectInput {
            name: "p".repeat(101),
            description: None,
        };
        assert!(long_name.validate().is_err());

        let long_description = ProjectInput {
            name: "Valid".to_string(),
            description: Some("d".repeat(501)),
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_project_input_normalization() {
        let input = ProjectInput {
            name: "  Board  ".to_string(),
            description: Some("   ".to_string()),
        }
        .normalized();

        assert_eq!(input.name, "Board");
        assert!(input.description.is_none());
        // A whitespace-only name becomes empty and fails validation.
        let blank = ProjectInput {
            name: "   ".to_string(),
            description: None,
        }
        .normalized();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_project_update_is_partial() {
        let update: ProjectUpdate = serde_json::from_str(r#"{"name": "Renamed"}"#).unwrap();
        assert_eq!(update.name.as_deref(), Some("Renamed"));
        assert!(update.description.is_none());
        assert!(update.validate().is_ok());
    }
}
