use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
  entities::project::Project,
  error::{ApiError, ApiResult},
};

const LIST_PROJECTS_QUERY: &str = r#"
  SELECT p.*, g.name AS group_name
  FROM projects AS p
  LEFT OUTER JOIN student_groups AS g ON p.group_id = g.id
  ORDER BY p.created_at DESC, p.name
"#;
const FIND_PROJECT_BY_ID_QUERY: &str = r#"
  SELECT p.*, g.name AS group_name
  FROM projects AS p
  LEFT OUTER JOIN student_groups AS g ON p.group_id = g.id
  WHERE p.id = ?1
"#;

/// Fetches all projects with the names of their groups, newest first
pub async fn list(pool: &SqlitePool) -> ApiResult<Vec<Project>> {
  sqlx::query_as::<_, Project>(LIST_PROJECTS_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> ApiResult<Option<Project>> {
  sqlx::query_as::<_, Project>(FIND_PROJECT_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

pub async fn ensure_exists(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  find_by_id(pool, id)
    .await?
    .map(|_| ())
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}
