use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
  entities::group::Group,
  error::{ApiError, ApiResult},
};

const LIST_GROUPS_QUERY: &str = "SELECT * FROM student_groups ORDER BY created_at DESC, name";
const FIND_GROUP_BY_ID_QUERY: &str = "SELECT * FROM student_groups WHERE id = ?1";

/// Lists all groups, newest first
pub async fn list(pool: &SqlitePool) -> ApiResult<Vec<Group>> {
  sqlx::query_as::<_, Group>(LIST_GROUPS_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> ApiResult<Option<Group>> {
  sqlx::query_as::<_, Group>(FIND_GROUP_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

/// Fails with ResourceNotFound unless the group exists
pub async fn ensure_exists(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  find_by_id(pool, id)
    .await?
    .map(|_| ())
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}
