use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
  entities::group::Group,
  error::{ApiError, ApiResult},
};

const FIND_GROUP_BY_NAME: &str = "SELECT * FROM student_groups WHERE name = ?1 AND id != ?2";
const INSERT_GROUP: &str = "INSERT INTO student_groups (id, name) VALUES (?1, ?2) RETURNING *";
const UPDATE_GROUP: &str = "UPDATE student_groups SET name = ?1 WHERE id = ?2 RETURNING *";
const DELETE_GROUP: &str = "DELETE FROM student_groups WHERE id = ?";

#[derive(Debug, Deserialize, Clone)]
pub struct GroupParams {
  pub name: String,
}

/// Creates a new group
///
/// # Errors
/// - AlreadyExists if a group with the same name exists
pub async fn create(pool: &SqlitePool, params: GroupParams) -> ApiResult<Group> {
  let id = Uuid::new_v4();
  ensure_name_free(pool, &params.name, id).await?;

  sqlx::query_as::<_, Group>(INSERT_GROUP)
    .bind(id)
    .bind(params.name)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

/// Renames a group
///
/// # Errors
/// - ResourceNotFound if the group doesn't exist
/// - AlreadyExists if another group has the new name
pub async fn update(pool: &SqlitePool, id: Uuid, params: GroupParams) -> ApiResult<Group> {
  ensure_name_free(pool, &params.name, id).await?;

  sqlx::query_as::<_, Group>(UPDATE_GROUP)
    .bind(params.name)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

/// Deletes a group together with its projects and presentations
pub async fn delete(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  let result = sqlx::query(DELETE_GROUP).bind(id).execute(pool).await?;

  match result.rows_affected() {
    0 => Err(ApiError::ResourceNotFound(id.to_string())),
    _ => Ok(()),
  }
}

async fn ensure_name_free(pool: &SqlitePool, name: &str, id: Uuid) -> ApiResult<()> {
  let existing = sqlx::query_as::<_, Group>(FIND_GROUP_BY_NAME)
    .bind(name)
    .bind(id)
    .fetch_optional(pool)
    .await?;

  match existing {
    Some(_) => Err(ApiError::AlreadyExists(format!("Group `{}`", name))),
    None => Ok(()),
  }
}
