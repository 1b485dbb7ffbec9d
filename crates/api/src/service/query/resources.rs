use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{entities::resource::Resource, error::ApiResult};

const LIST_ACTIVE_RESOURCES_QUERY: &str = r#"
  SELECT
    r.id, r.title, r.type, r.url, r.file_size, r.file_type, r.file_name, r.description,
    r.group_id, r.uploaded_by, r.downloads, r.status, r.uploaded_at, r.updated_at,
    u.username AS uploader_name,
    g.name AS group_name
  FROM resources AS r
  LEFT OUTER JOIN users AS u ON r.uploaded_by = u.id
  LEFT OUTER JOIN student_groups AS g ON r.group_id = g.id
  WHERE r.status = 'active'
  ORDER BY r.uploaded_at DESC, r.title
"#;
const FIND_RESOURCE_BY_ID_QUERY: &str = r#"
  SELECT r.*, u.username AS uploader_name, g.name AS group_name
  FROM resources AS r
  LEFT OUTER JOIN users AS u ON r.uploaded_by = u.id
  LEFT OUTER JOIN student_groups AS g ON r.group_id = g.id
  WHERE r.id = ?1
"#;

/// Active resources without their file payloads, newest first
pub async fn list_active(pool: &SqlitePool) -> ApiResult<Vec<Resource>> {
  sqlx::query_as::<_, Resource>(LIST_ACTIVE_RESOURCES_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

/// Finds a resource including its file payload
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> ApiResult<Option<Resource>> {
  sqlx::query_as::<_, Resource>(FIND_RESOURCE_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}
