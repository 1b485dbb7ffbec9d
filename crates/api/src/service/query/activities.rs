use sqlx::SqlitePool;

use crate::{entities::activity::Activity, error::ApiResult};

const LIST_RECENT_ACTIVITIES_QUERY: &str = "SELECT * FROM activities ORDER BY created_at DESC, rowid DESC LIMIT ?1";

/// Most recent activities first
pub async fn list_recent(pool: &SqlitePool, limit: i64) -> ApiResult<Vec<Activity>> {
  sqlx::query_as::<_, Activity>(LIST_RECENT_ACTIVITIES_QUERY)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}
