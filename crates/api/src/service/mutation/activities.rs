use chrono::Utc;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use crate::{entities::activity::ActivityAction, error::ApiResult};

const INSERT_ACTIVITY: &str = r#"
  INSERT INTO activities (id, type, action, target_id, target_name, user_id, path, created_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

#[derive(Debug, Clone)]
pub struct NewActivity<'a> {
  pub kind: &'a str,
  pub action: ActivityAction,
  pub target_id: Uuid,
  pub target_name: &'a str,
  pub user_id: Option<Uuid>,
  pub path: String,
}

/// Appends an entry to the activity feed. Pass a transaction to tie it to the change it describes.
pub async fn record<'e, E>(executor: E, activity: NewActivity<'_>) -> ApiResult<()>
where
  E: SqliteExecutor<'e>,
{
  sqlx::query(INSERT_ACTIVITY)
    .bind(Uuid::new_v4())
    .bind(activity.kind)
    .bind(activity.action.to_string())
    .bind(activity.target_id)
    .bind(activity.target_name)
    .bind(activity.user_id)
    .bind(activity.path)
    .bind(Utc::now())
    .execute(executor)
    .await?;

  Ok(())
}
