use chrono::{DateTime, Utc};
use classhub_scheduling::{ConflictQuery, Interval};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  entities::presentation::{Presentation, PresentationRow},
  error::{ApiError, ApiResult},
  service::{
    begin_write,
    query::{self, presentations::GroupSlots},
  },
  state::SchedulingContext,
};

const INSERT_PRESENTATION: &str = r#"
  INSERT INTO presentations (id, project_id, project_name, description, start_time, end_time, status, group_id)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;
const UPDATE_PRESENTATION: &str = r#"
  UPDATE presentations
  SET project_id = ?1, project_name = ?2, description = ?3, start_time = ?4,
      end_time = ?5, status = ?6, group_id = ?7, updated_at = CURRENT_TIMESTAMP
  WHERE id = ?8
"#;
const REFRESH_STATUS: &str = "UPDATE presentations SET status = ?1 WHERE id = ?2 AND status = ?3";
const DELETE_PRESENTATION: &str = "DELETE FROM presentations WHERE id = ?";

#[derive(Debug, Deserialize, Clone)]
pub struct CreatePresentationParams {
  pub project_id: Uuid,
  pub project_name: String,
  pub description: Option<String>,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub group_id: Uuid,
}

/// Books a presentation slot for a group
///
/// The conflict scan and the insert run under the group's guard and inside a
/// single transaction.
///
/// # Errors
/// - InvalidInterval unless `start_time < end_time`
/// - ResourceNotFound if the project or the group doesn't exist
/// - TimeConflict if the group already has an overlapping presentation
pub async fn create(
  pool: &SqlitePool,
  ctx: &SchedulingContext,
  params: CreatePresentationParams,
) -> ApiResult<Presentation> {
  let interval = Interval::new(params.start_time, params.end_time)?;
  query::projects::ensure_exists(pool, params.project_id).await?;
  query::groups::ensure_exists(pool, params.group_id).await?;

  let id = Uuid::new_v4();
  let _guard = ctx.locks.acquire(params.group_id).await;
  let mut tx = begin_write(pool).await?;

  let query = ConflictQuery {
    group_id: params.group_id,
    interval,
    exclude_id: None,
  };
  let report = ctx.checker.check(&mut GroupSlots::new(&mut *tx), &query).await?;
  if report.has_conflict {
    debug!("Rejecting presentation for group {}: {:?}", params.group_id, report.details);
    return Err(ApiError::TimeConflict(report));
  }

  sqlx::query(INSERT_PRESENTATION)
    .bind(id)
    .bind(params.project_id)
    .bind(&params.project_name)
    .bind(params.description.unwrap_or_default())
    .bind(interval.start())
    .bind(interval.end())
    .bind(interval.status_at(ctx.now()).to_string())
    .bind(params.group_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;

  get_presentation(pool, ctx, id).await
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdatePresentationParams {
  pub project_id: Option<Uuid>,
  pub project_name: Option<String>,
  pub description: Option<String>,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub group_id: Option<Uuid>,
}

/// Reschedules or edits a presentation. Missing fields keep their stored values.
///
/// # Errors
/// - ResourceNotFound if the presentation, a new project or a new group doesn't exist
/// - InvalidInterval if the merged interval is empty or reversed
/// - TimeConflict if another presentation of the target group overlaps
pub async fn update(
  pool: &SqlitePool,
  ctx: &SchedulingContext,
  id: Uuid,
  params: UpdatePresentationParams,
) -> ApiResult<Presentation> {
  let existing = get_row(pool, id).await?;
  let merged = merge(existing, params);
  let interval = Interval::new(merged.start_time, merged.end_time)?;

  query::projects::ensure_exists(pool, merged.project_id).await?;
  query::groups::ensure_exists(pool, merged.group_id).await?;

  let _guard = ctx.locks.acquire(merged.group_id).await;
  let mut tx = begin_write(pool).await?;

  let query = ConflictQuery {
    group_id: merged.group_id,
    interval,
    exclude_id: Some(id),
  };
  let report = ctx.checker.check(&mut GroupSlots::new(&mut *tx), &query).await?;
  if report.has_conflict {
    debug!("Rejecting update of presentation {}: {:?}", id, report.details);
    return Err(ApiError::TimeConflict(report));
  }

  let result = sqlx::query(UPDATE_PRESENTATION)
    .bind(merged.project_id)
    .bind(&merged.project_name)
    .bind(&merged.description)
    .bind(interval.start())
    .bind(interval.end())
    .bind(interval.status_at(ctx.now()).to_string())
    .bind(merged.group_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

  if result.rows_affected() == 0 {
    return Err(ApiError::ResourceNotFound(id.to_string()));
  }

  tx.commit().await?;

  get_presentation(pool, ctx, id).await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  let result = sqlx::query(DELETE_PRESENTATION).bind(id).execute(pool).await?;

  if result.rows_affected() == 0 {
    return Err(ApiError::ResourceNotFound(id.to_string()));
  }

  Ok(())
}

/// Rewrites cached statuses that no longer match `now`. Returns the number of updated rows.
pub async fn refresh_statuses(pool: &SqlitePool, now: DateTime<Utc>) -> ApiResult<u64> {
  let stale = query::presentations::list_unfinished(pool)
    .await?
    .into_iter()
    .filter(|row| row.is_stale(now));

  let mut updated = 0;
  for row in stale {
    let result = sqlx::query(REFRESH_STATUS)
      .bind(row.status_at(now).to_string())
      .bind(row.id)
      .bind(&row.status)
      .execute(pool)
      .await?;

    updated += result.rows_affected();
  }

  if updated > 0 {
    info!("Refreshed status of {} presentations", updated);
  }

  Ok(updated)
}

fn merge(existing: PresentationRow, params: UpdatePresentationParams) -> PresentationRow {
  PresentationRow {
    project_id: params.project_id.unwrap_or(existing.project_id),
    project_name: params.project_name.unwrap_or(existing.project_name),
    description: params.description.unwrap_or(existing.description),
    start_time: params.start_time.unwrap_or(existing.start_time),
    end_time: params.end_time.unwrap_or(existing.end_time),
    group_id: params.group_id.unwrap_or(existing.group_id),
    ..existing
  }
}

async fn get_row(pool: &SqlitePool, id: Uuid) -> ApiResult<PresentationRow> {
  query::presentations::find_by_id(pool, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn get_presentation(pool: &SqlitePool, ctx: &SchedulingContext, id: Uuid) -> ApiResult<Presentation> {
  get_row(pool, id).await.map(|row| row.into_presentation(ctx.now()))
}
