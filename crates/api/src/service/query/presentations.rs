use async_trait::async_trait;
use classhub_scheduling::{ConflictQuery, ConflictReport, ScheduledSlot, SlotSource};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::warn;
use uuid::Uuid;

use crate::{
  entities::presentation::{PresentationRow, SlotRow},
  error::{ApiError, ApiResult},
  state::SchedulingContext,
};

const LIST_PRESENTATIONS_QUERY: &str = r#"
  SELECT p.*, g.name AS group_name
  FROM presentations AS p
  LEFT OUTER JOIN student_groups AS g ON p.group_id = g.id
  ORDER BY p.start_time ASC
"#;
const FIND_PRESENTATION_BY_ID_QUERY: &str = r#"
  SELECT p.*, g.name AS group_name
  FROM presentations AS p
  LEFT OUTER JOIN student_groups AS g ON p.group_id = g.id
  WHERE p.id = ?1
"#;
const LIST_GROUP_SLOTS_QUERY: &str = r#"
  SELECT id, group_id, project_name, start_time, end_time
  FROM presentations
  WHERE group_id = ?1 AND (?2 IS NULL OR id != ?2)
"#;
const LIST_PROJECT_SLOTS_QUERY: &str = r#"
  SELECT id, group_id, project_name, start_time, end_time
  FROM presentations
  WHERE project_id = ?1
"#;
const LIST_UNFINISHED_QUERY: &str = "SELECT * FROM presentations WHERE status != 'completed'";

/// All presentations ordered by start time. Statuses are the cached ones.
pub async fn list(pool: &SqlitePool) -> ApiResult<Vec<PresentationRow>> {
  sqlx::query_as::<_, PresentationRow>(LIST_PRESENTATIONS_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> ApiResult<Option<PresentationRow>>
where
  E: SqliteExecutor<'e>,
{
  sqlx::query_as::<_, PresentationRow>(FIND_PRESENTATION_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(Into::into)
}

/// Presentations whose cached status can still change with time.
pub async fn list_unfinished(pool: &SqlitePool) -> ApiResult<Vec<PresentationRow>> {
  sqlx::query_as::<_, PresentationRow>(LIST_UNFINISHED_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub async fn project_slots<'e, E>(executor: E, project_id: Uuid) -> ApiResult<Vec<ScheduledSlot>>
where
  E: SqliteExecutor<'e>,
{
  let rows = sqlx::query_as::<_, SlotRow>(LIST_PROJECT_SLOTS_QUERY)
    .bind(project_id)
    .fetch_all(executor)
    .await?;

  Ok(into_slots(rows))
}

/// Dry run of the conflict check, without taking the group's guard.
pub async fn conflicts(pool: &SqlitePool, ctx: &SchedulingContext, query: &ConflictQuery) -> ApiResult<ConflictReport> {
  let mut conn = pool.acquire().await?;

  ctx.checker.check(&mut GroupSlots::new(&mut conn), query).await
}

/// Reads a group's bookings through the connection that will also perform
/// the write, so check and write share one transaction.
pub struct GroupSlots<'c> {
  conn: &'c mut SqliteConnection,
}

impl<'c> GroupSlots<'c> {
  pub fn new(conn: &'c mut SqliteConnection) -> Self {
    Self { conn }
  }
}

#[async_trait]
impl SlotSource for GroupSlots<'_> {
  type Error = ApiError;

  async fn group_slots(&mut self, group_id: Uuid, exclude_id: Option<Uuid>) -> ApiResult<Vec<ScheduledSlot>> {
    let rows = sqlx::query_as::<_, SlotRow>(LIST_GROUP_SLOTS_QUERY)
      .bind(group_id)
      .bind(exclude_id)
      .fetch_all(&mut *self.conn)
      .await?;

    Ok(into_slots(rows))
  }
}

fn into_slots(rows: Vec<SlotRow>) -> Vec<ScheduledSlot> {
  rows
    .into_iter()
    .filter_map(|row| {
      let id = row.id;
      row
        .into_slot()
        .map_err(|e| warn!("Skip presentation {} with broken interval: {}", id, e))
        .ok()
    })
    .collect()
}
