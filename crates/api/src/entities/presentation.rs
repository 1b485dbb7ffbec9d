use chrono::{DateTime, Utc};
use classhub_scheduling::{Interval, PresentationStatus, ScheduledSlot, SchedulingResult};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Stored form. `status` is the value cached at the last write and may be stale.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone)]
pub struct PresentationRow {
  pub id: Uuid,
  pub project_id: Uuid,
  pub project_name: String,
  pub description: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: String,
  pub group_id: Uuid,
  #[sqlx(default)]
  pub group_name: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl PresentationRow {
  pub fn interval(&self) -> SchedulingResult<Interval> {
    Interval::new(self.start_time, self.end_time)
  }

  pub fn status_at(&self, now: DateTime<Utc>) -> PresentationStatus {
    PresentationStatus::derive(self.start_time, self.end_time, now)
  }

  /// Whether the cached status differs from the one derived at `now`.
  pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
    self.status.parse::<PresentationStatus>().ok() != Some(self.status_at(now))
  }

  pub fn into_presentation(self, now: DateTime<Utc>) -> Presentation {
    let status = self.status_at(now);

    Presentation {
      id: self.id,
      project_id: self.project_id,
      project_name: self.project_name,
      description: self.description,
      start_time: self.start_time,
      end_time: self.end_time,
      status,
      group_id: self.group_id,
      group_name: self.group_name,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

/// Columns needed by the conflict check.
#[derive(FromRow, Debug, Clone)]
pub struct SlotRow {
  pub id: Uuid,
  pub group_id: Uuid,
  pub project_name: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
}

impl SlotRow {
  pub fn into_slot(self) -> SchedulingResult<ScheduledSlot> {
    Ok(ScheduledSlot {
      id: self.id,
      group_id: self.group_id,
      project_name: self.project_name,
      interval: Interval::new(self.start_time, self.end_time)?,
    })
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
  pub id: Uuid,
  pub project_id: Uuid,
  pub project_name: String,
  pub description: String,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: PresentationStatus,
  pub group_id: Uuid,
  pub group_name: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
