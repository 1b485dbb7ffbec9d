use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
  Create,
  Update,
  Delete,
}

impl fmt::Display for ActivityAction {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ActivityAction::Create => write!(f, "create"),
      ActivityAction::Update => write!(f, "update"),
      ActivityAction::Delete => write!(f, "delete"),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
  pub id: Uuid,
  pub r#type: String,
  pub action: String,
  pub target_id: Uuid,
  pub target_name: String,
  pub user_id: Option<Uuid>,
  pub path: String,
  pub created_at: DateTime<Utc>,
}
