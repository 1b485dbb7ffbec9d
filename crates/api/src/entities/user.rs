use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  Admin,
  Teacher,
  Student,
}

impl fmt::Display for UserRole {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      UserRole::Admin => write!(f, "admin"),
      UserRole::Teacher => write!(f, "teacher"),
      UserRole::Student => write!(f, "student"),
    }
  }
}

impl FromStr for UserRole {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin" => Ok(UserRole::Admin),
      "teacher" => Ok(UserRole::Teacher),
      "student" => Ok(UserRole::Student),
      _ => Err(format!("'{}' is not a valid role", s)),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub role: String,
  pub email: Option<String>,
  pub name: Option<String>,
  #[serde(skip_serializing)]
  pub password: String,
  pub group_id: Option<Uuid>,
  #[sqlx(default)]
  pub group_name: Option<String>,
  pub last_login: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn role(&self) -> Option<UserRole> {
    self.role.parse().ok()
  }

  /// Admins and teachers manage the classroom; students only read.
  pub fn is_staff(&self) -> bool {
    matches!(self.role(), Some(UserRole::Admin | UserRole::Teacher))
  }

  pub fn is_admin(&self) -> bool {
    self.role() == Some(UserRole::Admin)
  }
}
