use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SchedulingError;

/// Lifecycle phase of a presentation. Ordered the way time moves it:
/// `Upcoming < Ongoing < Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PresentationStatus {
  Upcoming,
  Ongoing,
  Completed,
}

impl PresentationStatus {
  /// Phase of `[start, end]` at `now`. Both endpoints count as ongoing.
  pub fn derive(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
    if now < start {
      PresentationStatus::Upcoming
    } else if now > end {
      PresentationStatus::Completed
    } else {
      PresentationStatus::Ongoing
    }
  }

  pub fn is_terminal(self) -> bool {
    self == PresentationStatus::Completed
  }
}

impl fmt::Display for PresentationStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      PresentationStatus::Upcoming => write!(f, "upcoming"),
      PresentationStatus::Ongoing => write!(f, "ongoing"),
      PresentationStatus::Completed => write!(f, "completed"),
    }
  }
}

impl FromStr for PresentationStatus {
  type Err = SchedulingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "upcoming" => Ok(PresentationStatus::Upcoming),
      "ongoing" => Ok(PresentationStatus::Ongoing),
      "completed" => Ok(PresentationStatus::Completed),
      _ => Err(SchedulingError::UnknownStatus(s.to_string())),
    }
  }
}
