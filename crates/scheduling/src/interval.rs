use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::{SchedulingError, SchedulingResult},
  status::PresentationStatus,
};

/// How two intervals that only touch at an endpoint are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
  /// Closed intervals: `[10:00, 11:00]` and `[11:00, 12:00]` conflict.
  #[default]
  Inclusive,
  /// Half-open intervals: `[10:00, 11:00)` and `[11:00, 12:00)` do not conflict.
  HalfOpen,
}

impl fmt::Display for OverlapPolicy {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      OverlapPolicy::Inclusive => write!(f, "inclusive"),
      OverlapPolicy::HalfOpen => write!(f, "half_open"),
    }
  }
}

impl FromStr for OverlapPolicy {
  type Err = SchedulingError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "inclusive" => Ok(OverlapPolicy::Inclusive),
      "half_open" | "half-open" => Ok(OverlapPolicy::HalfOpen),
      other => Err(SchedulingError::UnknownOverlapPolicy(other.to_string())),
    }
  }
}

/// A non-empty time range. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
  start: DateTime<Utc>,
  end: DateTime<Utc>,
}

impl Interval {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SchedulingResult<Self> {
    if start >= end {
      return Err(SchedulingError::InvalidInterval { start, end });
    }

    Ok(Self { start, end })
  }

  pub fn start(&self) -> DateTime<Utc> {
    self.start
  }

  pub fn end(&self) -> DateTime<Utc> {
    self.end
  }

  pub fn overlaps(&self, other: &Interval, policy: OverlapPolicy) -> bool {
    match policy {
      OverlapPolicy::Inclusive => self.start <= other.end && other.start <= self.end,
      OverlapPolicy::HalfOpen => self.start < other.end && other.start < self.end,
    }
  }

  pub fn status_at(&self, now: DateTime<Utc>) -> PresentationStatus {
    PresentationStatus::derive(self.start, self.end, now)
  }
}
