use chrono::{DateTime, Utc};

pub type SchedulingResult<T = ()> = Result<T, SchedulingError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
  #[error("Start time {start} must be before end time {end}")]
  InvalidInterval { start: DateTime<Utc>, end: DateTime<Utc> },

  #[error("Unknown overlap policy: {0}")]
  UnknownOverlapPolicy(String),

  #[error("'{0}' is not a valid presentation status")]
  UnknownStatus(String),
}
