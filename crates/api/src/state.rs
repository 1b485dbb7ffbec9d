use std::sync::Arc;

use chrono::{DateTime, Utc};
use classhub_scheduling::{Clock, ConflictChecker, GroupLocks, SystemClock};
use secrecy::ExposeSecret;
use sqlx::SqlitePool;

use crate::{config::Config, handlers::auth::Keys};

pub type SharedState = Arc<AppState>;

/// Everything the presentation services need besides the pool.
#[derive(Debug, Clone)]
pub struct SchedulingContext {
  pub checker: ConflictChecker,
  pub locks: GroupLocks,
  pub clock: Arc<dyn Clock>,
}

impl SchedulingContext {
  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }
}

pub struct AppState {
  pub pool: SqlitePool,
  pub keys: Keys,
  pub jwt_maxage: i64,
  pub scheduling: SchedulingContext,
}

impl AppState {
  pub fn new(pool: SqlitePool, config: &Config) -> Self {
    Self {
      pool,
      keys: Keys::new(config.jwt_secret.expose_secret().as_bytes()),
      jwt_maxage: config.jwt_maxage,
      scheduling: SchedulingContext {
        checker: ConflictChecker::new(config.overlap_policy),
        locks: GroupLocks::new(),
        clock: Arc::new(SystemClock),
      },
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.scheduling.clock = clock;
    self
  }
}
