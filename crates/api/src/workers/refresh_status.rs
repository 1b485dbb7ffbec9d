use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::mutation;
use crate::state::SharedState;

/// Keeps the cached presentation statuses in step with the clock.
pub async fn run(state: SharedState, interval: Duration, cancel_token: CancellationToken) -> Result<()> {
  debug!("Status refresh started, every {:?}", interval);

  while !cancel_token.is_cancelled() {
    select! {
      biased;
      _ = cancel_token.cancelled() => {
        info!("Status refresh stopped");
        break;
      }
      _ = sleep(interval) => {
        match mutation::presentations::refresh_statuses(&state.pool, state.scheduling.now()).await {
          Ok(updated) => debug!("Refreshed {} presentation statuses", updated),
          Err(e) => error!("Failed to refresh presentation statuses: {}", e),
        }
      }
    }
  }

  Ok(())
}
