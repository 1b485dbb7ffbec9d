use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use classhub_api::{config::Config, service::mutation, state::AppState, workers::refresh_status, MIGRATOR};
use futures::FutureExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod utils;

const DEFAULT_LOG_LEVEL: &str = "info";
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  let log_level = env::var("CLASSHUB_LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
  let env_filter = EnvFilter::from_default_env().add_directive(log_level.parse()?);

  // Initialize tracing subscriber with the environment filter
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let mut config = Config::from_env()?;

  let cancel_token = CancellationToken::new();

  // Start task for catching interrupt
  tokio::spawn({
    let cancel_token = cancel_token.clone();
    async move {
      let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
          error!("Failed to listen for Ctrl+C: {}", e);
          std::future::pending::<()>().await;
        }
      };

      #[cfg(unix)]
      let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
          Ok(mut stream) => {
            stream.recv().await;
          },
          Err(e) => {
            error!("Failed to install terminate handler: {}", e);
            std::future::pending::<()>().await;
          },
        }
      };

      #[cfg(not(unix))]
      let terminate = std::future::pending::<()>();

      tokio::select! {
        _ = ctrl_c => {
          info!("Received Ctrl-C, shutting down...");
          cancel_token.cancel()
        },
        _ = terminate => {
          info!("Received terminate, shutting down...");
          cancel_token.cancel()
        },
      }
    }
  });

  let connect_options = SqliteConnectOptions::from_str(&config.database_url)
    .context("DATABASE_URL is not a valid SQLite url")?
    .create_if_missing(true)
    .busy_timeout(SQLITE_BUSY_TIMEOUT);

  let pool = SqlitePoolOptions::new()
    .max_connections(16)
    .min_connections(1)
    .connect_with(connect_options)
    .await
    .context("Database connection failed")?;

  MIGRATOR.run(&pool).await.context("Failed to run database migrations")?;

  if let Some(password) = config.admin_password.take() {
    mutation::users::seed_admin(&pool, password)
      .await
      .map_err(|e| anyhow!("Failed to seed the admin account: {}", e))?;
  }

  let state = Arc::new(AppState::new(pool.clone(), &config));

  info!("Conflicts are checked with the {} overlap policy", config.overlap_policy);

  if let Err(err) = utils::join_all(
    vec![
      classhub_api::run(
        state.clone(),
        config.server_url(),
        config.cors_origin.clone(),
        cancel_token.clone(),
      )
      .boxed(),
      refresh_status::run(state.clone(), config.status_refresh_interval, cancel_token.clone()).boxed(),
    ],
    cancel_token,
  )
  .await
  {
    error!("One of main thread get error while execution: {:?}", err);
  }

  pool.close().await;

  Ok(())
}
