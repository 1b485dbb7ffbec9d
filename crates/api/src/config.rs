use std::{env, time::Duration};

use anyhow::{anyhow, Context, Result};
use classhub_scheduling::OverlapPolicy;
use secrecy::SecretBox;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_JWT_MAXAGE: i64 = 60 * 24;
const DEFAULT_STATUS_REFRESH_INTERVAL: &str = "30s";

/// Runtime settings, read from the environment (and `.env`).
///
/// | Env Var                   | Default                 |
/// |---------------------------|-------------------------|
/// | `DATABASE_URL`            | required                |
/// | `JWT_SECRET`              | required                |
/// | `HOST`                    | `127.0.0.1`             |
/// | `PORT`                    | `3000`                  |
/// | `CORS_ORIGIN`             | `http://localhost:5173` |
/// | `JWT_MAXAGE`              | `1440` (minutes)        |
/// | `OVERLAP_POLICY`          | `inclusive`             |
/// | `STATUS_REFRESH_INTERVAL` | `30s`                   |
/// | `ADMIN_PASSWORD`          | unset, no admin seeding |
#[derive(Debug)]
pub struct Config {
  pub database_url: String,
  pub host: String,
  pub port: u16,
  pub cors_origin: String,
  pub jwt_secret: SecretBox<String>,
  pub jwt_maxage: i64,
  pub overlap_policy: OverlapPolicy,
  pub status_refresh_interval: Duration,
  pub admin_password: Option<SecretBox<String>>,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    let database_url = required("DATABASE_URL")?;
    let jwt_secret = SecretBox::new(Box::new(required("JWT_SECRET")?));

    let host = optional("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match optional("PORT") {
      Some(port) => port.parse().context("PORT must be a valid port number")?,
      None => DEFAULT_PORT,
    };
    let cors_origin = optional("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

    let jwt_maxage = match optional("JWT_MAXAGE") {
      Some(maxage) => maxage.parse().context("JWT_MAXAGE must be a number of minutes")?,
      None => DEFAULT_JWT_MAXAGE,
    };

    let overlap_policy = match optional("OVERLAP_POLICY") {
      Some(policy) => policy.parse()?,
      None => OverlapPolicy::default(),
    };

    let status_refresh_interval = parse_interval(
      &optional("STATUS_REFRESH_INTERVAL").unwrap_or_else(|| DEFAULT_STATUS_REFRESH_INTERVAL.to_string()),
    )?;

    let admin_password = optional("ADMIN_PASSWORD").map(|password| SecretBox::new(Box::new(password)));

    Ok(Self {
      database_url,
      host,
      port,
      cors_origin,
      jwt_secret,
      jwt_maxage,
      overlap_policy,
      status_refresh_interval,
      admin_password,
    })
  }

  pub fn server_url(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

fn required(key: &str) -> Result<String> {
  optional(key).ok_or_else(|| anyhow!("{key} is not set in .env file"))
}

fn optional(key: &str) -> Option<String> {
  env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_interval(value: &str) -> Result<Duration> {
  let interval = duration_str::parse(value).map_err(|e| anyhow!("Invalid STATUS_REFRESH_INTERVAL: {e}"))?;

  if interval.is_zero() {
    return Err(anyhow!("STATUS_REFRESH_INTERVAL must be greater than zero"));
  }

  Ok(interval)
}
