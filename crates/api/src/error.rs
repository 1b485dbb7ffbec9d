use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use classhub_scheduling::{ConflictDetail, ConflictReport, SchedulingError};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error;

pub type ApiResult<T = ()> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Invalid credentials")]
  InvalidCredentials(),
  #[error("{0}")]
  Forbidden(String),
  #[error("{0} already exists")]
  AlreadyExists(String),
  #[error("Entity `{0}` is not found")]
  ResourceNotFound(String),
  #[error("Database error: {0}")]
  DatabaseError(#[from] SqlxError),
  #[error(transparent)]
  JsonRejection(JsonRejection),
  #[error(transparent)]
  InvalidInputError(#[from] validator::ValidationErrors),
  #[error(transparent)]
  InvalidInterval(#[from] SchedulingError),
  #[error("Invalid file data: {0}")]
  InvalidFileData(String),
  #[error("{0}")]
  BadRequest(String),
  #[error("The group already has a presentation scheduled in the selected time range")]
  TimeConflict(ConflictReport),
  #[error("an internal server error occurred")]
  Anyhow(#[from] anyhow::Error),
}

impl ApiError {
  pub fn response(self) -> (StatusCode, AppResponseError) {
    use ApiError::*;
    let message = self.to_string();

    let (kind, details, status_code) = match self {
      JsonRejection(rejection) => (
        "INVALID_INPUT_ERROR",
        ErrorDetails::Fields(vec![(rejection.status().to_string(), vec![rejection.body_text()])]),
        StatusCode::BAD_REQUEST,
      ),
      InvalidInputError(err) => (
        "INVALID_INPUT_ERROR",
        ErrorDetails::Fields(
          err
            .field_errors()
            .into_iter()
            .map(|(p, e)| {
              (
                p.to_string(),
                e.iter().map(|err| err.code.to_string()).collect::<Vec<String>>(),
              )
            })
            .collect(),
        ),
        StatusCode::BAD_REQUEST,
      ),
      InvalidInterval(_) | InvalidFileData(_) | BadRequest(_) => {
        ("INVALID_INPUT_ERROR", ErrorDetails::none(), StatusCode::BAD_REQUEST)
      },
      InvalidCredentials() => ("INVALID_CREDENTIALS", ErrorDetails::none(), StatusCode::UNAUTHORIZED),
      Forbidden(_) => ("FORBIDDEN", ErrorDetails::none(), StatusCode::FORBIDDEN),
      ResourceNotFound(_) => ("RESOURCE_NOT_FOUND", ErrorDetails::none(), StatusCode::NOT_FOUND),
      AlreadyExists(_) => ("ALREADY_EXISTS", ErrorDetails::none(), StatusCode::CONFLICT),
      TimeConflict(report) => (
        "time_conflict",
        ErrorDetails::Conflicts(report.details),
        StatusCode::CONFLICT,
      ),
      DatabaseError(ref e) if is_store_unavailable(e) => {
        tracing::error!("Database is unavailable: {:?}", e);

        ("STORE_UNAVAILABLE", ErrorDetails::none(), StatusCode::SERVICE_UNAVAILABLE)
      },
      DatabaseError(ref e) => {
        tracing::error!("Database error: {:?}", e);

        (
          "INTERNAL_SERVER_ERROR",
          ErrorDetails::none(),
          StatusCode::INTERNAL_SERVER_ERROR,
        )
      },
      Anyhow(ref e) => {
        tracing::error!("Generic error: {:?}", e);

        (
          "INTERNAL_SERVER_ERROR",
          ErrorDetails::none(),
          StatusCode::INTERNAL_SERVER_ERROR,
        )
      },
    };

    let message = match status_code {
      StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => "an internal server error occurred".to_string(),
      _ => message,
    };

    (status_code, AppResponseError::new(kind, message, None, details))
  }
}

// SQLITE_BUSY and SQLITE_LOCKED; extended codes keep the primary code in the low byte
const SQLITE_BUSY_CODES: [i32; 2] = [5, 6];

fn is_store_unavailable(err: &SqlxError) -> bool {
  match err {
    SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::WorkerCrashed => true,
    SqlxError::Database(db) => db
      .code()
      .and_then(|code| code.parse::<i32>().ok())
      .is_some_and(|code| SQLITE_BUSY_CODES.contains(&(code & 0xff))),
    _ => false,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status_code, body) = self.response();
    (status_code, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::JsonRejection(rejection)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorDetails {
  Conflicts(Vec<ConflictDetail>),
  Fields(Vec<(String, Vec<String>)>),
}

impl ErrorDetails {
  fn none() -> Self {
    ErrorDetails::Fields(vec![])
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppResponseError {
  #[serde(rename = "error")]
  pub kind: String,
  #[serde(rename = "message")]
  pub error_message: String,
  pub code: Option<i32>,
  pub details: ErrorDetails,
}

impl AppResponseError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>, code: Option<i32>, details: ErrorDetails) -> Self {
    Self {
      kind: kind.into(),
      error_message: message.into(),
      code,
      details,
    }
  }
}
