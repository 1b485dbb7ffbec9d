use axum::{
  extract::{Request, State},
  http::{header, StatusCode},
  middleware::Next,
  response::IntoResponse,
  Json,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::entities::user::User;
use crate::error::{ApiError, ApiResult};
use crate::service::query;
use crate::state::SharedState;

pub const AUTH_COOKIE_NAME: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String, // User associated with token
  pub iat: usize,  // Issued at time of the token
  pub exp: usize,  // Expiry time of the token
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub status: &'static str,
  pub message: String,
}

pub struct Keys {
  pub encoding: EncodingKey,
  pub decoding: DecodingKey,
}

impl Keys {
  pub fn new(secret: &[u8]) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
    }
  }
}

pub fn encode_jwt(keys: &Keys, maxage_minutes: i64, user_id: Uuid) -> Result<String, ApiError> {
  let now = chrono::Utc::now();
  let iat = now.timestamp() as usize;
  let exp = (now + chrono::Duration::minutes(maxage_minutes)).timestamp() as usize;
  let claims: Claims = Claims {
    sub: user_id.to_string(),
    exp,
    iat,
  };

  encode(&Header::default(), &claims, &keys.encoding)
    .map_err(|_| ApiError::Anyhow(anyhow::anyhow!("Can't encode token")))
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
  let json_error = ErrorResponse {
    status: "fail",
    message: message.to_string(),
  };
  (StatusCode::UNAUTHORIZED, Json(json_error))
}

pub async fn auth_guard(
  cookie_jar: CookieJar,
  State(state): State<SharedState>,
  mut req: Request,
  next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
  let token = cookie_jar
    .get(AUTH_COOKIE_NAME)
    .map(|cookie| cookie.value().to_string())
    .filter(|token| !token.is_empty())
    .or_else(|| {
      req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| {
          auth_value
            .strip_prefix("Bearer ")
            .map(|auth_value| auth_value.to_owned())
        })
    });

  let token = token.ok_or_else(|| unauthorized("You are not logged in, please provide token"))?;

  let claims = decode::<Claims>(&token, &state.keys.decoding, &Validation::default())
    .map_err(|_| unauthorized("Invalid token"))?
    .claims;

  let user_id = Uuid::parse_str(&claims.sub).map_err(|_| unauthorized("Invalid token"))?;

  let user = query::users::find_by_id(&state.pool, user_id)
    .await
    .map_err(|_| unauthorized("You are not logged in, please provide token"))?
    .ok_or_else(|| unauthorized("The user belonging to this token no longer exists"))?;

  debug!("fetch user model from db {:?}", user);

  req.extensions_mut().insert(user);
  Ok(next.run(req).await)
}

/// Mutations on the classroom are reserved for admins and teachers.
pub fn ensure_staff(user: &User) -> ApiResult<()> {
  if user.is_staff() {
    Ok(())
  } else {
    Err(ApiError::Forbidden(
      "Only teachers and admins can perform this action".to_string(),
    ))
  }
}
