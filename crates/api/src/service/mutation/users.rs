use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand_core::OsRng;
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::task;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::user::{User, UserRole};
use crate::error::{ApiError, ApiResult};
use crate::service::query;

const ADMIN_USERNAME: &str = "admin";

const FIND_USER_BY_ID: &str = "SELECT * FROM users WHERE id = ?1";
const FIND_OTHER_USER_BY_USERNAME: &str = "SELECT * FROM users WHERE username = ?1 AND id != ?2";
const CREATE_USER: &str = r#"
  INSERT INTO users (id, username, password, email, name, role, group_id)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
  RETURNING *
"#;
const UPDATE_USER: &str = r#"
  UPDATE users
  SET username = COALESCE(?1, username),
      email = COALESCE(?2, email),
      name = COALESCE(?3, name),
      role = COALESCE(?4, role),
      password = COALESCE(?5, password),
      group_id = CASE WHEN ?6 THEN ?7 ELSE group_id END,
      updated_at = CURRENT_TIMESTAMP
  WHERE id = ?8
  RETURNING *
"#;
const UPDATE_PASSWORD: &str = "UPDATE users SET password = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2";
const UPDATE_LAST_LOGIN: &str = "UPDATE users SET last_login = ?1 WHERE id = ?2";
const DELETE_USER: &str = "DELETE FROM users WHERE id = ?";

#[derive(Debug, Deserialize)]
pub struct LoginParams {
  pub username: String,
  pub password: SecretBox<String>,
}

/// Verifies the credentials and stamps the login time.
pub async fn login(pool: &SqlitePool, params: LoginParams) -> ApiResult<User> {
  let user = query::users::find_by_username(pool, &params.username)
    .await?
    .ok_or(ApiError::InvalidCredentials())?;
  verify_password(SecretBox::new(Box::new(user.password.to_owned())), params.password).await?;

  sqlx::query(UPDATE_LAST_LOGIN)
    .bind(chrono::Utc::now())
    .bind(user.id)
    .execute(pool)
    .await?;

  get_user(pool, user.id).await
}

#[derive(Debug, Deserialize)]
pub struct CreateUserParams {
  pub username: String,
  pub email: Option<String>,
  pub name: Option<String>,
  pub role: UserRole,
  pub group_id: Option<Uuid>,
  pub password: SecretBox<String>,
}

/// Creates an account with a hashed password
///
/// # Errors
/// - AlreadyExists if the username is taken
/// - ResourceNotFound if the given group doesn't exist
pub async fn create(pool: &SqlitePool, params: CreateUserParams) -> ApiResult<User> {
  let CreateUserParams {
    username,
    email,
    name,
    role,
    group_id,
    password,
  } = params;

  if query::users::find_by_username(pool, &username).await?.is_some() {
    return Err(ApiError::AlreadyExists(format!("User `{}`", username)));
  }

  if let Some(group_id) = group_id {
    query::groups::ensure_exists(pool, group_id).await?;
  }

  let hashed_password = hash_password(password).await?;
  let user = sqlx::query_as::<_, User>(CREATE_USER)
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(hashed_password)
    .bind(email)
    .bind(name)
    .bind(role.to_string())
    .bind(group_id)
    .fetch_one(pool)
    .await?;

  get_user(pool, user.id).await
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserParams {
  pub username: Option<String>,
  pub email: Option<String>,
  pub name: Option<String>,
  pub role: Option<UserRole>,
  /// `Some(None)` removes the user from their group.
  pub group_id: Option<Option<Uuid>>,
  pub password: Option<SecretBox<String>>,
}

impl UpdateUserParams {
  fn is_empty(&self) -> bool {
    self.username.is_none()
      && self.email.is_none()
      && self.name.is_none()
      && self.role.is_none()
      && self.group_id.is_none()
      && self.password.is_none()
  }
}

/// Updates the provided fields of an existing user
///
/// # Errors
/// - BadRequest if nothing is provided or an admin would lose the admin role
/// - ResourceNotFound if the user or the new group doesn't exist
/// - AlreadyExists if the new username belongs to someone else
pub async fn update(pool: &SqlitePool, id: Uuid, mut params: UpdateUserParams) -> ApiResult<User> {
  if params.is_empty() {
    return Err(ApiError::BadRequest("No fields to update were provided".to_string()));
  }

  let existing = get_user_row(pool, id).await?;

  if existing.is_admin() && params.role.is_some_and(|role| role != UserRole::Admin) {
    return Err(ApiError::BadRequest("The role of an admin cannot be changed".to_string()));
  }

  if let Some(username) = &params.username {
    ensure_username_free(pool, username, id).await?;
  }

  if let Some(Some(group_id)) = params.group_id {
    query::groups::ensure_exists(pool, group_id).await?;
  }

  let hashed_password = match params.password.take() {
    Some(password) => Some(hash_password(password).await?),
    None => None,
  };

  sqlx::query_as::<_, User>(UPDATE_USER)
    .bind(&params.username)
    .bind(&params.email)
    .bind(&params.name)
    .bind(params.role.map(|role| role.to_string()))
    .bind(hashed_password)
    .bind(params.group_id.is_some())
    .bind(params.group_id.flatten())
    .bind(id)
    .fetch_one(pool)
    .await?;

  get_user(pool, id).await
}

pub async fn change_password(pool: &SqlitePool, id: Uuid, password: SecretBox<String>) -> ApiResult<()> {
  get_user_row(pool, id).await?;

  let hashed_password = hash_password(password).await?;
  sqlx::query(UPDATE_PASSWORD)
    .bind(hashed_password)
    .bind(id)
    .execute(pool)
    .await?;

  Ok(())
}

/// Deletes a user from the database by their ID
///
/// # Errors
/// - ResourceNotFound if the user doesn't exist
/// - Forbidden for admin accounts
pub async fn delete(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  let user = get_user_row(pool, id).await?;

  if user.is_admin() {
    return Err(ApiError::Forbidden("Admin accounts cannot be deleted".to_string()));
  }

  sqlx::query(DELETE_USER).bind(id).execute(pool).await?;

  Ok(())
}

/// Creates the `admin` account on first start. Returns `None` when it already exists.
pub async fn seed_admin(pool: &SqlitePool, password: SecretBox<String>) -> ApiResult<Option<User>> {
  if query::users::find_by_username(pool, ADMIN_USERNAME).await?.is_some() {
    return Ok(None);
  }

  let admin = create(
    pool,
    CreateUserParams {
      username: ADMIN_USERNAME.to_string(),
      email: None,
      name: Some("Administrator".to_string()),
      role: UserRole::Admin,
      group_id: None,
      password,
    },
  )
  .await?;

  info!("Created admin account {}", admin.id);

  Ok(Some(admin))
}

async fn hash_password(password: SecretBox<String>) -> ApiResult<String> {
  task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(15000, 2, 1, None).map_err(|err| anyhow::anyhow!("Invalid argon2 params: {}", err))?;
    let argon2_config = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2_config
      .hash_password(password.expose_secret().as_bytes(), &salt)
      .map_err(|err| {
        error!("Failed to hash password: {}", err);
        ApiError::InvalidCredentials()
      })
      .map(|hash| hash.to_string())
  })
  .await
  .context("panic in hash_password()")?
}

async fn verify_password(
  expected_password_hash: SecretBox<String>,
  password_candidate: SecretBox<String>,
) -> ApiResult<()> {
  task::spawn_blocking(move || {
    let parsed_hash = PasswordHash::new(expected_password_hash.expose_secret()).map_err(|err| {
      info!("Failed to parse password hash: {}", err);
      ApiError::InvalidCredentials()
    })?;

    Argon2::default()
      .verify_password(password_candidate.expose_secret().as_bytes(), &parsed_hash)
      .map_err(|_| ApiError::InvalidCredentials())
  })
  .await
  .context("panic in verify_password()")?
}

async fn get_user(pool: &SqlitePool, id: Uuid) -> ApiResult<User> {
  query::users::find_by_id(pool, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn get_user_row(pool: &SqlitePool, id: Uuid) -> ApiResult<User> {
  sqlx::query_as::<_, User>(FIND_USER_BY_ID)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn ensure_username_free(pool: &SqlitePool, username: &str, id: Uuid) -> ApiResult<()> {
  let taken = sqlx::query_as::<_, User>(FIND_OTHER_USER_BY_USERNAME)
    .bind(username)
    .bind(id)
    .fetch_optional(pool)
    .await?;

  match taken {
    Some(_) => Err(ApiError::AlreadyExists(format!("User `{}`", username))),
    None => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use assert_matches::assert_matches;

  use super::*;

  #[tokio::test]
  async fn test_password_hash_verifies_only_original() {
    let hash = hash_password(SecretBox::new(Box::new("correct horse".to_string())))
      .await
      .unwrap();

    let ok = verify_password(
      SecretBox::new(Box::new(hash.clone())),
      SecretBox::new(Box::new("correct horse".to_string())),
    )
    .await;
    let wrong = verify_password(
      SecretBox::new(Box::new(hash)),
      SecretBox::new(Box::new("battery staple".to_string())),
    )
    .await;

    assert!(ok.is_ok());
    assert_matches!(wrong, Err(ApiError::InvalidCredentials()));
  }

  #[test]
  fn test_empty_update_is_detected() {
    assert!(UpdateUserParams::default().is_empty());
    assert!(!UpdateUserParams {
      group_id: Some(None),
      ..Default::default()
    }
    .is_empty());
  }
}
