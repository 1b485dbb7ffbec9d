use sqlx::SqlitePool;
use uuid::Uuid;

use super::calculate_total_pages;
use crate::{entities::user::User, error::ApiResult};

const LIST_USERS_QUERY: &str = r#"
  SELECT u.*, g.name AS group_name
  FROM users AS u
  LEFT OUTER JOIN student_groups AS g ON u.group_id = g.id
  ORDER BY u.created_at, u.username LIMIT ? OFFSET ?
"#;
const FIND_USER_BY_ID_QUERY: &str = r#"
  SELECT u.*, g.name AS group_name
  FROM users AS u
  LEFT OUTER JOIN student_groups AS g ON u.group_id = g.id
  WHERE u.id = ?1
"#;
const FIND_USER_BY_USERNAME_QUERY: &str = "SELECT * FROM users WHERE username = ?1";
const COUNT_USERS_QUERY: &str = "SELECT COUNT(*) FROM users";

/// Lists users with pagination
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `page` - Page number (1-based)
/// * `limit` - Number of items per page
///
/// # Returns
/// A tuple containing the users and total number of pages
pub async fn list(pool: &SqlitePool, page: i64, limit: i64) -> ApiResult<(Vec<User>, i64)> {
  let (total_count, users) = tokio::try_join!(get_total_count(pool), fetch_paginated_users(pool, page, limit))?;

  let total_pages = calculate_total_pages(total_count, limit);
  Ok((users, total_pages))
}

/// Finds a user by their ID, with the name of their group
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> ApiResult<Option<User>> {
  sqlx::query_as::<_, User>(FIND_USER_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> ApiResult<Option<User>> {
  sqlx::query_as::<_, User>(FIND_USER_BY_USERNAME_QUERY)
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

async fn get_total_count(pool: &SqlitePool) -> ApiResult<i64> {
  let (count,): (i64,) = sqlx::query_as(COUNT_USERS_QUERY).fetch_one(pool).await?;
  Ok(count)
}

async fn fetch_paginated_users(pool: &SqlitePool, page: i64, limit: i64) -> ApiResult<Vec<User>> {
  let offset = (page.max(1) - 1).saturating_mul(limit);

  sqlx::query_as::<_, User>(LIST_USERS_QUERY)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}
