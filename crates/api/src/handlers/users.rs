use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  middleware::from_fn_with_state,
  response::IntoResponse,
  Extension, Json,
};
use secrecy::SecretBox;
use serde::{Deserialize, Deserializer, Serialize};
use tower_cookies::{
  cookie::{time::Duration, SameSite},
  Cookie,
};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::user::{User, UserRole},
  error::{ApiError, ApiResult},
  handlers::auth::{auth_guard, encode_jwt, ensure_staff, AUTH_COOKIE_NAME},
  service::{mutation, query},
  state::SharedState,
  AppJson,
};

const USERS_TAG: &str = "users";
const DEFAULT_PAGE_SIZE: i64 = 10;

pub fn init_users_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  let public_routes = OpenApiRouter::new()
    .routes(routes!(register))
    .routes(routes!(login));

  let protected_routes = OpenApiRouter::new()
    .routes(routes!(get_me))
    .routes(routes!(logout))
    .routes(routes!(list_users, create_user))
    .routes(routes!(update_user, delete_user))
    .routes(routes!(change_password))
    .layer(from_fn_with_state(state, auth_guard));

  public_routes.merge(protected_routes)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
  #[validate(length(min = 3, max = 64))]
  username: String,
  #[validate(length(min = 6))]
  password: String,
  #[validate(email)]
  email: Option<String>,
  name: Option<String>,
  role: Option<UserRole>,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  post,
  path = "/register",
  tag = USERS_TAG,
  request_body = RegisterUser,
  responses(
    (status = 201, description = "Account created", body = User),
    (status = 400, description = "Validation error"),
    (status = 403, description = "Admin accounts cannot be self-registered"),
    (status = 409, description = "Username already taken")
  )
)]
#[instrument(skip(state, input))]
async fn register(
  State(state): State<SharedState>,
  AppJson(input): AppJson<RegisterUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
  input.validate()?;

  let role = input.role.unwrap_or(UserRole::Student);
  if role == UserRole::Admin {
    return Err(ApiError::Forbidden("Admin accounts cannot be registered".to_string()));
  }

  let params = mutation::users::CreateUserParams {
    username: input.username.to_ascii_lowercase(),
    email: input.email,
    name: input.name,
    role,
    group_id: input.group_id,
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Register new user with request: {:?}", params);

  let user = mutation::users::create(&state.pool, params).await?;

  info!("Registered user {} as {}", user.username, user.role);

  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUser {
  #[validate(length(min = 1))]
  username: String,
  #[validate(length(min = 1))]
  password: String,
}

#[derive(Debug, Serialize, ToSchema)]
struct LoginResponse {
  status: String,
  token: String,
}

#[utoipa::path(
  post,
  path = "/login",
  tag = USERS_TAG,
  request_body = LoginUser,
  responses(
    (status = 200, description = "Login successful", body = LoginResponse),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Invalid credentials")
  )
)]
#[instrument(skip(state, input))]
async fn login(State(state): State<SharedState>, AppJson(input): AppJson<LoginUser>) -> ApiResult<impl IntoResponse> {
  input.validate()?;

  let params = mutation::users::LoginParams {
    username: input.username.to_ascii_lowercase(),
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Try login user with params {:?}", params);

  let user = mutation::users::login(&state.pool, params).await?;
  let token = encode_jwt(&state.keys, state.jwt_maxage, user.id)?;

  let cookie = build_auth_cookie(token.clone(), Duration::minutes(state.jwt_maxage));
  let response = LoginResponse {
    status: "success".to_string(),
    token,
  };

  Ok(([(header::SET_COOKIE, cookie.to_string())], Json(response)))
}

#[utoipa::path(
  get,
  path = "/me",
  tag = USERS_TAG,
  responses(
    (status = OK, description = "Return current logged user", body = User),
    (status = 401, description = "Unauthorized")
  )
)]
async fn get_me(Extension(user): Extension<User>) -> ApiResult<Json<User>> {
  Ok(Json(user))
}

#[utoipa::path(
  post,
  path = "/logout",
  tag = USERS_TAG,
  responses(
    (status = 200, description = "Logout successful")
  )
)]
async fn logout() -> ApiResult<impl IntoResponse> {
  let cookie = build_auth_cookie(String::new(), Duration::seconds(-1));

  Ok((
    [(header::SET_COOKIE, cookie.to_string())],
    Json(serde_json::json!({"status": "success"})),
  ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
struct ListUsersParams {
  page: Option<i64>,
  users_per_page: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct UserPage {
  users: Vec<User>,
  page: i64,
  total_pages: i64,
}

#[utoipa::path(
  get,
  path = "/",
  tag = USERS_TAG,
  params(
    ListUsersParams
  ),
  responses(
    (status = 200, description = "List all users successfully", body = UserPage),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_users(
  State(state): State<SharedState>,
  Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<UserPage>> {
  let page = params.page.unwrap_or(1).max(1);
  let users_per_page = params.users_per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

  let (users, total_pages) = query::users::list(&state.pool, page, users_per_page).await?;

  Ok(Json(UserPage {
    users,
    page,
    total_pages,
  }))
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
  #[validate(length(min = 3, max = 64))]
  username: String,
  #[validate(length(min = 6))]
  password: String,
  #[validate(email)]
  email: Option<String>,
  name: Option<String>,
  role: UserRole,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  post,
  path = "/",
  tag = USERS_TAG,
  request_body = CreateUser,
  responses(
    (status = 201, description = "User created", body = User),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Only staff can create users"),
    (status = 409, description = "Username already taken")
  )
)]
#[instrument(skip(state, user, input))]
async fn create_user(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::users::CreateUserParams {
    username: input.username.to_ascii_lowercase(),
    email: input.email,
    name: input.name,
    role: input.role,
    group_id: input.group_id,
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Create new user with request: {:?}", params);

  let user = mutation::users::create(&state.pool, params).await?;

  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
  #[validate(length(min = 3, max = 64))]
  username: Option<String>,
  #[validate(email)]
  email: Option<String>,
  name: Option<String>,
  role: Option<UserRole>,
  /// `null` removes the user from their group
  #[serde(default, deserialize_with = "present")]
  #[schema(value_type = Option<Uuid>)]
  group_id: Option<Option<Uuid>>,
  #[validate(length(min = 6))]
  password: Option<String>,
}

/// Tells an explicit `null` apart from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = USERS_TAG,
  request_body = UpdateUser,
  responses(
    (status = 200, description = "User updated", body = User),
    (status = 400, description = "Validation error or empty update"),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Only staff can update users"),
    (status = 404, description = "User not found"),
    (status = 409, description = "Username already taken")
  ),
  params(
    ("id" = Uuid, Path, description = "User id")
  )
)]
#[instrument(skip(state, user, input))]
async fn update_user(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdateUser>,
) -> ApiResult<Json<User>> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::users::UpdateUserParams {
    username: input.username.map(|username| username.to_ascii_lowercase()),
    email: input.email,
    name: input.name,
    role: input.role,
    group_id: input.group_id,
    password: input.password.map(|password| SecretBox::new(Box::new(password))),
  };

  debug!("Update user with id {} and params {:?}", id, params);

  let user = mutation::users::update(&state.pool, id, params).await?;

  Ok(Json(user))
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
pub struct ChangePassword {
  #[validate(length(min = 6))]
  password: String,
}

#[utoipa::path(
  put,
  path = "/{id}/password",
  tag = USERS_TAG,
  request_body = ChangePassword,
  responses(
    (status = 200, description = "Password changed"),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Students can only change their own password"),
    (status = 404, description = "User not found")
  ),
  params(
    ("id" = Uuid, Path, description = "User id")
  )
)]
#[instrument(skip(state, user, input))]
async fn change_password(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<ChangePassword>,
) -> ApiResult<StatusCode> {
  if user.id != id {
    ensure_staff(&user)?;
  }
  input.validate()?;

  mutation::users::change_password(&state.pool, id, SecretBox::new(Box::new(input.password))).await?;

  Ok(StatusCode::OK)
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = USERS_TAG,
  responses(
    (status = 204, description = "User deleted"),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Only staff can delete users, admins cannot be deleted"),
    (status = 404, description = "User not found")
  ),
  params(
    ("id" = Uuid, Path, description = "User id")
  )
)]
#[instrument(skip(state, user))]
async fn delete_user(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  ensure_staff(&user)?;

  mutation::users::delete(&state.pool, id).await?;

  Ok(StatusCode::NO_CONTENT)
}

fn build_auth_cookie(token: String, max_age: Duration) -> Cookie<'static> {
  Cookie::build((AUTH_COOKIE_NAME, token))
    .path("/")
    .max_age(max_age)
    .same_site(SameSite::Lax)
    .http_only(true)
    .build()
}
