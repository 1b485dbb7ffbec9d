use axum::{
  extract::{Path, State},
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension, Json,
};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{group::Group, user::User},
  error::ApiResult,
  handlers::auth::{auth_guard, ensure_staff},
  service::{mutation, query},
  state::SharedState,
  AppJson,
};

const GROUPS_TAG: &str = "groups";

pub fn init_groups_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  OpenApiRouter::new()
    .routes(routes!(list_groups, create_group))
    .routes(routes!(update_group, delete_group))
    .layer(from_fn_with_state(state, auth_guard))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GroupInput {
  #[validate(length(min = 1, max = 100))]
  name: String,
}

impl From<GroupInput> for mutation::groups::GroupParams {
  fn from(input: GroupInput) -> Self {
    Self {
      name: input.name.trim().to_string(),
    }
  }
}

#[utoipa::path(
  get,
  path = "/",
  tag = GROUPS_TAG,
  responses(
    (status = 200, description = "List all groups successfully", body = [Group]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_groups(State(state): State<SharedState>) -> ApiResult<Json<Vec<Group>>> {
  let groups = query::groups::list(&state.pool).await?;

  Ok(Json(groups))
}

#[utoipa::path(
  post,
  path = "/",
  tag = GROUPS_TAG,
  request_body = GroupInput,
  responses(
    (status = 201, description = "Group created", body = Group),
    (status = 400, description = "Validation error"),
    (status = 403, description = "Only staff can manage groups"),
    (status = 409, description = "Group name already taken")
  )
)]
#[instrument(skip(state, user, input))]
async fn create_group(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<GroupInput>,
) -> ApiResult<(StatusCode, Json<Group>)> {
  ensure_staff(&user)?;
  input.validate()?;

  debug!("Create group with request: {:?}", input);

  let group = mutation::groups::create(&state.pool, input.into()).await?;

  Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = GROUPS_TAG,
  request_body = GroupInput,
  responses(
    (status = 200, description = "Group renamed", body = Group),
    (status = 400, description = "Validation error"),
    (status = 403, description = "Only staff can manage groups"),
    (status = 404, description = "Group not found"),
    (status = 409, description = "Group name already taken")
  ),
  params(
    ("id" = Uuid, Path, description = "Group id")
  )
)]
#[instrument(skip(state, user, input))]
async fn update_group(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<GroupInput>,
) -> ApiResult<Json<Group>> {
  ensure_staff(&user)?;
  input.validate()?;

  let group = mutation::groups::update(&state.pool, id, input.into()).await?;

  Ok(Json(group))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = GROUPS_TAG,
  responses(
    (status = 204, description = "Group deleted with its projects and presentations"),
    (status = 403, description = "Only staff can manage groups"),
    (status = 404, description = "Group not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Group id")
  )
)]
#[instrument(skip(state, user))]
async fn delete_group(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  ensure_staff(&user)?;

  mutation::groups::delete(&state.pool, id).await?;

  Ok(StatusCode::NO_CONTENT)
}
