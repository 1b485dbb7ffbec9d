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
  entities::{project::Project, user::User},
  error::{ApiError, ApiResult},
  handlers::auth::{auth_guard, ensure_staff},
  service::{mutation, query},
  state::SharedState,
  AppJson,
};

const PROJECTS_TAG: &str = "projects";

pub fn init_projects_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  OpenApiRouter::new()
    .routes(routes!(list_projects, create_project))
    .routes(routes!(get_project, update_project, delete_project))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  get,
  path = "/",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "List all projects successfully", body = [Project]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_projects(State(state): State<SharedState>) -> ApiResult<Json<Vec<Project>>> {
  let projects = query::projects::list(&state.pool).await?;

  Ok(Json(projects))
}

#[utoipa::path(
  get,
  path = "/{id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Project found", body = Project),
    (status = 404, description = "Project not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn get_project(State(state): State<SharedState>, Path(id): Path<Uuid>) -> ApiResult<Json<Project>> {
  query::projects::find_by_id(&state.pool, id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
  #[validate(length(min = 1, max = 200))]
  name: String,
  description: Option<String>,
  #[validate(length(max = 500))]
  git_repo: Option<String>,
  group_id: Uuid,
}

#[utoipa::path(
  post,
  path = "/",
  tag = PROJECTS_TAG,
  request_body = CreateProject,
  responses(
    (status = 201, description = "Project created", body = Project),
    (status = 400, description = "Validation error"),
    (status = 403, description = "Only staff can manage projects"),
    (status = 404, description = "Group not found"),
    (status = 409, description = "Project name already taken")
  )
)]
#[instrument(skip(state, user, input))]
async fn create_project(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::projects::CreateProjectParams {
    name: input.name,
    description: input.description,
    git_repo: input.git_repo,
    group_id: input.group_id,
  };

  debug!("Create project with request: {:?}", params);

  let project = mutation::projects::create(&state.pool, params).await?;

  Ok((StatusCode::CREATED, Json(project)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
  #[validate(length(min = 1, max = 200))]
  name: Option<String>,
  description: Option<String>,
  #[validate(length(max = 500))]
  git_repo: Option<String>,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = PROJECTS_TAG,
  request_body = UpdateProject,
  responses(
    (status = 200, description = "Project updated", body = Project),
    (status = 400, description = "Validation error"),
    (status = 403, description = "Only staff can manage projects"),
    (status = 404, description = "Project or group not found"),
    (status = 409, description = "Name taken, or the presentations clash with the target group")
  ),
  params(
    ("id" = Uuid, Path, description = "Project id")
  )
)]
#[instrument(skip(state, user, input))]
async fn update_project(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdateProject>,
) -> ApiResult<Json<Project>> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::projects::UpdateProjectParams {
    name: input.name,
    description: input.description,
    git_repo: input.git_repo,
    group_id: input.group_id,
  };

  debug!("Update project with id {} and params {:?}", id, params);

  let project = mutation::projects::update(&state.pool, &state.scheduling, id, params).await?;

  Ok(Json(project))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 204, description = "Project deleted with its presentations"),
    (status = 403, description = "Only staff can manage projects"),
    (status = 404, description = "Project not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Project id")
  )
)]
#[instrument(skip(state, user))]
async fn delete_project(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  ensure_staff(&user)?;

  mutation::projects::delete(&state.pool, id).await?;

  Ok(StatusCode::NO_CONTENT)
}
