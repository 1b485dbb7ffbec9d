use axum::{
  extract::{Path, Query, State},
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension, Json,
};
use chrono::{DateTime, Utc};
use classhub_scheduling::{ConflictQuery, ConflictReport, Interval};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{presentation::Presentation, user::User},
  error::{ApiError, ApiResult},
  handlers::auth::{auth_guard, ensure_staff},
  service::{mutation, query},
  state::SharedState,
  AppJson,
};

const PRESENTATIONS_TAG: &str = "presentations";

pub fn init_presentations_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  OpenApiRouter::new()
    .routes(routes!(list_presentations, create_presentation))
    .routes(routes!(check_conflicts))
    .routes(routes!(get_presentation, update_presentation, delete_presentation))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  get,
  path = "/",
  tag = PRESENTATIONS_TAG,
  responses(
    (status = 200, description = "All presentations by start time", body = [Presentation]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_presentations(State(state): State<SharedState>) -> ApiResult<Json<Vec<Presentation>>> {
  let now = state.scheduling.now();
  let presentations = query::presentations::list(&state.pool)
    .await?
    .into_iter()
    .map(|row| row.into_presentation(now))
    .collect();

  Ok(Json(presentations))
}

#[utoipa::path(
  get,
  path = "/{id}",
  tag = PRESENTATIONS_TAG,
  responses(
    (status = 200, description = "Presentation found", body = Presentation),
    (status = 404, description = "Presentation not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Presentation id")
  )
)]
#[instrument(skip(state))]
async fn get_presentation(State(state): State<SharedState>, Path(id): Path<Uuid>) -> ApiResult<Json<Presentation>> {
  query::presentations::find_by_id(&state.pool, id)
    .await?
    .map(|row| Json(row.into_presentation(state.scheduling.now())))
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePresentation {
  project_id: Uuid,
  #[validate(length(min = 1, max = 200))]
  project_name: String,
  description: Option<String>,
  start_time: DateTime<Utc>,
  end_time: DateTime<Utc>,
  group_id: Uuid,
}

#[utoipa::path(
  post,
  path = "/",
  tag = PRESENTATIONS_TAG,
  request_body = CreatePresentation,
  responses(
    (status = 201, description = "Presentation scheduled", body = Presentation),
    (status = 400, description = "Validation error or empty time range"),
    (status = 403, description = "Only staff can schedule presentations"),
    (status = 404, description = "Project or group not found"),
    (status = 409, description = "The group already presents in that time range")
  )
)]
#[instrument(skip(state, user, input))]
async fn create_presentation(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreatePresentation>,
) -> ApiResult<(StatusCode, Json<Presentation>)> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::presentations::CreatePresentationParams {
    project_id: input.project_id,
    project_name: input.project_name,
    description: input.description,
    start_time: input.start_time,
    end_time: input.end_time,
    group_id: input.group_id,
  };

  debug!("Schedule presentation with request: {:?}", params);

  let presentation = mutation::presentations::create(&state.pool, &state.scheduling, params).await?;

  info!(
    "Scheduled presentation {} for group {} from {} to {}",
    presentation.id, presentation.group_id, presentation.start_time, presentation.end_time
  );

  Ok((StatusCode::CREATED, Json(presentation)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePresentation {
  project_id: Option<Uuid>,
  #[validate(length(min = 1, max = 200))]
  project_name: Option<String>,
  description: Option<String>,
  start_time: Option<DateTime<Utc>>,
  end_time: Option<DateTime<Utc>>,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = PRESENTATIONS_TAG,
  request_body = UpdatePresentation,
  responses(
    (status = 200, description = "Presentation updated", body = Presentation),
    (status = 400, description = "Validation error or empty time range"),
    (status = 403, description = "Only staff can schedule presentations"),
    (status = 404, description = "Presentation, project or group not found"),
    (status = 409, description = "The group already presents in that time range")
  ),
  params(
    ("id" = Uuid, Path, description = "Presentation id")
  )
)]
#[instrument(skip(state, user, input))]
async fn update_presentation(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdatePresentation>,
) -> ApiResult<Json<Presentation>> {
  ensure_staff(&user)?;
  input.validate()?;

  let params = mutation::presentations::UpdatePresentationParams {
    project_id: input.project_id,
    project_name: input.project_name,
    description: input.description,
    start_time: input.start_time,
    end_time: input.end_time,
    group_id: input.group_id,
  };

  debug!("Update presentation with id {} and params {:?}", id, params);

  let presentation = mutation::presentations::update(&state.pool, &state.scheduling, id, params).await?;

  Ok(Json(presentation))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = PRESENTATIONS_TAG,
  responses(
    (status = 204, description = "Presentation deleted"),
    (status = 403, description = "Only staff can delete presentations"),
    (status = 404, description = "Presentation not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Presentation id")
  )
)]
#[instrument(skip(state, user))]
async fn delete_presentation(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  ensure_staff(&user)?;

  mutation::presentations::delete(&state.pool, id).await?;

  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
struct ConflictParams {
  group_id: Uuid,
  start_time: DateTime<Utc>,
  end_time: DateTime<Utc>,
  exclude_id: Option<Uuid>,
}

#[utoipa::path(
  get,
  path = "/conflicts",
  tag = PRESENTATIONS_TAG,
  params(
    ConflictParams
  ),
  responses(
    (status = 200, description = "Presentations of the group overlapping the range", body = ConflictReport),
    (status = 400, description = "Empty or reversed time range")
  )
)]
#[instrument(skip(state))]
async fn check_conflicts(
  State(state): State<SharedState>,
  Query(params): Query<ConflictParams>,
) -> ApiResult<Json<ConflictReport>> {
  let query = ConflictQuery {
    group_id: params.group_id,
    interval: Interval::new(params.start_time, params.end_time)?,
    exclude_id: params.exclude_id,
  };

  let report = query::presentations::conflicts(&state.pool, &state.scheduling, &query).await?;

  Ok(Json(report))
}
