use axum::{
  extract::{Query, State},
  middleware::from_fn_with_state,
  Json,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
  entities::activity::Activity,
  error::ApiResult,
  handlers::auth::auth_guard,
  service::query,
  state::SharedState,
};

const ACTIVITIES_TAG: &str = "activities";
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;

pub fn init_activities_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  OpenApiRouter::new()
    .routes(routes!(list_activities))
    .layer(from_fn_with_state(state, auth_guard))
}

#[derive(Debug, Deserialize, IntoParams)]
struct ListActivitiesParams {
  limit: Option<i64>,
}

#[utoipa::path(
  get,
  path = "/",
  tag = ACTIVITIES_TAG,
  params(
    ListActivitiesParams
  ),
  responses(
    (status = 200, description = "Most recent activities first", body = [Activity]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_activities(
  State(state): State<SharedState>,
  Query(params): Query<ListActivitiesParams>,
) -> ApiResult<Json<Vec<Activity>>> {
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

  let activities = query::activities::list_recent(&state.pool, limit).await?;

  Ok(Json(activities))
}
