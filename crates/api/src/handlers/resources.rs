use axum::{
  extract::{Path, State},
  http::{header, StatusCode},
  middleware::from_fn_with_state,
  response::IntoResponse,
  Extension, Json,
};
use serde::Deserialize;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{
    resource::{Resource, ResourceKind},
    user::User,
  },
  error::ApiResult,
  handlers::auth::auth_guard,
  service::{mutation, query},
  state::SharedState,
  AppJson,
};

const RESOURCES_TAG: &str = "resources";

pub fn init_resources_routes(state: SharedState) -> OpenApiRouter<SharedState> {
  OpenApiRouter::new()
    .routes(routes!(list_resources, create_resource))
    .routes(routes!(update_resource, delete_resource))
    .routes(routes!(download_resource))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  get,
  path = "/",
  tag = RESOURCES_TAG,
  responses(
    (status = 200, description = "Active resources, newest first", body = [Resource]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state))]
async fn list_resources(State(state): State<SharedState>) -> ApiResult<Json<Vec<Resource>>> {
  let resources = query::resources::list_active(&state.pool).await?;

  Ok(Json(resources))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateResource {
  #[validate(length(min = 1, max = 200))]
  title: String,
  #[serde(rename = "type")]
  kind: ResourceKind,
  #[validate(length(min = 1))]
  url: String,
  /// `data:<mime>;base64,<payload>`, required for files
  file_data: Option<String>,
  description: Option<String>,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  post,
  path = "/",
  tag = RESOURCES_TAG,
  request_body = CreateResource,
  responses(
    (status = 201, description = "Resource shared", body = Resource),
    (status = 400, description = "Validation error or malformed file data"),
    (status = 404, description = "Group not found")
  )
)]
#[instrument(skip(state, user, input))]
async fn create_resource(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateResource>,
) -> ApiResult<(StatusCode, Json<Resource>)> {
  input.validate()?;

  let params = mutation::resources::CreateResourceParams {
    title: input.title,
    kind: input.kind,
    url: input.url,
    file_data: input.file_data,
    description: input.description,
    group_id: input.group_id,
  };

  debug!("Share {} resource {:?} by {}", params.kind, params.title, user.username);

  let resource = mutation::resources::create(&state.pool, user.id, params).await?;

  Ok((StatusCode::CREATED, Json(resource)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResource {
  #[validate(length(min = 1, max = 200))]
  title: Option<String>,
  #[validate(length(min = 1))]
  url: Option<String>,
  file_data: Option<String>,
  description: Option<String>,
  group_id: Option<Uuid>,
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = RESOURCES_TAG,
  request_body = UpdateResource,
  responses(
    (status = 200, description = "Resource updated", body = Resource),
    (status = 400, description = "Validation error or malformed file data"),
    (status = 404, description = "Resource or group not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Resource id")
  )
)]
#[instrument(skip(state, user, input))]
async fn update_resource(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdateResource>,
) -> ApiResult<Json<Resource>> {
  input.validate()?;

  let params = mutation::resources::UpdateResourceParams {
    title: input.title,
    url: input.url,
    file_data: input.file_data,
    description: input.description,
    group_id: input.group_id,
  };

  let resource = mutation::resources::update(&state.pool, id, user.id, params).await?;

  Ok(Json(resource))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = RESOURCES_TAG,
  responses(
    (status = 204, description = "Resource deleted"),
    (status = 404, description = "Resource not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Resource id")
  )
)]
#[instrument(skip(state, user))]
async fn delete_resource(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  mutation::resources::delete(&state.pool, id, user.id).await?;

  Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
  get,
  path = "/{id}/download",
  tag = RESOURCES_TAG,
  responses(
    (status = 200, description = "File contents", content_type = "application/octet-stream"),
    (status = 400, description = "The resource is not a file"),
    (status = 404, description = "Resource or file data not found")
  ),
  params(
    ("id" = Uuid, Path, description = "Resource id")
  )
)]
#[instrument(skip(state, user))]
async fn download_resource(
  State(state): State<SharedState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
  let download = mutation::resources::download(&state.pool, id, user.id).await?;

  info!("{} downloads {} ({} bytes)", user.username, download.file_name, download.bytes.len());

  let headers = [
    (header::CONTENT_TYPE, download.mime_type),
    (
      header::CONTENT_DISPOSITION,
      format!("attachment; filename=\"{}\"", header_safe(&download.file_name)),
    ),
    (header::CONTENT_LENGTH, download.bytes.len().to_string()),
  ];

  Ok((headers, download.bytes))
}

/// Keeps a file name usable inside a quoted header parameter.
fn header_safe(file_name: &str) -> String {
  file_name
    .chars()
    .map(|c| match c {
      '"' | '\\' => '_',
      c if c.is_ascii_graphic() || c == ' ' => c,
      _ => '_',
    })
    .collect()
}
