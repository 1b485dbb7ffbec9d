use axum::{
  extract::{FromRequest, State},
  http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode,
  },
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use error::ApiError;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use handlers::{
  activities::init_activities_routes, groups::init_groups_routes, presentations::init_presentations_routes,
  projects::init_projects_routes, resources::init_resources_routes, users::init_users_routes,
};
use state::SharedState;

pub mod config;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod service;
pub mod state;
pub mod workers;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const CLASSHUB_TAG: &str = "classhub";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct AppJson<T>(T);

/// Handle health check requests
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
  match sqlx::query("SELECT 1").execute(&state.pool).await {
    Ok(_) => (
      StatusCode::OK,
      Json(json!({
        "code": "200",
        "success": true,
      })),
    ),
    Err(_) => (
      StatusCode::SERVICE_UNAVAILABLE,
      Json(json!({
        "code": "503",
        "success": false,
      })),
    ),
  }
}

/// Builds the full HTTP application: API routes, health check and Swagger UI.
pub fn app(state: SharedState, cors_origin: &str) -> anyhow::Result<Router> {
  let cors = CorsLayer::new()
    .allow_origin(cors_origin.parse::<HeaderValue>()?)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_credentials(true)
    .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
    .expose_headers([CONTENT_DISPOSITION]);

  #[derive(OpenApi)]
  #[openapi(
    tags(
      (name = CLASSHUB_TAG, description = "Classroom project and presentation scheduling API")
    )
  )]
  struct ApiDoc;

  let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
    .route("/health", get(health_handler))
    .nest("/api/users", init_users_routes(state.clone()))
    .nest("/api/groups", init_groups_routes(state.clone()))
    .nest("/api/projects", init_projects_routes(state.clone()))
    .nest("/api/presentations", init_presentations_routes(state.clone()))
    .nest("/api/resources", init_resources_routes(state.clone()))
    .nest("/api/activities", init_activities_routes(state.clone()))
    .layer(CookieManagerLayer::new())
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
    .split_for_parts();

  Ok(router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api)))
}

pub async fn run(state: SharedState, server_url: String, cors_origin: String, cancel_token: CancellationToken) -> anyhow::Result<()> {
  let router = app(state, &cors_origin)?;

  info!("Starting api server on {}...", server_url);

  let listener = TcpListener::bind(&server_url).await?;
  axum::serve(listener, router.into_make_service())
    .with_graceful_shutdown(Box::pin(async move { cancel_token.cancelled().await }))
    .await?;

  info!("Stopped api server");

  Ok(())
}
