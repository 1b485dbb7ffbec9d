mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp};
use sqlx::SqlitePool;

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_health_checks_the_database(pool: SqlitePool) {
  let app = TestApp::new(pool).await;

  let response = app.send(Method::GET, "/health", None, None).await;

  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(body_json(response).await["success"], true);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_health_reports_a_closed_pool(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  app.state.pool.close().await;

  let response = app.send(Method::GET, "/health", None, None).await;

  assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_openapi_document_is_served(pool: SqlitePool) {
  let app = TestApp::new(pool).await;

  let response = app.send(Method::GET, "/api-docs/openapi.json", None, None).await;

  assert_eq!(response.status(), StatusCode::OK);
  let json = body_json(response).await;
  assert!(json["paths"].as_object().unwrap().keys().any(|path| path.starts_with("/api/presentations")));
}
