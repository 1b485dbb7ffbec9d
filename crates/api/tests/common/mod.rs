#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
  body::Body,
  http::{header, Method, Request, Response},
  Router,
};
use chrono::{DateTime, TimeZone, Utc};
use classhub_api::{
  config::Config,
  entities::user::{User, UserRole},
  handlers::auth::encode_jwt,
  service::mutation,
  state::{AppState, SharedState},
};
use classhub_scheduling::{FixedClock, OverlapPolicy};
use http_body_util::BodyExt;
use secrecy::SecretBox;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "secret-password";

/// 2024-05-01 at the given time, UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

pub fn test_config(overlap_policy: OverlapPolicy) -> Config {
  Config {
    database_url: "sqlite::memory:".to_string(),
    host: "127.0.0.1".to_string(),
    port: 0,
    cors_origin: "http://localhost:5173".to_string(),
    jwt_secret: SecretBox::new(Box::new("test-secret".to_string())),
    jwt_maxage: 60,
    overlap_policy,
    status_refresh_interval: Duration::from_secs(30),
    admin_password: None,
  }
}

pub struct TestApp {
  pub router: Router,
  pub state: SharedState,
  pub clock: Arc<FixedClock>,
  /// Token of a teacher account.
  pub token: String,
}

impl TestApp {
  pub async fn new(pool: SqlitePool) -> Self {
    Self::with_policy(pool, OverlapPolicy::default()).await
  }

  /// App with the clock frozen at 08:00, before every scheduled slot.
  pub async fn with_policy(pool: SqlitePool, overlap_policy: OverlapPolicy) -> Self {
    let clock = Arc::new(FixedClock::new(at(8, 0)));
    let state = Arc::new(AppState::new(pool, &test_config(overlap_policy)).with_clock(clock.clone()));
    let router = classhub_api::app(state.clone(), "http://localhost:5173").unwrap();

    let teacher = create_user(&state.pool, "teacher", UserRole::Teacher).await;
    let token = encode_jwt(&state.keys, state.jwt_maxage, teacher.id).unwrap();

    Self {
      router,
      state,
      clock,
      token,
    }
  }

  pub fn token_for(&self, user: &User) -> String {
    encode_jwt(&self.state.keys, self.state.jwt_maxage, user.id).unwrap()
  }

  pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
      request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
      Some(body) => request
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string())),
      None => request.body(Body::empty()),
    }
    .unwrap();

    self.router.clone().oneshot(request).await.unwrap()
  }

  pub async fn get(&self, uri: &str) -> Response<Body> {
    self.send(Method::GET, uri, Some(&self.token), None).await
  }

  pub async fn post(&self, uri: &str, body: Value) -> Response<Body> {
    self.send(Method::POST, uri, Some(&self.token), Some(body)).await
  }

  pub async fn put(&self, uri: &str, body: Value) -> Response<Body> {
    self.send(Method::PUT, uri, Some(&self.token), Some(body)).await
  }

  pub async fn delete(&self, uri: &str) -> Response<Body> {
    self.send(Method::DELETE, uri, Some(&self.token), None).await
  }

  pub async fn create_group(&self, name: &str) -> Uuid {
    let response = self.post("/api/groups", json!({ "name": name })).await;
    id_of(body_json(response).await)
  }

  pub async fn create_project(&self, group_id: Uuid, name: &str) -> Uuid {
    let response = self
      .post("/api/projects", json!({ "name": name, "groupId": group_id }))
      .await;
    id_of(body_json(response).await)
  }

  pub async fn schedule(
    &self,
    project_id: Uuid,
    group_id: Uuid,
    name: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Response<Body> {
    self
      .post(
        "/api/presentations",
        json!({
          "projectId": project_id,
          "projectName": name,
          "description": "",
          "startTime": start,
          "endTime": end,
          "groupId": group_id,
        }),
      )
      .await
  }
}

pub async fn create_user(pool: &SqlitePool, username: &str, role: UserRole) -> User {
  mutation::users::create(
    pool,
    mutation::users::CreateUserParams {
      username: username.to_string(),
      email: None,
      name: None,
      role,
      group_id: None,
      password: SecretBox::new(Box::new(PASSWORD.to_string())),
    },
  )
  .await
  .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
  response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
  serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn id_of(value: Value) -> Uuid {
  value["id"].as_str().unwrap().parse().unwrap()
}
