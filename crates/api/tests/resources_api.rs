//! HTTP-level tests for shared resources, file downloads and the activity feed.

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, id_of, TestApp};
use serde_json::json;
use sqlx::SqlitePool;

// "hello world" as a text/plain data URL
const HELLO_TXT: &str = "data:text/plain;base64,aGVsbG8gd29ybGQ=";

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_upload_and_download_a_file(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group = app.create_group("Group A").await;

  let created = app
    .post(
      "/api/resources",
      json!({ "title": "Notes", "type": "file", "url": "notes.txt", "fileData": HELLO_TXT, "groupId": group }),
    )
    .await;
  assert_eq!(created.status(), StatusCode::CREATED);
  let resource = body_json(created).await;
  assert_eq!(resource["fileSize"], 11);
  assert_eq!(resource["fileType"], "txt");
  assert_eq!(resource["fileName"], "notes.txt");
  assert_eq!(resource["groupName"], "Group A");
  assert_eq!(resource["uploaderName"], "teacher");
  assert!(resource.get("fileData").is_none());
  let id = id_of(resource);

  let download = app.get(&format!("/api/resources/{id}/download")).await;
  assert_eq!(download.status(), StatusCode::OK);
  assert_eq!(download.headers()[header::CONTENT_TYPE], "text/plain");
  assert_eq!(
    download.headers()[header::CONTENT_DISPOSITION],
    "attachment; filename=\"notes.txt\""
  );
  assert_eq!(body_bytes(download).await, b"hello world");

  let listed = body_json(app.get("/api/resources").await).await;
  assert_eq!(listed[0]["downloads"], 1);

  let activities = body_json(app.get("/api/activities").await).await;
  let actions: Vec<_> = activities
    .as_array()
    .unwrap()
    .iter()
    .map(|activity| activity["action"].as_str().unwrap().to_string())
    .collect();
  assert_eq!(actions, vec!["update", "create"]);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_links_cannot_be_downloaded(pool: SqlitePool) {
  let app = TestApp::new(pool).await;

  let created = app
    .post(
      "/api/resources",
      json!({ "title": "Docs", "type": "link", "url": "https://docs.rs" }),
    )
    .await;
  assert_eq!(created.status(), StatusCode::CREATED);
  let link = body_json(created).await;
  assert!(link["fileSize"].is_null());

  let download = app.get(&format!("/api/resources/{}/download", id_of(link))).await;
  assert_eq!(download.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_malformed_file_data_is_rejected(pool: SqlitePool) {
  let app = TestApp::new(pool).await;

  let response = app
    .post(
      "/api/resources",
      json!({ "title": "Broken", "type": "file", "url": "broken.bin", "fileData": "not-a-data-url" }),
    )
    .await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(response).await["error"], "INVALID_INPUT_ERROR");
  assert_eq!(body_json(app.get("/api/resources").await).await, json!([]));
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_update_and_delete_are_logged(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let id = id_of(
    body_json(
      app
        .post(
          "/api/resources",
          json!({ "title": "Notes", "type": "file", "url": "notes.txt", "fileData": HELLO_TXT }),
        )
        .await,
    )
    .await,
  );

  let updated = app
    .put(
      &format!("/api/resources/{id}"),
      json!({ "title": "Slides", "url": "slides.pdf", "fileData": "data:application/pdf;base64,JVBERi0=" }),
    )
    .await;
  assert_eq!(updated.status(), StatusCode::OK);
  let resource = body_json(updated).await;
  assert_eq!(resource["title"], "Slides");
  assert_eq!(resource["fileSize"], 5);
  assert_eq!(resource["fileType"], "pdf");

  assert_eq!(app.delete(&format!("/api/resources/{id}")).await.status(), StatusCode::NO_CONTENT);
  assert_eq!(
    app.get(&format!("/api/resources/{id}/download")).await.status(),
    StatusCode::NOT_FOUND
  );

  let activities = body_json(app.get("/api/activities?limit=1").await).await;
  assert_eq!(activities.as_array().unwrap().len(), 1);
  assert_eq!(activities[0]["action"], "delete");
  assert_eq!(activities[0]["targetName"], "Slides");
  assert_eq!(activities[0]["type"], "resource");
}
