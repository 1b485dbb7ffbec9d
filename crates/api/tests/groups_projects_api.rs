//! HTTP-level tests for groups and projects, including moving a project with
//! its presentations to another group.

mod common;

use axum::http::{Method, StatusCode};
use classhub_api::entities::user::UserRole;
use common::{at, body_json, create_user, id_of, TestApp};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_group_lifecycle(pool: SqlitePool) {
  let app = TestApp::new(pool).await;

  let created = app.post("/api/groups", json!({ "name": "Group A" })).await;
  assert_eq!(created.status(), StatusCode::CREATED);
  let id = id_of(body_json(created).await);

  let duplicate = app.post("/api/groups", json!({ "name": "Group A" })).await;
  assert_eq!(duplicate.status(), StatusCode::CONFLICT);

  let renamed = app.put(&format!("/api/groups/{id}"), json!({ "name": "Group Z" })).await;
  assert_eq!(renamed.status(), StatusCode::OK);
  assert_eq!(body_json(renamed).await["name"], "Group Z");

  let groups = body_json(app.get("/api/groups").await).await;
  assert_eq!(groups.as_array().unwrap().len(), 1);

  assert_eq!(app.delete(&format!("/api/groups/{id}")).await.status(), StatusCode::NO_CONTENT);
  assert_eq!(app.delete(&format!("/api/groups/{id}")).await.status(), StatusCode::NOT_FOUND);

  let missing = app
    .put(&format!("/api/groups/{}", Uuid::new_v4()), json!({ "name": "Ghost" }))
    .await;
  assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_deleting_a_group_removes_its_schedule(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group = app.create_group("Group A").await;
  let project = app.create_project(group, "Compiler").await;
  app.schedule(project, group, "Compiler", at(10, 0), at(11, 0)).await;

  app.delete(&format!("/api/groups/{group}")).await;

  assert_eq!(body_json(app.get("/api/projects").await).await, json!([]));
  assert_eq!(body_json(app.get("/api/presentations").await).await, json!([]));
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_project_rules(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group = app.create_group("Group A").await;

  let created = app
    .post(
      "/api/projects",
      json!({ "name": "Compiler", "description": "Toy compiler", "gitRepo": "https://git.example.com/compiler", "groupId": group }),
    )
    .await;
  assert_eq!(created.status(), StatusCode::CREATED);
  let project = body_json(created).await;
  assert_eq!(project["groupName"], "Group A");
  assert_eq!(project["gitRepo"], "https://git.example.com/compiler");

  let duplicate = app
    .post("/api/projects", json!({ "name": "Compiler", "groupId": group }))
    .await;
  assert_eq!(duplicate.status(), StatusCode::CONFLICT);

  let orphan = app
    .post("/api/projects", json!({ "name": "Orphan", "groupId": Uuid::new_v4() }))
    .await;
  assert_eq!(orphan.status(), StatusCode::NOT_FOUND);

  let id = id_of(project);
  let updated = body_json(
    app
      .put(&format!("/api/projects/{id}"), json!({ "description": "Optimizing compiler" }))
      .await,
  )
  .await;
  assert_eq!(updated["name"], "Compiler");
  assert_eq!(updated["description"], "Optimizing compiler");

  assert_eq!(app.delete(&format!("/api/projects/{id}")).await.status(), StatusCode::NO_CONTENT);
  assert_eq!(app.get(&format!("/api/projects/{id}")).await.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_moving_a_project_moves_its_presentations(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group_a = app.create_group("Group A").await;
  let group_b = app.create_group("Group B").await;
  let project = app.create_project(group_a, "Compiler").await;
  let presentation = id_of(body_json(app.schedule(project, group_a, "Compiler", at(10, 0), at(11, 0)).await).await);

  let moved = app
    .put(&format!("/api/projects/{project}"), json!({ "groupId": group_b }))
    .await;
  assert_eq!(moved.status(), StatusCode::OK);
  assert_eq!(body_json(moved).await["groupName"], "Group B");

  let stored = body_json(app.get(&format!("/api/presentations/{presentation}")).await).await;
  assert_eq!(stored["groupId"], group_b.to_string());
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_move_into_a_busy_group_is_rejected(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group_a = app.create_group("Group A").await;
  let group_b = app.create_group("Group B").await;
  let moving = app.create_project(group_a, "Compiler").await;
  let resident = app.create_project(group_b, "Database").await;
  app.schedule(moving, group_a, "Compiler", at(10, 0), at(11, 0)).await;
  app.schedule(resident, group_b, "Database", at(10, 30), at(11, 30)).await;

  let response = app
    .put(&format!("/api/projects/{moving}"), json!({ "groupId": group_b }))
    .await;

  assert_eq!(response.status(), StatusCode::CONFLICT);
  let json = body_json(response).await;
  assert_eq!(json["error"], "time_conflict");
  assert_eq!(json["details"][0]["projectName"], "Database");

  let project = body_json(app.get(&format!("/api/projects/{moving}")).await).await;
  assert_eq!(project["groupId"], group_a.to_string());
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_students_read_but_do_not_write(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let student = create_user(&app.state.pool, "student", UserRole::Student).await;
  let token = app.token_for(&student);

  let list = app.send(Method::GET, "/api/groups", Some(&token), None).await;
  assert_eq!(list.status(), StatusCode::OK);

  let create = app
    .send(Method::POST, "/api/groups", Some(&token), Some(json!({ "name": "Rogue" })))
    .await;
  assert_eq!(create.status(), StatusCode::FORBIDDEN);
  assert_eq!(body_json(create).await["error"], "FORBIDDEN");
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_moved_presentations_may_not_overlap_each_other(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group_a = app.create_group("Group A").await;
  let group_b = app.create_group("Group B").await;
  let group_c = app.create_group("Group C").await;
  let project = app.create_project(group_a, "Compiler").await;
  let in_a = id_of(body_json(app.schedule(project, group_a, "Compiler", at(10, 0), at(11, 0)).await).await);
  let in_b = id_of(body_json(app.schedule(project, group_b, "Compiler", at(10, 0), at(11, 0)).await).await);

  let response = app
    .put(&format!("/api/projects/{project}"), json!({ "groupId": group_c }))
    .await;

  assert_eq!(response.status(), StatusCode::CONFLICT);
  assert_eq!(body_json(response).await["error"], "time_conflict");
  for (presentation, group) in [(in_a, group_a), (in_b, group_b)] {
    let stored = body_json(app.get(&format!("/api/presentations/{presentation}")).await).await;
    assert_eq!(stored["groupId"], group.to_string());
  }
}

#[sqlx::test(migrator = "classhub_api::MIGRATOR")]
async fn test_disjoint_presentations_from_several_groups_move_together(pool: SqlitePool) {
  let app = TestApp::new(pool).await;
  let group_a = app.create_group("Group A").await;
  let group_b = app.create_group("Group B").await;
  let group_c = app.create_group("Group C").await;
  let project = app.create_project(group_a, "Compiler").await;
  app.schedule(project, group_a, "Compiler", at(10, 0), at(11, 0)).await;
  app.schedule(project, group_b, "Compiler", at(13, 0), at(14, 0)).await;

  let response = app
    .put(&format!("/api/projects/{project}"), json!({ "groupId": group_c }))
    .await;
  assert_eq!(response.status(), StatusCode::OK);

  let all = body_json(app.get("/api/presentations").await).await;
  let groups: Vec<_> = all.as_array().unwrap().iter().map(|p| p["groupId"].clone()).collect();
  assert_eq!(groups, vec![json!(group_c.to_string()); 2]);
}
