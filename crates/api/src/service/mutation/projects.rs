use classhub_scheduling::SlotSource;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  entities::project::Project,
  error::{ApiError, ApiResult},
  service::{
    begin_write,
    query::{self, presentations::GroupSlots},
  },
  state::SchedulingContext,
};

const FIND_PROJECT_BY_NAME: &str = "SELECT * FROM projects WHERE name = ?1 AND id != ?2";
const INSERT_PROJECT: &str = r#"
  INSERT INTO projects (id, name, description, git_repo, group_id)
  VALUES (?1, ?2, ?3, ?4, ?5)
"#;
const UPDATE_PROJECT: &str = r#"
  UPDATE projects
  SET name = ?1, description = ?2, git_repo = ?3, group_id = ?4, updated_at = CURRENT_TIMESTAMP
  WHERE id = ?5
"#;
const MOVE_PRESENTATIONS: &str = r#"
  UPDATE presentations
  SET group_id = ?1, updated_at = CURRENT_TIMESTAMP
  WHERE project_id = ?2
"#;
const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = ?";

#[derive(Debug, Deserialize, Clone)]
pub struct CreateProjectParams {
  pub name: String,
  pub description: Option<String>,
  pub git_repo: Option<String>,
  pub group_id: Uuid,
}

/// Creates a new project owned by a group
///
/// # Errors
/// - AlreadyExists if a project with the same name exists
/// - ResourceNotFound if the group doesn't exist
pub async fn create(pool: &SqlitePool, params: CreateProjectParams) -> ApiResult<Project> {
  let id = Uuid::new_v4();
  ensure_name_free(pool, &params.name, id).await?;
  query::groups::ensure_exists(pool, params.group_id).await?;

  sqlx::query(INSERT_PROJECT)
    .bind(id)
    .bind(params.name)
    .bind(params.description.unwrap_or_default())
    .bind(params.git_repo)
    .bind(params.group_id)
    .execute(pool)
    .await?;

  get_project(pool, id).await
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateProjectParams {
  pub name: Option<String>,
  pub description: Option<String>,
  pub git_repo: Option<String>,
  pub group_id: Option<Uuid>,
}

/// Updates an existing project. Missing fields keep their stored values.
///
/// Moving the project to another group moves its presentations as well, so
/// they are checked against the target group's schedule and against each other first.
///
/// # Errors
/// - ResourceNotFound if the project or the new group doesn't exist
/// - AlreadyExists if another project has the new name
/// - TimeConflict if a moved presentation overlaps one of the target group or another moved one
pub async fn update(
  pool: &SqlitePool,
  ctx: &SchedulingContext,
  id: Uuid,
  params: UpdateProjectParams,
) -> ApiResult<Project> {
  let existing = get_project(pool, id).await?;

  let name = params.name.unwrap_or(existing.name);
  let description = params.description.unwrap_or(existing.description);
  let git_repo = params.git_repo.or(existing.git_repo);
  let group_id = params.group_id.unwrap_or(existing.group_id);

  ensure_name_free(pool, &name, id).await?;
  query::groups::ensure_exists(pool, group_id).await?;

  let moves = group_id != existing.group_id;
  let _guard = if moves {
    Some(ctx.locks.acquire(group_id).await)
  } else {
    None
  };
  let mut tx = begin_write(pool).await?;

  if moves {
    let moving = query::presentations::project_slots(&mut *tx, id).await?;
    let target = GroupSlots::new(&mut tx).group_slots(group_id, None).await?;
    let report = ctx.checker.evaluate_incoming(group_id, &moving, &target);

    if report.has_conflict {
      debug!("Rejecting move of project {} to group {}: {:?}", id, group_id, report.details);
      return Err(ApiError::TimeConflict(report));
    }

    let moved = sqlx::query(MOVE_PRESENTATIONS)
      .bind(group_id)
      .bind(id)
      .execute(&mut *tx)
      .await?;
    info!("Moved {} presentations of project {} to group {}", moved.rows_affected(), id, group_id);
  }

  sqlx::query(UPDATE_PROJECT)
    .bind(name)
    .bind(description)
    .bind(git_repo)
    .bind(group_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;

  get_project(pool, id).await
}

/// Deletes a project together with its presentations
pub async fn delete(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  let result = sqlx::query(DELETE_PROJECT).bind(id).execute(pool).await?;

  match result.rows_affected() {
    0 => Err(ApiError::ResourceNotFound(id.to_string())),
    _ => Ok(()),
  }
}

async fn get_project(pool: &SqlitePool, id: Uuid) -> ApiResult<Project> {
  query::projects::find_by_id(pool, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn ensure_name_free(pool: &SqlitePool, name: &str, id: Uuid) -> ApiResult<()> {
  let existing = sqlx::query_as::<_, Project>(FIND_PROJECT_BY_NAME)
    .bind(name)
    .bind(id)
    .fetch_optional(pool)
    .await?;

  match existing {
    Some(_) => Err(ApiError::AlreadyExists(format!("Project `{}`", name))),
    None => Ok(()),
  }
}
