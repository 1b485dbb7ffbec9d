use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::activities::{self, NewActivity};
use crate::{
  entities::{
    activity::ActivityAction,
    resource::{FilePayload, Resource, ResourceKind},
  },
  error::{ApiError, ApiResult},
  service::{begin_write, query},
};

const ACTIVITY_KIND: &str = "resource";
const ACTIVITY_PATH: &str = "/resources";

const INSERT_RESOURCE: &str = r#"
  INSERT INTO resources
    (id, title, type, url, file_data, file_size, file_type, file_name, description, group_id, uploaded_by)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;
const UPDATE_RESOURCE: &str = r#"
  UPDATE resources
  SET title = ?1, url = ?2, file_data = ?3, file_size = ?4, file_type = ?5, file_name = ?6,
      description = ?7, group_id = ?8, updated_at = CURRENT_TIMESTAMP
  WHERE id = ?9
"#;
const INCREMENT_DOWNLOADS: &str = "UPDATE resources SET downloads = downloads + 1 WHERE id = ?1";
const DELETE_RESOURCE: &str = "DELETE FROM resources WHERE id = ?";

/// File columns derived from an uploaded data URL.
#[derive(Debug, Default, PartialEq, Eq)]
struct FileColumns {
  data: Option<String>,
  size: Option<i64>,
  file_type: Option<String>,
  name: Option<String>,
}

impl FileColumns {
  fn from_upload(data_url: String, url: &str) -> ApiResult<Self> {
    let payload = FilePayload::parse(&data_url)?;

    Ok(Self {
      size: Some(payload.size()),
      file_type: Some(payload.file_type(url)),
      name: Some(url.to_string()),
      data: Some(data_url),
    })
  }

  fn of(resource: &Resource) -> Self {
    Self {
      data: resource.file_data.clone(),
      size: resource.file_size,
      file_type: resource.file_type.clone(),
      name: resource.file_name.clone(),
    }
  }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateResourceParams {
  pub title: String,
  pub kind: ResourceKind,
  pub url: String,
  pub file_data: Option<String>,
  pub description: Option<String>,
  pub group_id: Option<Uuid>,
}

/// Shares a link or an uploaded file
///
/// # Errors
/// - InvalidFileData if a file resource comes without a valid data URL
/// - ResourceNotFound if the group doesn't exist
pub async fn create(pool: &SqlitePool, uploaded_by: Uuid, params: CreateResourceParams) -> ApiResult<Resource> {
  let file = match (params.kind, params.file_data) {
    (ResourceKind::File, Some(data_url)) => FileColumns::from_upload(data_url, &params.url)?,
    (ResourceKind::File, None) => {
      return Err(ApiError::InvalidFileData("file resources need file data".to_string()));
    },
    (ResourceKind::Link, _) => FileColumns::default(),
  };

  if let Some(group_id) = params.group_id {
    query::groups::ensure_exists(pool, group_id).await?;
  }

  let id = Uuid::new_v4();
  let mut tx = begin_write(pool).await?;

  sqlx::query(INSERT_RESOURCE)
    .bind(id)
    .bind(&params.title)
    .bind(params.kind.to_string())
    .bind(&params.url)
    .bind(file.data)
    .bind(file.size)
    .bind(file.file_type)
    .bind(file.name)
    .bind(params.description)
    .bind(params.group_id)
    .bind(uploaded_by)
    .execute(&mut *tx)
    .await?;

  activities::record(
    &mut *tx,
    NewActivity {
      kind: ACTIVITY_KIND,
      action: ActivityAction::Create,
      target_id: id,
      target_name: &params.title,
      user_id: Some(uploaded_by),
      path: ACTIVITY_PATH.to_string(),
    },
  )
  .await?;

  tx.commit().await?;

  get_resource(pool, id).await
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateResourceParams {
  pub title: Option<String>,
  pub url: Option<String>,
  pub file_data: Option<String>,
  pub description: Option<String>,
  pub group_id: Option<Uuid>,
}

/// Updates the provided fields. New file data recomputes the file columns.
pub async fn update(pool: &SqlitePool, id: Uuid, user_id: Uuid, params: UpdateResourceParams) -> ApiResult<Resource> {
  let existing = get_resource(pool, id).await?;

  let title = params.title.unwrap_or_else(|| existing.title.clone());
  let url = params.url.unwrap_or_else(|| existing.url.clone());
  let file = match params.file_data {
    Some(data_url) => FileColumns::from_upload(data_url, &url)?,
    None => FileColumns::of(&existing),
  };
  let group_id = params.group_id.or(existing.group_id);

  if let Some(group_id) = params.group_id {
    query::groups::ensure_exists(pool, group_id).await?;
  }

  let mut tx = begin_write(pool).await?;

  sqlx::query(UPDATE_RESOURCE)
    .bind(&title)
    .bind(url)
    .bind(file.data)
    .bind(file.size)
    .bind(file.file_type)
    .bind(file.name)
    .bind(params.description.or(existing.description))
    .bind(group_id)
    .bind(id)
    .execute(&mut *tx)
    .await?;

  activities::record(
    &mut *tx,
    NewActivity {
      kind: ACTIVITY_KIND,
      action: ActivityAction::Update,
      target_id: id,
      target_name: &title,
      user_id: Some(user_id),
      path: ACTIVITY_PATH.to_string(),
    },
  )
  .await?;

  tx.commit().await?;

  get_resource(pool, id).await
}

/// Deletes a resource and logs the deletion in one transaction
pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<()> {
  let existing = get_resource(pool, id).await?;
  let mut tx = begin_write(pool).await?;

  sqlx::query(DELETE_RESOURCE).bind(id).execute(&mut *tx).await?;

  activities::record(
    &mut *tx,
    NewActivity {
      kind: ACTIVITY_KIND,
      action: ActivityAction::Delete,
      target_id: id,
      target_name: &existing.title,
      user_id: Some(user_id),
      path: ACTIVITY_PATH.to_string(),
    },
  )
  .await?;

  tx.commit().await.map_err(Into::into)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
  pub file_name: String,
  pub mime_type: String,
  pub bytes: Vec<u8>,
}

/// Decodes the stored file, bumps the download counter and logs the download
///
/// # Errors
/// - BadRequest if the resource is a link
/// - ResourceNotFound if the resource or its file data doesn't exist
/// - InvalidFileData if the stored data URL is broken
pub async fn download(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<Download> {
  let resource = get_resource(pool, id).await?;

  if resource.kind() != Some(ResourceKind::File) {
    return Err(ApiError::BadRequest("The resource is not a file".to_string()));
  }

  let data_url = resource
    .file_data
    .as_deref()
    .ok_or_else(|| ApiError::ResourceNotFound(format!("file of {}", id)))?;
  let payload = FilePayload::parse(data_url)?;

  let mut tx = begin_write(pool).await?;

  sqlx::query(INCREMENT_DOWNLOADS).bind(id).execute(&mut *tx).await?;

  activities::record(
    &mut *tx,
    NewActivity {
      kind: ACTIVITY_KIND,
      action: ActivityAction::Update,
      target_id: id,
      target_name: &resource.title,
      user_id: Some(user_id),
      path: ACTIVITY_PATH.to_string(),
    },
  )
  .await?;

  tx.commit().await?;

  Ok(Download {
    file_name: resource.file_name.unwrap_or(resource.url),
    mime_type: payload.mime_type,
    bytes: payload.bytes,
  })
}

async fn get_resource(pool: &SqlitePool, id: Uuid) -> ApiResult<Resource> {
  query::resources::find_by_id(pool, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
  use assert_matches::assert_matches;

  use super::*;

  #[test]
  fn test_upload_fills_file_columns() {
    let file = FileColumns::from_upload("data:application/pdf;base64,JVBERi0=".to_string(), "slides.pdf").unwrap();

    assert_eq!(file.size, Some(5));
    assert_eq!(file.file_type.as_deref(), Some("pdf"));
    assert_eq!(file.name.as_deref(), Some("slides.pdf"));
    assert!(file.data.is_some());
  }

  #[test]
  fn test_broken_upload_is_rejected() {
    assert_matches!(
      FileColumns::from_upload("not a data url".to_string(), "slides.pdf"),
      Err(ApiError::InvalidFileData(_))
    );
  }
}
