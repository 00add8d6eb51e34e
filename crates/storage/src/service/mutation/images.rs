use chrono::Utc;
use sqlx::SqlitePool;

use project_hub_core::{entities::ProjectImage, HubResult};

use crate::service::query;

const INSERT_IMAGE: &str = r#"
  INSERT INTO project_images (id, project_id, url, caption, alt, width, height, file_size, mime_type, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;
const UPDATE_CAPTION: &str = "UPDATE project_images SET caption = ?1, updated_at = ?2 WHERE id = ?3";
const DELETE_IMAGE: &str = "DELETE FROM project_images WHERE id = ?1";

/// Records metadata for a file that is already stored
///
/// # Errors
/// - NotFound if the owning project doesn't exist
pub async fn create(pool: &SqlitePool, image: &ProjectImage) -> HubResult<ProjectImage> {
  query::projects::ensure_exists(pool, &image.project_id).await?;

  sqlx::query(INSERT_IMAGE)
    .bind(&image.id)
    .bind(&image.project_id)
    .bind(&image.url)
    .bind(&image.caption)
    .bind(&image.alt)
    .bind(image.width)
    .bind(image.height)
    .bind(image.file_size)
    .bind(&image.mime_type)
    .bind(image.created_at)
    .bind(image.updated_at)
    .execute(pool)
    .await?;

  query::images::find(pool, &image.id).await
}

/// # Errors
/// - NotFound if the image doesn't exist
pub async fn update_caption(pool: &SqlitePool, id: &str, caption: &str) -> HubResult<ProjectImage> {
  query::images::find(pool, id).await?;

  sqlx::query(UPDATE_CAPTION)
    .bind(caption)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

  query::images::find(pool, id).await
}

/// Deletes the row and hands it back so the caller can remove the file
///
/// # Errors
/// - NotFound if the image doesn't exist
pub async fn delete(pool: &SqlitePool, id: &str) -> HubResult<ProjectImage> {
  let image = query::images::find(pool, id).await?;

  sqlx::query(DELETE_IMAGE).bind(id).execute(pool).await?;

  Ok(image)
}
