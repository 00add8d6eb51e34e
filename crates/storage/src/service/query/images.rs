use sqlx::SqlitePool;

use project_hub_core::{entities::ProjectImage, HubError, HubResult};

const IMAGE_COLUMNS: &str =
  "id, project_id, url, caption, alt, width, height, file_size, mime_type, created_at, updated_at";

pub async fn list_for_project(pool: &SqlitePool, project_id: &str) -> HubResult<Vec<ProjectImage>> {
  let query = format!("SELECT {IMAGE_COLUMNS} FROM project_images WHERE project_id = ?1 ORDER BY rowid");

  sqlx::query_as::<_, ProjectImage>(&query)
    .bind(project_id)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

/// # Errors
/// - NotFound if the image doesn't exist
pub async fn find(pool: &SqlitePool, id: &str) -> HubResult<ProjectImage> {
  let query = format!("SELECT {IMAGE_COLUMNS} FROM project_images WHERE id = ?1");

  sqlx::query_as::<_, ProjectImage>(&query)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| HubError::not_found("Image", id))
}

/// Every url referenced by an image row.
pub async fn all_urls(pool: &SqlitePool) -> HubResult<Vec<String>> {
  let rows: Vec<(String,)> = sqlx::query_as("SELECT url FROM project_images")
    .fetch_all(pool)
    .await?;

  Ok(rows.into_iter().map(|(url,)| url).collect())
}
