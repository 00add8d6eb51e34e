use chrono::Utc;
use sqlx::SqlitePool;

use project_hub_core::{validation::ensure_distinct, HubError, HubResult};

use crate::service::query;

const INSERT_RELATION: &str = "INSERT INTO project_relations (from_id, to_id, created_at) VALUES (?1, ?2, ?3)";
const DELETE_RELATION: &str = "DELETE FROM project_relations WHERE from_id = ?1 AND to_id = ?2";

/// Adds the edge `from_id -> to_id`
///
/// # Errors
/// - Validation on a self relation or an existing edge
/// - NotFound if either project doesn't exist
pub async fn create(pool: &SqlitePool, from_id: &str, to_id: &str) -> HubResult<()> {
  ensure_distinct(from_id, to_id)?;
  query::projects::ensure_exists(pool, from_id).await?;
  query::projects::ensure_exists(pool, to_id).await?;

  if query::relations::exists(pool, from_id, to_id).await? {
    return Err(HubError::validation("These projects are already related"));
  }

  sqlx::query(INSERT_RELATION)
    .bind(from_id)
    .bind(to_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

  Ok(())
}

pub async fn delete(pool: &SqlitePool, from_id: &str, to_id: &str) -> HubResult<u64> {
  Ok(
    sqlx::query(DELETE_RELATION)
      .bind(from_id)
      .bind(to_id)
      .execute(pool)
      .await?
      .rows_affected(),
  )
}
