use sqlx::SqlitePool;

use project_hub_core::HubResult;

const FIND_RELATION: &str = "SELECT COUNT(*) FROM project_relations WHERE from_id = ?1 AND to_id = ?2";

pub async fn exists(pool: &SqlitePool, from_id: &str, to_id: &str) -> HubResult<bool> {
  let (count,): (i64,) = sqlx::query_as(FIND_RELATION)
    .bind(from_id)
    .bind(to_id)
    .fetch_one(pool)
    .await?;

  Ok(count > 0)
}
