use std::time::Duration;

use sqlx::{
  migrate::Migrator,
  sqlite::{SqliteConnectOptions, SqlitePoolOptions},
  SqlitePool,
};
use tracing::info;

use project_hub_core::HubResult;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the pool. Foreign keys are switched on so cascades hold.
pub async fn connect(database_url: &str, max_connections: u32) -> HubResult<SqlitePool> {
  let options = database_url
    .parse::<SqliteConnectOptions>()?
    .create_if_missing(true)
    .foreign_keys(true);

  let pool = SqlitePoolOptions::new()
    .max_connections(max_connections)
    .acquire_timeout(Duration::from_secs(10))
    .connect_with(options)
    .await?;

  Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> HubResult<()> {
  MIGRATOR.run(pool).await.map_err(sqlx::Error::from)?;
  info!("Database schema is up to date");

  Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
  let pool = connect("sqlite::memory:", 1).await.unwrap();
  migrate(&pool).await.unwrap();
  pool
}
