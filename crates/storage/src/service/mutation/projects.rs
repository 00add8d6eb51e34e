use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use project_hub_core::{
  entities::{ArchiveNotes, NewProject, Project, ProjectStatus},
  validation::{ensure_archive_notes, ensure_present, validate_import},
  HubResult,
};

use crate::service::query;

// SQL Query Constants
const INSERT_PROJECT: &str = r#"
  INSERT INTO projects (id, name, description, notes, status, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
"#;
const IMPORT_PROJECT: &str = r#"
  INSERT INTO projects (id, name, description, notes, status, github_url, published_url, archive_notes, private, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
"#;
const IMPORT_TODO: &str = r#"
  INSERT INTO todos (id, project_id, text, completed, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?5)
"#;
const IMPORT_IMAGE: &str = r#"
  INSERT INTO project_images (id, project_id, url, caption, alt, width, height, file_size, mime_type, created_at, updated_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
"#;
const UPDATE_PROJECT: &str = r#"
  UPDATE projects
  SET name = ?1, description = ?2, notes = ?3, status = ?4, github_url = ?5,
      published_url = ?6, archive_notes = ?7, private = ?8, updated_at = ?9
  WHERE id = ?10
"#;
const UPDATE_PROJECT_STATUS: &str = "UPDATE projects SET status = ?1, archive_notes = ?2, updated_at = ?3 WHERE id = ?4";
const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = ?1";
const PROJECT_IMAGE_URLS: &str = "SELECT url FROM project_images WHERE project_id = ?1";
const PURGE_PROJECTS: &str = "DELETE FROM projects";

/// Creates a new draft with a fresh id and empty collections
///
/// # Errors
/// - Validation if the name is empty
/// - DatabaseError for any database-related issues
pub async fn create(pool: &SqlitePool, params: NewProject) -> HubResult<Project> {
  ensure_present("Project name", &params.name)?;

  let project = Project::draft(Uuid::new_v4().to_string(), params);

  sqlx::query(INSERT_PROJECT)
    .bind(&project.id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.notes)
    .bind(ProjectStatus::Draft.to_string())
    .bind(Utc::now())
    .execute(pool)
    .await?;

  Ok(project)
}

/// Overwrites the mutable fields of an existing project
///
/// Todos and images are untouched, the returned record carries the stored ones.
///
/// # Errors
/// - Validation if the name is empty
/// - NotFound if project doesn't exist
/// - DatabaseError for any database-related issues
pub async fn update(pool: &SqlitePool, project: &Project) -> HubResult<Project> {
  ensure_present("Project name", &project.name)?;
  query::projects::ensure_exists(pool, &project.id).await?;

  sqlx::query(UPDATE_PROJECT)
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.notes)
    .bind(project.status.to_string())
    .bind(&project.github_url)
    .bind(&project.published_url)
    .bind(&project.archive_notes)
    .bind(project.private)
    .bind(Utc::now())
    .bind(&project.id)
    .execute(pool)
    .await?;

  query::projects::find(pool, &project.id).await
}

/// Moves a project to another status
///
/// # Errors
/// - Validation if notes are set for a status other than archived
/// - NotFound if project doesn't exist
/// - DatabaseError for any database-related issues
pub async fn update_status(
  pool: &SqlitePool,
  id: &str,
  status: ProjectStatus,
  archive_notes: &ArchiveNotes,
) -> HubResult<Project> {
  ensure_archive_notes(status, archive_notes)?;

  let existing = query::projects::find(pool, id).await?;

  sqlx::query(UPDATE_PROJECT_STATUS)
    .bind(status.to_string())
    .bind(archive_notes.apply(existing.archive_notes))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

  query::projects::find(pool, id).await
}

/// Deletes a project; todos, relation edges and image rows go with it
///
/// Returns the urls of the images that were attached so their files can be removed.
///
/// # Errors
/// - NotFound if project doesn't exist
/// - DatabaseError for any database-related issues
pub async fn delete(pool: &SqlitePool, id: &str) -> HubResult<Vec<String>> {
  query::projects::ensure_exists(pool, id).await?;

  let mut tx = pool.begin().await?;

  let urls: Vec<(String,)> = sqlx::query_as(PROJECT_IMAGE_URLS).bind(id).fetch_all(&mut *tx).await?;
  sqlx::query(DELETE_PROJECT).bind(id).execute(&mut *tx).await?;

  tx.commit().await?;

  Ok(urls.into_iter().map(|(url,)| url).collect())
}

pub async fn purge(pool: &SqlitePool) -> HubResult<u64> {
  Ok(sqlx::query(PURGE_PROJECTS).execute(pool).await?.rows_affected())
}

/// Replaces everything with the given projects in one transaction
///
/// # Errors
/// - Validation if ids are missing or duplicated
/// - DatabaseError for any database-related issues
pub async fn import(pool: &SqlitePool, projects: &[Project]) -> HubResult<()> {
  validate_import(projects)?;

  let mut tx = pool.begin().await?;

  sqlx::query(PURGE_PROJECTS).execute(&mut *tx).await?;

  for project in projects {
    insert_imported(&mut tx, project).await?;
  }

  tx.commit().await?;

  Ok(())
}

async fn insert_imported(tx: &mut Transaction<'_, Sqlite>, project: &Project) -> HubResult<()> {
  let now = Utc::now();

  sqlx::query(IMPORT_PROJECT)
    .bind(&project.id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.notes)
    .bind(project.status.to_string())
    .bind(&project.github_url)
    .bind(&project.published_url)
    .bind(&project.archive_notes)
    .bind(project.private)
    .bind(now)
    .execute(&mut **tx)
    .await?;

  for todo in &project.todos {
    sqlx::query(IMPORT_TODO)
      .bind(&todo.id)
      .bind(&project.id)
      .bind(&todo.text)
      .bind(todo.completed)
      .bind(now)
      .execute(&mut **tx)
      .await?;
  }

  for image in &project.images {
    sqlx::query(IMPORT_IMAGE)
      .bind(&image.id)
      .bind(&project.id)
      .bind(&image.url)
      .bind(&image.caption)
      .bind(&image.alt)
      .bind(image.width)
      .bind(image.height)
      .bind(image.file_size)
      .bind(&image.mime_type)
      .bind(image.created_at)
      .bind(image.updated_at)
      .execute(&mut **tx)
      .await?;
  }

  Ok(())
}
