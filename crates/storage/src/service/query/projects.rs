use std::collections::HashMap;

use sqlx::SqlitePool;

use project_hub_core::{
  entities::{Project, ProjectImage, ProjectRow, Todo, TodoRow},
  HubError, HubResult,
};

const LIST_PROJECTS_QUERY: &str = "SELECT * FROM projects ORDER BY rowid";
const LIST_TODOS_QUERY: &str = "SELECT id, project_id, text, completed FROM todos ORDER BY rowid";
const LIST_IMAGES_QUERY: &str = r#"
  SELECT id, project_id, url, caption, alt, width, height, file_size, mime_type, created_at, updated_at
  FROM project_images
  ORDER BY rowid
"#;
const FIND_PROJECT_BY_ID: &str = "SELECT * FROM projects WHERE id = ?1";
const LIST_PROJECT_TODOS: &str = "SELECT id, project_id, text, completed FROM todos WHERE project_id = ?1 ORDER BY rowid";
const LIST_RELATED_PROJECTS: &str = r#"
  SELECT p.*
  FROM project_relations AS r
  INNER JOIN projects AS p ON p.id = r.to_id
  WHERE r.from_id = ?1
  ORDER BY r.rowid
"#;

/// Fetches every project with its todos and image metadata, in creation order.
pub async fn list_all(pool: &SqlitePool) -> HubResult<Vec<Project>> {
  let (rows, todos, images) = tokio::try_join!(fetch_rows(pool), fetch_todos(pool), fetch_images(pool))?;

  assemble(rows, todos, images)
}

/// Fetches one materialized project.
///
/// # Errors
/// - NotFound if the project doesn't exist
pub async fn find(pool: &SqlitePool, id: &str) -> HubResult<Project> {
  let row = find_row(pool, id)
    .await?
    .ok_or_else(|| HubError::not_found("Project", id))?;

  materialize(pool, row).await
}

pub async fn find_row(pool: &SqlitePool, id: &str) -> HubResult<Option<ProjectRow>> {
  sqlx::query_as::<_, ProjectRow>(FIND_PROJECT_BY_ID)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

pub async fn ensure_exists(pool: &SqlitePool, id: &str) -> HubResult<()> {
  match find_row(pool, id).await? {
    Some(_) => Ok(()),
    None => Err(HubError::not_found("Project", id)),
  }
}

/// Targets of the edges leaving `id`, in the order the edges were added.
///
/// # Errors
/// - NotFound if the source project doesn't exist
pub async fn related(pool: &SqlitePool, id: &str) -> HubResult<Vec<Project>> {
  ensure_exists(pool, id).await?;

  let rows = sqlx::query_as::<_, ProjectRow>(LIST_RELATED_PROJECTS)
    .bind(id)
    .fetch_all(pool)
    .await?;

  let mut projects = Vec::with_capacity(rows.len());
  for row in rows {
    projects.push(materialize(pool, row).await?);
  }

  Ok(projects)
}

async fn materialize(pool: &SqlitePool, row: ProjectRow) -> HubResult<Project> {
  let todos = sqlx::query_as::<_, TodoRow>(LIST_PROJECT_TODOS)
    .bind(&row.id)
    .fetch_all(pool)
    .await?;
  let images = super::images::list_for_project(pool, &row.id).await?;

  Project::build(row, todos.into_iter().map(Todo::from).collect(), images)
}

async fn fetch_rows(pool: &SqlitePool) -> HubResult<Vec<ProjectRow>> {
  sqlx::query_as::<_, ProjectRow>(LIST_PROJECTS_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

async fn fetch_todos(pool: &SqlitePool) -> HubResult<Vec<TodoRow>> {
  sqlx::query_as::<_, TodoRow>(LIST_TODOS_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

async fn fetch_images(pool: &SqlitePool) -> HubResult<Vec<ProjectImage>> {
  sqlx::query_as::<_, ProjectImage>(LIST_IMAGES_QUERY)
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

fn assemble(rows: Vec<ProjectRow>, todos: Vec<TodoRow>, images: Vec<ProjectImage>) -> HubResult<Vec<Project>> {
  let mut todos_by_project: HashMap<String, Vec<Todo>> = HashMap::new();
  for row in todos {
    todos_by_project.entry(row.project_id.clone()).or_default().push(row.into());
  }

  let mut images_by_project: HashMap<String, Vec<ProjectImage>> = HashMap::new();
  for image in images {
    images_by_project.entry(image.project_id.clone()).or_default().push(image);
  }

  rows
    .into_iter()
    .map(|row| {
      let todos = todos_by_project.remove(&row.id).unwrap_or_default();
      let images = images_by_project.remove(&row.id).unwrap_or_default();
      Project::build(row, todos, images)
    })
    .collect()
}
