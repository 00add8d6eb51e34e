use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use project_hub_core::{entities::Todo, validation::ensure_present, HubError, HubResult};

use crate::service::query;

// SQL Query Constants
const INSERT_TODO: &str = r#"
  INSERT INTO todos (id, project_id, text, completed, created_at, updated_at)
  VALUES (?1, ?2, ?3, 0, ?4, ?4)
"#;
const UPDATE_TODO: &str = "UPDATE todos SET text = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4 AND project_id = ?5";
const DELETE_TODO: &str = "DELETE FROM todos WHERE id = ?1 AND project_id = ?2";

/// Appends a todo to the project
///
/// # Errors
/// - Validation if the text is empty
/// - NotFound if project doesn't exist
pub async fn create(pool: &SqlitePool, project_id: &str, text: &str) -> HubResult<Todo> {
  ensure_present("Todo text", text)?;
  query::projects::ensure_exists(pool, project_id).await?;

  let todo = Todo {
    id: Uuid::new_v4().to_string(),
    text: text.to_string(),
    completed: false,
  };

  sqlx::query(INSERT_TODO)
    .bind(&todo.id)
    .bind(project_id)
    .bind(&todo.text)
    .bind(Utc::now())
    .execute(pool)
    .await?;

  Ok(todo)
}

/// # Errors
/// - NotFound if the project or the todo within it doesn't exist
pub async fn update(pool: &SqlitePool, project_id: &str, todo: &Todo) -> HubResult<Todo> {
  query::projects::ensure_exists(pool, project_id).await?;

  let affected = sqlx::query(UPDATE_TODO)
    .bind(&todo.text)
    .bind(todo.completed)
    .bind(Utc::now())
    .bind(&todo.id)
    .bind(project_id)
    .execute(pool)
    .await?
    .rows_affected();

  match affected {
    0 => Err(HubError::not_found("Todo", &todo.id)),
    _ => Ok(todo.clone()),
  }
}

/// # Errors
/// - NotFound if the project or the todo within it doesn't exist
pub async fn delete(pool: &SqlitePool, project_id: &str, todo_id: &str) -> HubResult<()> {
  query::projects::ensure_exists(pool, project_id).await?;

  let affected = sqlx::query(DELETE_TODO)
    .bind(todo_id)
    .bind(project_id)
    .execute(pool)
    .await?
    .rows_affected();

  match affected {
    0 => Err(HubError::not_found("Todo", todo_id)),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use project_hub_core::entities::NewProject;

  use super::*;
  use crate::{db::memory_pool, service::mutation};

  #[tokio::test]
  async fn test_todo_lifecycle() {
    let pool = memory_pool().await;
    let project = mutation::projects::create(&pool, NewProject::new("X")).await.unwrap();

    let todo = create(&pool, &project.id, "draft outline").await.unwrap();
    update(
      &pool,
      &project.id,
      &Todo {
        completed: true,
        ..todo.clone()
      },
    )
    .await
    .unwrap();

    let stored = query::projects::find(&pool, &project.id).await.unwrap();
    assert_eq!(stored.todos.len(), 1);
    assert_eq!(stored.todos[0].text, "draft outline");
    assert!(stored.todos[0].completed);

    delete(&pool, &project.id, &todo.id).await.unwrap();
    assert!(query::projects::find(&pool, &project.id).await.unwrap().todos.is_empty());
  }

  #[tokio::test]
  async fn test_todos_are_scoped_to_their_project() {
    let pool = memory_pool().await;
    let a = mutation::projects::create(&pool, NewProject::new("A")).await.unwrap();
    let b = mutation::projects::create(&pool, NewProject::new("B")).await.unwrap();
    let todo = create(&pool, &a.id, "only in A").await.unwrap();

    assert!(matches!(delete(&pool, &b.id, &todo.id).await, Err(HubError::NotFound { .. })));
    assert!(matches!(create(&pool, "missing", "x").await, Err(HubError::NotFound { .. })));
    assert!(matches!(create(&pool, &a.id, "").await, Err(HubError::Validation(_))));
  }
}
