use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Todo {
  pub id: String,
  pub text: String,
  #[serde(default)]
  pub completed: bool,
}

#[derive(FromRow, Debug, Clone)]
pub struct TodoRow {
  pub id: String,
  pub project_id: String,
  pub text: String,
  pub completed: bool,
}

impl From<TodoRow> for Todo {
  fn from(row: TodoRow) -> Self {
    Todo {
      id: row.id,
      text: row.text,
      completed: row.completed,
    }
  }
}
