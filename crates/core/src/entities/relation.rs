use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Directed edge between two projects. Symmetry is up to the caller.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRelation {
  pub from_id: String,
  pub to_id: String,
}

impl ProjectRelation {
  pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
    Self {
      from_id: from_id.into(),
      to_id: to_id.into(),
    }
  }
}
