use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{image::ProjectImage, todo::Todo};
use crate::error::{HubError, HubResult};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
  #[default]
  Draft,
  Refined,
  Archived,
}

impl fmt::Display for ProjectStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      ProjectStatus::Draft => write!(f, "draft"),
      ProjectStatus::Refined => write!(f, "refined"),
      ProjectStatus::Archived => write!(f, "archived"),
    }
  }
}

impl FromStr for ProjectStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "draft" => Ok(ProjectStatus::Draft),
      "refined" => Ok(ProjectStatus::Refined),
      "archived" => Ok(ProjectStatus::Archived),
      _ => Err(format!("'{}' is not a valid variant", s)),
    }
  }
}

/// What a status transition does with the archive notes column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArchiveNotes {
  /// Leave whatever is stored.
  #[default]
  Keep,
  /// Write null.
  Clear,
  /// Write the given text. Only accepted together with [`ProjectStatus::Archived`].
  Set(String),
}

impl ArchiveNotes {
  /// Maps the wire shape: a missing field keeps, an explicit null clears.
  pub fn from_field(field: Option<Option<String>>) -> Self {
    match field {
      None => ArchiveNotes::Keep,
      Some(None) => ArchiveNotes::Clear,
      Some(Some(notes)) => ArchiveNotes::Set(notes),
    }
  }

  pub fn apply(&self, current: Option<String>) -> Option<String> {
    match self {
      ArchiveNotes::Keep => current,
      ArchiveNotes::Clear => None,
      ArchiveNotes::Set(notes) => Some(notes.clone()),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone)]
pub struct ProjectRow {
  pub id: String,
  pub name: String,
  pub description: String,
  pub notes: String,
  pub status: String,
  pub github_url: Option<String>,
  pub published_url: Option<String>,
  pub archive_notes: Option<String>,
  pub private: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Client-facing project record, also the shape of the export document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub status: ProjectStatus,
  #[serde(default)]
  pub archive_notes: Option<String>,
  #[serde(default)]
  pub github_url: Option<String>,
  #[serde(default)]
  pub published_url: Option<String>,
  #[serde(default)]
  pub private: bool,
  #[serde(default)]
  pub todos: Vec<Todo>,
  #[serde(default)]
  pub images: Vec<ProjectImage>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  #[schema(value_type = Option<Vec<Object>>)]
  pub related_projects: Option<Vec<Project>>,
}

impl Project {
  /// A fresh draft with empty collections.
  pub fn draft(id: impl Into<String>, new_project: NewProject) -> Self {
    Self {
      id: id.into(),
      name: new_project.name,
      description: new_project.description,
      notes: new_project.notes,
      status: ProjectStatus::Draft,
      archive_notes: None,
      github_url: None,
      published_url: None,
      private: false,
      todos: vec![],
      images: vec![],
      related_projects: None,
    }
  }

  pub fn build(row: ProjectRow, todos: Vec<Todo>, images: Vec<ProjectImage>) -> HubResult<Self> {
    let status = row
      .status
      .parse::<ProjectStatus>()
      .map_err(|e| HubError::Backend(format!("project `{}`: {}", row.id, e)))?;

    Ok(Self {
      id: row.id,
      name: row.name,
      description: row.description,
      notes: row.notes,
      status,
      archive_notes: row.archive_notes,
      github_url: row.github_url,
      published_url: row.published_url,
      private: row.private,
      todos,
      images,
      related_projects: None,
    })
  }
}

/// Fields accepted when capturing a new idea.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub notes: String,
}

impl NewProject {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = notes.into();
    self
  }
}
