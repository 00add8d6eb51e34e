use std::{collections::HashSet, path::Path};

use crate::{
  entities::{ArchiveNotes, Project, ProjectStatus},
  error::{HubError, HubResult},
};

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

pub fn ensure_image_type(mime_type: &str) -> HubResult<()> {
  if ALLOWED_IMAGE_TYPES.contains(&mime_type) {
    Ok(())
  } else {
    Err(HubError::validation(
      "Invalid file type. Only JPEG, PNG, GIF, and WebP are allowed.",
    ))
  }
}

pub fn ensure_present(field: &str, value: &str) -> HubResult<()> {
  if value.trim().is_empty() {
    Err(HubError::validation(format!("{field} must not be empty")))
  } else {
    Ok(())
  }
}

/// Ids end up in upload file names, so they must not be able to leave a directory.
pub fn ensure_safe_id(field: &str, id: &str) -> HubResult<()> {
  ensure_present(field, id)?;

  if id.contains(['/', '\\']) || id.contains("..") || id.chars().any(char::is_control) {
    Err(HubError::validation(format!("{field} `{}` contains unsupported characters", id.escape_debug())))
  } else {
    Ok(())
  }
}

pub fn ensure_archive_notes(status: ProjectStatus, notes: &ArchiveNotes) -> HubResult<()> {
  match (status, notes) {
    (ProjectStatus::Archived, _) | (_, ArchiveNotes::Keep | ArchiveNotes::Clear) => Ok(()),
    (status, ArchiveNotes::Set(_)) => Err(HubError::validation(format!(
      "archive notes can only be set when archiving, not for `{status}`"
    ))),
  }
}

pub fn ensure_distinct(from_id: &str, to_id: &str) -> HubResult<()> {
  if from_id == to_id {
    Err(HubError::validation("A project cannot be related to itself"))
  } else {
    Ok(())
  }
}

/// Name under which an uploaded file is stored: `{projectId}-{timestamp}-{originalFileName}`.
///
/// Only the final path component of the original name is kept.
pub fn upload_file_name(project_id: &str, timestamp_millis: i64, original: &str) -> HubResult<String> {
  ensure_safe_id("project id", project_id)?;

  let base = Path::new(original)
    .file_name()
    .and_then(|name| name.to_str())
    .filter(|name| !name.trim().is_empty())
    .ok_or_else(|| HubError::validation("No file provided"))?;

  Ok(format!("{project_id}-{timestamp_millis}-{base}"))
}

/// Checks an import document before anything is purged.
pub fn validate_import(projects: &[Project]) -> HubResult<()> {
  let mut project_ids = HashSet::new();
  let mut todo_ids = HashSet::new();
  let mut image_ids = HashSet::new();

  for project in projects {
    ensure_safe_id("project id", &project.id)?;
    ensure_present("project name", &project.name)?;

    if !project_ids.insert(project.id.as_str()) {
      return Err(HubError::validation(format!("duplicate project id `{}`", project.id)));
    }

    for todo in &project.todos {
      ensure_safe_id("todo id", &todo.id)?;
      if !todo_ids.insert(todo.id.as_str()) {
        return Err(HubError::validation(format!("duplicate todo id `{}`", todo.id)));
      }
    }

    for image in &project.images {
      ensure_safe_id("image id", &image.id)?;
      if !image_ids.insert(image.id.as_str()) {
        return Err(HubError::validation(format!("duplicate image id `{}`", image.id)));
      }
    }
  }

  Ok(())
}
