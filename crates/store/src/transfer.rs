use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info};

use project_hub_core::{entities::Project, HubError, HubResult};

use crate::store::ProjectStore;

pub const EXPORT_FILE_NAME: &str = "project-hub-data.json";

impl ProjectStore {
  /// Pretty-printed JSON of the in-memory list. Lazily loaded relations are left out.
  pub fn export_json(&self) -> HubResult<String> {
    let projects: Vec<Project> = self
      .projects()
      .into_iter()
      .map(|p| Project {
        related_projects: None,
        ..p
      })
      .collect();

    Ok(serde_json::to_string_pretty(&projects)?)
  }

  /// Replaces everything with the projects in `document`.
  ///
  /// A document that does not parse is reported as a validation error and
  /// nothing is touched.
  pub async fn import_json(&self, document: &str) -> HubResult<()> {
    let projects: Vec<Project> = serde_json::from_str(document).map_err(|e| {
      error!("Rejected import document: {}", e);
      HubError::validation(format!("The selected file is not valid JSON: {e}"))
    })?;

    self.set_all_projects(projects).await
  }

  /// Writes the export document into `dir` and returns its path.
  pub async fn export_to_file(&self, dir: impl AsRef<Path>) -> HubResult<PathBuf> {
    let path = dir.as_ref().join(EXPORT_FILE_NAME);

    fs::write(&path, self.export_json()?).await?;
    info!("Your projects have been saved to {}", path.display());

    Ok(path)
  }

  pub async fn import_from_file(&self, path: impl AsRef<Path>) -> HubResult<()> {
    let document = fs::read_to_string(path).await?;
    self.import_json(&document).await
  }
}
