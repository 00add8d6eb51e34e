use async_trait::async_trait;

use crate::{
  entities::{ArchiveNotes, ImageUpload, NewProject, Project, ProjectImage, ProjectStatus, Todo},
  error::HubResult,
};

/// Persistence contract the client store mutates through.
///
/// Every implementation carries the whole contract, relations and images
/// included, so callers never have to check for capabilities.
#[async_trait]
pub trait StorageProvider: Send + Sync {
  // Projects

  /// Full snapshot with todos and image metadata. Relations are loaded separately.
  async fn get_all_projects(&self) -> HubResult<Vec<Project>>;

  async fn get_project(&self, id: &str) -> HubResult<Project>;

  /// Stores a new draft under a freshly issued id.
  async fn add_project(&self, new_project: NewProject) -> HubResult<Project>;

  /// Overwrites the mutable fields of an existing project.
  async fn update_project(&self, project: &Project) -> HubResult<Project>;

  /// Removes the project with its todos, relation edges and images.
  async fn delete_project(&self, id: &str) -> HubResult<()>;

  async fn update_project_status(
    &self,
    id: &str,
    status: ProjectStatus,
    archive_notes: ArchiveNotes,
  ) -> HubResult<Project>;

  // Todos

  async fn add_todo(&self, project_id: &str, text: &str) -> HubResult<Todo>;

  async fn update_todo(&self, project_id: &str, todo: &Todo) -> HubResult<Todo>;

  async fn delete_todo(&self, project_id: &str, todo_id: &str) -> HubResult<()>;

  // Bulk

  /// Irreversibly drops every project, todo, relation and image record.
  async fn purge_all_projects(&self) -> HubResult<()>;

  /// Replaces the whole store with the given projects, keeping their ids.
  async fn import_projects(&self, projects: &[Project]) -> HubResult<()>;

  // Relations

  async fn get_related_projects(&self, id: &str) -> HubResult<Vec<Project>>;

  async fn add_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()>;

  /// Removing an edge that does not exist is not an error.
  async fn remove_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()>;

  // Images

  async fn upload_project_image(&self, project_id: &str, upload: ImageUpload) -> HubResult<ProjectImage>;

  async fn update_project_image_caption(&self, image_id: &str, caption: &str) -> HubResult<ProjectImage>;

  async fn delete_project_image(&self, image_id: &str) -> HubResult<()>;

  async fn get_project_images(&self, project_id: &str) -> HubResult<Vec<ProjectImage>>;
}
