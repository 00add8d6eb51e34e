use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, instrument, warn};

use project_hub_core::{
  entities::{ArchiveNotes, ImageUpload, NewProject, Project, ProjectImage, ProjectStatus, Todo},
  validation::ensure_image_type,
  HubResult, StorageProvider,
};

use crate::{
  blob::DiskImageStore,
  service::{mutation, query},
};

/// Durable provider backed by the SQLite schema.
pub struct SqliteProvider {
  pool: Arc<SqlitePool>,
  images: Arc<DiskImageStore>,
}

impl SqliteProvider {
  pub fn new(pool: Arc<SqlitePool>, images: Arc<DiskImageStore>) -> Self {
    Self { pool, images }
  }

  pub fn pool(&self) -> &SqlitePool {
    &self.pool
  }
}

#[async_trait]
impl StorageProvider for SqliteProvider {
  #[instrument(level = "debug", skip(self))]
  async fn get_all_projects(&self) -> HubResult<Vec<Project>> {
    query::projects::list_all(&self.pool).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_project(&self, id: &str) -> HubResult<Project> {
    query::projects::find(&self.pool, id).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_project(&self, new_project: NewProject) -> HubResult<Project> {
    mutation::projects::create(&self.pool, new_project).await
  }

  #[instrument(level = "debug", skip(self, project), fields(project_id = %project.id))]
  async fn update_project(&self, project: &Project) -> HubResult<Project> {
    mutation::projects::update(&self.pool, project).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_project(&self, id: &str) -> HubResult<()> {
    let urls = mutation::projects::delete(&self.pool, id).await?;
    self.images.remove_all(&urls).await;

    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_project_status(
    &self,
    id: &str,
    status: ProjectStatus,
    archive_notes: ArchiveNotes,
  ) -> HubResult<Project> {
    mutation::projects::update_status(&self.pool, id, status, &archive_notes).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_todo(&self, project_id: &str, text: &str) -> HubResult<Todo> {
    mutation::todos::create(&self.pool, project_id, text).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_todo(&self, project_id: &str, todo: &Todo) -> HubResult<Todo> {
    mutation::todos::update(&self.pool, project_id, todo).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_todo(&self, project_id: &str, todo_id: &str) -> HubResult<()> {
    mutation::todos::delete(&self.pool, project_id, todo_id).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn purge_all_projects(&self) -> HubResult<()> {
    let removed = mutation::projects::purge(&self.pool).await?;
    debug!("Purged {} projects", removed);

    Ok(())
  }

  #[instrument(level = "debug", skip(self, projects), fields(count = projects.len()))]
  async fn import_projects(&self, projects: &[Project]) -> HubResult<()> {
    mutation::projects::import(&self.pool, projects).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_related_projects(&self, id: &str) -> HubResult<Vec<Project>> {
    query::projects::related(&self.pool, id).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    mutation::relations::create(&self.pool, from_id, to_id).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn remove_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    mutation::relations::delete(&self.pool, from_id, to_id).await.map(|_| ())
  }

  #[instrument(level = "debug", skip(self, upload), fields(file_name = %upload.file_name))]
  async fn upload_project_image(&self, project_id: &str, upload: ImageUpload) -> HubResult<ProjectImage> {
    ensure_image_type(&upload.mime_type)?;
    query::projects::ensure_exists(&self.pool, project_id).await?;

    let image = self.images.store(project_id, &upload).await?;

    match mutation::images::create(&self.pool, &image).await {
      Ok(stored) => Ok(stored),
      Err(e) => {
        warn!("Failed to record image {}, removing file: {}", image.url, e);
        self.images.remove_all([&image.url]).await;
        Err(e)
      },
    }
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_project_image_caption(&self, image_id: &str, caption: &str) -> HubResult<ProjectImage> {
    mutation::images::update_caption(&self.pool, image_id, caption).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_project_image(&self, image_id: &str) -> HubResult<()> {
    let image = mutation::images::delete(&self.pool, image_id).await?;
    self.images.remove(&image.url).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_project_images(&self, project_id: &str) -> HubResult<Vec<ProjectImage>> {
    query::projects::ensure_exists(&self.pool, project_id).await?;
    query::images::list_for_project(&self.pool, project_id).await
  }
}
