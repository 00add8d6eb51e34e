use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{instrument, warn};
use uuid::Uuid;

use project_hub_core::{
  entities::{ArchiveNotes, ImageUpload, NewProject, Project, ProjectImage, ProjectRelation, ProjectStatus, Todo},
  validation::{ensure_archive_notes, ensure_distinct, ensure_image_type, ensure_present, validate_import},
  HubError, HubResult, StorageProvider,
};

use crate::{blob::DiskImageStore, keyvalue::KeyValueStore};

pub const PROJECTS_KEY: &str = "project-hub-projects";
pub const RELATIONS_KEY: &str = "project-hub-relations";

#[derive(Default)]
struct LocalState {
  projects: Vec<Project>,
  relations: Vec<ProjectRelation>,
}

impl LocalState {
  fn project(&self, id: &str) -> HubResult<&Project> {
    self
      .projects
      .iter()
      .find(|p| p.id == id)
      .ok_or_else(|| HubError::not_found("Project", id))
  }

  fn project_mut(&mut self, id: &str) -> HubResult<&mut Project> {
    self
      .projects
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or_else(|| HubError::not_found("Project", id))
  }

  fn image_mut(&mut self, image_id: &str) -> HubResult<&mut ProjectImage> {
    self
      .projects
      .iter_mut()
      .flat_map(|p| p.images.iter_mut())
      .find(|i| i.id == image_id)
      .ok_or_else(|| HubError::not_found("Image", image_id))
  }
}

/// Keeps the whole project list as one JSON document in a key-value slot.
///
/// Relation edges live in a second slot, image binaries in the shared
/// [`DiskImageStore`]. Mutations are serialised by an async mutex, so the
/// read-modify-write cycle never interleaves within one process.
pub struct LocalProvider<K> {
  slots: K,
  images: Arc<DiskImageStore>,
  write_lock: Mutex<()>,
}

impl<K: KeyValueStore> LocalProvider<K> {
  pub fn new(slots: K, images: Arc<DiskImageStore>) -> Self {
    Self {
      slots,
      images,
      write_lock: Mutex::new(()),
    }
  }

  /// A missing slot or a malformed document reads as the default value.
  /// Errors from the backing store are returned as they are.
  async fn read_slot<T: DeserializeOwned + Default>(&self, key: &str) -> HubResult<T> {
    let Some(raw) = self.slots.get(key).await? else {
      return Ok(T::default());
    };

    Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
      warn!("Discarding malformed {} slot: {}", key, e);
      T::default()
    }))
  }

  async fn load(&self) -> HubResult<LocalState> {
    Ok(LocalState {
      projects: self.read_slot(PROJECTS_KEY).await?,
      relations: self.read_slot(RELATIONS_KEY).await?,
    })
  }

  /// The projects slot is written last, so a failed relations write leaves the list untouched.
  async fn save(&self, state: &LocalState) -> HubResult<()> {
    let projects = serde_json::to_string(&state.projects)?;
    let relations = serde_json::to_string(&state.relations)?;

    self.slots.set(RELATIONS_KEY, relations).await?;
    self.slots.set(PROJECTS_KEY, projects).await
  }

  /// Runs one read-modify-write cycle. Nothing is written when `f` fails.
  async fn mutate<T>(&self, f: impl FnOnce(&mut LocalState) -> HubResult<T> + Send) -> HubResult<T> {
    let _guard = self.write_lock.lock().await;

    let mut state = self.load().await?;
    let result = f(&mut state)?;
    self.save(&state).await?;

    Ok(result)
  }
}

fn stored(project: &Project) -> Project {
  Project {
    related_projects: None,
    ..project.clone()
  }
}

#[async_trait]
impl<K: KeyValueStore> StorageProvider for LocalProvider<K> {
  #[instrument(level = "debug", skip(self))]
  async fn get_all_projects(&self) -> HubResult<Vec<Project>> {
    Ok(self.load().await?.projects)
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_project(&self, id: &str) -> HubResult<Project> {
    self.load().await?.project(id).cloned()
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_project(&self, new_project: NewProject) -> HubResult<Project> {
    ensure_present("Project name", &new_project.name)?;

    let project = Project::draft(Uuid::new_v4().to_string(), new_project);

    self
      .mutate(|state| {
        state.projects.push(project.clone());
        Ok(project)
      })
      .await
  }

  #[instrument(level = "debug", skip(self, project), fields(project_id = %project.id))]
  async fn update_project(&self, project: &Project) -> HubResult<Project> {
    ensure_present("Project name", &project.name)?;

    self
      .mutate(|state| {
        let existing = state.project_mut(&project.id)?;
        *existing = Project {
          todos: std::mem::take(&mut existing.todos),
          images: std::mem::take(&mut existing.images),
          ..stored(project)
        };
        Ok(existing.clone())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_project(&self, id: &str) -> HubResult<()> {
    let removed = self
      .mutate(|state| {
        let index = state
          .projects
          .iter()
          .position(|p| p.id == id)
          .ok_or_else(|| HubError::not_found("Project", id))?;
        let removed = state.projects.remove(index);
        state.relations.retain(|r| r.from_id != id && r.to_id != id);
        Ok(removed)
      })
      .await?;

    let urls: Vec<String> = removed.images.into_iter().map(|i| i.url).collect();
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
    ensure_archive_notes(status, &archive_notes)?;

    self
      .mutate(|state| {
        let project = state.project_mut(id)?;
        project.status = status;
        project.archive_notes = archive_notes.apply(project.archive_notes.take());
        Ok(project.clone())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_todo(&self, project_id: &str, text: &str) -> HubResult<Todo> {
    ensure_present("Todo text", text)?;

    let todo = Todo {
      id: Uuid::new_v4().to_string(),
      text: text.to_string(),
      completed: false,
    };

    self
      .mutate(|state| {
        state.project_mut(project_id)?.todos.push(todo.clone());
        Ok(todo)
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_todo(&self, project_id: &str, todo: &Todo) -> HubResult<Todo> {
    self
      .mutate(|state| {
        let existing = state
          .project_mut(project_id)?
          .todos
          .iter_mut()
          .find(|t| t.id == todo.id)
          .ok_or_else(|| HubError::not_found("Todo", &todo.id))?;
        *existing = todo.clone();
        Ok(todo.clone())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_todo(&self, project_id: &str, todo_id: &str) -> HubResult<()> {
    self
      .mutate(|state| {
        let todos = &mut state.project_mut(project_id)?.todos;
        let index = todos
          .iter()
          .position(|t| t.id == todo_id)
          .ok_or_else(|| HubError::not_found("Todo", todo_id))?;
        todos.remove(index);
        Ok(())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn purge_all_projects(&self) -> HubResult<()> {
    self
      .mutate(|state| {
        *state = LocalState::default();
        Ok(())
      })
      .await
  }

  #[instrument(level = "debug", skip(self, projects), fields(count = projects.len()))]
  async fn import_projects(&self, projects: &[Project]) -> HubResult<()> {
    validate_import(projects)?;

    self
      .mutate(|state| {
        *state = LocalState {
          projects: projects.iter().map(stored).collect(),
          relations: vec![],
        };
        Ok(())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_related_projects(&self, id: &str) -> HubResult<Vec<Project>> {
    let state = self.load().await?;
    state.project(id)?;

    Ok(
      state
        .relations
        .iter()
        .filter(|r| r.from_id == id)
        .filter_map(|r| state.projects.iter().find(|p| p.id == r.to_id).cloned())
        .collect(),
    )
  }

  #[instrument(level = "debug", skip(self))]
  async fn add_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    ensure_distinct(from_id, to_id)?;

    self
      .mutate(|state| {
        state.project(from_id)?;
        state.project(to_id)?;

        let relation = ProjectRelation::new(from_id, to_id);
        if state.relations.contains(&relation) {
          return Err(HubError::validation("These projects are already related"));
        }
        state.relations.push(relation);
        Ok(())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn remove_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    self
      .mutate(|state| {
        state.relations.retain(|r| !(r.from_id == from_id && r.to_id == to_id));
        Ok(())
      })
      .await
  }

  #[instrument(level = "debug", skip(self, upload), fields(file_name = %upload.file_name))]
  async fn upload_project_image(&self, project_id: &str, upload: ImageUpload) -> HubResult<ProjectImage> {
    ensure_image_type(&upload.mime_type)?;
    self.load().await?.project(project_id)?;

    let image = self.images.store(project_id, &upload).await?;

    let recorded = self
      .mutate(|state| {
        state.project_mut(project_id)?.images.push(image.clone());
        Ok(image.clone())
      })
      .await;

    if recorded.is_err() {
      self.images.remove_all([&image.url]).await;
    }

    recorded
  }

  #[instrument(level = "debug", skip(self))]
  async fn update_project_image_caption(&self, image_id: &str, caption: &str) -> HubResult<ProjectImage> {
    self
      .mutate(|state| {
        let image = state.image_mut(image_id)?;
        image.caption = Some(caption.to_string());
        image.updated_at = Utc::now();
        Ok(image.clone())
      })
      .await
  }

  #[instrument(level = "debug", skip(self))]
  async fn delete_project_image(&self, image_id: &str) -> HubResult<()> {
    let removed = self
      .mutate(|state| {
        for project in state.projects.iter_mut() {
          if let Some(index) = project.images.iter().position(|i| i.id == image_id) {
            return Ok(project.images.remove(index));
          }
        }
        Err(HubError::not_found("Image", image_id))
      })
      .await?;

    self.images.remove(&removed.url).await
  }

  #[instrument(level = "debug", skip(self))]
  async fn get_project_images(&self, project_id: &str) -> HubResult<Vec<ProjectImage>> {
    Ok(self.load().await?.project(project_id)?.images.clone())
  }
}
