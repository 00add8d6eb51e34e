use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use project_hub_core::{
  entities::{ArchiveNotes, ImageUpload, NewProject, Project, ProjectImage, ProjectStatus, Todo},
  validation::validate_import,
  HubResult, StorageProvider,
};

/// What subscribers see: the project list and whether the first load has resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
  pub projects: Vec<Project>,
  pub loaded: bool,
}

impl StoreState {
  pub fn project(&self, id: &str) -> Option<&Project> {
    self.projects.iter().find(|p| p.id == id)
  }

  fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
    self.projects.iter_mut().find(|p| p.id == id)
  }

  /// Replaces the project with the same id or appends it. A related list
  /// that was already loaded survives, since updates never touch edges.
  fn upsert(&mut self, mut project: Project) {
    match self.project_mut(&project.id) {
      Some(existing) => {
        if project.related_projects.is_none() {
          project.related_projects = existing.related_projects.take();
        }
        *existing = project;
      },
      None => self.projects.push(project),
    }
  }

  fn remove(&mut self, id: &str) {
    self.projects.retain(|p| p.id != id);
    for project in self.projects.iter_mut() {
      if let Some(related) = project.related_projects.as_mut() {
        related.retain(|p| p.id != id);
      }
    }
  }
}

/// In-memory source of truth for the UI.
///
/// Every action calls the provider first and merges the confirmed record
/// afterwards, so a failed call leaves the published state untouched. Relation
/// actions are the exception: they are applied up front and rolled back when
/// the provider refuses.
pub struct ProjectStore {
  provider: Arc<dyn StorageProvider>,
  state: watch::Sender<StoreState>,
}

impl ProjectStore {
  pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
    let (state, _) = watch::channel(StoreState::default());

    Self { provider, state }
  }

  pub fn provider(&self) -> &Arc<dyn StorageProvider> {
    &self.provider
  }

  pub fn subscribe(&self) -> watch::Receiver<StoreState> {
    self.state.subscribe()
  }

  pub fn snapshot(&self) -> StoreState {
    self.state.borrow().clone()
  }

  pub fn projects(&self) -> Vec<Project> {
    self.state.borrow().projects.clone()
  }

  pub fn is_loaded(&self) -> bool {
    self.state.borrow().loaded
  }

  /// Fetches the list. `loaded` flips once the provider answers, successfully or not.
  ///
  /// A failed reload leaves the list as it was.
  #[instrument(level = "debug", skip(self))]
  pub async fn load(&self) -> HubResult<()> {
    let result = self.provider.get_all_projects().await;

    self.state.send_modify(|state| {
      match &result {
        Ok(projects) => state.projects = projects.clone(),
        // a failed reload keeps what is already on screen
        Err(_) if state.loaded => {},
        Err(_) => state.projects = vec![],
      }
      state.loaded = true;
    });

    match result {
      Ok(projects) => {
        info!("Loaded {} projects", projects.len());
        Ok(())
      },
      Err(e) => {
        error!("Failed to load projects: {}", e);
        Err(e)
      },
    }
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn add_project(&self, new_project: NewProject) -> HubResult<Project> {
    let created = self
      .provider
      .add_project(new_project)
      .await
      .inspect_err(|e| error!("Failed to add project: {}", e))?;

    self.state.send_modify(|state| state.upsert(created.clone()));

    Ok(created)
  }

  #[instrument(level = "debug", skip(self, project), fields(project_id = %project.id))]
  pub async fn update_project(&self, project: &Project) -> HubResult<Project> {
    let updated = self
      .provider
      .update_project(project)
      .await
      .inspect_err(|e| error!("Failed to update project: {}", e))?;

    self.state.send_modify(|state| state.upsert(updated.clone()));

    Ok(updated)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn delete_project(&self, id: &str) -> HubResult<()> {
    self
      .provider
      .delete_project(id)
      .await
      .inspect_err(|e| error!("Failed to delete project: {}", e))?;

    self.state.send_modify(|state| state.remove(id));

    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn update_project_status(
    &self,
    id: &str,
    status: ProjectStatus,
    archive_notes: ArchiveNotes,
  ) -> HubResult<Project> {
    let updated = self
      .provider
      .update_project_status(id, status, archive_notes)
      .await
      .inspect_err(|e| error!("Failed to update project status: {}", e))?;

    self.state.send_modify(|state| state.upsert(updated.clone()));

    Ok(updated)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn add_todo(&self, project_id: &str, text: &str) -> HubResult<Todo> {
    let todo = self
      .provider
      .add_todo(project_id, text)
      .await
      .inspect_err(|e| error!("Failed to add todo: {}", e))?;

    self.state.send_modify(|state| {
      if let Some(project) = state.project_mut(project_id) {
        project.todos.push(todo.clone());
      }
    });

    Ok(todo)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn update_todo(&self, project_id: &str, todo: &Todo) -> HubResult<Todo> {
    let updated = self
      .provider
      .update_todo(project_id, todo)
      .await
      .inspect_err(|e| error!("Failed to update todo: {}", e))?;

    self.state.send_modify(|state| {
      if let Some(existing) = state
        .project_mut(project_id)
        .and_then(|p| p.todos.iter_mut().find(|t| t.id == updated.id))
      {
        *existing = updated.clone();
      }
    });

    Ok(updated)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn delete_todo(&self, project_id: &str, todo_id: &str) -> HubResult<()> {
    self
      .provider
      .delete_todo(project_id, todo_id)
      .await
      .inspect_err(|e| error!("Failed to delete todo: {}", e))?;

    self.state.send_modify(|state| {
      if let Some(project) = state.project_mut(project_id) {
        project.todos.retain(|t| t.id != todo_id);
      }
    });

    Ok(())
  }

  /// Purge, import, reload. The two provider writes are not atomic: a failure
  /// after the purge leaves the backend empty while this list stays as it was.
  #[instrument(level = "debug", skip(self, projects), fields(count = projects.len()))]
  pub async fn set_all_projects(&self, projects: Vec<Project>) -> HubResult<()> {
    let result: HubResult<Vec<Project>> = async {
      validate_import(&projects)?;
      self.provider.purge_all_projects().await?;
      self.provider.import_projects(&projects).await?;
      self.provider.get_all_projects().await
    }
    .await;

    let reloaded = result.inspect_err(|e| error!("Failed to import projects: {}", e))?;

    self.state.send_modify(|state| state.projects = reloaded);

    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn purge_all_projects(&self) -> HubResult<()> {
    self
      .provider
      .purge_all_projects()
      .await
      .inspect_err(|e| error!("Failed to purge projects: {}", e))?;

    self.state.send_modify(|state| state.projects.clear());

    Ok(())
  }

  /// Fetches the outgoing edges of `id` and attaches them to the in-memory project.
  #[instrument(level = "debug", skip(self))]
  pub async fn load_related_projects(&self, id: &str) -> HubResult<Vec<Project>> {
    let related = self
      .provider
      .get_related_projects(id)
      .await
      .inspect_err(|e| error!("Failed to load related projects: {}", e))?;

    self.set_related(id, Some(related.clone()));

    Ok(related)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn add_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    let target = self.state.borrow().project(to_id).map(|p| Project {
      related_projects: None,
      ..p.clone()
    });
    let target_known = target.is_some();
    let previous = self.edit_related(from_id, |related| {
      if let Some(target) = target {
        related.push(target);
      }
    });

    if let Err(e) = self.provider.add_project_relation(from_id, to_id).await {
      error!("Failed to add relation {} -> {}: {}", from_id, to_id, e);
      if let Some(previous) = previous {
        self.set_related(from_id, previous);
      }
      return Err(e);
    }

    // the target was not in memory, so the loaded list has to come from the provider
    if previous.is_some() && !target_known {
      match self.provider.get_related_projects(from_id).await {
        Ok(related) => self.set_related(from_id, Some(related)),
        Err(e) => warn!("Relation {} -> {} added but related list not refreshed: {}", from_id, to_id, e),
      }
    }

    Ok(())
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn remove_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
    let previous = self.edit_related(from_id, |related| related.retain(|p| p.id != to_id));

    if let Err(e) = self.provider.remove_project_relation(from_id, to_id).await {
      error!("Failed to remove relation {} -> {}: {}", from_id, to_id, e);
      if let Some(previous) = previous {
        self.set_related(from_id, previous);
      }
      return Err(e);
    }

    Ok(())
  }

  #[instrument(level = "debug", skip(self, upload), fields(file_name = %upload.file_name))]
  pub async fn upload_project_image(&self, project_id: &str, upload: ImageUpload) -> HubResult<ProjectImage> {
    let image = self
      .provider
      .upload_project_image(project_id, upload)
      .await
      .inspect_err(|e| error!("Failed to upload image: {}", e))?;

    self.state.send_modify(|state| {
      if let Some(project) = state.project_mut(project_id) {
        project.images.push(image.clone());
      }
    });

    Ok(image)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn update_project_image_caption(&self, image_id: &str, caption: &str) -> HubResult<ProjectImage> {
    let image = self
      .provider
      .update_project_image_caption(image_id, caption)
      .await
      .inspect_err(|e| error!("Failed to update image caption: {}", e))?;

    self.state.send_modify(|state| {
      if let Some(existing) = state
        .project_mut(&image.project_id)
        .and_then(|p| p.images.iter_mut().find(|i| i.id == image.id))
      {
        *existing = image.clone();
      }
    });

    Ok(image)
  }

  #[instrument(level = "debug", skip(self))]
  pub async fn delete_project_image(&self, image_id: &str) -> HubResult<()> {
    self
      .provider
      .delete_project_image(image_id)
      .await
      .inspect_err(|e| error!("Failed to delete image: {}", e))?;

    self.state.send_modify(|state| {
      for project in state.projects.iter_mut() {
        project.images.retain(|i| i.id != image_id);
      }
    });

    Ok(())
  }

  /// Applies `f` to a loaded related list and returns what was there before.
  /// `None` means the project or its related list is not in memory.
  fn edit_related(&self, id: &str, f: impl FnOnce(&mut Vec<Project>)) -> Option<Option<Vec<Project>>> {
    let mut previous = None;

    self.state.send_if_modified(|state| {
      let Some(related) = state.project_mut(id).and_then(|p| p.related_projects.as_mut()) else {
        return false;
      };
      previous = Some(Some(related.clone()));
      f(related);
      true
    });

    if previous.is_some() {
      debug!("Applied optimistic relation change on {}", id);
    }

    previous
  }

  fn set_related(&self, id: &str, related: Option<Vec<Project>>) {
    self.state.send_if_modified(|state| match state.project_mut(id) {
      Some(project) => {
        project.related_projects = related;
        true
      },
      None => false,
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicBool, Ordering};

  use async_trait::async_trait;
  use project_hub_core::HubError;
  use project_hub_storage::{DiskImageStore, LocalProvider, MemoryKeyValue};
  use tempfile::TempDir;

  use super::*;

  /// Local provider whose reads or relation writes can be made to fail.
  struct FlakyProvider {
    inner: LocalProvider<MemoryKeyValue>,
    fail_reads: AtomicBool,
    fail_relations: AtomicBool,
  }

  impl FlakyProvider {
    fn check(flag: &AtomicBool) -> HubResult<()> {
      match flag.load(Ordering::SeqCst) {
        true => Err(HubError::Backend("connection reset".into())),
        false => Ok(()),
      }
    }
  }

  #[async_trait]
  impl StorageProvider for FlakyProvider {
    async fn get_all_projects(&self) -> HubResult<Vec<Project>> {
      Self::check(&self.fail_reads)?;
      self.inner.get_all_projects().await
    }

    async fn get_project(&self, id: &str) -> HubResult<Project> {
      self.inner.get_project(id).await
    }

    async fn add_project(&self, new_project: NewProject) -> HubResult<Project> {
      self.inner.add_project(new_project).await
    }

    async fn update_project(&self, project: &Project) -> HubResult<Project> {
      self.inner.update_project(project).await
    }

    async fn delete_project(&self, id: &str) -> HubResult<()> {
      self.inner.delete_project(id).await
    }

    async fn update_project_status(
      &self,
      id: &str,
      status: ProjectStatus,
      archive_notes: ArchiveNotes,
    ) -> HubResult<Project> {
      self.inner.update_project_status(id, status, archive_notes).await
    }

    async fn add_todo(&self, project_id: &str, text: &str) -> HubResult<Todo> {
      self.inner.add_todo(project_id, text).await
    }

    async fn update_todo(&self, project_id: &str, todo: &Todo) -> HubResult<Todo> {
      self.inner.update_todo(project_id, todo).await
    }

    async fn delete_todo(&self, project_id: &str, todo_id: &str) -> HubResult<()> {
      self.inner.delete_todo(project_id, todo_id).await
    }

    async fn purge_all_projects(&self) -> HubResult<()> {
      self.inner.purge_all_projects().await
    }

    async fn import_projects(&self, projects: &[Project]) -> HubResult<()> {
      self.inner.import_projects(projects).await
    }

    async fn get_related_projects(&self, id: &str) -> HubResult<Vec<Project>> {
      Self::check(&self.fail_reads)?;
      self.inner.get_related_projects(id).await
    }

    async fn add_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
      Self::check(&self.fail_relations)?;
      self.inner.add_project_relation(from_id, to_id).await
    }

    async fn remove_project_relation(&self, from_id: &str, to_id: &str) -> HubResult<()> {
      Self::check(&self.fail_relations)?;
      self.inner.remove_project_relation(from_id, to_id).await
    }

    async fn upload_project_image(&self, project_id: &str, upload: ImageUpload) -> HubResult<ProjectImage> {
      self.inner.upload_project_image(project_id, upload).await
    }

    async fn update_project_image_caption(&self, image_id: &str, caption: &str) -> HubResult<ProjectImage> {
      self.inner.update_project_image_caption(image_id, caption).await
    }

    async fn delete_project_image(&self, image_id: &str) -> HubResult<()> {
      self.inner.delete_project_image(image_id).await
    }

    async fn get_project_images(&self, project_id: &str) -> HubResult<Vec<ProjectImage>> {
      self.inner.get_project_images(project_id).await
    }
  }

  fn setup() -> (ProjectStore, Arc<FlakyProvider>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let images = Arc::new(DiskImageStore::new(dir.path().join("uploads")));
    let provider = Arc::new(FlakyProvider {
      inner: LocalProvider::new(MemoryKeyValue::new(), images),
      fail_reads: AtomicBool::new(false),
      fail_relations: AtomicBool::new(false),
    });

    (ProjectStore::new(provider.clone()), provider, dir)
  }

  #[tokio::test]
  async fn test_load_marks_loaded_even_on_failure() {
    let (store, provider, _dir) = setup();
    provider.fail_reads.store(true, Ordering::SeqCst);

    assert!(!store.is_loaded());
    assert!(store.load().await.is_err());
    assert!(store.is_loaded());
    assert!(store.projects().is_empty());
  }

  #[tokio::test]
  async fn test_failed_reload_keeps_the_list() {
    let (store, provider, _dir) = setup();
    provider.add_project(NewProject::new("Existing")).await.unwrap();
    store.load().await.unwrap();

    provider.fail_reads.store(true, Ordering::SeqCst);
    assert!(store.load().await.is_err());

    assert!(store.is_loaded());
    let names: Vec<_> = store.projects().into_iter().map(|p| p.name).collect();
    assert_eq!(names, vec!["Existing"]);
  }

  #[tokio::test]
  async fn test_load_picks_up_existing_projects() {
    let (store, provider, _dir) = setup();
    provider.add_project(NewProject::new("Existing")).await.unwrap();

    store.load().await.unwrap();

    let projects = store.projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Existing");
  }

  #[tokio::test]
  async fn test_todo_scenario_is_mirrored_in_memory() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();

    let x = store.add_project(NewProject::new("X")).await.unwrap();
    let todo = store.add_todo(&x.id, "draft outline").await.unwrap();
    store
      .update_todo(
        &x.id,
        &Todo {
          completed: true,
          ..todo.clone()
        },
      )
      .await
      .unwrap();

    let projects = store.projects();
    assert_eq!(projects[0].todos.len(), 1);
    assert!(projects[0].todos[0].completed);
    assert_eq!(provider.get_all_projects().await.unwrap(), projects);

    store.delete_todo(&x.id, &todo.id).await.unwrap();
    assert!(store.projects()[0].todos.is_empty());
  }

  #[tokio::test]
  async fn test_failed_action_leaves_state_alone() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    let before = store.snapshot();

    let err = store.add_todo("missing", "x").await.unwrap_err();

    assert!(matches!(err, HubError::NotFound { .. }));
    assert_eq!(store.snapshot(), before);
  }

  #[tokio::test]
  async fn test_status_change_keeps_loaded_relations() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = store.add_project(NewProject::new("B")).await.unwrap();
    store.add_project_relation(&a.id, &b.id).await.unwrap();
    store.load_related_projects(&a.id).await.unwrap();

    let archived = store
      .update_project_status(&a.id, ProjectStatus::Archived, ArchiveNotes::Set("later".into()))
      .await
      .unwrap();

    assert_eq!(archived.archive_notes.as_deref(), Some("later"));
    let state = store.snapshot();
    let a = state.project(&a.id).unwrap();
    assert_eq!(a.status, ProjectStatus::Archived);
    assert_eq!(a.related_projects.as_ref().map(Vec::len), Some(1));
  }

  #[tokio::test]
  async fn test_failed_relation_add_is_rolled_back() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = store.add_project(NewProject::new("B")).await.unwrap();
    store.load_related_projects(&a.id).await.unwrap();

    provider.fail_relations.store(true, Ordering::SeqCst);
    let mut updates = store.subscribe();
    updates.borrow_and_update();

    assert!(store.add_project_relation(&a.id, &b.id).await.is_err());

    assert!(updates.has_changed().unwrap());
    let state = store.snapshot();
    assert_eq!(state.project(&a.id).unwrap().related_projects, Some(vec![]));
  }

  #[tokio::test]
  async fn test_failed_relation_removal_is_rolled_back() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = store.add_project(NewProject::new("B")).await.unwrap();
    store.add_project_relation(&a.id, &b.id).await.unwrap();
    let related = store.load_related_projects(&a.id).await.unwrap();

    provider.fail_relations.store(true, Ordering::SeqCst);
    assert!(store.remove_project_relation(&a.id, &b.id).await.is_err());

    let state = store.snapshot();
    assert_eq!(state.project(&a.id).unwrap().related_projects, Some(related));
  }

  #[tokio::test]
  async fn test_relation_changes_update_loaded_lists() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = store.add_project(NewProject::new("B")).await.unwrap();
    store.load_related_projects(&a.id).await.unwrap();

    store.add_project_relation(&a.id, &b.id).await.unwrap();
    let ids: Vec<_> = store.snapshot().project(&a.id).unwrap().related_projects.clone().unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].id, b.id);

    store.remove_project_relation(&a.id, &b.id).await.unwrap();
    assert_eq!(store.snapshot().project(&a.id).unwrap().related_projects, Some(vec![]));
  }

  #[tokio::test]
  async fn test_relation_to_a_project_not_yet_in_memory_is_listed() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = provider.add_project(NewProject::new("B")).await.unwrap();
    store.load_related_projects(&a.id).await.unwrap();
    assert!(store.snapshot().project(&b.id).is_none());

    store.add_project_relation(&a.id, &b.id).await.unwrap();

    let related = store.snapshot().project(&a.id).unwrap().related_projects.clone().unwrap();
    assert_eq!(related, vec![b]);
  }

  #[tokio::test]
  async fn test_deleting_a_project_strips_it_from_related_lists() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    let a = store.add_project(NewProject::new("A")).await.unwrap();
    let b = store.add_project(NewProject::new("B")).await.unwrap();
    store.add_project_relation(&a.id, &b.id).await.unwrap();
    store.load_related_projects(&a.id).await.unwrap();

    store.delete_project(&b.id).await.unwrap();

    let state = store.snapshot();
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.project(&a.id).unwrap().related_projects, Some(vec![]));
  }

  #[tokio::test]
  async fn test_set_all_projects_replaces_everything() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    store.add_project(NewProject::new("Old")).await.unwrap();
    let replacement = Project::draft("p-1", NewProject::new("New"));

    store.set_all_projects(vec![replacement.clone()]).await.unwrap();

    assert_eq!(store.projects(), vec![replacement]);
  }

  #[tokio::test]
  async fn test_invalid_replacement_is_refused_before_purging() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();
    store.add_project(NewProject::new("Keep")).await.unwrap();
    let nameless = Project::draft("p-1", NewProject::new(""));

    let err = store.set_all_projects(vec![nameless]).await.unwrap_err();

    assert!(matches!(err, HubError::Validation(_)));
    assert_eq!(provider.get_all_projects().await.unwrap().len(), 1);
    assert_eq!(store.projects().len(), 1);
  }

  #[tokio::test]
  async fn test_purge_empties_the_list() {
    let (store, provider, _dir) = setup();
    store.load().await.unwrap();
    store.add_project(NewProject::new("A")).await.unwrap();

    store.purge_all_projects().await.unwrap();

    assert!(store.projects().is_empty());
    assert!(provider.get_all_projects().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_image_actions_are_merged() {
    let (store, _provider, _dir) = setup();
    store.load().await.unwrap();
    let x = store.add_project(NewProject::new("X")).await.unwrap();

    let image = store
      .upload_project_image(&x.id, ImageUpload::new("a.gif", "image/gif", vec![7; 3]))
      .await
      .unwrap();
    store.update_project_image_caption(&image.id, "Logo").await.unwrap();
    assert_eq!(store.projects()[0].images[0].caption.as_deref(), Some("Logo"));

    store.delete_project_image(&image.id).await.unwrap();
    assert!(store.projects()[0].images.is_empty());
  }

  #[tokio::test]
  async fn test_subscribers_see_changes() {
    let (store, _provider, _dir) = setup();
    let mut updates = store.subscribe();
    store.load().await.unwrap();
    updates.borrow_and_update();

    store.add_project(NewProject::new("A")).await.unwrap();

    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().projects.len(), 1);
  }
}
