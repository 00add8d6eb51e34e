use axum::{
  extract::{Multipart, Path, State},
  http::StatusCode,
  Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use validator::Validate;

use project_hub_core::{
  entities::{ArchiveNotes, ImageUpload, NewProject, Project, ProjectImage, ProjectStatus, Todo},
  HubError,
};

use crate::{error::ApiResult, AppJson, AppState};

const PROJECTS_TAG: &str = "projects";

pub fn init_projects_routes() -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(list_projects, create_project, purge_projects))
    .routes(routes!(get_project, update_project, delete_project))
    .routes(routes!(update_project_status))
    .routes(routes!(add_todo))
    .routes(routes!(update_todo, delete_todo))
    .routes(routes!(list_related_projects))
    .routes(routes!(add_project_relation, remove_project_relation))
    .routes(routes!(list_project_images, upload_project_image))
}

#[utoipa::path(
  get,
  path = "",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "List all projects successfully", body = [Project])
  )
)]
#[instrument(skip(state))]
async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
  Ok(Json(state.store.projects()))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct CreateProject {
  #[validate(length(min = 1))]
  name: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  notes: String,
}

#[utoipa::path(
  post,
  path = "",
  tag = PROJECTS_TAG,
  request_body = CreateProject,
  responses(
    (status = 201, description = "Project created successfully", body = Project),
  )
)]
async fn create_project(
  State(state): State<AppState>,
  AppJson(input): AppJson<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
  debug!("Create new project with request: {:?}", input);

  input.validate()?;

  let project = state
    .store
    .add_project(NewProject::new(input.name).description(input.description).notes(input.notes))
    .await?;

  Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
  delete,
  path = "",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "All projects removed"),
  )
)]
#[instrument(skip(state))]
async fn purge_projects(State(state): State<AppState>) -> ApiResult<()> {
  state.store.purge_all_projects().await?;

  Ok(())
}

#[utoipa::path(
  get,
  path = "/{id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Project found", body = Project),
    (status = 404, description = "Project not found"),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Project>> {
  let project = state.store.provider().get_project(&id).await?;

  Ok(Json(project))
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = PROJECTS_TAG,
  request_body = Project,
  responses(
    (status = 200, description = "Project updated successfully", body = Project),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state, project))]
async fn update_project(
  State(state): State<AppState>,
  Path(id): Path<String>,
  AppJson(mut project): AppJson<Project>,
) -> ApiResult<Json<Project>> {
  debug!("Update project with id {}", id);

  project.id = id;
  let project = state.store.update_project(&project).await?;

  Ok(Json(project))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Project successfully deleted"),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
  debug!("Remove project with id {}", id);

  state.store.delete_project(&id).await?;

  Ok(())
}

/// Absent keeps the stored notes, `null` clears them.
fn archive_notes_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
  D: Deserializer<'de>,
{
  Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
  status: ProjectStatus,
  #[serde(default, deserialize_with = "archive_notes_field")]
  #[schema(value_type = Option<String>)]
  archive_notes: Option<Option<String>>,
}

#[utoipa::path(
  put,
  path = "/{id}/status",
  tag = PROJECTS_TAG,
  request_body = UpdateStatus,
  responses(
    (status = 200, description = "Status changed", body = Project),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn update_project_status(
  State(state): State<AppState>,
  Path(id): Path<String>,
  AppJson(input): AppJson<UpdateStatus>,
) -> ApiResult<Json<Project>> {
  let project = state
    .store
    .update_project_status(&id, input.status, ArchiveNotes::from_field(input.archive_notes))
    .await?;

  Ok(Json(project))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct CreateTodo {
  #[validate(length(min = 1))]
  text: String,
}

#[utoipa::path(
  post,
  path = "/{id}/todos",
  tag = PROJECTS_TAG,
  request_body = CreateTodo,
  responses(
    (status = 201, description = "Todo added", body = Todo),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn add_todo(
  State(state): State<AppState>,
  Path(id): Path<String>,
  AppJson(input): AppJson<CreateTodo>,
) -> ApiResult<(StatusCode, Json<Todo>)> {
  input.validate()?;

  let todo = state.store.add_todo(&id, &input.text).await?;

  Ok((StatusCode::CREATED, Json(todo)))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct UpdateTodo {
  #[validate(length(min = 1))]
  text: String,
  #[serde(default)]
  completed: bool,
}

#[utoipa::path(
  put,
  path = "/{id}/todos/{todo_id}",
  tag = PROJECTS_TAG,
  request_body = UpdateTodo,
  responses(
    (status = 200, description = "Todo updated", body = Todo),
  ),
  params(
    ("id" = String, Path, description = "Project id"),
    ("todo_id" = String, Path, description = "Todo id")
  )
)]
#[instrument(skip(state))]
async fn update_todo(
  State(state): State<AppState>,
  Path((id, todo_id)): Path<(String, String)>,
  AppJson(input): AppJson<UpdateTodo>,
) -> ApiResult<Json<Todo>> {
  input.validate()?;

  let todo = Todo {
    id: todo_id,
    text: input.text,
    completed: input.completed,
  };
  let todo = state.store.update_todo(&id, &todo).await?;

  Ok(Json(todo))
}

#[utoipa::path(
  delete,
  path = "/{id}/todos/{todo_id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Todo removed"),
  ),
  params(
    ("id" = String, Path, description = "Project id"),
    ("todo_id" = String, Path, description = "Todo id")
  )
)]
#[instrument(skip(state))]
async fn delete_todo(State(state): State<AppState>, Path((id, todo_id)): Path<(String, String)>) -> ApiResult<()> {
  state.store.delete_todo(&id, &todo_id).await?;

  Ok(())
}

#[utoipa::path(
  get,
  path = "/{id}/related",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Projects this one links to", body = [Project]),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn list_related_projects(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<Project>>> {
  let related = state.store.load_related_projects(&id).await?;

  Ok(Json(related))
}

#[utoipa::path(
  post,
  path = "/{id}/related/{to_id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 201, description = "Relation added"),
    (status = 400, description = "Self relation or duplicate"),
  ),
  params(
    ("id" = String, Path, description = "Source project id"),
    ("to_id" = String, Path, description = "Target project id")
  )
)]
#[instrument(skip(state))]
async fn add_project_relation(
  State(state): State<AppState>,
  Path((id, to_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
  state.store.add_project_relation(&id, &to_id).await?;

  Ok(StatusCode::CREATED)
}

#[utoipa::path(
  delete,
  path = "/{id}/related/{to_id}",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Relation removed"),
  ),
  params(
    ("id" = String, Path, description = "Source project id"),
    ("to_id" = String, Path, description = "Target project id")
  )
)]
#[instrument(skip(state))]
async fn remove_project_relation(
  State(state): State<AppState>,
  Path((id, to_id)): Path<(String, String)>,
) -> ApiResult<()> {
  state.store.remove_project_relation(&id, &to_id).await?;

  Ok(())
}

#[utoipa::path(
  get,
  path = "/{id}/images",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Images of the project", body = [ProjectImage]),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state))]
async fn list_project_images(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> ApiResult<Json<Vec<ProjectImage>>> {
  let images = state.store.provider().get_project_images(&id).await?;

  Ok(Json(images))
}

#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadImageForm {
  #[schema(value_type = String, format = Binary)]
  file: Vec<u8>,
  caption: Option<String>,
  alt: Option<String>,
}

#[utoipa::path(
  post,
  path = "/{id}/images",
  tag = PROJECTS_TAG,
  request_body(content = UploadImageForm, content_type = "multipart/form-data"),
  responses(
    (status = 201, description = "Image stored", body = ProjectImage),
    (status = 400, description = "Missing file or unsupported type"),
  ),
  params(
    ("id" = String, Path, description = "Project id")
  )
)]
#[instrument(skip(state, multipart))]
async fn upload_project_image(
  State(state): State<AppState>,
  Path(id): Path<String>,
  mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ProjectImage>)> {
  let mut upload = None;
  let mut caption = None;
  let mut alt = None;

  while let Some(field) = multipart.next_field().await? {
    let name = field.name().unwrap_or_default().to_string();

    match name.as_str() {
      "file" => {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some(ImageUpload::new(file_name, mime_type, bytes.to_vec()));
      },
      "caption" => caption = Some(field.text().await?).filter(|s| !s.is_empty()),
      "alt" => alt = Some(field.text().await?).filter(|s| !s.is_empty()),
      other => debug!("Ignoring form field {}", other),
    }
  }

  let mut upload = upload.ok_or_else(|| HubError::validation("No file provided"))?;
  upload.caption = caption;
  upload.alt = alt;

  let image = state.store.upload_project_image(&id, upload).await?;

  Ok((StatusCode::CREATED, Json(image)))
}
