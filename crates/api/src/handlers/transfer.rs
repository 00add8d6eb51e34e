use axum::{
  extract::State,
  http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
  response::IntoResponse,
};
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

use project_hub_core::entities::Project;
use project_hub_store::EXPORT_FILE_NAME;

use crate::{error::ApiResult, AppState};

const TRANSFER_TAG: &str = "transfer";

pub fn init_transfer_routes() -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(export_projects))
    .routes(routes!(import_projects))
}

#[utoipa::path(
  get,
  path = "/api/export",
  tag = TRANSFER_TAG,
  responses(
    (status = 200, description = "Every project as a downloadable JSON document", body = [Project])
  )
)]
#[instrument(skip(state))]
async fn export_projects(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
  let document = state.store.export_json()?;

  Ok((
    [
      (CONTENT_TYPE, "application/json".to_string()),
      (CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILE_NAME}\"")),
    ],
    document,
  ))
}

/// Takes the raw document so a malformed upload is reported the same way as
/// one that fails validation.
#[utoipa::path(
  post,
  path = "/api/import",
  tag = TRANSFER_TAG,
  request_body(content = [Project], content_type = "application/json"),
  responses(
    (status = 200, description = "Everything replaced by the document"),
    (status = 400, description = "Malformed or invalid document"),
  )
)]
#[instrument(skip(state, document), fields(bytes = document.len()))]
async fn import_projects(State(state): State<AppState>, document: String) -> ApiResult<()> {
  state.store.import_json(&document).await?;

  Ok(())
}
