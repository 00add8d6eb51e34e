use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use validator::Validate;

use project_hub_core::HubError;

use crate::{error::ApiResult, AppJson, AppState, DynAssistant};

const ASSIST_TAG: &str = "assist";

pub fn init_assist_routes() -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(generate_ideas))
    .routes(routes!(improve_notes))
}

fn assistant(state: &AppState) -> Result<&DynAssistant, HubError> {
  state
    .assistant
    .as_deref()
    .ok_or_else(|| HubError::Model("No language model is configured".into()))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct GenerateIdeas {
  #[validate(length(min = 1))]
  keywords: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Ideas {
  ideas: Vec<String>,
}

#[utoipa::path(
  post,
  path = "/ideas",
  tag = ASSIST_TAG,
  request_body = GenerateIdeas,
  responses(
    (status = 200, description = "Suggested project ideas", body = Ideas),
    (status = 502, description = "The model failed or answered with nothing"),
  )
)]
#[instrument(skip(state))]
async fn generate_ideas(
  State(state): State<AppState>,
  AppJson(input): AppJson<GenerateIdeas>,
) -> ApiResult<Json<Ideas>> {
  input.validate()?;

  let ideas = assistant(&state)?.generate_ideas(&input.keywords).await?;

  Ok(Json(Ideas { ideas }))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ImproveNotes {
  #[serde(default)]
  description: String,
  #[serde(default)]
  notes: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedNotes {
  improved_notes: String,
}

#[utoipa::path(
  post,
  path = "/notes",
  tag = ASSIST_TAG,
  request_body = ImproveNotes,
  responses(
    (status = 200, description = "Rewritten notes", body = ImprovedNotes),
    (status = 502, description = "The model failed or answered with nothing"),
  )
)]
#[instrument(skip(state, input))]
async fn improve_notes(
  State(state): State<AppState>,
  AppJson(input): AppJson<ImproveNotes>,
) -> ApiResult<Json<ImprovedNotes>> {
  let improved_notes = assistant(&state)?
    .improve_notes(&input.description, &input.notes)
    .await?;

  Ok(Json(ImprovedNotes { improved_notes }))
}
