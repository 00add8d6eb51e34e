use axum::{
  extract::{Path, State},
  Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use project_hub_core::entities::ProjectImage;

use crate::{error::ApiResult, AppJson, AppState};

const IMAGES_TAG: &str = "images";

pub fn init_images_routes() -> OpenApiRouter<AppState> {
  OpenApiRouter::new().routes(routes!(update_image_caption, delete_image))
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateCaption {
  caption: String,
}

#[utoipa::path(
  put,
  path = "/{image_id}",
  tag = IMAGES_TAG,
  request_body = UpdateCaption,
  responses(
    (status = 200, description = "Caption updated", body = ProjectImage),
    (status = 404, description = "Image not found"),
  ),
  params(
    ("image_id" = String, Path, description = "Image id")
  )
)]
#[instrument(skip(state))]
async fn update_image_caption(
  State(state): State<AppState>,
  Path(image_id): Path<String>,
  AppJson(input): AppJson<UpdateCaption>,
) -> ApiResult<Json<ProjectImage>> {
  let image = state
    .store
    .update_project_image_caption(&image_id, &input.caption)
    .await?;

  Ok(Json(image))
}

#[utoipa::path(
  delete,
  path = "/{image_id}",
  tag = IMAGES_TAG,
  responses(
    (status = 200, description = "Image and its file removed"),
  ),
  params(
    ("image_id" = String, Path, description = "Image id")
  )
)]
#[instrument(skip(state))]
async fn delete_image(State(state): State<AppState>, Path(image_id): Path<String>) -> ApiResult<()> {
  debug!("Remove image with id {}", image_id);

  state.store.delete_project_image(&image_id).await?;

  Ok(())
}
