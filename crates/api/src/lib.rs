use std::{path::PathBuf, sync::Arc};

use axum::{
  extract::{FromRequest, State},
  http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
  },
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use error::ApiError;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use handlers::{
  assist::init_assist_routes, images::init_images_routes, projects::init_projects_routes,
  transfer::init_transfer_routes,
};
use project_hub_assist::{Assistant, LanguageModel};
use project_hub_store::ProjectStore;

pub mod error;
mod handlers;
pub mod workers;

const PROJECT_HUB_TAG: &str = "project-hub";

pub type DynAssistant = Assistant<Box<dyn LanguageModel>>;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<ProjectStore>,
  /// `None` when no model is configured.
  pub assistant: Option<Arc<DynAssistant>>,
}

impl AppState {
  pub fn new(store: Arc<ProjectStore>) -> Self {
    Self { store, assistant: None }
  }

  pub fn assistant(mut self, assistant: DynAssistant) -> Self {
    self.assistant = Some(Arc::new(assistant));
    self
  }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  pub cors_origin: String,
  pub uploads_dir: PathBuf,
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct AppJson<T>(T);

/// Handle health check requests
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
  let loaded = state.store.is_loaded();

  Json(json!({
    "success": loaded,
    "projects": state.store.projects().len(),
    "assistant": state.assistant.is_some(),
  }))
}

/// Builds the full application: API routes, Swagger UI and the uploads directory.
pub fn router(state: AppState, config: &ServerConfig) -> anyhow::Result<Router> {
  let cors = CorsLayer::new()
    .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([ACCEPT, CONTENT_TYPE]);

  #[derive(OpenApi)]
  #[openapi(
    tags(
      (name = PROJECT_HUB_TAG, description = "Personal project board API")
    )
  )]
  struct ApiDoc;

  let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
    .route("/health", get(health_handler))
    .nest("/api/projects", init_projects_routes())
    .nest("/api/images", init_images_routes())
    .nest("/api/assist", init_assist_routes())
    .merge(init_transfer_routes())
    .layer(cors)
    .with_state(state)
    .split_for_parts();

  let router = router
    .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
    .nest_service("/uploads", ServeDir::new(&config.uploads_dir));

  Ok(router)
}

pub async fn run(state: AppState, config: ServerConfig, cancel_token: CancellationToken) -> anyhow::Result<()> {
  let server_url = format!("{}:{}", config.host, config.port);
  let router = router(state, &config)?;

  info!("Starting api server on {}...", server_url);

  let listener = TcpListener::bind(&server_url).await?;
  axum::serve(listener, router.into_make_service())
    .with_graceful_shutdown(Box::pin(async move { cancel_token.cancelled().await }))
    .await?;

  info!("Stopped api server");

  Ok(())
}
