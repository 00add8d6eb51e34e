//! Router behaviour exercised in-process with `oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
  body::Body,
  http::{header, Method, Request, StatusCode},
  response::Response,
  Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use project_hub_api::{router, AppState, ServerConfig};
use project_hub_assist::{Assistant, LanguageModel};
use project_hub_core::HubResult;
use project_hub_storage::{DiskImageStore, LocalProvider, MemoryKeyValue};
use project_hub_store::ProjectStore;

struct CannedModel(&'static str);

#[async_trait]
impl LanguageModel for CannedModel {
  async fn complete(&self, _prompt: &str) -> HubResult<String> {
    Ok(self.0.to_string())
  }
}

struct TestApp {
  router: Router,
  _dir: TempDir,
}

async fn app(model: Option<&'static str>) -> TestApp {
  let dir = tempfile::tempdir().unwrap();
  let uploads_dir = dir.path().join("uploads");
  let images = Arc::new(DiskImageStore::new(&uploads_dir));
  let store = Arc::new(ProjectStore::new(Arc::new(LocalProvider::new(MemoryKeyValue::new(), images))));
  store.load().await.unwrap();

  let mut state = AppState::new(store);
  if let Some(reply) = model {
    state = state.assistant(Assistant::new(Box::new(CannedModel(reply)) as Box<dyn LanguageModel>));
  }

  let config = ServerConfig {
    host: "127.0.0.1".into(),
    port: 0,
    cors_origin: "http://localhost:3000".into(),
    uploads_dir,
  };

  TestApp {
    router: router(state, &config).unwrap(),
    _dir: dir,
  }
}

async fn send(app: &TestApp, method: Method, uri: &str, body: Option<Value>) -> Response {
  let request = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(body) => request
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string())),
    None => request.body(Body::empty()),
  };

  app.router.clone().oneshot(request.unwrap()).await.unwrap()
}

async fn body_json(response: Response) -> Value {
  let bytes = response.into_body().collect().await.unwrap().to_bytes();
  serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_loaded_store() {
  let app = app(None).await;

  let response = send(&app, Method::GET, "/health", None).await;

  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(body_json(response).await["success"], true);
}

#[tokio::test]
async fn test_project_lifecycle() {
  let app = app(None).await;

  let response = send(&app, Method::POST, "/api/projects", Some(json!({ "name": "Board" }))).await;
  assert_eq!(response.status(), StatusCode::CREATED);
  let project = body_json(response).await;
  assert_eq!(project["status"], "draft");
  let id = project["id"].as_str().unwrap().to_string();

  let response = send(
    &app,
    Method::POST,
    &format!("/api/projects/{id}/todos"),
    Some(json!({ "text": "sketch" })),
  )
  .await;
  assert_eq!(response.status(), StatusCode::CREATED);

  let response = send(
    &app,
    Method::PUT,
    &format!("/api/projects/{id}/status"),
    Some(json!({ "status": "archived", "archiveNotes": "on hold" })),
  )
  .await;
  assert_eq!(response.status(), StatusCode::OK);
  let archived = body_json(response).await;
  assert_eq!(archived["archiveNotes"], "on hold");
  assert_eq!(archived["todos"].as_array().unwrap().len(), 1);

  let listed = body_json(send(&app, Method::GET, "/api/projects", None).await).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let response = send(&app, Method::DELETE, &format!("/api/projects/{id}"), None).await;
  assert_eq!(response.status(), StatusCode::OK);

  let response = send(&app, Method::GET, &format!("/api/projects/{id}"), None).await;
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(response).await["kind"], "RESOURCE_NOT_FOUND");
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
  let app = app(None).await;

  let response = send(&app, Method::POST, "/api/projects", Some(json!({ "name": "" }))).await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  assert_eq!(body_json(response).await["kind"], "INVALID_INPUT_ERROR");
}

#[tokio::test]
async fn test_self_relation_is_a_bad_request() {
  let app = app(None).await;
  let project = body_json(send(&app, Method::POST, "/api/projects", Some(json!({ "name": "A" }))).await).await;
  let id = project["id"].as_str().unwrap();

  let response = send(&app, Method::POST, &format!("/api/projects/{id}/related/{id}"), None).await;

  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_is_an_attachment_and_import_rejects_garbage() {
  let app = app(None).await;
  send(&app, Method::POST, "/api/projects", Some(json!({ "name": "A" }))).await;

  let response = send(&app, Method::GET, "/api/export", None).await;
  assert_eq!(response.status(), StatusCode::OK);
  let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
  assert!(disposition.contains("project-hub-data.json"));
  let document = body_json(response).await;

  let request = Request::builder()
    .method(Method::POST)
    .uri("/api/import")
    .body(Body::from("not json"))
    .unwrap();
  let response = app.router.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);

  let response = send(&app, Method::POST, "/api/import", Some(document.clone())).await;
  assert_eq!(response.status(), StatusCode::OK);
  let listed = body_json(send(&app, Method::GET, "/api/projects", None).await).await;
  assert_eq!(listed, document);
}

#[tokio::test]
async fn test_assist_without_model_is_a_bad_gateway() {
  let app = app(None).await;

  let response = send(&app, Method::POST, "/api/assist/ideas", Some(json!({ "keywords": "rust" }))).await;

  assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
  assert_eq!(body_json(response).await["kind"], "MODEL_ERROR");
}

#[tokio::test]
async fn test_assist_returns_ideas_and_notes() {
  let app = app(Some("First idea\n\nSecond idea\n")).await;

  let ideas = body_json(send(&app, Method::POST, "/api/assist/ideas", Some(json!({ "keywords": "rust" }))).await).await;
  assert_eq!(ideas["ideas"], json!(["First idea", "Second idea"]));

  let notes = body_json(
    send(
      &app,
      Method::POST,
      "/api/assist/notes",
      Some(json!({ "description": "d", "notes": "n" })),
    )
    .await,
  )
  .await;
  assert_eq!(notes["improvedNotes"], "First idea\n\nSecond idea");
}

#[tokio::test]
async fn test_image_upload_via_multipart() {
  let app = app(None).await;
  let project = body_json(send(&app, Method::POST, "/api/projects", Some(json!({ "name": "A" }))).await).await;
  let id = project["id"].as_str().unwrap();

  let boundary = "XBOUNDARY";
  let body = format!(
    "--{boundary}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nHome\r\n\
     --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"shot.png\"\r\n\
     Content-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
  );
  let request = Request::builder()
    .method(Method::POST)
    .uri(format!("/api/projects/{id}/images"))
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
    .body(Body::from(body))
    .unwrap();

  let response = app.router.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::CREATED);
  let image = body_json(response).await;
  assert_eq!(image["caption"], "Home");
  assert_eq!(image["mimeType"], "image/png");
  assert_eq!(image["fileSize"], 7);

  let url = image["url"].as_str().unwrap();
  let served = send(&app, Method::GET, url, None).await;
  assert_eq!(served.status(), StatusCode::OK);

  let image_id = image["id"].as_str().unwrap();
  let response = send(&app, Method::DELETE, &format!("/api/images/{image_id}"), None).await;
  assert_eq!(response.status(), StatusCode::OK);
}
