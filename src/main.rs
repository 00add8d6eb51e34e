use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use project_hub_api::{workers::sweep_uploads, AppState};
use project_hub_assist::{Assistant, LanguageModel, OpenRouterModel};
use project_hub_core::StorageProvider;
use project_hub_storage::{db, DiskImageStore, FileKeyValue, LocalProvider, SqliteProvider};
use project_hub_store::ProjectStore;

use config::{Config, StorageKind};

mod config;
mod utils;

const MAX_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  let config = Config::from_env()?;

  let env_filter = EnvFilter::from_default_env().add_directive(config.log_level.parse()?);

  // Initialize tracing subscriber with the environment filter
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  if rustls::crypto::ring::default_provider().install_default().is_err() {
    warn!("A TLS crypto provider was already installed");
  }

  let cancel_token = CancellationToken::new();

  // Start task for catching interrupt
  tokio::spawn({
    let cancel_token = cancel_token.clone();
    async move {
      let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
          error!("Failed to install Ctrl+C handler: {}", e);
          std::future::pending::<()>().await;
        }
      };

      #[cfg(unix)]
      let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
          Ok(mut stream) => {
            stream.recv().await;
          },
          Err(e) => {
            error!("Failed to install signal handler: {}", e);
            std::future::pending::<()>().await;
          },
        }
      };

      #[cfg(not(unix))]
      let terminate = std::future::pending::<()>();

      tokio::select! {
        _ = ctrl_c => {
          info!("Received Ctrl-C, shutting down...");
          cancel_token.cancel()
        },
        _ = terminate => {
          info!("Received terminate, shutting down...");
          cancel_token.cancel()
        },
      }
    }
  });

  let images = Arc::new(DiskImageStore::new(&config.server.uploads_dir));

  let (provider, pool) = match config.storage {
    StorageKind::Sqlite => {
      let pool = Arc::new(db::connect(&config.database_url, MAX_CONNECTIONS).await?);
      db::migrate(&pool).await?;
      info!("Using SQLite storage at {}", config.database_url);

      (
        Arc::new(SqliteProvider::new(pool.clone(), images.clone())) as Arc<dyn StorageProvider>,
        Some(pool),
      )
    },
    StorageKind::Local => {
      info!("Using local storage in {}", config.local_dir.display());

      (
        Arc::new(LocalProvider::new(FileKeyValue::new(&config.local_dir), images.clone())) as Arc<dyn StorageProvider>,
        None,
      )
    },
  };

  let store = Arc::new(ProjectStore::new(provider.clone()));
  if let Err(e) = store.load().await {
    warn!("Starting with an empty board: {}", e);
  }

  let mut state = AppState::new(store);
  match &config.openrouter_api_key {
    Some(api_key) => {
      let model: Box<dyn LanguageModel> = Box::new(OpenRouterModel::new(api_key, &config.model));
      state = state.assistant(Assistant::new(model));
      info!("Assistant enabled with model {}", config.model);
    },
    None => info!("OPENROUTER_API_KEY is not set, assistant disabled"),
  }

  if let Err(err) = utils::join_all(
    vec![
      project_hub_api::run(state, config.server.clone(), cancel_token.clone()).boxed(),
      sweep_uploads::run(provider, images, config.sweep, cancel_token.clone()).boxed(),
    ],
    cancel_token,
  )
  .await
  {
    error!("One of main thread get error while execution: {:?}", err);
  }

  if let Some(pool) = pool {
    pool.close().await;
  }

  Ok(())
}
