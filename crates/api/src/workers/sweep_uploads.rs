use std::{collections::HashSet, sync::Arc, time::SystemTime};

use anyhow::Result;
use tokio::select;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use project_hub_core::{HubResult, StorageProvider};
use project_hub_storage::DiskImageStore;

#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
  /// Pause between passes.
  pub interval: Duration,
  /// Unreferenced files younger than this are left alone, so an upload whose
  /// row is not written yet survives.
  pub grace: Duration,
}

/// Periodically removes upload files that no image record points at.
pub async fn run(
  provider: Arc<dyn StorageProvider>,
  images: Arc<DiskImageStore>,
  settings: SweepSettings,
  cancel_token: CancellationToken,
) -> Result<()> {
  info!("Uploads sweeper started");

  while !cancel_token.is_cancelled() {
    select! {
      biased;
      _ = cancel_token.cancelled() => {
        info!("Uploads sweeper stopped");
        break;
      }
      _ = sleep(settings.interval) => {
        match sweep_once(provider.as_ref(), &images, settings.grace).await {
          Ok(removed) => debug!("Removed {} orphaned uploads", removed),
          Err(e) => error!("Failed to sweep uploads: {}", e),
        }
      }
    }
  }

  Ok(())
}

/// One pass over the uploads directory. Returns how many files were removed.
pub async fn sweep_once(provider: &dyn StorageProvider, images: &DiskImageStore, grace: Duration) -> HubResult<usize> {
  let referenced: HashSet<String> = provider
    .get_all_projects()
    .await?
    .into_iter()
    .flat_map(|p| p.images)
    .map(|image| image.url)
    .collect();

  let now = SystemTime::now();
  let mut removed = 0;

  for file in images.list().await? {
    if referenced.contains(&file.url) {
      continue;
    }

    // a modification time in the future counts as fresh
    let age = now.duration_since(file.modified).unwrap_or_default();
    if age < grace {
      continue;
    }

    match images.remove(&file.url).await {
      Ok(()) => removed += 1,
      Err(e) => warn!("Failed to remove {}: {}", file.path.display(), e),
    }
  }

  Ok(removed)
}
