use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
  time::SystemTime,
};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use project_hub_core::{
  entities::{ImageUpload, ProjectImage},
  validation::upload_file_name,
  HubResult,
};

pub const DEFAULT_PUBLIC_PREFIX: &str = "/uploads";

/// A file found in the uploads directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
  pub url: String,
  pub path: PathBuf,
  pub modified: SystemTime,
}

/// Image binaries on local disk, addressed by a public url path.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
  root: PathBuf,
  public_prefix: String,
}

impl DiskImageStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
    }
  }

  pub fn public_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.public_prefix = prefix.into().trim_end_matches('/').to_string();
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Writes the upload and returns the metadata to record for it.
  ///
  /// The caller is expected to have validated the MIME type already.
  pub async fn store(&self, project_id: &str, upload: &ImageUpload) -> HubResult<ProjectImage> {
    let now = Utc::now();
    let file_name = upload_file_name(project_id, now.timestamp_millis(), &upload.file_name)?;

    fs::create_dir_all(&self.root).await?;
    fs::write(self.root.join(&file_name), &upload.bytes).await?;

    debug!("Stored upload {} ({} bytes)", file_name, upload.bytes.len());

    Ok(ProjectImage {
      id: Uuid::new_v4().to_string(),
      project_id: project_id.to_string(),
      url: format!("{}/{}", self.public_prefix, file_name),
      caption: upload.caption.clone(),
      alt: upload.alt.clone(),
      width: None,
      height: None,
      file_size: upload.bytes.len() as i64,
      mime_type: upload.mime_type.clone(),
      created_at: now,
      updated_at: now,
    })
  }

  /// Removes the file behind `url`. A file that is already gone is fine.
  pub async fn remove(&self, url: &str) -> HubResult<()> {
    let Some(path) = self.path_for_url(url) else {
      warn!("Refusing to remove {}: not under {}", url, self.public_prefix);
      return Ok(());
    };

    match fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  /// Best effort removal of several files, failures are only logged.
  pub async fn remove_all<'a>(&self, urls: impl IntoIterator<Item = &'a String>) {
    for url in urls {
      if let Err(e) = self.remove(url).await {
        warn!("Failed to remove image file {}: {}", url, e);
      }
    }
  }

  pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
    let name = url.strip_prefix(&self.public_prefix)?.strip_prefix('/')?;

    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
      return None;
    }

    Some(self.root.join(name))
  }

  /// Lists the files currently in the uploads directory.
  pub async fn list(&self) -> HubResult<Vec<StoredFile>> {
    let mut entries = match fs::read_dir(&self.root).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
      Err(e) => return Err(e.into()),
    };

    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await? {
      let metadata = entry.metadata().await?;
      if !metadata.is_file() {
        continue;
      }

      let Some(name) = entry.file_name().to_str().map(str::to_string) else {
        continue;
      };

      files.push(StoredFile {
        url: format!("{}/{}", self.public_prefix, name),
        path: entry.path(),
        modified: metadata.modified()?,
      });
    }

    Ok(files)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_store_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = DiskImageStore::new(dir.path().join("uploads"));

    let image = store
      .store("p1", &ImageUpload::new("cat.png", "image/png", vec![1, 2, 3]).caption("a cat"))
      .await
      .unwrap();

    assert!(image.url.starts_with("/uploads/p1-"));
    assert!(image.url.ends_with("-cat.png"));
    assert_eq!(image.file_size, 3);
    assert_eq!(image.caption.as_deref(), Some("a cat"));
    assert_eq!(image.width, None);

    let path = store.path_for_url(&image.url).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    assert_eq!(store.list().await.unwrap().len(), 1);

    store.remove(&image.url).await.unwrap();
    assert!(!path.exists());
    // second removal is a no-op
    store.remove(&image.url).await.unwrap();
  }

  #[test]
  fn test_path_for_url_stays_inside_root() {
    let store = DiskImageStore::new("/srv/uploads");

    assert_eq!(
      store.path_for_url("/uploads/p1-1-cat.png"),
      Some(PathBuf::from("/srv/uploads/p1-1-cat.png"))
    );
    assert_eq!(store.path_for_url("/uploads/../secret"), None);
    assert_eq!(store.path_for_url("/elsewhere/cat.png"), None);
  }

  #[tokio::test]
  async fn test_list_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = DiskImageStore::new(dir.path().join("never-created"));

    assert!(store.list().await.unwrap().is_empty());
  }
}
