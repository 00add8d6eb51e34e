use std::{
  collections::HashMap,
  io::ErrorKind,
  path::PathBuf,
  sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs;

use project_hub_core::{HubError, HubResult};

/// A string slot store, the stand-in for browser local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
  async fn get(&self, key: &str) -> HubResult<Option<String>>;

  async fn set(&self, key: &str, value: String) -> HubResult<()>;

  async fn delete(&self, key: &str) -> HubResult<()>;
}

/// Builder-style structure used to create a [`MemoryKeyValue`].
#[derive(Default)]
pub struct MemoryKeyValueBuilder {
  in_memory_data: HashMap<String, String>,
}

impl MemoryKeyValueBuilder {
  /// Preset data for the slots.
  pub fn in_memory_data<I, K, V>(mut self, data: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    self.in_memory_data = data.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    self
  }

  pub fn build(self) -> MemoryKeyValue {
    MemoryKeyValue {
      data: Arc::new(Mutex::new(self.in_memory_data)),
    }
  }
}

/// Process-local slots. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryKeyValue {
  data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValue {
  pub fn new() -> Self {
    Default::default()
  }

  /// Convenience function for calling [`MemoryKeyValueBuilder::default`].
  pub fn builder() -> MemoryKeyValueBuilder {
    MemoryKeyValueBuilder::default()
  }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValue {
  async fn get(&self, key: &str) -> HubResult<Option<String>> {
    Ok(self.data.lock().get(key).cloned())
  }

  async fn set(&self, key: &str, value: String) -> HubResult<()> {
    self.data.lock().insert(key.to_string(), value);
    Ok(())
  }

  async fn delete(&self, key: &str) -> HubResult<()> {
    self.data.lock().remove(key);
    Ok(())
  }
}

/// One file per slot inside a directory. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileKeyValue {
  dir: PathBuf,
}

impl FileKeyValue {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  fn path(&self, key: &str) -> HubResult<PathBuf> {
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
      return Err(HubError::Backend(format!("invalid storage key `{key}`")));
    }

    Ok(self.dir.join(format!("{key}.json")))
  }
}

#[async_trait]
impl KeyValueStore for FileKeyValue {
  async fn get(&self, key: &str) -> HubResult<Option<String>> {
    match fs::read_to_string(self.path(key)?).await {
      Ok(value) => Ok(Some(value)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn set(&self, key: &str, value: String) -> HubResult<()> {
    let path = self.path(key)?;
    let tmp = path.with_extension("json.tmp");

    fs::create_dir_all(&self.dir).await?;
    fs::write(&tmp, value).await?;
    fs::rename(&tmp, &path).await?;

    Ok(())
  }

  async fn delete(&self, key: &str) -> HubResult<()> {
    match fs::remove_file(self.path(key)?).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_memory_slots() {
    let store = MemoryKeyValue::builder().in_memory_data([("a", "1")]).build();
    let shared = store.clone();

    assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
    shared.set("b", "2".into()).await.unwrap();
    assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    store.delete("a").await.unwrap();
    assert_eq!(shared.get("a").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_file_slots() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValue::new(dir.path().join("slots"));

    assert_eq!(store.get("project-hub-projects").await.unwrap(), None);

    store.set("project-hub-projects", "[]".into()).await.unwrap();
    assert_eq!(store.get("project-hub-projects").await.unwrap().as_deref(), Some("[]"));
    assert!(dir.path().join("slots/project-hub-projects.json").exists());

    store.delete("project-hub-projects").await.unwrap();
    store.delete("project-hub-projects").await.unwrap();
    assert_eq!(store.get("project-hub-projects").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_file_slots_reject_path_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyValue::new(dir.path());

    assert!(store.get("../escape").await.is_err());
  }
}
