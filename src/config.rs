use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};

use project_hub_api::{workers::sweep_uploads::SweepSettings, ServerConfig};
use project_hub_assist::DEFAULT_MODEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
  Sqlite,
  Local,
}

impl FromStr for StorageKind {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "sqlite" => Ok(StorageKind::Sqlite),
      "local" => Ok(StorageKind::Local),
      other => Err(anyhow!("unknown storage kind `{other}`, expected `sqlite` or `local`")),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub log_level: String,
  pub database_url: String,
  pub storage: StorageKind,
  pub local_dir: PathBuf,
  pub server: ServerConfig,
  pub openrouter_api_key: Option<String>,
  pub model: String,
  pub sweep: SweepSettings,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

    let port = var("PORT", "9002");
    let port = port.parse().with_context(|| format!("PORT `{port}` is not a valid port"))?;

    Ok(Self {
      log_level: var("PROJECT_HUB_LOG_LEVEL", "info"),
      database_url: var("DATABASE_URL", "sqlite://project-hub.db?mode=rwc"),
      storage: var("PROJECT_HUB_STORAGE", "sqlite").parse()?,
      local_dir: var("PROJECT_HUB_LOCAL_DIR", "./data").into(),
      server: ServerConfig {
        host: var("HOST", "127.0.0.1"),
        port,
        cors_origin: var("PROJECT_HUB_CORS_ORIGIN", "http://localhost:3000"),
        uploads_dir: var("PROJECT_HUB_UPLOADS_DIR", "./public/uploads").into(),
      },
      openrouter_api_key: lookup("OPENROUTER_API_KEY").filter(|key| !key.trim().is_empty()),
      model: var("PROJECT_HUB_MODEL", DEFAULT_MODEL),
      sweep: SweepSettings {
        interval: seconds(&lookup, "PROJECT_HUB_SWEEP_INTERVAL_SECS")?,
        grace: seconds(&lookup, "PROJECT_HUB_SWEEP_GRACE_SECS")?,
      },
    })
  }
}

const DEFAULT_SWEEP_SECS: u64 = 3600;

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Duration> {
  match lookup(key) {
    Some(value) => value
      .parse()
      .map(Duration::from_secs)
      .with_context(|| format!("{key} `{value}` is not a number of seconds")),
    None => Ok(Duration::from_secs(DEFAULT_SWEEP_SECS)),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn config(vars: &[(&str, &str)]) -> Result<Config> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Config::from_lookup(|key| vars.get(key).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = config(&[]).unwrap();

    assert_eq!(config.storage, StorageKind::Sqlite);
    assert_eq!(config.server.port, 9002);
    assert_eq!(config.server.uploads_dir, PathBuf::from("./public/uploads"));
    assert_eq!(config.model, DEFAULT_MODEL);
    assert_eq!(config.openrouter_api_key, None);
    assert_eq!(config.sweep.grace, Duration::from_secs(3600));
  }

  #[test]
  fn test_overrides() {
    let config = config(&[
      ("PROJECT_HUB_STORAGE", "local"),
      ("PORT", "8080"),
      ("OPENROUTER_API_KEY", "sk-test"),
      ("PROJECT_HUB_SWEEP_INTERVAL_SECS", "60"),
    ])
    .unwrap();

    assert_eq!(config.storage, StorageKind::Local);
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-test"));
    assert_eq!(config.sweep.interval, Duration::from_secs(60));
  }

  #[test]
  fn test_invalid_values_fail() {
    assert!(config(&[("PORT", "eighty")]).is_err());
    assert!(config(&[("PROJECT_HUB_STORAGE", "postgres")]).is_err());
    assert!(config(&[("PROJECT_HUB_SWEEP_GRACE_SECS", "-1")]).is_err());
  }
}
