use std::{io, path::PathBuf};

use simple_kv_store::{normalize_key, InMemoryStore, KeyValueStore, KubernetesStore, SQLiteStore};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::{config::AddonConfig, settings::ConfigStoreConfig};

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Cannot access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid yaml config document: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("Invalid config document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config store backend error: {0}")]
    Backend(String),
}

/// Where the add-on configuration document lives.
///
/// The document is read once and written once per startup.
pub enum ConfigStore {
    File { path: PathBuf },
    KeyValue { store: KeyValueStore, key: String },
}

impl ConfigStore {
    pub async fn open(config: &ConfigStoreConfig, addon_id: &str) -> Result<Self, ConfigStoreError> {
        let key = normalize_key(addon_id);
        let store = match config {
            ConfigStoreConfig::File { path } => return Ok(ConfigStore::File { path: path.clone() }),
            ConfigStoreConfig::InMemory => KeyValueStore::InMemory(InMemoryStore::new()),
            ConfigStoreConfig::Sqlite { path } => KeyValueStore::SQLite(open_sqlite(path).await?),
            ConfigStoreConfig::Kubernetes {
                name,
                namespace,
                ressource_type,
            } => KeyValueStore::Kubernetes(
                KubernetesStore::new(namespace, name, *ressource_type)
                    .await
                    .map_err(|e| ConfigStoreError::Backend(e.to_string()))?,
            ),
        };
        Ok(ConfigStore::KeyValue { store, key })
    }

    pub fn in_memory(addon_id: &str) -> Self {
        ConfigStore::KeyValue {
            store: KeyValueStore::InMemory(InMemoryStore::new()),
            key: normalize_key(addon_id),
        }
    }

    /// Reads the document. A store without a document yields the default document.
    pub async fn load(&self) -> Result<AddonConfig, ConfigStoreError> {
        match self {
            ConfigStore::File { path } => match tokio::fs::read_to_string(path).await {
                Ok(doc) if doc.trim().is_empty() => Ok(AddonConfig::default()),
                Ok(doc) => Ok(serde_yml::from_str(&doc)?),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::debug!("No config file at {}, starting empty", path.display());
                    Ok(AddonConfig::default())
                }
                Err(source) => Err(ConfigStoreError::Io {
                    path: path.clone(),
                    source,
                }),
            },
            ConfigStore::KeyValue { store, key } => match get_raw(store, key).await {
                Some(doc) => Ok(serde_json::from_str(&doc)?),
                None => {
                    log::debug!("No config document under {}, starting empty", key);
                    Ok(AddonConfig::default())
                }
            },
        }
    }

    pub async fn save(&self, config: &AddonConfig) -> Result<(), ConfigStoreError> {
        match self {
            ConfigStore::File { path } => {
                let doc = serde_yml::to_string(config)?;
                tokio::fs::write(path, doc).await.map_err(|source| ConfigStoreError::Io {
                    path: path.clone(),
                    source,
                })
            }
            ConfigStore::KeyValue { store, key } => store
                .set(key.as_str(), config)
                .await
                .map_err(|e| ConfigStoreError::Backend(e.to_string())),
        }
    }
}

// `KeyValueStore::get` maps undecodable values to `None`, which would look like a missing
// document and get overwritten on save.
async fn get_raw(store: &KeyValueStore, key: &str) -> Option<String> {
    match store {
        KeyValueStore::InMemory(store) => store.get(key).await,
        KeyValueStore::Kubernetes(store) => store.get(key).await,
        KeyValueStore::SQLite(store) => store.get(key).await,
    }
}

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// `SQLiteStore::new` panics on an unusable database, so the file is checked up front.
async fn open_sqlite(path: &str) -> Result<SQLiteStore, ConfigStoreError> {
    let io_err = |source| ConfigStoreError::Io {
        path: PathBuf::from(path),
        source,
    };
    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .map_err(io_err)?;

    let len = file.metadata().await.map_err(io_err)?.len();
    if len > 0 {
        let mut header = [0u8; 16];
        let valid = file.read_exact(&mut header).await.is_ok() && &header == SQLITE_HEADER;
        if !valid {
            return Err(ConfigStoreError::Backend(format!("{} is not a sqlite database", path)));
        }
    }
    drop(file);

    let path = path.to_string();
    tokio::spawn(async move { SQLiteStore::new(&path).await })
        .await
        .map_err(|e| ConfigStoreError::Backend(format!("Cannot open sqlite store: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimerConfig;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hc-homie5-timers-{}-{}.yaml", std::process::id(), name))
    }

    fn sample() -> AddonConfig {
        AddonConfig {
            timers: vec![TimerConfig::new("Tea", 3).with_id("tea")],
            intervals: vec![TimerConfig::new("Watering", 60)],
            deactivate_progress_bar: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let store = ConfigStore::File {
            path: temp_file("missing"),
        };
        assert_eq!(store.load().await.unwrap(), AddonConfig::default());
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let path = temp_file("roundtrip");
        let store = ConfigStore::File { path: path.clone() };

        store.save(&sample()).await.unwrap();
        let loaded = store.load().await.unwrap();
        let _ = std::fs::remove_file(path);

        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let path = temp_file("malformed");
        std::fs::write(&path, "timers: 12").unwrap();
        let store = ConfigStore::File { path: path.clone() };
        let res = store.load().await;
        let _ = std::fs::remove_file(path);

        assert!(matches!(res, Err(ConfigStoreError::Yaml(_))));
    }

    #[tokio::test]
    async fn key_value_store_round_trip() {
        let store = ConfigStore::in_memory("timers");
        assert_eq!(store.load().await.unwrap(), AddonConfig::default());

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn undecodable_document_is_an_error() {
        let raw = "timers:\n  - name: Tea\n    seconds: 3";
        let inner = InMemoryStore::new();
        inner.set("timers", raw).await.unwrap();
        let store = ConfigStore::KeyValue {
            store: KeyValueStore::InMemory(inner.clone()),
            key: "timers".to_string(),
        };

        assert!(matches!(store.load().await, Err(ConfigStoreError::Json(_))));
        assert_eq!(inner.get("timers").await.as_deref(), Some(raw));
    }

    #[tokio::test]
    async fn sqlite_in_missing_directory_is_an_error() {
        let config = ConfigStoreConfig::Sqlite {
            path: "/nonexistent-dir/sub/timers.db".to_string(),
        };
        let res = ConfigStore::open(&config, "timers").await;
        assert!(matches!(res, Err(ConfigStoreError::Io { .. })));
    }

    #[tokio::test]
    async fn sqlite_rejects_foreign_file() {
        let path = temp_file("not-sqlite");
        std::fs::write(&path, "timers: []\nthis is not a database").unwrap();
        let config = ConfigStoreConfig::Sqlite {
            path: path.display().to_string(),
        };
        let res = ConfigStore::open(&config, "timers").await;
        let _ = std::fs::remove_file(path);

        assert!(matches!(res, Err(ConfigStoreError::Backend(_))));
    }
}
