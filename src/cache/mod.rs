//! Versioned on-disk cache for fetched assets.
//!
//! Entries live under `<root>/<version>/`, one file per URL. Bumping the
//! version and calling [`OfflineCache::activate`] drops every older
//! generation.

use std::path::{Path, PathBuf};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use thiserror::Error;

use crate::loader::{fetch_bytes, LoaderError};

pub const DEFAULT_CACHE_VERSION: &str = "linkhub-cache-v2";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    CacheFirst,
    #[default]
    NetworkFirst,
}

impl CacheStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cache-first" | "cache_first" | "cache" => Some(Self::CacheFirst),
            "network-first" | "network_first" | "network" => Some(Self::NetworkFirst),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirst => "network-first",
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io failed: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{url} is not cached and the network fetch failed: {source}")]
    Miss {
        url: String,
        #[source]
        source: Box<LoaderError>,
    },

    #[error("failed to install {failed} of {total} assets: {first}")]
    Install {
        failed: usize,
        total: usize,
        first: Box<LoaderError>,
    },
}

#[derive(Clone, Debug)]
pub struct OfflineCache {
    root: PathBuf,
    version: String,
}

/// 64-bit FNV-1a of the URL, used as the entry file name.
pub fn cache_key(url: &str) -> String {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in url.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x100000001b3);
    }
    format!("{h:016x}")
}

impl OfflineCache {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self) -> PathBuf {
        self.root.join(&self.version)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir().join(cache_key(url))
    }

    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.entry_path(url)).await.ok()
    }

    pub async fn put(&self, url: &str, body: &[u8]) -> Result<(), CacheError> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
        let path = self.entry_path(url);
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| CacheError::Io {
                path: path.display().to_string(),
                source: e,
            })
    }

    /// Fetches every asset and stores it. All-or-nothing in the sense that
    /// any failure is reported, though successful entries stay on disk.
    pub async fn install(
        &self,
        client: &reqwest::Client,
        assets: &[String],
    ) -> Result<usize, CacheError> {
        let mut pending = FuturesUnordered::new();
        for url in assets.iter() {
            pending.push(async move { (url, fetch_bytes(client, url).await) });
        }

        let mut stored = 0;
        let mut failures: Vec<LoaderError> = Vec::new();
        while let Some((url, result)) = pending.next().await {
            match result {
                Ok(body) => {
                    self.put(url, &body).await?;
                    tracing::debug!(%url, bytes = body.len(), "cached asset");
                    stored += 1;
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "asset fetch failed during install");
                    failures.push(e);
                }
            }
        }

        if !failures.is_empty() {
            let failed = failures.len();
            return Err(CacheError::Install {
                failed,
                total: assets.len(),
                first: Box::new(failures.remove(0)),
            });
        }
        Ok(stored)
    }

    pub async fn fetch(
        &self,
        client: &reqwest::Client,
        url: &str,
        strategy: CacheStrategy,
    ) -> Result<Vec<u8>, CacheError> {
        match strategy {
            CacheStrategy::CacheFirst => {
                if let Some(body) = self.get(url).await {
                    tracing::debug!(%url, "served from cache");
                    return Ok(body);
                }
                let body = fetch_bytes(client, url)
                    .await
                    .map_err(|e| CacheError::Miss {
                        url: url.to_string(),
                        source: Box::new(e),
                    })?;
                self.store_best_effort(url, &body).await;
                Ok(body)
            }
            CacheStrategy::NetworkFirst => match fetch_bytes(client, url).await {
                Ok(body) => {
                    self.store_best_effort(url, &body).await;
                    Ok(body)
                }
                Err(e) => match self.get(url).await {
                    Some(body) => {
                        tracing::warn!(%url, error = %e, "network failed, serving cached copy");
                        Ok(body)
                    }
                    None => Err(CacheError::Miss {
                        url: url.to_string(),
                        source: Box::new(e),
                    }),
                },
            },
        }
    }

    async fn store_best_effort(&self, url: &str, body: &[u8]) {
        if let Err(e) = self.put(url, body).await {
            tracing::warn!(%url, error = %e, "failed to refresh cache entry");
        }
    }

    /// Removes every cache generation other than the current version.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let io_err = |e: std::io::Error| CacheError::Io {
            path: self.root.display().to_string(),
            source: e,
        };
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut removed = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == self.version {
                continue;
            }
            let file_type = entry.file_type().await.map_err(io_err)?;
            if !file_type.is_dir() {
                continue;
            }
            tokio::fs::remove_dir_all(entry.path())
                .await
                .map_err(io_err)?;
            tracing::debug!(version = %name, "removed stale cache generation");
            removed.push(name);
        }
        removed.sort();
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        let dir = self.dir();
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path: dir.display().to_string(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cache_key_is_stable_hex() {
        assert_eq!(cache_key("https://x/links.json").len(), 16);
        assert_eq!(cache_key("a"), cache_key("a"));
        assert_ne!(cache_key("a"), cache_key("b"));
    }

    #[test]
    fn strategy_parse_accepts_aliases() {
        assert_eq!(
            CacheStrategy::parse("cache-first"),
            Some(CacheStrategy::CacheFirst)
        );
        assert_eq!(
            CacheStrategy::parse("Network"),
            Some(CacheStrategy::NetworkFirst)
        );
        assert_eq!(CacheStrategy::parse("stale"), None);
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let cache = OfflineCache::new(dir.path(), "v1");
        assert!(cache.get("https://x/").await.is_none());
        cache.put("https://x/", b"hello").await.unwrap();
        assert_eq!(cache.get("https://x/").await.unwrap(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn activate_drops_other_versions_only() {
        let dir = tempdir().unwrap();
        let old = OfflineCache::new(dir.path(), "v1");
        old.put("https://x/", b"old").await.unwrap();
        let older = OfflineCache::new(dir.path(), "v0");
        older.put("https://x/", b"older").await.unwrap();

        let current = OfflineCache::new(dir.path(), "v2");
        current.put("https://x/", b"new").await.unwrap();

        let removed = current.activate().await.unwrap();
        assert_eq!(removed, vec!["v0".to_string(), "v1".to_string()]);
        assert!(old.get("https://x/").await.is_none());
        assert_eq!(current.get("https://x/").await.unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn activate_without_root_is_a_no_op() {
        let dir = tempdir().unwrap();
        let cache = OfflineCache::new(dir.path().join("missing"), "v1");
        assert!(cache.activate().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_first_serves_cached_entry_without_network() {
        let dir = tempdir().unwrap();
        let cache = OfflineCache::new(dir.path(), "v1");
        // Port 9 (discard) on localhost is never answered in tests.
        let url = "http://127.0.0.1:9/links.json";
        cache.put(url, b"{}").await.unwrap();
        let client = crate::loader::build_client(1).unwrap();
        let body = cache
            .fetch(&client, url, CacheStrategy::CacheFirst)
            .await
            .unwrap();
        assert_eq!(body, b"{}".to_vec());
    }

    #[tokio::test]
    async fn network_first_falls_back_to_cache() {
        let dir = tempdir().unwrap();
        let cache = OfflineCache::new(dir.path(), "v1");
        let url = "http://127.0.0.1:9/links.json";
        let client = crate::loader::build_client(1).unwrap();
        assert!(matches!(
            cache.fetch(&client, url, CacheStrategy::NetworkFirst).await,
            Err(CacheError::Miss { .. })
        ));
        cache.put(url, b"cached").await.unwrap();
        let body = cache
            .fetch(&client, url, CacheStrategy::NetworkFirst)
            .await
            .unwrap();
        assert_eq!(body, b"cached".to_vec());
    }
}
