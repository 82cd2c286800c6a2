//! Offline cache for the client shell.
//!
//! A named cache generation lives in its own directory under the cache root.
//! Installing fills the current generation with the shell manifest, activating
//! deletes every other generation, and fetches are served cache-first with a
//! network fallback.

pub mod fetcher;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

pub use fetcher::HttpAssetFetcher;

pub const CACHE_NAME: &str = "foodninja-v1";
pub const SHELL_PAGE: &str = "/index.html";
pub const SHELL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/modern.css",
    "/main.js",
    "/icon.svg",
    "/manifest.webmanifest",
];

#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: String,
    pub path: String,
    /// Top-level page load rather than a subresource.
    pub navigation: bool,
}

impl AssetRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            navigation: false,
        }
    }

    pub fn navigate(path: impl Into<String>) -> Self {
        Self {
            navigation: true,
            ..Self::get(path)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Network,
    ShellFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub bytes: Vec<u8>,
    pub source: AssetSource,
}

pub struct AssetCache {
    root: PathBuf,
    name: String,
}

/// Maps a request path to a flat file name (`/` -> `%2F`).
fn entry_file_name(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
        }
    }

    /// The current cache generation under `root`.
    pub fn current(root: impl Into<PathBuf>) -> Self {
        Self::new(root, CACHE_NAME)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    fn entry_path(&self, path: &str) -> PathBuf {
        self.dir().join(entry_file_name(path))
    }

    pub async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), String> {
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| format!("Failed to create cache {}: {}", dir.display(), e))?;
        let entry = self.entry_path(path);
        tokio::fs::write(&entry, bytes)
            .await
            .map_err(|e| format!("Failed to write cache entry {}: {}", entry.display(), e))
    }

    pub async fn match_path(&self, path: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.entry_path(path)).await.ok()
    }

    /// Fetches the whole shell manifest and stores it. Nothing is written
    /// unless every asset was fetched.
    pub async fn install(&self, fetcher: &dyn AssetFetcher) -> Result<usize, String> {
        info!("Installing offline cache '{}'", self.name);
        let bodies = try_join_all(SHELL_ASSETS.iter().map(|path| async move {
            fetcher
                .fetch(path)
                .await
                .map(|bytes| (*path, bytes))
                .map_err(|e| format!("Failed to fetch {}: {}", path, e))
        }))
        .await?;

        for (path, bytes) in &bodies {
            self.put(path, bytes).await?;
        }
        debug!("Cached {} shell assets", bodies.len());
        Ok(bodies.len())
    }

    /// Deletes every cache generation except this one. Returns the names of
    /// the purged generations.
    pub async fn activate(&self) -> Result<Vec<String>, String> {
        let mut purged = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(purged),
            Err(e) => return Err(format!("Failed to list {}: {}", self.root.display(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| format!("Failed to list {}: {}", self.root.display(), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == self.name || !is_dir(&entry.path()).await {
                continue;
            }
            tokio::fs::remove_dir_all(entry.path())
                .await
                .map_err(|e| format!("Failed to delete cache {}: {}", name, e))?;
            info!("Purged old cache generation '{}'", name);
            purged.push(name);
        }

        purged.sort();
        Ok(purged)
    }

    /// Cache-first fetch. Non-GET requests bypass the cache entirely; a failed
    /// navigation falls back to the cached shell page.
    pub async fn fetch(
        &self,
        request: &AssetRequest,
        fetcher: &dyn AssetFetcher,
    ) -> Result<CachedAsset, String> {
        if !request.method.eq_ignore_ascii_case("GET") {
            let bytes = fetcher.fetch(&request.path).await?;
            return Ok(CachedAsset {
                bytes,
                source: AssetSource::Network,
            });
        }

        if let Some(bytes) = self.match_path(&request.path).await {
            debug!("Cache hit for {}", request.path);
            return Ok(CachedAsset {
                bytes,
                source: AssetSource::Cache,
            });
        }

        match fetcher.fetch(&request.path).await {
            Ok(bytes) => Ok(CachedAsset {
                bytes,
                source: AssetSource::Network,
            }),
            Err(e) if request.navigation => {
                warn!("Navigation to {} failed, serving shell: {}", request.path, e);
                self.match_path(SHELL_PAGE)
                    .await
                    .map(|bytes| CachedAsset {
                        bytes,
                        source: AssetSource::ShellFallback,
                    })
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockFetcher {
        assets: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn serving_shell() -> Self {
            let assets = SHELL_ASSETS
                .iter()
                .map(|path| (path.to_string(), format!("body of {}", path).into_bytes()))
                .collect();
            Self {
                assets,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn offline() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl AssetFetcher for MockFetcher {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, String> {
            self.calls.lock().unwrap().push(path.to_string());
            self.assets
                .get(path)
                .cloned()
                .ok_or_else(|| format!("offline: {}", path))
        }
    }

    #[test]
    fn entry_names_are_flat() {
        assert_eq!(entry_file_name("/"), "%2F");
        assert_eq!(entry_file_name("/index.html"), "%2Findex.html");
        assert_eq!(entry_file_name("/a/b?c"), "%2Fa%2Fb%3Fc");
    }

    #[tokio::test]
    async fn install_then_serve_from_cache() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path());

        let count = cache.install(&MockFetcher::serving_shell()).await.unwrap();
        assert_eq!(count, SHELL_ASSETS.len());

        let offline = MockFetcher::offline();
        let asset = cache
            .fetch(&AssetRequest::get("/main.js"), &offline)
            .await
            .unwrap();
        assert_eq!(asset.source, AssetSource::Cache);
        assert_eq!(asset.bytes, b"body of /main.js");
        assert!(offline.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path());
        let mut fetcher = MockFetcher::serving_shell();
        fetcher.assets.remove("/icon.svg");

        assert!(cache.install(&fetcher).await.is_err());
        assert!(cache.match_path("/index.html").await.is_none());
    }

    #[tokio::test]
    async fn misses_fall_back_to_network_without_caching() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path());
        let mut fetcher = MockFetcher::offline();
        fetcher.assets.insert("/extra.png".into(), vec![1, 2]);

        let asset = cache
            .fetch(&AssetRequest::get("/extra.png"), &fetcher)
            .await
            .unwrap();
        assert_eq!(asset.source, AssetSource::Network);
        assert!(cache.match_path("/extra.png").await.is_none());
    }

    #[tokio::test]
    async fn failed_navigation_serves_shell_page() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path());
        cache.install(&MockFetcher::serving_shell()).await.unwrap();

        let offline = MockFetcher::offline();
        let asset = cache
            .fetch(&AssetRequest::navigate("/history"), &offline)
            .await
            .unwrap();
        assert_eq!(asset.source, AssetSource::ShellFallback);
        assert_eq!(asset.bytes, b"body of /index.html");

        // subresources get no fallback
        assert!(cache
            .fetch(&AssetRequest::get("/missing.css"), &offline)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn non_get_requests_bypass_cache() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path());
        cache.install(&MockFetcher::serving_shell()).await.unwrap();

        let request = AssetRequest {
            method: "POST".into(),
            path: "/main.js".into(),
            navigation: false,
        };
        assert!(cache.fetch(&request, &MockFetcher::offline()).await.is_err());
    }

    #[tokio::test]
    async fn activate_purges_other_generations() {
        let dir = TempDir::new().unwrap();
        let old = AssetCache::new(dir.path(), "foodninja-v0");
        old.put("/index.html", b"old").await.unwrap();
        std::fs::write(dir.path().join("stray-file"), b"x").unwrap();

        let current = AssetCache::current(dir.path());
        current.install(&MockFetcher::serving_shell()).await.unwrap();

        let purged = current.activate().await.unwrap();
        assert_eq!(purged, vec!["foodninja-v0".to_string()]);
        assert!(old.match_path("/index.html").await.is_none());
        assert!(current.match_path("/index.html").await.is_some());
        assert!(dir.path().join("stray-file").exists());
    }

    #[tokio::test]
    async fn activate_without_root_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::current(dir.path().join("missing"));
        assert!(cache.activate().await.unwrap().is_empty());
    }
}
