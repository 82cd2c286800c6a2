use crate::offline::{AssetCache, AssetRequest, HttpAssetFetcher};
use log::info;
use std::io::Write;

pub async fn install(cache: &AssetCache, origin: &str) -> Result<(), String> {
    let fetcher = HttpAssetFetcher::new(origin)?;
    let count = cache.install(&fetcher).await?;
    let purged = cache.activate().await?;
    info!(
        "Offline cache '{}' ready: {} assets, {} old generations purged",
        cache.name(),
        count,
        purged.len()
    );
    println!("Đã lưu {} tệp vào bộ nhớ đệm '{}'.", count, cache.name());
    Ok(())
}

/// Serves `path` cache-first and writes the body to stdout.
pub async fn get(
    cache: &AssetCache,
    origin: &str,
    path: &str,
    navigation: bool,
) -> Result<(), String> {
    let fetcher = HttpAssetFetcher::new(origin)?;
    let request = if navigation {
        AssetRequest::navigate(path)
    } else {
        AssetRequest::get(path)
    };
    let asset = cache.fetch(&request, &fetcher).await?;
    info!("Served {} from {:?}", path, asset.source);
    std::io::stdout()
        .write_all(&asset.bytes)
        .map_err(|e| format!("Failed to write output: {}", e))
}
