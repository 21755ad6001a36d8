//! Application wiring
//!
//! Builds the resolver and its collaborators once at start-up from the
//! validated configuration. The handles are then shared by every request.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{CacheError, CacheStore, FileStore, RedisStore};
use crate::cli::{CacheBackend, ResolverConfig};
use crate::data::{FirstHeadingExtractor, ParkrunClient};
use crate::resolver::AthleteNameResolver;

/// Errors that can occur while starting up
#[derive(Debug, Error)]
pub enum StartupError {
    /// The cache store could not be opened
    #[error("Failed to open cache: {0}")]
    Cache(#[from] CacheError),

    /// No cache directory was given and none could be determined
    #[error("No cache directory available; set --cache-dir or --redis-url")]
    NoCacheDir,
}

/// Opens the configured cache store
pub async fn open_cache(backend: &CacheBackend) -> Result<Arc<dyn CacheStore>, StartupError> {
    match backend {
        CacheBackend::Redis(url) => {
            let store = RedisStore::connect(url).await?;
            tracing::info!("caching names in Redis");
            Ok(Arc::new(store))
        }
        CacheBackend::Files(dir) => {
            let store = match dir {
                Some(dir) => FileStore::with_dir(dir.clone()),
                None => FileStore::new().ok_or(StartupError::NoCacheDir)?,
            };
            tracing::info!(dir = %store.dir().display(), "caching names on disk");
            Ok(Arc::new(store))
        }
    }
}

/// Builds the resolver described by `config`
pub async fn build_resolver(config: &ResolverConfig) -> Result<AthleteNameResolver, StartupError> {
    let cache = open_cache(&config.cache).await?;

    let source = ParkrunClient::new()
        .with_profile_url(config.profile_url.clone())
        .with_proxy_key(config.proxy_key.clone())
        .with_forwarded_headers(config.forward_client_headers);

    Ok(AthleteNameResolver::new(
        cache,
        Arc::new(source),
        Arc::new(FirstHeadingExtractor),
        config.settings.clone(),
    ))
}
