//! Athlete name resolution
//!
//! Turns an athlete ID into a `{"name": ...}` payload: validate the ID, serve
//! from cache when possible, otherwise scrape the parkrun profile page and
//! cache the result.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheStore;
use crate::data::profile_page::{page_text, page_title};
use crate::data::{
    AthleteId, AthleteIdError, AthleteProfile, ClientHints, FetchError, NameExtractor,
    ProfileSource,
};

/// Default lifetime of cached names (72 hours)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 72);

/// Default title of parkrun's anti-bot interstitial
pub const DEFAULT_CHALLENGE_TITLE: &str = "Human Verification";

/// Errors returned by [`AthleteNameResolver::resolve`]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No athlete ID was supplied
    #[error("Athlete ID is required")]
    MissingIdentifier,

    /// The athlete ID does not match the expected format
    #[error("Invalid Athlete ID ({0})")]
    InvalidIdentifier(String),

    /// parkrun answered, but not with a usable profile page
    #[error("Unable to retrieve data from parkrun (received HTTP {status})")]
    UpstreamLookupFailed { status: u16 },

    /// parkrun could not be reached
    #[error("Unable to retrieve data from parkrun (request failed)")]
    UpstreamUnreachable(#[source] FetchError),

    /// parkrun served a human-verification page instead of the profile
    #[error("CAPTCHA challenge")]
    ChallengeDetected,
}

impl ResolveError {
    /// HTTP status code reported to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            ResolveError::MissingIdentifier | ResolveError::InvalidIdentifier(_) => 400,
            ResolveError::UpstreamLookupFailed { .. }
            | ResolveError::UpstreamUnreachable(_)
            | ResolveError::ChallengeDetected => 502,
        }
    }
}

impl From<AthleteIdError> for ResolveError {
    fn from(err: AthleteIdError) -> Self {
        match err {
            AthleteIdError::Missing => ResolveError::MissingIdentifier,
            AthleteIdError::Invalid(raw) => ResolveError::InvalidIdentifier(raw),
        }
    }
}

/// Where a resolved payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from the cache store
    Cache,
    /// Scraped from parkrun on this request
    Upstream,
}

/// A successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// JSON payload, `{"name": ...}`; cached payloads are passed through verbatim
    pub payload: String,
    /// Whether the payload was cached or freshly fetched
    pub origin: Origin,
}

/// Tunables for [`AthleteNameResolver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// How long fresh lookups stay cached
    pub cache_ttl: Duration,
    /// Page title that identifies a challenge page
    pub challenge_title: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            challenge_title: DEFAULT_CHALLENGE_TITLE.to_string(),
        }
    }
}

/// Resolves athlete IDs to display names, cache first
///
/// Each call does at most one cache read, one upstream request and one cache
/// write. Nothing is retried; concurrent misses for the same ID may both
/// fetch and both write identical payloads.
#[derive(Clone)]
pub struct AthleteNameResolver {
    cache: Arc<dyn CacheStore>,
    source: Arc<dyn ProfileSource>,
    extractor: Arc<dyn NameExtractor>,
    settings: ResolverSettings,
}

impl AthleteNameResolver {
    /// Creates a resolver over the given collaborators
    pub fn new(
        cache: Arc<dyn CacheStore>,
        source: Arc<dyn ProfileSource>,
        extractor: Arc<dyn NameExtractor>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            cache,
            source,
            extractor,
            settings,
        }
    }

    /// Resolves a raw athlete ID (as typed by the user) to a name payload
    pub async fn resolve(&self, raw_id: &str, hints: &ClientHints) -> Result<Resolved, ResolveError> {
        let athlete_id = AthleteId::parse(raw_id)?;
        let key = athlete_id.key();

        match self.cache.get(key).await {
            Ok(Some(payload)) if !payload.is_empty() => {
                tracing::debug!(athlete = %athlete_id, "cache hit");
                return Ok(Resolved {
                    payload,
                    origin: Origin::Cache,
                });
            }
            Ok(_) => tracing::debug!(athlete = %athlete_id, "cache miss"),
            Err(e) => tracing::warn!(athlete = %athlete_id, error = %e, "cache read failed"),
        }

        let page = self
            .source
            .fetch_profile(key, hints)
            .await
            .map_err(|e| {
                tracing::error!(athlete = %athlete_id, error = %e, "profile request failed");
                ResolveError::UpstreamUnreachable(e)
            })?;

        if page_title(&page.body).as_deref() == Some(self.settings.challenge_title.as_str()) {
            tracing::error!(athlete = %athlete_id, status = page.status, "challenge page returned");
            return Err(ResolveError::ChallengeDetected);
        }

        let name = match self.extractor.extract_name(&page.body) {
            Some(name) if page.is_success() => name,
            _ => {
                tracing::error!(
                    athlete = %athlete_id,
                    status = page.status,
                    page = %page_text(&page.body),
                    "profile lookup failed"
                );
                return Err(ResolveError::UpstreamLookupFailed {
                    status: page.status,
                });
            }
        };

        let payload = AthleteProfile { name }.to_json();

        if let Err(e) = self
            .cache
            .set_ex(key, self.settings.cache_ttl, &payload)
            .await
        {
            tracing::warn!(athlete = %athlete_id, error = %e, "cache write failed");
        }

        tracing::info!(athlete = %athlete_id, "resolved athlete name");

        Ok(Resolved {
            payload,
            origin: Origin::Upstream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheError;
    use crate::data::{FirstHeadingExtractor, ProfilePage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory cache that records writes
    #[derive(Default)]
    struct RecordingCache {
        entries: Mutex<HashMap<String, String>>,
        reads: Mutex<usize>,
        writes: Mutex<Vec<(String, Duration, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl CacheStore for RecordingCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            *self.reads.lock().unwrap() += 1;
            if self.fail {
                return Err(CacheError::Io(std::io::Error::other("down")));
            }
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_ex(&self, key: &str, ttl: Duration, value: &str) -> Result<(), CacheError> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), ttl, value.to_string()));
            if self.fail {
                return Err(CacheError::Io(std::io::Error::other("down")));
            }
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Upstream that serves a fixed page and counts requests
    struct FakeSource {
        status: u16,
        body: String,
        requests: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProfileSource for FakeSource {
        async fn fetch_profile(&self, key: &str, _hints: &ClientHints) -> Result<ProfilePage, FetchError> {
            self.requests.lock().unwrap().push(key.to_string());
            Ok(ProfilePage {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    const PROFILE: &str = "<html><head><title>Jane Doe | parkrun</title></head><body><h2>Jane Doe</h2></body></html>";
    const CHALLENGE: &str = "<html><head><title>Human Verification</title></head><body><h2>Are you human?</h2></body></html>";

    fn resolver(cache: Arc<RecordingCache>, source: Arc<FakeSource>) -> AthleteNameResolver {
        AthleteNameResolver::new(
            cache,
            source,
            Arc::new(FirstHeadingExtractor),
            ResolverSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_id_rejected_before_any_access() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, PROFILE));
        let resolver = resolver(cache.clone(), source.clone());

        for raw in ["208864", "A0", "A1234567890", "X1", "A12B"] {
            let err = resolver.resolve(raw, &ClientHints::default()).await.unwrap_err();
            assert!(matches!(err, ResolveError::InvalidIdentifier(_)), "input {:?}", raw);
            assert_eq!(err.status_code(), 400);
        }

        assert_eq!(*cache.reads.lock().unwrap(), 0);
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_id_rejected() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, PROFILE));
        let resolver = resolver(cache.clone(), source.clone());

        for raw in ["", "a"] {
            let err = resolver.resolve(raw, &ClientHints::default()).await.unwrap_err();
            assert!(matches!(err, ResolveError::MissingIdentifier));
        }
        assert_eq!(*cache.reads.lock().unwrap(), 0);
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_first_lookup_fetches_once_and_caches() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, PROFILE));
        let resolver = resolver(cache.clone(), source.clone());

        let first = resolver.resolve("A208864", &ClientHints::default()).await.unwrap();
        assert_eq!(first.origin, Origin::Upstream);
        assert_eq!(first.payload, r#"{"name":"Jane Doe"}"#);
        assert_eq!(source.request_count(), 1);
        assert_eq!(source.requests.lock().unwrap()[0], "208864");

        {
            let writes = cache.writes.lock().unwrap();
            assert_eq!(writes.len(), 1);
            assert_eq!(writes[0].0, "208864");
            assert_eq!(writes[0].1, DEFAULT_CACHE_TTL);
            assert_eq!(writes[0].2, first.payload);
        }

        let second = resolver.resolve("a208864", &ClientHints::default()).await.unwrap();
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(second.payload, first.payload);
        assert_eq!(source.request_count(), 1, "second call must not hit upstream");
        assert_eq!(cache.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cached_payload_returned_verbatim() {
        let cache = Arc::new(RecordingCache::default());
        cache
            .entries
            .lock()
            .unwrap()
            .insert("208864".to_string(), r#"{"name":"Jane Doe"}"#.to_string());
        let source = Arc::new(FakeSource::new(500, ""));
        let resolver = resolver(cache.clone(), source.clone());

        let resolved = resolver.resolve("A208864", &ClientHints::default()).await.unwrap();

        assert_eq!(resolved.payload, r#"{"name":"Jane Doe"}"#);
        assert_eq!(resolved.origin, Origin::Cache);
        assert_eq!(source.request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_cached_value_is_a_miss() {
        let cache = Arc::new(RecordingCache::default());
        cache
            .entries
            .lock()
            .unwrap()
            .insert("208864".to_string(), String::new());
        let source = Arc::new(FakeSource::new(200, PROFILE));
        let resolver = resolver(cache.clone(), source.clone());

        let resolved = resolver.resolve("A208864", &ClientHints::default()).await.unwrap();

        assert_eq!(resolved.origin, Origin::Upstream);
        assert_eq!(resolved.payload, r#"{"name":"Jane Doe"}"#);
        assert_eq!(source.request_count(), 1);
        assert_eq!(cache.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_reported_and_not_cached() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(503, "<html><body><h2>Jane Doe</h2></body></html>"));
        let resolver = resolver(cache.clone(), source.clone());

        let err = resolver.resolve("A208864", &ClientHints::default()).await.unwrap_err();

        assert!(matches!(err, ResolveError::UpstreamLookupFailed { status: 503 }));
        assert!(err.to_string().contains("503"));
        assert_eq!(err.status_code(), 502);
        assert!(cache.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_heading_fails_even_with_ok_status() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, "<html><body><h2>  </h2></body></html>"));
        let resolver = resolver(cache.clone(), source.clone());

        let err = resolver.resolve("A208864", &ClientHints::default()).await.unwrap_err();

        assert!(matches!(err, ResolveError::UpstreamLookupFailed { status: 200 }));
        assert!(cache.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_challenge_page_is_distinguished() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, CHALLENGE));
        let resolver = resolver(cache.clone(), source.clone());

        let err = resolver.resolve("A208864", &ClientHints::default()).await.unwrap_err();

        assert!(matches!(err, ResolveError::ChallengeDetected));
        assert_eq!(err.to_string(), "CAPTCHA challenge");
        assert_eq!(err.status_code(), 502);
        assert!(cache.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_challenge_detected_with_error_status() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(405, CHALLENGE));
        let resolver = resolver(cache, source);

        let err = resolver.resolve("A1", &ClientHints::default()).await.unwrap_err();

        assert!(matches!(err, ResolveError::ChallengeDetected));
    }

    #[tokio::test]
    async fn test_challenge_title_is_configurable() {
        let cache = Arc::new(RecordingCache::default());
        let source = Arc::new(FakeSource::new(200, CHALLENGE));
        let resolver = AthleteNameResolver::new(
            cache,
            source,
            Arc::new(FirstHeadingExtractor),
            ResolverSettings {
                challenge_title: "Just a moment...".to_string(),
                ..ResolverSettings::default()
            },
        );

        let resolved = resolver.resolve("A1", &ClientHints::default()).await.unwrap();

        assert_eq!(resolved.payload, r#"{"name":"Are you human?"}"#);
    }

    #[tokio::test]
    async fn test_cache_failures_do_not_block_lookup() {
        let cache = Arc::new(RecordingCache {
            fail: true,
            ..RecordingCache::default()
        });
        let source = Arc::new(FakeSource::new(200, PROFILE));
        let resolver = resolver(cache.clone(), source.clone());

        let resolved = resolver.resolve("A208864", &ClientHints::default()).await.unwrap();

        assert_eq!(resolved.payload, r#"{"name":"Jane Doe"}"#);
        assert_eq!(source.request_count(), 1);
        assert_eq!(cache.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        struct DownSource;

        #[async_trait]
        impl ProfileSource for DownSource {
            async fn fetch_profile(&self, _key: &str, _hints: &ClientHints) -> Result<ProfilePage, FetchError> {
                let err = reqwest::Client::new()
                    .get("http://[::1")
                    .build()
                    .unwrap_err();
                Err(FetchError::RequestFailed(err))
            }
        }

        let resolver = AthleteNameResolver::new(
            Arc::new(RecordingCache::default()),
            Arc::new(DownSource),
            Arc::new(FirstHeadingExtractor),
            ResolverSettings::default(),
        );

        let err = resolver.resolve("A1", &ClientHints::default()).await.unwrap_err();

        assert!(matches!(err, ResolveError::UpstreamUnreachable(_)));
        assert_eq!(err.status_code(), 502);
    }
}
