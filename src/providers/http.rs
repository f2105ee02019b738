//! Shared plumbing for adapters backed by an HTTP API: retrying client,
//! hourly quota and search-result caching

use anyhow::{Context, Result};
use rand::RngExt;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ProviderError, RateLimiter, SearchParams};
use crate::cache::PersistentCache;
use crate::config::ProvidersConfig;
use crate::models::LocationCandidate;

/// HTTP client, quota and cache shared by all adapters of one external service
pub struct HttpContext {
    client: ClientWithMiddleware,
    limiter: RateLimiter,
    cache: Option<Arc<PersistentCache>>,
    cache_ttl: Duration,
}

impl HttpContext {
    pub fn new(
        config: &ProvidersConfig,
        cache: Option<Arc<PersistentCache>>,
        cache_ttl: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds.into()))
            .user_agent(concat!("Sidequest/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            limiter: RateLimiter::per_hour(config.max_calls_per_hour),
            cache,
            cache_ttl,
        })
    }

    /// Cached candidates for this provider and query, if still fresh
    pub async fn cached(&self, type_tag: &str, params: &SearchParams) -> Option<Vec<LocationCandidate>> {
        let cache = self.cache.as_ref()?;
        let key = cache_key(type_tag, params);

        match cache.get::<Vec<LocationCandidate>>(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Remember a search result. Failures are logged and otherwise ignored.
    pub async fn store(&self, type_tag: &str, params: &SearchParams, candidates: &[LocationCandidate]) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let key = cache_key(type_tag, params);

        if let Err(e) = cache.put(&key, candidates.to_vec(), jittered(self.cache_ttl)).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// GET `url` and decode the JSON body, spending one unit of quota
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
    ) -> std::result::Result<T, ProviderError> {
        self.send_json(service, self.client.get(url)).await
    }

    /// POST `fields` url-encoded to `url` and decode the JSON body
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        fields: &[(&str, &str)],
    ) -> std::result::Result<T, ProviderError> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(fields));
        self.send_json(service, request).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        service: &str,
        request: RequestBuilder,
    ) -> std::result::Result<T, ProviderError> {
        if !self.limiter.allow_request() {
            return Err(ProviderError::RateLimited(format!(
                "{} quota exhausted, next call allowed in {}s",
                service,
                self.limiter.time_until_next_request().as_secs()
            )));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return match status.as_u16() {
                429 => Err(ProviderError::RateLimited(format!(
                    "{} API rate limit exceeded",
                    service
                ))),
                code => Err(ProviderError::api(code, format!("{}: {}", service, error_text))),
            };
        }

        let body = response.json::<T>().await.map_err(|e| {
            ProviderError::parse(format!("Failed to parse {} response: {}", service, e))
        })?;

        debug!("{} request succeeded, {} calls left this hour", service, self.limiter.remaining());
        Ok(body)
    }
}

fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn cache_key(type_tag: &str, params: &SearchParams) -> String {
    let (lat, lon) = params.coordinates().rounded_coordinates(3);
    format!(
        "search:{}:{}:{}:{:.1}:{}",
        type_tag, lat, lon, params.radius_miles, params.limit
    )
}

/// TTL spread by ±10% so entries written together do not expire together
fn jittered(ttl: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    ttl.mul_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use tempfile::TempDir;

    #[test]
    fn test_cache_key_rounds_coordinates() {
        let a = SearchParams::new(27.950_01, -82.457_24, 25.0, 10);
        let b = SearchParams::new(27.950_04, -82.457_21, 25.0, 10);
        assert_eq!(cache_key("beach", &a), cache_key("beach", &b));
        assert_eq!(cache_key("beach", &a), "search:beach:27.95:-82.457:25.0:10");
        assert_ne!(cache_key("beach", &a), cache_key("pier", &a));
    }

    #[test]
    fn test_encode_form_escapes_values() {
        assert_eq!(
            encode_form(&[("data", "[out:json];way(around:100,1,2);")]),
            "data=%5Bout%3Ajson%5D%3Bway%28around%3A100%2C1%2C2%29%3B"
        );
        assert_eq!(encode_form(&[("a", "1"), ("b", "x y")]), "a=1&b=x%20y");
    }

    #[test]
    fn test_jittered_ttl_stays_in_range() {
        let ttl = Duration::from_secs(3600);
        for _ in 0..100 {
            let value = jittered(ttl);
            assert!(value >= Duration::from_secs(3240) && value <= Duration::from_secs(3960));
        }
    }

    #[tokio::test]
    async fn test_store_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let cache = Arc::new(PersistentCache::open(temp_dir.path()).unwrap());
        let context = HttpContext::new(
            &ProvidersConfig::default(),
            Some(cache),
            Duration::from_secs(3600),
        )
        .unwrap();

        let params = SearchParams::new(27.95, -82.46, 25.0, 10);
        assert!(context.cached("beach", &params).await.is_none());

        let candidate = LocationCandidate::new(
            "geoapify-beach-1",
            "Clearwater Beach",
            "Sand",
            Coordinates::new(27.97, -82.83),
            "Clearwater, FL",
            "beach",
        );
        context.store("beach", &params, &[candidate.clone()]).await;

        assert_eq!(context.cached("beach", &params).await, Some(vec![candidate]));
    }

    #[tokio::test]
    async fn test_quota_exhaustion_skips_request() {
        let config = ProvidersConfig {
            max_calls_per_hour: 0,
            ..ProvidersConfig::default()
        };
        let context = HttpContext::new(&config, None, Duration::from_secs(60)).unwrap();
        let result: std::result::Result<serde_json::Value, ProviderError> =
            context.get_json("Test", "http://127.0.0.1:9/never").await;
        assert!(matches!(result, Err(ProviderError::RateLimited(_))));

        let result: std::result::Result<serde_json::Value, ProviderError> = context
            .post_form_json("Test", "http://127.0.0.1:9/never", &[("data", "{}")])
            .await;
        assert!(matches!(result, Err(ProviderError::RateLimited(_))));
    }
}
