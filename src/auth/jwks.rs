// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Security
//!
//! - Keys are cached with a configurable TTL
//! - An unknown `kid` forces one refresh, at most once per
//!   [`MIN_REFRESH_INTERVAL`], so key rotation is picked up without letting
//!   garbage tokens hammer the endpoint
//! - Only one fetch is in flight at a time; concurrent callers share its result
//! - The verification algorithm comes from the key, never from the token

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};

use super::provider::ProviderError;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum time between forced refreshes triggered by unknown key ids.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
///
/// Fetches are serialized: concurrent callers that find the cache stale or
/// miss a `kid` wait for the one in-flight fetch instead of starting their own.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Held for the duration of every fetch; stores the last forced refresh.
    refresh_lock: Arc<Mutex<Option<Instant>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// `http_timeout` bounds every fetch.
    pub fn new(jwks_url: impl Into<String>, http_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| ProviderError::KeyFetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(None)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom minimum interval between forced refreshes.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Unexpired cached key set and when it was fetched.
    async fn cached(&self) -> Option<(JwkSet, Instant)> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| (entry.jwks.clone(), entry.fetched_at))
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<(JwkSet, Instant), ProviderError> {
        if let Some(hit) = self.cached().await {
            return Ok(hit);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(hit) = self.cached().await {
            return Ok(hit);
        }
        self.fetch_and_store().await
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, ProviderError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| ProviderError::KeyFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::KeyFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| ProviderError::KeyFetch(e.to_string()))
    }

    /// Fetch and replace the cache. Callers hold `refresh_lock`.
    async fn fetch_and_store(&self) -> Result<(JwkSet, Instant), ProviderError> {
        let jwks = self.fetch_jwks().await?;
        let fetched_at = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at,
        });
        tracing::debug!(keys = jwks.keys.len(), url = %self.jwks_url, "refreshed key set");
        Ok((jwks, fetched_at))
    }

    /// Get the decoding key for a token.
    ///
    /// With a `kid` the matching key is required; without one the first
    /// usable key is taken.
    pub async fn decoding_key(
        &self,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), ProviderError> {
        let (jwks, fetched_at) = self.get_jwks().await?;
        match find_key(&jwks, kid) {
            Err(ProviderError::NoMatchingKey(_)) => {
                match self.force_refresh(kid, fetched_at).await? {
                    Some(jwks) => find_key(&jwks, kid),
                    None => Err(ProviderError::NoMatchingKey(kid.map(str::to_string))),
                }
            }
            result => result,
        }
    }

    /// Refresh after a key lookup missed on the set fetched at `seen`.
    ///
    /// Returns `None` when rate limited.
    async fn force_refresh(
        &self,
        kid: Option<&str>,
        seen: Instant,
    ) -> Result<Option<JwkSet>, ProviderError> {
        let mut last_forced = self.refresh_lock.lock().await;

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref().filter(|entry| entry.fetched_at > seen) {
                return Ok(Some(entry.jwks.clone()));
            }
        }

        let recently_forced =
            matches!(*last_forced, Some(at) if at.elapsed() < self.min_refresh_interval);
        if recently_forced || seen.elapsed() < self.min_refresh_interval {
            return Ok(None);
        }

        *last_forced = Some(Instant::now());
        tracing::debug!(kid = ?kid, "unknown signing key, refreshing key set");
        self.fetch_and_store().await.map(|(jwks, _)| Some(jwks))
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<JwkSet, ProviderError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await.map(|(jwks, _)| jwks)
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.cached().await.is_some()
    }
}

fn find_key(jwks: &JwkSet, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), ProviderError> {
    match kid {
        Some(kid) => {
            let jwk = jwks
                .keys
                .iter()
                .find(|k| k.common.key_id.as_deref() == Some(kid))
                .ok_or_else(|| ProviderError::NoMatchingKey(Some(kid.to_string())))?;
            jwk_to_decoding_key(jwk)
        }
        None => jwks
            .keys
            .iter()
            .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
            .ok_or(ProviderError::NoMatchingKey(None)),
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), ProviderError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| ProviderError::InvalidKey(format!("RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| ProviderError::InvalidKey(format!("EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(ProviderError::InvalidKey(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}
