//! Reverse geocoding: coordinate to a short locality name.
//! Uses BigDataCloud's free client endpoint, no API key required.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Config, Coordinate, cache::CacheStore, fetch::HttpFetcher, geocode::first_label};

pub const UNKNOWN_LOCALITY: &str = "ไม่ทราบตำแหน่ง";

#[derive(Debug, Deserialize)]
struct BdcResponse {
    locality: Option<String>,
    city: Option<String>,
    #[serde(rename = "principalSubdivision")]
    principal_subdivision: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedLocality {
    locality: String,
}

#[derive(Debug, Clone)]
pub struct LocalityLookup {
    fetcher: HttpFetcher,
    cache: CacheStore,
    url: String,
    language: String,
    ttl: Duration,
}

impl LocalityLookup {
    pub fn new(fetcher: HttpFetcher, cache: CacheStore, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            url: config.endpoints.reverse_geocode.clone(),
            language: config.language.clone(),
            ttl: config.ttl.reverse(),
        }
    }

    /// Always yields a string. Failures produce [`UNKNOWN_LOCALITY`], which is
    /// cached like any other answer so the upstream is not hammered.
    pub async fn locate(&self, coordinate: Coordinate) -> String {
        let key = reverse_key(coordinate);
        let cached = self.cache.get::<CachedLocality>(&key, self.ttl);
        if let Some(cached) = cached.filter(|c| !c.locality.is_empty()) {
            return cached.locality;
        }

        let locality = self
            .fetch(coordinate)
            .await
            .unwrap_or_else(|| UNKNOWN_LOCALITY.to_string());

        self.cache.put(
            &key,
            &CachedLocality {
                locality: locality.clone(),
            },
        );
        locality
    }

    async fn fetch(&self, coordinate: Coordinate) -> Option<String> {
        let params = [
            ("latitude", coordinate.latitude.to_string()),
            ("longitude", coordinate.longitude.to_string()),
            ("localityLanguage", self.language.clone()),
        ];

        let body: BdcResponse = match self.fetcher.fetch_json(&self.url, &params).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Reverse geocode failed for {:?}: {}", coordinate, e);
                return None;
            }
        };

        first_label([
            body.locality.as_deref(),
            body.city.as_deref(),
            body.principal_subdivision.as_deref(),
        ])
    }
}

pub fn reverse_key(coordinate: Coordinate) -> String {
    format!("reverse_{}", coordinate.cache_fragment())
}
