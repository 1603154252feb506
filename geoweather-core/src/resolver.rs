use sha1::{Digest, Sha1};
use std::time::Duration;

use crate::{
    GeocodeProvider, GeocodeResult,
    cache::CacheStore,
    config::DefaultLocation,
    geocode::ForwardGeocoder,
};

/// Turns a place name into coordinates: cache, then each geocoder in order,
/// then the configured default location.
#[derive(Debug)]
pub struct PlaceResolver {
    cache: CacheStore,
    geocoders: Vec<Box<dyn ForwardGeocoder>>,
    ttl: Duration,
    fallback: DefaultLocation,
}

impl PlaceResolver {
    pub fn new(
        cache: CacheStore,
        geocoders: Vec<Box<dyn ForwardGeocoder>>,
        ttl: Duration,
        fallback: DefaultLocation,
    ) -> Self {
        Self {
            cache,
            geocoders,
            ttl,
            fallback,
        }
    }

    /// Never fails; unresolvable names yield the fallback location, which is not cached.
    pub async fn resolve(&self, place_name: &str) -> GeocodeResult {
        let query = place_name.trim();
        if query.is_empty() {
            return self.fallback();
        }

        let key = forward_key(query);
        let cached = self.cache.get::<GeocodeResult>(&key, self.ttl);
        if let Some(cached) = cached.filter(|c| c.coordinate.is_valid()) {
            tracing::debug!("Forward geocode cache hit for {:?}", query);
            return cached;
        }

        for geocoder in &self.geocoders {
            match geocoder.geocode(query).await {
                Some(found) if found.coordinate.is_valid() => {
                    tracing::info!(
                        "Resolved {:?} via {} to {:?}",
                        query,
                        found.provider,
                        found.coordinate
                    );
                    self.cache.put(&key, &found);
                    return found;
                }
                Some(found) => {
                    tracing::warn!(
                        "{} returned out-of-range coordinates for {:?}: {:?}",
                        geocoder.provider(),
                        query,
                        found.coordinate
                    );
                }
                None => tracing::debug!("{} found nothing for {:?}", geocoder.provider(), query),
            }
        }

        tracing::warn!("Could not resolve {:?}, using fallback location", query);
        self.fallback()
    }

    fn fallback(&self) -> GeocodeResult {
        GeocodeResult {
            coordinate: self.fallback.coordinate(),
            label: self.fallback.label.clone(),
            provider: GeocodeProvider::Fallback,
        }
    }
}

/// Cache key for a trimmed place name.
pub fn forward_key(query: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(query.trim().as_bytes());
    format!("forward_{:x}", hasher.finalize())
}
