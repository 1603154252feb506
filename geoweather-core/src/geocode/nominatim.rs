use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Config, Coordinate, GeocodeProvider, GeocodeResult,
    fetch::HttpFetcher,
    geocode::{as_number, best_index, first_label, fold},
};

use super::ForwardGeocoder;

const MAX_CANDIDATES: u32 = 5;

/// Nominatim (OpenStreetMap) free-text search. Handles Thai names well.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    fetcher: HttpFetcher,
    url: String,
    country_code: String,
    country_name: String,
    language: String,
}

impl NominatimGeocoder {
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Self {
        Self {
            fetcher,
            url: config.endpoints.nominatim_search.clone(),
            country_code: config.country_code.clone(),
            country_name: config.country_name.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NmAddress {
    state: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NmCandidate {
    lat: Option<Value>,
    lon: Option<Value>,
    display_name: Option<String>,
    class: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    importance: Option<Value>,
    address: Option<NmAddress>,
}

impl NmCandidate {
    fn state(&self) -> Option<&str> {
        self.address.as_ref()?.state.as_deref()
    }

    fn coordinate(&self) -> Option<Coordinate> {
        let lat = as_number(self.lat.as_ref())?;
        let lon = as_number(self.lon.as_ref())?;
        Some(Coordinate::new(lat, lon))
    }

    /// A missing country code lets the candidate through.
    fn in_country(&self, country_code: &str) -> bool {
        let country = self.address.as_ref().and_then(|a| a.country_code.as_deref());
        match country.map(str::trim) {
            Some(cc) if !cc.is_empty() => cc.eq_ignore_ascii_case(country_code),
            _ => true,
        }
    }

    fn is_administrative(&self) -> bool {
        self.class.as_deref() == Some("boundary") || self.kind.as_deref() == Some("administrative")
    }

    /// Additive relevance score against an already folded, non-empty query.
    pub(crate) fn score(&self, query: &str) -> f64 {
        let mut score = 0.0;

        if self.state().is_some_and(|s| fold(s) == query) {
            score += 10.0;
        }
        if self.display_name.as_deref().is_some_and(|d| d.to_lowercase().contains(query)) {
            score += 6.0;
        }
        if self.is_administrative() {
            score += 4.0;
        }
        if let Some(importance) = as_number(self.importance.as_ref()) {
            score += importance;
        }

        score
    }
}

pub(crate) fn select(
    candidates: &[NmCandidate],
    query: &str,
    country_code: &str,
) -> Option<GeocodeResult> {
    let folded = fold(query);

    let eligible: Vec<(&NmCandidate, Coordinate)> = candidates
        .iter()
        .filter(|c| c.in_country(country_code))
        .filter_map(|c| c.coordinate().map(|coord| (c, coord)))
        .collect();

    let idx = best_index(eligible.iter().map(|(c, _)| c.score(&folded)))?;
    let (best, coordinate) = eligible[idx];

    Some(GeocodeResult {
        coordinate,
        label: first_label([best.state(), best.display_name.as_deref()])
            .unwrap_or_else(|| query.to_string()),
        provider: GeocodeProvider::Nominatim,
    })
}

#[async_trait]
impl ForwardGeocoder for NominatimGeocoder {
    fn provider(&self) -> GeocodeProvider {
        GeocodeProvider::Nominatim
    }

    async fn geocode(&self, place_name: &str) -> Option<GeocodeResult> {
        let query = place_name.trim();
        if query.is_empty() {
            return None;
        }

        // Country suffix helps disambiguate short names.
        let params = [
            ("q", format!("{query}, {}", self.country_name)),
            ("format", "jsonv2".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", MAX_CANDIDATES.to_string()),
            ("accept-language", self.language.clone()),
        ];

        let results: Vec<Value> = match self.fetcher.fetch_json(&self.url, &params).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Nominatim search failed for {:?}: {}", query, e);
                return None;
            }
        };

        let candidates: Vec<NmCandidate> =
            results.into_iter().filter_map(|v| serde_json::from_value(v).ok()).collect();

        let result = select(&candidates, query, &self.country_code);
        tracing::debug!("Nominatim picked {:?} for {:?}", result, query);
        result
    }
}
