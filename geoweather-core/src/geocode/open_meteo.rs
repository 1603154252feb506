use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Config, Coordinate, GeocodeProvider, GeocodeResult,
    fetch::HttpFetcher,
    geocode::{as_number, best_index, first_label, fold},
};

use super::ForwardGeocoder;

const MAX_CANDIDATES: u32 = 10;

/// Open-Meteo geocoding search, biased towards province-level features.
#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    fetcher: HttpFetcher,
    url: String,
    country_code: String,
    language: String,
}

impl OpenMeteoGeocoder {
    pub fn new(fetcher: HttpFetcher, config: &Config) -> Self {
        Self {
            fetcher,
            url: config.endpoints.open_meteo_geocoding.clone(),
            country_code: config.country_code.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Vec<Value>,
}

/// One search hit. Every field is optional; coordinates may arrive as strings.
#[derive(Debug, Deserialize)]
pub(crate) struct OmCandidate {
    name: Option<String>,
    latitude: Option<Value>,
    longitude: Option<Value>,
    feature_code: Option<String>,
    country_code: Option<String>,
    admin1: Option<String>,
    population: Option<Value>,
}

impl OmCandidate {
    fn coordinate(&self) -> Option<Coordinate> {
        let lat = as_number(self.latitude.as_ref())?;
        let lon = as_number(self.longitude.as_ref())?;
        Some(Coordinate::new(lat, lon))
    }

    /// Additive relevance score against an already folded query.
    pub(crate) fn score(&self, query: &str) -> f64 {
        let mut score = 0.0;
        let fc = self.feature_code.as_deref().unwrap_or_default().to_uppercase();

        match fc.as_str() {
            "ADM1" => score += 10.0,
            "PPLC" => score += 6.0,
            "PPLA" => score += 4.0,
            _ => {}
        }
        if fc.starts_with("PPL") {
            score += 2.0;
        }

        if self.name.as_deref().is_some_and(|n| fold(n) == query) {
            score += 4.0;
        }
        if self.admin1.as_deref().is_some_and(|a| fold(a) == query) {
            score += 6.0;
        }

        if let Some(pop) = as_number(self.population.as_ref()) {
            score += (pop.max(1.0).log10() / 3.0).min(2.0);
        }

        score
    }
}

/// Pick the best candidate in `country_code`, or `None` if none qualifies.
pub(crate) fn select(
    candidates: &[OmCandidate],
    query: &str,
    country_code: &str,
) -> Option<GeocodeResult> {
    let folded = fold(query);

    let eligible: Vec<(&OmCandidate, Coordinate)> = candidates
        .iter()
        .filter(|c| c.country_code.as_deref() == Some(country_code))
        .filter_map(|c| c.coordinate().map(|coord| (c, coord)))
        .collect();

    let idx = best_index(eligible.iter().map(|(c, _)| c.score(&folded)))?;
    let (best, coordinate) = eligible[idx];

    Some(GeocodeResult {
        coordinate,
        label: first_label([best.admin1.as_deref(), best.name.as_deref()])
            .unwrap_or_else(|| query.to_string()),
        provider: GeocodeProvider::OpenMeteo,
    })
}

#[async_trait]
impl ForwardGeocoder for OpenMeteoGeocoder {
    fn provider(&self) -> GeocodeProvider {
        GeocodeProvider::OpenMeteo
    }

    async fn geocode(&self, place_name: &str) -> Option<GeocodeResult> {
        let query = place_name.trim();
        if query.is_empty() {
            return None;
        }

        let params = [
            ("name", query.to_string()),
            ("count", MAX_CANDIDATES.to_string()),
            ("format", "json".to_string()),
            ("country", self.country_code.clone()),
            ("language", self.language.clone()),
        ];

        let response: OmSearchResponse = match self.fetcher.fetch_json(&self.url, &params).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Open-Meteo geocoding failed for {:?}: {}", query, e);
                return None;
            }
        };

        let candidates: Vec<OmCandidate> = response
            .results
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();

        let result = select(&candidates, query, &self.country_code);
        tracing::debug!("Open-Meteo picked {:?} for {:?}", result, query);
        result
    }
}
