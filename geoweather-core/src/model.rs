use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::WeatherError;

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components finite and inside `[-90, 90]` / `[-180, 180]`.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn validated(self) -> Result<Self, WeatherError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(WeatherError::InvalidCoordinates)
        }
    }

    /// Coordinate rounded to four decimals, used to build cache keys.
    pub fn cache_fragment(&self) -> String {
        format!("{:.4}_{:.4}", self.latitude, self.longitude)
    }
}

/// Where a coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeocodeProvider {
    #[serde(rename = "open-meteo")]
    OpenMeteo,
    #[serde(rename = "nominatim")]
    Nominatim,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "coords")]
    Coords,
}

impl GeocodeProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocodeProvider::OpenMeteo => "open-meteo",
            GeocodeProvider::Nominatim => "nominatim",
            GeocodeProvider::Fallback => "fallback",
            GeocodeProvider::Coords => "coords",
        }
    }
}

impl std::fmt::Display for GeocodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub coordinate: Coordinate,
    pub label: String,
    pub provider: GeocodeProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    /// Only an exact `"fahrenheit"` selects Fahrenheit; anything else is Celsius.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("fahrenheit") => TemperatureUnit::Fahrenheit,
            _ => TemperatureUnit::Celsius,
        }
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const UNKNOWN_SOURCE: &str = "Unknown";

/// One incoming weather request, parsed from query parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub province: Option<String>,
    pub source: Option<String>,
    pub unit: TemperatureUnit,
}

impl WeatherQuery {
    /// Build a query from raw `lat`, `lon`, `province`, `source` and `unit` values.
    ///
    /// A blank `lat`/`lon` counts as absent. Any other value that does not parse
    /// as a number becomes NaN so it is rejected by coordinate validation instead
    /// of being silently dropped.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let number = |key: &str| {
            params
                .get(key)
                .map(|raw| raw.trim())
                .filter(|raw| !raw.is_empty())
                .map(|raw| raw.parse::<f64>().unwrap_or(f64::NAN))
        };

        Self {
            lat: number("lat"),
            lon: number("lon"),
            province: params.get("province").map(|p| p.trim().to_string()),
            source: params.get("source").map(|s| s.trim().to_string()),
            unit: TemperatureUnit::from_param(params.get("unit").map(String::as_str)),
        }
    }

    /// Explicit coordinates, only when both halves were supplied.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    /// Non-empty province name, if any.
    pub fn province(&self) -> Option<&str> {
        self.province.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn source_label(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }

    /// True when the caller gave no meaningful display label.
    pub fn source_is_unset(&self) -> bool {
        let label = self.source_label();
        label.is_empty() || label == UNKNOWN_SOURCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    #[serde(rename = "HIT")]
    Hit,
    #[serde(rename = "MISS")]
    Miss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub lat: f64,
    pub lon: f64,
    pub unit: TemperatureUnit,
    pub source: String,
    pub source_label: String,
    pub locality: String,
    pub geocode_provider: GeocodeProvider,
    pub cache: CacheStatus,
}

/// Current conditions as reported by the weather provider.
///
/// `temperature_c` carries Fahrenheit values when the request asked for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub time_local: Option<String>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_kmh: f64,
    pub weather_code: i32,
    pub is_day: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HourlySeries {
    pub time: Vec<String>,
    pub temperature: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub meta: SnapshotMeta,
    pub data: CurrentConditions,
    pub hourly: HourlySeries,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn coordinates_inside_range_are_valid() {
        for (lat, lon) in [(0.0, 0.0), (90.0, 180.0), (-90.0, -180.0), (13.7563, 100.5018)] {
            assert!(Coordinate::new(lat, lon).is_valid(), "{lat},{lon}");
        }
    }

    #[test]
    fn coordinates_outside_range_are_rejected() {
        for (lat, lon) in [(90.0001, 0.0), (0.0, -180.5), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
            let err = Coordinate::new(lat, lon).validated().unwrap_err();
            assert_eq!(err, WeatherError::InvalidCoordinates);
        }
    }

    #[test]
    fn cache_fragment_rounds_to_four_decimals() {
        assert_eq!(Coordinate::new(13.75634, 100.50176).cache_fragment(), "13.7563_100.5018");
    }

    #[test]
    fn unit_defaults_to_celsius() {
        assert_eq!(TemperatureUnit::from_param(None), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::from_param(Some("Fahrenheit")), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::from_param(Some("fahrenheit")), TemperatureUnit::Fahrenheit);
    }

    #[test]
    fn query_requires_both_coordinates() {
        let q = WeatherQuery::from_params(&params(&[("lat", "18.79")]));
        assert!(q.coordinate().is_none());

        let q = WeatherQuery::from_params(&params(&[("lat", "18.79"), ("lon", "98.98")]));
        assert_eq!(q.coordinate(), Some(Coordinate::new(18.79, 98.98)));
    }

    #[test]
    fn unparseable_coordinate_fails_validation() {
        let q = WeatherQuery::from_params(&params(&[("lat", "north"), ("lon", "98.98")]));
        let coord = q.coordinate().expect("both halves present");
        assert!(!coord.is_valid());
    }

    #[test]
    fn blank_coordinates_are_absent() {
        let q = WeatherQuery::from_params(&params(&[
            ("lat", ""),
            ("lon", "  "),
            ("province", "ภูเก็ต"),
        ]));
        assert_eq!(q.lat, None);
        assert_eq!(q.lon, None);
        assert!(q.coordinate().is_none());
        assert_eq!(q.province(), Some("ภูเก็ต"));
    }

    #[test]
    fn source_label_defaults_to_unknown() {
        let q = WeatherQuery::from_params(&params(&[("province", "  เชียงใหม่ ")]));
        assert_eq!(q.source_label(), "Unknown");
        assert!(q.source_is_unset());
        assert_eq!(q.province(), Some("เชียงใหม่"));

        let q = WeatherQuery::from_params(&params(&[("source", "GPS"), ("province", "   ")]));
        assert!(!q.source_is_unset());
        assert_eq!(q.province(), None);
    }

    #[test]
    fn provider_serializes_with_wire_names() {
        let json = serde_json::to_string(&GeocodeProvider::OpenMeteo).unwrap();
        assert_eq!(json, "\"open-meteo\"");
        assert_eq!(serde_json::to_string(&CacheStatus::Miss).unwrap(), "\"MISS\"");
    }
}
