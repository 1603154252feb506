use serde::Deserialize;
use std::time::Duration;

use crate::{
    CacheStatus, Config, Coordinate, CurrentConditions, GeocodeProvider, HourlySeries,
    SnapshotMeta, TemperatureUnit, WeatherSnapshot, cache::CacheStore, error::WeatherError,
    fetch::HttpFetcher,
};

const SOURCE: &str = "open-meteo";
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code,is_day";

/// Per-request labels stamped onto every snapshot, cached or not.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotLabels {
    pub source_label: String,
    pub locality: String,
    pub geocode_provider: GeocodeProvider,
}

#[derive(Debug, Deserialize)]
struct OmForecast {
    current: Option<OmCurrent>,
    hourly: Option<OmHourly>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: Option<String>,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    weather_code: Option<f64>,
    is_day: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
}

impl From<OmCurrent> for CurrentConditions {
    fn from(c: OmCurrent) -> Self {
        Self {
            time_local: c.time,
            temperature_c: c.temperature_2m.unwrap_or(0.0),
            humidity_percent: c.relative_humidity_2m.unwrap_or(0.0),
            wind_kmh: c.wind_speed_10m.unwrap_or(0.0),
            weather_code: c.weather_code.map_or(-1, |code| code as i32),
            is_day: c.is_day.is_some_and(|d| d == 1.0),
        }
    }
}

impl From<OmHourly> for HourlySeries {
    fn from(h: OmHourly) -> Self {
        Self {
            time: h.time,
            temperature: h.temperature_2m,
        }
    }
}

/// Current conditions plus the trailing day of hourly temperatures, cached briefly.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    fetcher: HttpFetcher,
    cache: CacheStore,
    url: String,
    ttl: Duration,
}

impl WeatherFetcher {
    pub fn new(fetcher: HttpFetcher, cache: CacheStore, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            url: config.endpoints.forecast.clone(),
            ttl: config.ttl.weather(),
        }
    }

    /// `coordinate` must already be validated.
    pub async fn snapshot(
        &self,
        coordinate: Coordinate,
        unit: TemperatureUnit,
        labels: SnapshotLabels,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let key = weather_key(coordinate, unit);

        if let Some(mut cached) = self.cache.get::<WeatherSnapshot>(&key, self.ttl) {
            tracing::debug!("Weather cache hit for {}", key);
            cached.meta.cache = CacheStatus::Hit;
            cached.meta.source_label = labels.source_label;
            cached.meta.locality = labels.locality;
            cached.meta.geocode_provider = labels.geocode_provider;
            return Ok(cached);
        }

        let params = [
            ("latitude", coordinate.latitude.to_string()),
            ("longitude", coordinate.longitude.to_string()),
            ("current", CURRENT_FIELDS.to_string()),
            ("hourly", "temperature_2m".to_string()),
            ("temperature_unit", unit.as_str().to_string()),
            ("past_days", "1".to_string()),
            ("forecast_days", "1".to_string()),
            ("timezone", "auto".to_string()),
        ];

        let forecast: OmForecast = self.fetcher.fetch_json(&self.url, &params).await.map_err(|e| {
            tracing::warn!("Forecast request failed for {:?}: {}", coordinate, e);
            WeatherError::UpstreamUnavailable
        })?;

        let (Some(current), Some(hourly)) = (forecast.current, forecast.hourly) else {
            tracing::warn!("Forecast response for {:?} lacks current/hourly data", coordinate);
            return Err(WeatherError::UpstreamUnavailable);
        };

        let snapshot = WeatherSnapshot {
            meta: SnapshotMeta {
                lat: coordinate.latitude,
                lon: coordinate.longitude,
                unit,
                source: SOURCE.to_string(),
                source_label: labels.source_label,
                locality: labels.locality,
                geocode_provider: labels.geocode_provider,
                cache: CacheStatus::Miss,
            },
            data: current.into(),
            hourly: hourly.into(),
        };

        self.cache.put(&key, &snapshot);
        Ok(snapshot)
    }
}

/// Distinct per unit so Celsius and Fahrenheit readings never collide.
pub fn weather_key(coordinate: Coordinate, unit: TemperatureUnit) -> String {
    format!("weather_{}_{}", coordinate.cache_fragment(), unit)
}
