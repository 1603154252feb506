use serde::Serialize;

use crate::{
    Config, Coordinate, GeocodeProvider, WeatherQuery, WeatherSnapshot,
    cache::CacheStore,
    error::{FetchError, WeatherError},
    fetch::HttpFetcher,
    geocode::geocoders_from_config,
    locality::LocalityLookup,
    resolver::PlaceResolver,
    weather::{SnapshotLabels, WeatherFetcher},
};

/// Everything one weather request needs, wired from a single [`Config`].
#[derive(Debug)]
pub struct WeatherService {
    config: Config,
    resolver: PlaceResolver,
    locality: LocalityLookup,
    weather: WeatherFetcher,
}

impl WeatherService {
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config)?;
        let cache = CacheStore::new(config.cache_dir.clone());

        let resolver = PlaceResolver::new(
            cache.clone(),
            geocoders_from_config(&fetcher, &config),
            config.ttl.forward(),
            config.default_location.clone(),
        );
        let locality = LocalityLookup::new(fetcher.clone(), cache.clone(), &config);
        let weather = WeatherFetcher::new(fetcher, cache, &config);

        Ok(Self {
            config,
            resolver,
            locality,
            weather,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve the requested location and return its current weather.
    ///
    /// Explicit coordinates win over a province name and are rejected outright
    /// when out of range, even if a province was also given.
    pub async fn handle(&self, query: &WeatherQuery) -> Result<WeatherSnapshot, WeatherError> {
        let (coordinate, labels) = self.resolve_location(query).await;
        let coordinate = coordinate.validated()?;

        let locality = self.locality.locate(coordinate).await;

        let labels = SnapshotLabels { locality, ..labels };
        self.weather.snapshot(coordinate, query.unit, labels).await
    }

    async fn resolve_location(&self, query: &WeatherQuery) -> (Coordinate, SnapshotLabels) {
        let labels = |source_label: String, geocode_provider| SnapshotLabels {
            source_label,
            locality: String::new(),
            geocode_provider,
        };

        if let Some(coordinate) = query.coordinate() {
            return (
                coordinate,
                labels(query.source_label().to_string(), GeocodeProvider::Coords),
            );
        }

        if let Some(province) = query.province() {
            let resolved = self.resolver.resolve(province).await;
            // The caller's chosen province name takes precedence over upstream labels.
            let source_label = if query.source_is_unset() {
                province.to_string()
            } else {
                query.source_label().to_string()
            };
            return (resolved.coordinate, labels(source_label, resolved.provider));
        }

        let default = &self.config.default_location;
        (default.coordinate(), labels(default.label.clone(), GeocodeProvider::Fallback))
    }
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    ok: bool,
    #[serde(flatten)]
    snapshot: &'a WeatherSnapshot,
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

/// HTTP status plus pretty-printed JSON body, ready for any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn from_result(result: &Result<WeatherSnapshot, WeatherError>) -> Self {
        let (status, body) = match result {
            Ok(snapshot) => (
                200,
                serde_json::to_string_pretty(&SuccessBody { ok: true, snapshot }),
            ),
            Err(e) => (
                e.status_code(),
                serde_json::to_string_pretty(&ErrorBody {
                    ok: false,
                    error: e.to_string(),
                }),
            ),
        };

        let body = body.unwrap_or_else(|e| {
            tracing::error!("Failed to encode reply: {}", e);
            r#"{"ok": false}"#.to_string()
        });

        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CacheStatus, config::Endpoints, locality::UNKNOWN_LOCALITY};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(uri: &str, cache_dir: &std::path::Path) -> WeatherService {
        WeatherService::new(Config {
            cache_dir: Some(cache_dir.to_path_buf()),
            endpoints: Endpoints::rooted_at(uri),
            ..Config::default()
        })
        .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> WeatherQuery {
        let params: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WeatherQuery::from_params(&params)
    }

    async fn mount_weather(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": {"time": "2026-10-19T14:00", "temperature_2m": 29.4,
                            "relative_humidity_2m": 80, "wind_speed_10m": 4.0,
                            "weather_code": 61, "is_day": 0},
                "hourly": {"time": ["2026-10-19T13:00"], "temperature_2m": [29.9]}
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"city": "เมืองเชียงใหม่"})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn explicit_coordinates_take_priority() {
        let mock_server = MockServer::start().await;
        mount_weather(&mock_server).await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let params = [
            ("lat", "18.79"),
            ("lon", "98.98"),
            ("province", "Phuket"),
            ("source", "GPS"),
        ];
        let snap = service(&mock_server.uri(), dir.path())
            .handle(&query(&params))
            .await
            .unwrap();

        assert_eq!(snap.meta.geocode_provider, GeocodeProvider::Coords);
        assert_eq!(snap.meta.source_label, "GPS");
        assert_eq!(snap.meta.locality, "เมืองเชียงใหม่");
        assert_eq!((snap.meta.lat, snap.meta.lon), (18.79, 98.98));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected_before_province() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = service(&mock_server.uri(), dir.path())
            .handle(&query(&[("lat", "95"), ("lon", "100"), ("province", "Phuket")]))
            .await;

        assert_eq!(result.unwrap_err(), WeatherError::InvalidCoordinates);
    }

    #[tokio::test]
    async fn province_becomes_source_label_when_unset() {
        let mock_server = MockServer::start().await;
        mount_weather(&mock_server).await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"name": "Chiang Mai", "admin1": "Chiang Mai", "feature_code": "ADM1",
                             "country_code": "TH", "latitude": 18.75, "longitude": 98.5}]
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let snap = service(&mock_server.uri(), dir.path())
            .handle(&query(&[("province", "Chiang Mai"), ("source", "Unknown")]))
            .await
            .unwrap();

        assert_eq!(snap.meta.geocode_provider, GeocodeProvider::OpenMeteo);
        assert_eq!(snap.meta.source_label, "Chiang Mai");
        assert_eq!((snap.meta.lat, snap.meta.lon), (18.75, 98.5));
    }

    #[tokio::test]
    async fn unresolvable_province_uses_fallback_coordinate() {
        let mock_server = MockServer::start().await;
        mount_weather(&mock_server).await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let snap = service(&mock_server.uri(), dir.path())
            .handle(&query(&[("province", "Atlantis"), ("source", "Map")]))
            .await
            .unwrap();

        assert_eq!(snap.meta.geocode_provider, GeocodeProvider::Fallback);
        assert_eq!(snap.meta.source_label, "Map");
        assert_eq!((snap.meta.lat, snap.meta.lon), (13.7563, 100.5018));
    }

    #[tokio::test]
    async fn no_location_defaults_to_bangkok_label() {
        let mock_server = MockServer::start().await;
        mount_weather(&mock_server).await;

        let dir = tempfile::tempdir().unwrap();
        let snap = service(&mock_server.uri(), dir.path())
            .handle(&query(&[("source", "ignored"), ("unit", "fahrenheit")]))
            .await
            .unwrap();

        assert_eq!(snap.meta.geocode_provider, GeocodeProvider::Fallback);
        assert_eq!(snap.meta.source_label, "กรุงเทพมหานคร");
        assert_eq!(snap.meta.unit, crate::TemperatureUnit::Fahrenheit);
    }

    #[tokio::test]
    async fn repeated_requests_serve_identical_data_from_cache() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "7.89"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": {"temperature_2m": 30.3, "is_day": 1},
                "hourly": {"time": ["t0", "t1"], "temperature_2m": [29.1, 30.3]}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let service = service(&mock_server.uri(), dir.path());
        let q = query(&[("lat", "7.89"), ("lon", "98.39")]);

        let first = ApiReply::from_result(&service.handle(&q).await);
        let second = ApiReply::from_result(&service.handle(&q).await);

        let first: Value = serde_json::from_str(&first.body).unwrap();
        let second: Value = serde_json::from_str(&second.body).unwrap();

        assert_eq!(first["meta"]["cache"], "MISS");
        assert_eq!(second["meta"]["cache"], "HIT");
        assert_eq!(second["meta"]["locality"], UNKNOWN_LOCALITY);
        assert_eq!(first["data"].to_string(), second["data"].to_string());
        assert_eq!(first["hourly"].to_string(), second["hourly"].to_string());
    }

    #[tokio::test]
    async fn weather_outage_maps_to_502_reply() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = service(&mock_server.uri(), dir.path())
            .handle(&query(&[("lat", "7.89"), ("lon", "98.39")]))
            .await;
        let reply = ApiReply::from_result(&result);

        assert_eq!(reply.status, 502);
        let body: Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(body, json!({"ok": false, "error": "ไม่สามารถดึงข้อมูลอากาศได้"}));
    }

    #[test]
    fn success_reply_wraps_snapshot() {
        let snapshot = WeatherSnapshot {
            meta: crate::SnapshotMeta {
                lat: 1.0,
                lon: 2.0,
                unit: crate::TemperatureUnit::Celsius,
                source: "open-meteo".into(),
                source_label: "x".into(),
                locality: "y".into(),
                geocode_provider: GeocodeProvider::Coords,
                cache: CacheStatus::Miss,
            },
            data: crate::CurrentConditions {
                time_local: None,
                temperature_c: 30.0,
                humidity_percent: 50.0,
                wind_kmh: 3.0,
                weather_code: 0,
                is_day: true,
            },
            hourly: crate::HourlySeries::default(),
        };

        let reply = ApiReply::from_result(&Ok(snapshot));
        assert!(reply.is_success());

        let body: Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["meta"]["geocode_provider"], "coords");
        assert_eq!(body["data"]["weather_code"], 0);
        assert!(body["hourly"]["time"].as_array().unwrap().is_empty());
    }
}
