//! Core library behind the `geoweather` endpoint.
//!
//! This crate defines:
//! - Configuration (cache location, TTLs, default location, upstream endpoints)
//! - A TTL file cache shared by every lookup
//! - Forward geocoding with Open-Meteo and Nominatim, plus place resolution
//! - Reverse locality lookup and the weather snapshot assembler
//!
//! It is used by `geoweather-cli`, but can also be embedded in other services.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod locality;
pub mod model;
pub mod resolver;
pub mod service;
pub mod weather;

pub use config::{Config, DefaultLocation, Endpoints, TtlConfig};
pub use error::{FetchError, WeatherError};
pub use model::{
    CacheStatus, Coordinate, CurrentConditions, GeocodeProvider, GeocodeResult, HourlySeries,
    SnapshotMeta, TemperatureUnit, WeatherQuery, WeatherSnapshot,
};
pub use service::{ApiReply, WeatherService};
