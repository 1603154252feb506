use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use geoweather_core::{ApiReply, Config, WeatherQuery, WeatherService};
use inquire::{CustomType, CustomUserError, Text, validator::Validation};
use std::{collections::HashMap, net::SocketAddr, ops::RangeInclusive, path::PathBuf};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "geoweather", version, about = "Current weather for a place or coordinate")]
pub struct Cli {
    /// Use this config file instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure contact details, cache directory and default location.
    Configure,

    /// Run one request and print the JSON reply.
    Show {
        #[command(flatten)]
        params: QueryArgs,
    },

    /// Serve `GET /weather` over HTTP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

/// Mirrors the HTTP query string; values are kept raw and parsed by the core.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct QueryArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<String>,

    /// Place name to geocode when no coordinates are given.
    #[arg(long)]
    pub province: Option<String>,

    /// Display label echoed back in the reply.
    #[arg(long)]
    pub source: Option<String>,

    /// "celsius" (default) or "fahrenheit".
    #[arg(long)]
    pub unit: Option<String>,
}

impl QueryArgs {
    pub fn to_params(&self) -> HashMap<String, String> {
        [
            ("lat", &self.lat),
            ("lon", &self.lon),
            ("province", &self.province),
            ("source", &self.source),
            ("unit", &self.unit),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Configure => {
                let updated = configure(config)?;
                match &self.config {
                    Some(path) => updated.save_to(path)?,
                    None => updated.save()?,
                }
                println!("Configuration saved.");
            }
            Command::Show { params } => {
                let service = WeatherService::new(config).context("Failed to build HTTP client")?;
                let query = WeatherQuery::from_params(&params.to_params());
                let reply = ApiReply::from_result(&service.handle(&query).await);

                println!("{}", reply.body);
                if !reply.is_success() {
                    bail!("Request failed with status {}", reply.status);
                }
            }
            Command::Serve { addr } => {
                let service = WeatherService::new(config).context("Failed to build HTTP client")?;
                crate::server::run(addr, service).await;
            }
        }

        Ok(())
    }
}

/// Interactive prompts, pre-filled with the current values.
fn configure(mut config: Config) -> anyhow::Result<Config> {
    config.contact = Text::new("Contact for the User-Agent header (e-mail or URL):")
        .with_default(&config.contact)
        .prompt()?;

    let current_dir = config
        .cache_dir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let cache_dir = Text::new("Cache directory:").with_default(&current_dir).prompt()?;
    config.cache_dir = Some(cache_dir.trim())
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);

    let default = &mut config.default_location;
    default.latitude = CustomType::<f64>::new("Default latitude:")
        .with_default(default.latitude)
        .with_error_message("Please enter a number")
        .with_validator(within(-90.0..=90.0, "Latitude must be within [-90, 90]"))
        .prompt()?;
    default.longitude = CustomType::<f64>::new("Default longitude:")
        .with_default(default.longitude)
        .with_error_message("Please enter a number")
        .with_validator(within(-180.0..=180.0, "Longitude must be within [-180, 180]"))
        .prompt()?;
    default.label = Text::new("Default location label:")
        .with_default(&default.label)
        .prompt()?;

    Ok(config)
}

fn within(
    range: RangeInclusive<f64>,
    message: &'static str,
) -> impl Fn(&f64) -> Result<Validation, CustomUserError> + Clone {
    move |value: &f64| {
        if range.contains(value) {
            Ok(Validation::Valid)
        } else {
            Ok(Validation::Invalid(message.into()))
        }
    }
}
