use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use weather_core::{Config, Credentials, WeatherError, WeatherPipeline, WeatherRequest};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "24-hour local-time weather forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the registered city names.
    Cities,

    /// Geocode a free-text place description.
    Search {
        /// Place name or address.
        query: String,
    },

    /// Show the next 24 hours of weather, in local time.
    Weather {
        /// Registered city name; unknown names use the default city.
        #[arg(long)]
        city: Option<String>,

        /// Latitude in decimal degrees.
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        /// Longitude in decimal degrees.
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,
    },

    /// Serve `/cities`, `/search` and `/weather` over HTTP.
    Serve {
        /// Overrides `server.bind_address` from the config file.
        #[arg(long)]
        bind: Option<String>,

        /// Overrides `server.port` from the config file.
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;
        let pipeline = WeatherPipeline::from_config(&config, Credentials::from_env())?;

        match self.command {
            Command::Cities => print_json(&pipeline.locations().registry().names()),
            Command::Search { query } => {
                let place = pipeline.locations().resolve_by_query(&query).await.map_err(failure)?;
                print_json(&place)
            }
            Command::Weather { city, lat, lon } => {
                let request = WeatherRequest { city, lat, lon };
                let response = pipeline.get_weather(&request).await.map_err(failure)?;
                print_json(&response)
            }
            Command::Serve { bind, port } => {
                let bind = bind.unwrap_or(config.server.bind_address);
                let port = port.unwrap_or(config.server.port);
                server::serve(&bind, port, Arc::new(pipeline)).await
            }
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn failure(e: WeatherError) -> anyhow::Error {
    anyhow!("{e} (status {})", e.status_code())
}
