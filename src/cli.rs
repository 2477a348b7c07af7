//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use stationmap::client::StationSource;
use stationmap::output::Format;

/// Weather station map: markers, clusters and viewport from station data.
#[derive(Parser, Debug)]
#[command(name = "stationmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the map once and print its markers
    Show(ShowArgs),

    /// Serve the map state over HTTP
    Serve(ServeArgs),
}

/// Where to read stations from. Exactly one of the two is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// JSON file with an array of stations
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Base URL of the station API (e.g. http://localhost:8000)
    #[arg(long)]
    pub api: Option<String>,
}

impl SourceArgs {
    /// Resolve into a station source.
    #[must_use]
    pub fn source(&self, active_only: bool) -> StationSource {
        // the required arg group guarantees `api` when `file` is absent
        match &self.file {
            Some(path) => StationSource::File(path.clone()),
            None => StationSource::Api {
                base_url: self.api.clone().unwrap_or_default(),
                active_only,
            },
        }
    }
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only request active stations from the API
    #[arg(long)]
    pub active_only: bool,

    /// Map configuration file (JSON)
    #[arg(long)]
    pub map_config: Option<PathBuf>,

    /// Container name of the map surface
    #[arg(long, default_value = "map-container")]
    pub container: String,

    /// Surface width in pixels
    #[arg(long, default_value = "1024")]
    pub width: f64,

    /// Surface height in pixels
    #[arg(long, default_value = "768")]
    pub height: f64,

    /// Station to highlight after fitting
    #[arg(long)]
    pub highlight: Option<String>,

    /// Also build the temperature overlay
    #[arg(long)]
    pub weather: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `serve` command.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only request active stations from the API
    #[arg(long)]
    pub active_only: bool,

    /// Map configuration file (JSON)
    #[arg(long)]
    pub map_config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "8080")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Surface width in pixels used for bounds fitting
    #[arg(long, default_value = "1024")]
    pub width: f64,

    /// Surface height in pixels used for bounds fitting
    #[arg(long, default_value = "768")]
    pub height: f64,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
