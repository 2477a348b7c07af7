//! stationmap - weather station map from your terminal.
//!
//! Builds the station map (markers, clusters, viewport) from a station
//! file or the station API and prints it, or serves it over HTTP.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use stationmap::config::MapConfig;
use stationmap::output;
use stationmap::renderer::HeadlessRenderer;
use stationmap::view::StationMapView;

mod cli;
mod server;

use cli::{Cli, Command};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Show(args) => cmd_show(args),
        Command::Serve(args) => cmd_serve(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Load the map configuration, falling back to defaults.
fn load_map_config(path: Option<&std::path::Path>) -> Result<MapConfig> {
    match path {
        Some(path) => MapConfig::from_file(path)
            .with_context(|| format!("failed to load map config {}", path.display())),
        None => Ok(MapConfig::default()),
    }
}

/// Execute the `show` command - build the map once and print its markers.
fn cmd_show(args: cli::ShowArgs) -> Result<()> {
    let config = load_map_config(args.map_config.as_deref())?;

    let stations = args
        .source
        .source(args.active_only)
        .load()
        .context("failed to load stations")?;

    let renderer = HeadlessRenderer::new().with_container(&args.container, args.width, args.height);
    let mut view = StationMapView::new(renderer, config);
    view.initialize(&args.container, &stations)
        .context("failed to initialize map")?;

    if args.weather {
        let circles = view
            .add_weather_layer(&stations)
            .context("failed to add weather layer")?;
        tracing::info!("weather overlay: {} stations with temperature", circles);
    }

    if let Some(id) = &args.highlight
        && !view.highlight_marker(id)
    {
        tracing::warn!("no marker for station {}", id);
    }

    if let Some(viewport) = view.viewport() {
        tracing::info!(
            "viewport: center {:.4}, {:.4} zoom {}",
            viewport.center.lat,
            viewport.center.lng,
            viewport.zoom
        );
    }
    tracing::info!("{}", output::cluster_summary(&view.clusters()));

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_markers(&mut handle, &view.snapshots(), args.format)?;

    Ok(())
}

/// Execute the `serve` command - start the web server.
fn cmd_serve(args: cli::ServeArgs) -> Result<()> {
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        source: args.source.source(args.active_only),
        map: load_map_config(args.map_config.as_deref())?,
        width: args.width,
        height: args.height,
    };

    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m📍 stationmap\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Surface: {}x{}", args.width, args.height);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config))
}
