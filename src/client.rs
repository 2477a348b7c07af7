//! Station API client.
//!
//! Provides blocking HTTP access to the station list of the monitoring
//! backend, plus loading the same JSON from a file.
//! Uses reqwest with rustls for TLS.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::errors::StationMapError;
use crate::models::Station;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("stationmap/", env!("CARGO_PKG_VERSION"));

/// Where station records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationSource {
    /// JSON array of stations on disk
    File(std::path::PathBuf),
    /// Base URL of the station API
    Api { base_url: String, active_only: bool },
}

impl StationSource {
    /// Load and validate all stations from this source.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, decoding or validation fails.
    pub fn load(&self) -> Result<Vec<Station>, StationMapError> {
        match self {
            Self::File(path) => load_stations_file(path),
            Self::Api {
                base_url,
                active_only,
            } => StationApiClient::new(base_url)?.fetch_stations(*active_only),
        }
    }
}

/// Client for the station API.
pub struct StationApiClient {
    client: Client,
    base_url: String,
}

impl StationApiClient {
    /// Create a new client for `base_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(base_url: &str) -> Result<Self, StationMapError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the station list endpoint.
    #[must_use]
    pub fn stations_url(&self, active_only: bool) -> String {
        if active_only {
            format!("{}/api/stations/?active=true", self.base_url)
        } else {
            format!("{}/api/stations/", self.base_url)
        }
    }

    /// Fetch the station list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the response cannot be parsed
    /// or a station fails validation.
    #[instrument(skip(self))]
    pub fn fetch_stations(&self, active_only: bool) -> Result<Vec<Station>, StationMapError> {
        let url = self.stations_url(active_only);

        debug!("fetching stations from {}", url);

        let response = self.client.get(&url).send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StationMapError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let stations: Vec<Station> = response.json()?;
        validate_all(&stations)?;

        debug!("fetched {} stations", stations.len());
        Ok(stations)
    }
}

/// Read a JSON array of stations from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a station
/// fails validation.
pub fn load_stations_file(path: &Path) -> Result<Vec<Station>, StationMapError> {
    let text = std::fs::read_to_string(path)?;
    let stations: Vec<Station> = serde_json::from_str(&text)?;
    validate_all(&stations)?;
    debug!("loaded {} stations from {}", stations.len(), path.display());
    Ok(stations)
}

fn validate_all(stations: &[Station]) -> Result<(), StationMapError> {
    stations.iter().try_for_each(Station::validate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stations_url() {
        let client = StationApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.stations_url(false), "http://localhost:8000/api/stations/");
        assert_eq!(
            client.stations_url(true),
            "http://localhost:8000/api/stations/?active=true"
        );
    }

    #[test]
    fn test_load_stations_file() {
        let path = std::env::temp_dir().join(format!("stationmap-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id":"A","name":"Alpha","location":"Madrid","latitude":40.0,"longitude":-3.0,"active":true},
                {"id":"B","name":"Beta","location":"Barcelona","latitude":41.0,"longitude":2.0,"active":false}]"#,
        )
        .unwrap();

        let stations = StationSource::File(path.clone()).load().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].id, "B");
    }

    #[test]
    fn test_load_rejects_invalid_station() {
        let path = std::env::temp_dir().join(format!("stationmap-bad-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id":"A","name":"Alpha","location":"x","latitude":120.0,"longitude":0.0,"active":true}]"#,
        )
        .unwrap();

        let result = load_stations_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(StationMapError::InvalidStation(_))));
    }
}
