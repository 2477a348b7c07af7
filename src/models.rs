//! Data models for station records and marker output.
//!
//! `Station` matches the station API's JSON (snake_case, with camelCase
//! aliases). The output types are what we emit in JSON/NDJSON/GeoJSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::StationMapError;
use crate::geo::LatLng;

/// A weather station as returned by the station API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Unique station ID (stable identity key)
    pub id: String,

    pub name: String,

    pub location: String,

    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,

    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,

    /// Whether the station is currently reporting
    pub active: bool,

    /// Time of the last received reading; `None` means never reported
    #[serde(
        default,
        alias = "lastDataTime",
        deserialize_with = "deserialize_timestamp"
    )]
    pub last_data_time: Option<DateTime<Utc>>,

    /// Most recent reading, if the API included one
    #[serde(default, alias = "latestReading", alias = "latest_data")]
    pub latest_reading: Option<LatestReading>,
}

impl Station {
    /// Validate the record before it is placed on a map.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStation` for an empty ID or a latitude/longitude
    /// that is not finite or out of range.
    pub fn validate(&self) -> Result<(), StationMapError> {
        if self.id.is_empty() {
            return Err(StationMapError::InvalidStation("empty station ID".into()));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(StationMapError::InvalidStation(format!(
                "station {}: latitude {} out of range [-90, 90]",
                self.id, self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(StationMapError::InvalidStation(format!(
                "station {}: longitude {} out of range [-180, 180]",
                self.id, self.longitude
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Temperature of the latest reading, if any.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.latest_reading.as_ref().and_then(|r| r.temperature)
    }
}

/// Latest weather reading of a station. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestReading {
    /// Degrees Celsius
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Relative humidity, percent
    #[serde(default)]
    pub humidity: Option<f64>,

    /// Wind speed in m/s
    #[serde(default, alias = "windSpeed", alias = "wind_speed_ms")]
    pub wind_speed: Option<f64>,

    /// Accumulated rainfall in mm
    #[serde(default, alias = "total_rainfall")]
    pub rain: Option<f64>,
}

/// Accept RFC 3339 timestamps and naive ISO-8601 ones (taken as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

/// Parse a timestamp in either RFC 3339 or naive `YYYY-MM-DDTHH:MM:SS[.f]` form.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Flattened marker for output.
///
/// This is the normalized structure we emit in JSON/NDJSON output and as
/// GeoJSON feature properties.
#[derive(Debug, Clone, Serialize)]
pub struct MarkerSnapshot {
    pub id: String,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub active: bool,
    pub color: String,
    pub last_data_time: Option<String>,
    pub temperature: Option<f64>,
}

/// GeoJSON `FeatureCollection` of station markers.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub features: Vec<Feature>,
}

/// A single GeoJSON point feature.
#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    /// Always "Feature"
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub id: String,
    pub geometry: Geometry,
    pub properties: MarkerSnapshot,
}

/// GeoJSON point geometry.
#[derive(Debug, Clone, Serialize)]
pub struct Geometry {
    /// Always "Point"
    #[serde(rename = "type")]
    pub type_: &'static str,

    /// Coordinates: [longitude, latitude]
    pub coordinates: [f64; 2],
}

impl From<MarkerSnapshot> for Feature {
    fn from(snapshot: MarkerSnapshot) -> Self {
        Self {
            type_: "Feature",
            id: snapshot.id.clone(),
            geometry: Geometry {
                type_: "Point",
                coordinates: [snapshot.longitude, snapshot.latitude],
            },
            properties: snapshot,
        }
    }
}

impl FromIterator<MarkerSnapshot> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = MarkerSnapshot>>(iter: I) -> Self {
        Self {
            type_: "FeatureCollection",
            features: iter.into_iter().map(Feature::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_station() {
        let json = r#"{
            "id": "ST-001",
            "name": "Madrid Centro",
            "location": "Madrid",
            "latitude": 40.4168,
            "longitude": -3.7038,
            "active": true,
            "last_data_time": "2024-05-01T12:30:00",
            "description": null,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-05-01T12:30:00",
            "latest_data": {
                "temperature": 21.5,
                "humidity": 40.0,
                "wind_speed_ms": 3.2,
                "total_rainfall": 0.0
            }
        }"#;
        let station: Station = serde_json::from_str(json).expect("failed to parse station");
        station.validate().expect("invalid station");

        assert_eq!(station.id, "ST-001");
        let reading = station.latest_reading.as_ref().unwrap();
        assert_eq!(reading.wind_speed, Some(3.2));
        assert_eq!(reading.rain, Some(0.0));
        assert_eq!(station.temperature(), Some(21.5));
        assert_eq!(
            station.last_data_time.unwrap().to_rfc3339(),
            "2024-05-01T12:30:00+00:00"
        );
    }

    #[test]
    fn test_parse_camel_case_station() {
        let json = r#"{
            "id": "B",
            "name": "Barcelona",
            "location": "Barcelona",
            "latitude": 41.0,
            "longitude": 2.0,
            "active": false,
            "lastDataTime": "2024-05-01T12:30:00Z",
            "latestReading": {"humidity": 55.0}
        }"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert!(station.last_data_time.is_some());
        assert_eq!(station.temperature(), None);
        assert_eq!(station.latest_reading.unwrap().humidity, Some(55.0));
    }

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{"id":"X","name":"n","location":"l","latitude":0,"longitude":0,"active":true}"#;
        let station: Station = serde_json::from_str(json).unwrap();
        assert!(station.last_data_time.is_none());
        assert!(station.latest_reading.is_none());
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = r#"{"id":"X","name":"n","location":"l","latitude":0,"longitude":0,
                       "active":true,"last_data_time":"yesterday"}"#;
        assert!(serde_json::from_str::<Station>(json).is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let mut station = Station {
            id: "X".into(),
            name: "n".into(),
            location: "l".into(),
            latitude: 91.0,
            longitude: 0.0,
            active: true,
            last_data_time: None,
            latest_reading: None,
        };
        assert!(station.validate().is_err());
        station.latitude = 45.0;
        station.longitude = -181.0;
        assert!(station.validate().is_err());
        station.longitude = f64::NAN;
        assert!(station.validate().is_err());
        station.longitude = 179.9;
        assert!(station.validate().is_ok());
        station.id.clear();
        assert!(station.validate().is_err());
    }
}
