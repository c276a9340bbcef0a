//! Data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ImporterError;
use coerce::*;

/// One archived readsb snapshot
///
/// Only the fields used by the importer are modelled, everything else in the
/// document is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Snapshot {
    /// Snapshot time in seconds from Unix epoch, with fractional part
    pub now: f64,
    /// Aircraft seen in this snapshot
    pub aircraft: Vec<RawAircraft>,
}

impl Snapshot {
    /// Record timestamp shared by every aircraft of this snapshot.
    ///
    /// `now` plus one second, at microsecond precision.
    pub fn timestamp(&self) -> Result<DateTime<Utc>, ImporterError> {
        let micros = ((self.now + 1.0) * 1_000_000.0).round();
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return Err(ImporterError::InvalidSnapshotTime(self.now));
        }
        DateTime::from_timestamp_micros(micros as i64)
            .ok_or(ImporterError::InvalidSnapshotTime(self.now))
    }

    /// Normalize all aircraft, dropping those without a position
    pub fn into_records(self) -> Result<Vec<NormalizedRecord>, ImporterError> {
        let timestamp = self.timestamp()?;
        Ok(self
            .aircraft
            .into_iter()
            .filter_map(|aircraft| NormalizedRecord::from_raw(timestamp, aircraft))
            .collect())
    }
}

/// Aircraft entry exactly as found in the snapshot
///
/// A key with a JSON `null` value is treated the same as a missing key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawAircraft(Map<String, Value>);

impl RawAircraft {
    /// Field value, `None` if missing or null
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }
}

impl From<Map<String, Value>> for RawAircraft {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Aircraft position row, as stored in the `adsb` table
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Snapshot time
    pub timestamp: DateTime<Utc>,
    /// ICAO 24-bit address
    pub hex: Option<String>,
    /// Callsign, empty string if not available
    pub flight: String,
    pub registration: Option<String>,
    pub aircraft_type: Option<String>,
    /// Barometric altitude in feet, None when on ground or not available
    pub altitude: Option<i32>,
    /// Ground speed in knots
    pub ground_speed: Option<f64>,
    pub nav_heading: Option<f64>,
    pub track: Option<f64>,
    /// Longitude in WGS84 decimal degrees
    pub longitude: f64,
    /// Latitude in WGS84 decimal degrees
    pub latitude: f64,
    /// The unmodified source entry
    pub raw: RawAircraft,
}

impl NormalizedRecord {
    /// Map one raw aircraft entry into a row.
    ///
    /// Returns `None` when either coordinate is missing. Fields that cannot
    /// be coerced to their column type are stored as NULL.
    pub fn from_raw(timestamp: DateTime<Utc>, raw: RawAircraft) -> Option<Self> {
        let latitude = parse_float(raw.get("lat"))?;
        let longitude = parse_float(raw.get("lon"))?;

        Some(Self {
            timestamp,
            hex: parse_text(raw.get("hex")),
            flight: parse_callsign(raw.get("flight")),
            registration: parse_text(raw.get("r")),
            aircraft_type: parse_text(raw.get("t")),
            altitude: parse_int(raw.get("alt_baro")),
            ground_speed: parse_float(raw.get("gs")),
            nav_heading: parse_float(raw.get("nav_heading")),
            track: parse_float(raw.get("track")),
            longitude,
            latitude,
            raw,
        })
    }
}

/// Lenient field conversions, any value that does not fit becomes `None`
mod coerce {
    use serde_json::Value;

    pub fn parse_int(value: Option<&Value>) -> Option<i32> {
        match value? {
            Value::Number(n) => match n.as_i64() {
                Some(i) => i32::try_from(i).ok(),
                None => n.as_f64().and_then(truncate),
            },
            Value::String(s) => s.trim().parse::<i32>().ok(),
            Value::Bool(b) => Some(i32::from(*b)),
            _ => None,
        }
    }

    pub fn parse_float(value: Option<&Value>) -> Option<f64> {
        let f = match value? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            Value::Bool(b) => f64::from(u8::from(*b)),
            _ => return None,
        };
        f.is_finite().then_some(f)
    }

    pub fn parse_text(value: Option<&Value>) -> Option<String> {
        match value? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn parse_callsign(value: Option<&Value>) -> String {
        match value {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => String::new(),
        }
    }

    fn truncate(f: f64) -> Option<i32> {
        let t = f.trunc();
        if t.is_finite() && t >= i32::MIN as f64 && t <= i32::MAX as f64 {
            Some(t as i32)
        } else {
            None
        }
    }
}
