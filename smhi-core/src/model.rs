use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

/// Parameter names carried by SMHI point-forecast entries.
pub mod params {
    pub const AIR_TEMPERATURE: &str = "air_temperature";
    pub const RELATIVE_HUMIDITY: &str = "relative_humidity";
    pub const WIND_SPEED: &str = "wind_speed";
    pub const WIND_FROM_DIRECTION: &str = "wind_from_direction";
    pub const AIR_PRESSURE_AT_MEAN_SEA_LEVEL: &str = "air_pressure_at_mean_sea_level";
    pub const PRECIPITATION_AMOUNT_MEAN: &str = "precipitation_amount_mean";
    pub const WEATHER_SYMBOL: &str = "weather_symbol";
}

/// Geographic point a forecast is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Latitude within -90..=90 and longitude within -180..=180.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Key identifying a configured location; two locations may not share it.
    pub fn key(&self) -> String {
        format!("{}-{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Numeric parameters of one forecast entry, keyed by parameter name.
///
/// Non-numeric and `null` values in the upstream document are dropped while
/// decoding, so a lookup only ever yields a usable number or nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Parameters(HashMap<String, f64>);

impl Parameters {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn air_temperature(&self) -> Option<f64> {
        self.get(params::AIR_TEMPERATURE)
    }

    pub fn relative_humidity(&self) -> Option<f64> {
        self.get(params::RELATIVE_HUMIDITY)
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.get(params::WIND_SPEED)
    }

    pub fn wind_from_direction(&self) -> Option<f64> {
        self.get(params::WIND_FROM_DIRECTION)
    }

    pub fn air_pressure(&self) -> Option<f64> {
        self.get(params::AIR_PRESSURE_AT_MEAN_SEA_LEVEL)
    }

    pub fn precipitation_amount_mean(&self) -> Option<f64> {
        self.get(params::PRECIPITATION_AMOUNT_MEAN)
    }

    /// Weather symbol code, only when the value is a whole number.
    pub fn weather_symbol(&self) -> Option<i64> {
        let value = self.get(params::WEATHER_SYMBOL)?;
        (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // `null` or a non-object reads as an entry with no parameters.
        let serde_json::Value::Object(raw) = serde_json::Value::deserialize(deserializer)? else {
            return Ok(Self::default());
        };
        Ok(Self(
            raw.into_iter()
                .filter_map(|(name, value)| value.as_f64().map(|n| (name, n)))
                .collect(),
        ))
    }
}

/// One timestamped sample of the forecast time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    /// `None` when the upstream timestamp is missing or unparseable.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: Parameters,
}

impl TimePoint {
    pub fn new(time: DateTime<Utc>, data: Parameters) -> Self {
        Self { time: Some(time), data }
    }
}

/// Decoded SMHI point-forecast document. Keys other than these are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub reference_time: Option<DateTime<Utc>>,
    /// Elements that are not entries are dropped while decoding.
    #[serde(default, deserialize_with = "lenient_series")]
    pub time_series: Vec<TimePoint>,
}

impl RawPayload {
    pub fn new(time_series: Vec<TimePoint>) -> Self {
        Self { reference_time: None, time_series }
    }

    /// Entry the provider lists first, taken as the current one.
    pub fn first(&self) -> Option<&TimePoint> {
        self.time_series.first()
    }

    pub fn is_empty(&self) -> bool {
        self.time_series.is_empty()
    }
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

fn lenient_series<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<TimePoint>, D::Error> {
    let serde_json::Value::Array(raw) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(point) => Some(point),
            Err(e) => {
                trace!(index, error = %e, "dropping malformed forecast entry");
                None
            }
        })
        .collect())
}

/// Parse an upstream timestamp; naive forms are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| ndt.and_utc())
}
