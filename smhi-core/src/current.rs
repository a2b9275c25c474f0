//! Instantaneous readings taken from the first time-series entry.
//!
//! The provider returns the series sorted ascending with the most current
//! entry first. No search for the entry nearest to "now" is made.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    condition::{ConditionTag, classify},
    model::{Parameters, RawPayload},
};

/// Raw parameters of the first entry, if the series has one.
pub fn current(payload: &RawPayload) -> Option<&Parameters> {
    payload.first().map(|point| &point.data)
}

/// Typed view of the current entry, one field per rendered reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub observed_at: Option<DateTime<Utc>>,
    /// °C
    pub temperature: Option<f64>,
    /// %
    pub humidity: Option<f64>,
    /// m/s
    pub wind_speed: Option<f64>,
    /// Degrees the wind blows from.
    pub wind_bearing: Option<f64>,
    /// hPa, reduced to mean sea level.
    pub pressure: Option<f64>,
    /// mm/h
    pub precipitation: Option<f64>,
    pub symbol: Option<i64>,
    pub condition: Option<ConditionTag>,
}

impl CurrentConditions {
    pub fn from_payload(payload: &RawPayload) -> Option<Self> {
        let point = payload.first()?;
        let mut conditions = Self::from_parameters(&point.data);
        conditions.observed_at = point.time;
        Some(conditions)
    }

    pub fn from_parameters(data: &Parameters) -> Self {
        let symbol = data.weather_symbol();
        Self {
            observed_at: None,
            temperature: data.air_temperature(),
            humidity: data.relative_humidity(),
            wind_speed: data.wind_speed(),
            wind_bearing: data.wind_from_direction(),
            pressure: data.air_pressure(),
            precipitation: data.precipitation_amount_mean(),
            symbol,
            condition: classify(symbol),
        }
    }
}
