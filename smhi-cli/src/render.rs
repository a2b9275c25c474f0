//! Plain-text rendering of cached forecasts.

use chrono::{NaiveDate, TimeZone};
use smhi_core::{
    CurrentConditions, DailyAggregate,
    condition::symbol_description,
    daily::day_label,
};

fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => "-".to_string(),
    }
}

fn describe(symbol: Option<i64>) -> &'static str {
    symbol.and_then(symbol_description).unwrap_or("Unknown")
}

/// Current readings block, headed by the location name.
pub fn render_current<Tz>(name: &str, current: Option<&CurrentConditions>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let Some(now) = current else {
        return format!("{name}: no forecast data available");
    };

    let observed = now
        .observed_at
        .map(|t| t.with_timezone(tz).format("%Y-%m-%d %H:%M %Z").to_string())
        .unwrap_or_else(|| "-".to_string());

    let condition = now
        .condition
        .map(|c| c.as_str())
        .unwrap_or("unknown");

    [
        format!("{name} ({observed})"),
        format!("  {} [{condition}]", describe(now.symbol)),
        format!("  Temperature:   {}", reading(now.temperature, " °C")),
        format!("  Humidity:      {}", reading(now.humidity, " %")),
        format!(
            "  Wind:          {} from {}",
            reading(now.wind_speed, " m/s"),
            reading(now.wind_bearing, "°")
        ),
        format!("  Pressure:      {}", reading(now.pressure, " hPa")),
        format!("  Precipitation: {}", reading(now.precipitation, " mm/h")),
    ]
    .join("\n")
}

/// One line per day, labelled relative to `today`.
pub fn render_forecast(days: &[DailyAggregate], today: NaiveDate) -> String {
    if days.is_empty() {
        return "No daily forecast available".to_string();
    }

    days.iter()
        .map(|day| {
            let offset = u32::try_from((day.date - today).num_days()).unwrap_or(0);
            format!(
                "{:<9} {}  {:>8} / {:>8}  {:>8}  {}",
                day_label(offset),
                day.date.format("%a %d %b"),
                reading(day.max_temperature, " °C"),
                reading(day.min_temperature, " °C"),
                reading(Some(day.precipitation_estimate), " mm"),
                describe(day.representative_symbol),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
