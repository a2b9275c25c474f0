//! Per-day aggregation over the forecast time series.
//!
//! A calendar day is `[local midnight, next local midnight)` in the supplied
//! time zone. Entries are compared by their UTC timestamp converted to that
//! zone. Entries without a usable timestamp never contribute.
//!
//! Everything here is a pure function of the series, the time zone and the
//! reference instant, so repeated evaluation gives identical results.

use std::collections::HashSet;

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::trace;

use crate::{
    condition::{ConditionTag, classify},
    model::{Parameters, TimePoint},
};

/// Upper bound on days in a multi-day forecast.
pub const MAX_FORECAST_DAYS: usize = 10;

/// Hours the representative hourly precipitation rate is scaled by.
const PRECIPITATION_HOURS: f64 = 24.0;

/// Summary of one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub condition: Option<ConditionTag>,
    pub representative_symbol: Option<i64>,
    pub representative_wind_speed: Option<f64>,
    pub representative_wind_bearing: Option<f64>,
    /// Representative rate times 24, in mm. An estimate, not a sum of samples.
    pub precipitation_estimate: f64,
    /// All parameters of the entry that reached `max_temperature`.
    pub max_temperature_parameters: Option<Parameters>,
}

/// Calendar date of `time` in `tz`.
pub fn local_date<Tz: TimeZone>(time: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    time.with_timezone(tz).date_naive()
}

/// 12:00 local time on `date`, as UTC.
///
/// When noon falls in a DST gap the wall-clock time is read as UTC; when it
/// is ambiguous the earlier instant is used.
pub fn local_noon<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::hours(12);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

fn entries_on<'a, Tz: TimeZone>(
    series: &'a [TimePoint],
    date: NaiveDate,
    tz: &'a Tz,
) -> impl Iterator<Item = (DateTime<Utc>, &'a TimePoint)> + 'a {
    series.iter().filter_map(move |point| {
        let Some(time) = point.time else {
            trace!("skipping forecast entry without a valid timestamp");
            return None;
        };
        (local_date(&time, tz) == date).then_some((time, point))
    })
}

pub fn daily_max_temperature<Tz: TimeZone>(
    series: &[TimePoint],
    date: NaiveDate,
    tz: &Tz,
) -> Option<f64> {
    entries_on(series, date, tz)
        .filter_map(|(_, point)| point.data.air_temperature())
        .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.max(t))))
}

pub fn daily_min_temperature<Tz: TimeZone>(
    series: &[TimePoint],
    date: NaiveDate,
    tz: &Tz,
) -> Option<f64> {
    entries_on(series, date, tz)
        .filter_map(|(_, point)| point.data.air_temperature())
        .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |m| m.min(t))))
}

/// First entry on `date` that reaches the day's maximum temperature.
pub fn daily_max_entry<'a, Tz: TimeZone>(
    series: &'a [TimePoint],
    date: NaiveDate,
    tz: &'a Tz,
) -> Option<&'a TimePoint> {
    let mut best: Option<(f64, &TimePoint)> = None;
    for (_, point) in entries_on(series, date, tz) {
        let Some(temp) = point.data.air_temperature() else {
            continue;
        };
        if best.is_none_or(|(max, _)| temp > max) {
            best = Some((temp, point));
        }
    }
    best.map(|(_, point)| point)
}

/// Entry on `date` closest to local noon; the earliest wins a tie.
pub fn representative_entry<'a, Tz: TimeZone>(
    series: &'a [TimePoint],
    date: NaiveDate,
    tz: &'a Tz,
) -> Option<&'a TimePoint> {
    let noon = local_noon(date, tz);
    entries_on(series, date, tz)
        .min_by_key(|(time, _)| (*time - noon).num_seconds().abs())
        .map(|(_, point)| point)
}

/// Representative hourly precipitation rate (0 if missing) times 24.
pub fn daily_precipitation_estimate<Tz: TimeZone>(
    series: &[TimePoint],
    date: NaiveDate,
    tz: &Tz,
) -> Option<f64> {
    representative_entry(series, date, tz).map(|point| precipitation_estimate(&point.data))
}

fn precipitation_estimate(data: &Parameters) -> f64 {
    data.precipitation_amount_mean().unwrap_or(0.0) * PRECIPITATION_HOURS
}

/// Aggregate for one date, or `None` when no entry falls on it.
pub fn aggregate_day<Tz: TimeZone>(
    series: &[TimePoint],
    date: NaiveDate,
    tz: &Tz,
) -> Option<DailyAggregate> {
    let representative = representative_entry(series, date, tz)?;
    let data = &representative.data;
    let symbol = data.weather_symbol();

    Some(DailyAggregate {
        date,
        max_temperature: daily_max_temperature(series, date, tz),
        min_temperature: daily_min_temperature(series, date, tz),
        condition: classify(symbol),
        representative_symbol: symbol,
        representative_wind_speed: data.wind_speed(),
        representative_wind_bearing: data.wind_from_direction(),
        precipitation_estimate: precipitation_estimate(data),
        max_temperature_parameters: daily_max_entry(series, date, tz)
            .map(|point| point.data.clone()),
    })
}

/// Multi-day forecast starting at the local date of `now`.
///
/// Walks the series once in order, skipping days before today, and emits one
/// aggregate per newly seen date until `limit` (capped at
/// [`MAX_FORECAST_DAYS`]) dates have been produced. Days without entries are
/// simply absent.
pub fn forecast<Tz: TimeZone>(
    series: &[TimePoint],
    now: DateTime<Utc>,
    tz: &Tz,
    limit: usize,
) -> Vec<DailyAggregate> {
    let limit = limit.min(MAX_FORECAST_DAYS);
    let today = local_date(&now, tz);
    let mut seen = HashSet::new();
    let mut days = Vec::with_capacity(limit);

    if limit == 0 {
        return days;
    }

    for point in series {
        let Some(time) = point.time else {
            continue;
        };
        let date = local_date(&time, tz);
        if date < today || !seen.insert(date) {
            continue;
        }

        if let Some(day) = aggregate_day(series, date, tz) {
            days.push(day);
        }
        if days.len() >= limit {
            break;
        }
    }

    days
}

/// Aggregate for `today + offset` days.
pub fn day_forecast<Tz: TimeZone>(
    series: &[TimePoint],
    now: DateTime<Utc>,
    tz: &Tz,
    offset: u32,
) -> Option<DailyAggregate> {
    let date = local_date(&now, tz).checked_add_days(Days::new(u64::from(offset)))?;
    aggregate_day(series, date, tz)
}

/// "Today", "Tomorrow", then "Day +n".
pub fn day_label(offset: u32) -> String {
    match offset {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        n => format!("Day +{n}"),
    }
}
