//! Coordinator behaviour against a scripted in-process fetcher
//!
//! Covers coalescing of concurrent refreshes, whole-snapshot replacement,
//! stale data on failure, listener notification and the refresh schedule.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use smhi_core::{
    ConditionTag, Coordinates, Coordinator, CoordinatorStatus, FetchError, ForecastFetcher,
    RawPayload, TimePoint, model::params,
};
use tokio::sync::Notify;

const STOCKHOLM: Coordinates = Coordinates::new(59.3293, 18.0686);

/// Hands out scripted outcomes in order; optionally blocks until released.
#[derive(Debug, Default)]
struct ScriptedFetcher {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Result<RawPayload, StatusCode>>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedFetcher {
    fn new(script: Vec<Result<RawPayload, StatusCode>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    fn gated(script: Vec<Result<RawPayload, StatusCode>>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForecastFetcher for ScriptedFetcher {
    async fn fetch(&self, _coordinates: Coordinates) -> Result<RawPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(status)) => Err(FetchError::Upstream {
                status,
                body: String::new(),
            }),
            None => Err(FetchError::Upstream {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "script exhausted".to_string(),
            }),
        }
    }
}

/// Single-entry payload with the given temperature, at 2023-10-10 12:00Z.
fn payload(temperature: f64) -> RawPayload {
    let data = [
        (params::AIR_TEMPERATURE, temperature),
        (params::RELATIVE_HUMIDITY, 60.0),
        (params::WIND_SPEED, 5.0),
        (params::WIND_FROM_DIRECTION, 180.0),
        (params::AIR_PRESSURE_AT_MEAN_SEA_LEVEL, 1012.0),
        (params::PRECIPITATION_AMOUNT_MEAN, 0.0),
        (params::WEATHER_SYMBOL, 1.0),
    ]
    .into_iter()
    .collect();
    RawPayload::new(vec![TimePoint::new(
        Utc.with_ymd_and_hms(2023, 10, 10, 12, 0, 0).unwrap(),
        data,
    )])
}

fn coordinator_with(fetcher: &Arc<ScriptedFetcher>) -> Coordinator {
    Coordinator::new("Home", STOCKHOLM, chrono_tz::UTC, fetcher.clone())
}

#[tokio::test]
async fn concurrent_refreshes_share_one_fetch() {
    let gate = Arc::new(Notify::new());
    let fetcher = Arc::new(ScriptedFetcher::gated(vec![Ok(payload(15.0))], gate.clone()));
    let coordinator = coordinator_with(&fetcher);

    let (a, b, c, ()) = tokio::join!(
        coordinator.refresh(),
        coordinator.refresh(),
        coordinator.refresh(),
        async {
            assert_eq!(coordinator.status(), CoordinatorStatus::Loading);
            gate.notify_one();
        }
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(coordinator.status(), CoordinatorStatus::Ready);
}

#[tokio::test]
async fn coalesced_callers_all_see_the_failure() {
    let gate = Arc::new(Notify::new());
    let fetcher = Arc::new(ScriptedFetcher::gated(
        vec![Err(StatusCode::BAD_GATEWAY)],
        gate.clone(),
    ));
    let coordinator = coordinator_with(&fetcher);

    let (a, b, ()) = tokio::join!(coordinator.refresh(), coordinator.refresh(), async {
        gate.notify_one();
    });

    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert_eq!(a.cause().status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(b.cause().status(), Some(StatusCode::BAD_GATEWAY));
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn sequential_refreshes_each_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(payload(1.0)), Ok(payload(2.0))]));
    let coordinator = coordinator_with(&fetcher);

    coordinator.refresh().await.expect("first");
    coordinator.refresh().await.expect("second");

    assert_eq!(fetcher.calls(), 2);
    let now = coordinator.current_conditions().expect("current");
    assert_eq!(now.temperature, Some(2.0));
}

#[tokio::test]
async fn failure_keeps_previous_payload() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(payload(10.0)),
        Err(StatusCode::INTERNAL_SERVER_ERROR),
        Ok(payload(20.0)),
    ]));
    let coordinator = coordinator_with(&fetcher);

    coordinator.refresh().await.expect("first refresh");
    let first = coordinator.snapshot();
    assert!(coordinator.is_available());

    let err = coordinator.refresh().await.expect_err("second refresh fails");
    assert_eq!(err.cause().status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

    let stale = coordinator.snapshot();
    let (stale_payload, first_payload) = (stale.payload.as_ref(), first.payload.as_ref());
    assert!(Arc::ptr_eq(stale_payload.unwrap(), first_payload.unwrap()));
    assert_eq!(stale.last_success, first.last_success);
    assert!(stale.last_error.is_some());
    assert!(!coordinator.is_available());
    assert_eq!(coordinator.current_conditions().unwrap().temperature, Some(10.0));

    coordinator.refresh().await.expect("third refresh");
    let fresh = coordinator.snapshot();
    assert!(fresh.last_error.is_none());
    assert!(coordinator.is_available());
    assert_eq!(coordinator.current_conditions().unwrap().temperature, Some(20.0));

    // Earlier snapshots are untouched by later swaps.
    let old = first.payload.as_ref().unwrap();
    assert_eq!(old.time_series[0].data.air_temperature(), Some(10.0));
    assert!(first.last_error.is_none());
}

#[tokio::test]
async fn failed_first_refresh_leaves_cache_empty() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(StatusCode::INTERNAL_SERVER_ERROR)]));
    let coordinator = coordinator_with(&fetcher);
    assert_eq!(coordinator.status(), CoordinatorStatus::Uninitialized);

    assert!(coordinator.first_refresh().await.is_err());

    assert_eq!(coordinator.status(), CoordinatorStatus::Ready);
    assert!(coordinator.payload().is_none());
    assert!(coordinator.current_conditions().is_none());
    assert!(coordinator.current_parameters().is_none());
    assert!(coordinator.daily_forecast(10).is_empty());
    assert!(coordinator.day_forecast(0).is_none());
    assert!(!coordinator.is_available());
}

#[tokio::test]
async fn listeners_run_after_success_and_failure_in_order() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(payload(1.0)),
        Err(StatusCode::INTERNAL_SERVER_ERROR),
    ]));
    let coordinator = coordinator_with(&fetcher);
    let log: Arc<Mutex<Vec<String>>> = Arc::default();

    let first = {
        let log = Arc::clone(&log);
        let view = coordinator.clone();
        coordinator.subscribe(move || {
            let available = view.is_available();
            log.lock().push(format!("first:{available}"));
        })
    };
    let _second = {
        let log = Arc::clone(&log);
        coordinator.subscribe(move || log.lock().push("second".to_string()))
    };

    coordinator.refresh().await.expect("success");
    let _ = coordinator.refresh().await;

    assert_eq!(
        *log.lock(),
        vec!["first:true", "second", "first:false", "second"]
    );

    first.unsubscribe();
    first.unsubscribe();
    let _ = coordinator.refresh().await;
    assert_eq!(log.lock().last().map(String::as_str), Some("second"));
    assert_eq!(log.lock().len(), 5);
}

#[tokio::test]
async fn abandoned_refresh_is_resumed_not_restarted() {
    let gate = Arc::new(Notify::new());
    let fetcher = Arc::new(ScriptedFetcher::gated(vec![Ok(payload(7.0))], gate.clone()));
    let coordinator = coordinator_with(&fetcher);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), coordinator.refresh()).await;
    assert!(abandoned.is_err());
    assert_eq!(coordinator.status(), CoordinatorStatus::Loading);
    assert!(coordinator.payload().is_none());

    gate.notify_one();
    coordinator.refresh().await.expect("resumed refresh");

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(coordinator.current_conditions().unwrap().temperature, Some(7.0));
}

#[tokio::test]
async fn end_to_end_single_entry() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(payload(15.0))]));
    let coordinator = coordinator_with(&fetcher);
    coordinator.first_refresh().await.expect("refresh");
    let now = Utc.with_ymd_and_hms(2023, 10, 10, 12, 0, 0).unwrap();

    let current = coordinator.current_conditions().expect("current");
    assert_eq!(current.temperature, Some(15.0));
    assert_eq!(
        coordinator.current_parameters().unwrap().air_temperature(),
        Some(15.0)
    );
    assert_eq!(coordinator.classify_condition(Some(1)), Some(ConditionTag::ClearNight));

    let days = coordinator.daily_forecast_at(now, 10);
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].date, now.date_naive());
    assert_eq!(days[0].max_temperature, Some(15.0));
    assert_eq!(days[0].min_temperature, Some(15.0));
    assert_eq!(days[0].precipitation_estimate, 0.0);

    let today = coordinator.day_forecast_at(now, 0).expect("today");
    assert_eq!(today, days[0]);
    assert!(coordinator.day_forecast_at(now, 1).is_none());
}

#[tokio::test(start_paused = true)]
async fn refresh_loop_runs_every_period_and_survives_failures() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Err(StatusCode::INTERNAL_SERVER_ERROR),
        Ok(payload(3.0)),
    ]));
    let coordinator = coordinator_with(&fetcher);
    let period = Duration::from_secs(60 * 60);

    let refresh_loop = coordinator.spawn_refresh_loop(period);

    tokio::time::sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(fetcher.calls(), 0);

    tokio::time::sleep(Duration::from_secs(31 * 60)).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(coordinator.payload().is_none());

    tokio::time::sleep(period).await;
    assert_eq!(fetcher.calls(), 2);
    assert!(coordinator.is_available());
    assert!(!refresh_loop.is_finished());

    refresh_loop.stop();
    tokio::time::sleep(period * 3).await;
    assert_eq!(fetcher.calls(), 2);
}
