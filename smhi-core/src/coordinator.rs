//! Single-writer cache of one location's forecast, refreshed on a schedule.
//!
//! Readers take an immutable snapshot ([`CacheState`]) that is swapped
//! wholesale by the one refresh in flight, so a reader never sees a payload
//! mixing two downloads. Concurrent [`Coordinator::refresh`] calls share the
//! in-flight attempt and all receive its outcome.

use std::{fmt, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    condition::{self, ConditionTag},
    current::{self, CurrentConditions},
    daily::{self, DailyAggregate},
    fetcher::{FetchError, ForecastFetcher},
    listeners::{ListenerRegistry, Subscription},
    model::{Coordinates, Parameters, RawPayload},
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// A refresh attempt failed. The cause is kept for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("error fetching forecast from SMHI: {source}")]
pub struct UpdateFailure {
    #[source]
    source: Arc<FetchError>,
}

impl UpdateFailure {
    pub fn cause(&self) -> &FetchError {
        &self.source
    }
}

impl From<FetchError> for UpdateFailure {
    fn from(err: FetchError) -> Self {
        Self {
            source: Arc::new(err),
        }
    }
}

/// What readers see. Replaced as a whole, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    pub payload: Option<Arc<RawPayload>>,
    pub last_success: Option<DateTime<Utc>>,
    /// Cleared by the next successful refresh.
    pub last_error: Option<UpdateFailure>,
    pub last_attempt: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStatus {
    /// No refresh attempt has completed yet.
    Uninitialized,
    /// A refresh is in flight. An attempt whose callers were all dropped
    /// stays in flight until the next `refresh` resumes it.
    Loading,
    /// At least one attempt completed and none is running.
    Ready,
}

type InFlight = Shared<BoxFuture<'static, Result<(), UpdateFailure>>>;

struct Inner {
    name: String,
    coordinates: Coordinates,
    timezone: Tz,
    fetcher: Arc<dyn ForecastFetcher>,
    cache: ArcSwap<CacheState>,
    in_flight: Mutex<Option<InFlight>>,
    listeners: ListenerRegistry,
}

/// Owner of one location's cached forecast. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("name", &self.inner.name)
            .field("coordinates", &self.inner.coordinates)
            .field("timezone", &self.inner.timezone)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(
        name: impl Into<String>,
        coordinates: Coordinates,
        timezone: Tz,
        fetcher: Arc<dyn ForecastFetcher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                coordinates,
                timezone,
                fetcher,
                cache: ArcSwap::from_pointee(CacheState::default()),
                in_flight: Mutex::new(None),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn coordinates(&self) -> Coordinates {
        self.inner.coordinates
    }

    pub fn timezone(&self) -> Tz {
        self.inner.timezone
    }

    /// Current cache contents; stays valid while later refreshes replace it.
    pub fn snapshot(&self) -> Arc<CacheState> {
        self.inner.cache.load_full()
    }

    pub fn payload(&self) -> Option<Arc<RawPayload>> {
        self.snapshot().payload.clone()
    }

    pub fn status(&self) -> CoordinatorStatus {
        if self.inner.in_flight.lock().is_some() {
            CoordinatorStatus::Loading
        } else if self.snapshot().last_attempt.is_some() {
            CoordinatorStatus::Ready
        } else {
            CoordinatorStatus::Uninitialized
        }
    }

    /// Data is present and the most recent attempt succeeded.
    pub fn is_available(&self) -> bool {
        let state = self.snapshot();
        state.payload.is_some() && state.last_error.is_none()
    }

    /// Fetch now, or join the attempt already running.
    ///
    /// On success the payload is replaced; on failure the previous payload is
    /// kept and the error recorded. Listeners run after either outcome.
    pub async fn refresh(&self) -> Result<(), UpdateFailure> {
        let attempt = {
            let mut slot = self.inner.in_flight.lock();
            match slot.as_ref() {
                Some(running) => running.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let attempt = async move { inner.run_refresh().await }.boxed().shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    /// Eager refresh at setup; a failure here should abort configuring the location.
    pub async fn first_refresh(&self) -> Result<(), UpdateFailure> {
        info!(location = %self.inner.name, coordinates = %self.inner.coordinates, "Performing first forecast refresh");
        self.refresh().await
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    /// Refresh every `period`, measured from the end of the previous attempt.
    ///
    /// Failures are logged and the loop continues. Must be called within a
    /// Tokio runtime.
    pub fn spawn_refresh_loop(&self, period: Duration) -> RefreshLoop {
        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if let Err(err) = coordinator.refresh().await {
                    warn!(
                        location = %coordinator.name(),
                        error = %err,
                        "Scheduled forecast refresh failed; keeping previous data"
                    );
                }
            }
        });

        RefreshLoop { handle }
    }

    /// Parameters of the first time-series entry.
    pub fn current_parameters(&self) -> Option<Parameters> {
        let payload = self.payload()?;
        current::current(&payload).cloned()
    }

    pub fn current_conditions(&self) -> Option<CurrentConditions> {
        let payload = self.payload()?;
        CurrentConditions::from_payload(&payload)
    }

    /// Up to `limit` days starting today in the coordinator's time zone.
    pub fn daily_forecast(&self, limit: usize) -> Vec<DailyAggregate> {
        self.daily_forecast_at(Utc::now(), limit)
    }

    pub fn daily_forecast_at(&self, now: DateTime<Utc>, limit: usize) -> Vec<DailyAggregate> {
        match self.payload() {
            Some(payload) => {
                daily::forecast(&payload.time_series, now, &self.inner.timezone, limit)
            }
            None => Vec::new(),
        }
    }

    /// Aggregate for today (`offset` 0), tomorrow (1), and so on.
    pub fn day_forecast(&self, offset: u32) -> Option<DailyAggregate> {
        self.day_forecast_at(Utc::now(), offset)
    }

    pub fn day_forecast_at(&self, now: DateTime<Utc>, offset: u32) -> Option<DailyAggregate> {
        let payload = self.payload()?;
        daily::day_forecast(&payload.time_series, now, &self.inner.timezone, offset)
    }

    pub fn classify_condition(&self, symbol: Option<i64>) -> Option<ConditionTag> {
        condition::classify(symbol)
    }
}

impl Inner {
    async fn run_refresh(self: Arc<Self>) -> Result<(), UpdateFailure> {
        let result = self.fetcher.fetch(self.coordinates).await;
        let now = Utc::now();

        let outcome = match result {
            Ok(payload) => {
                info!(location = %self.name, entries = payload.time_series.len(), "Forecast refreshed");
                self.cache.store(Arc::new(CacheState {
                    payload: Some(Arc::new(payload)),
                    last_success: Some(now),
                    last_error: None,
                    last_attempt: Some(now),
                }));
                Ok(())
            }
            Err(err) => {
                let failure = UpdateFailure::from(err);
                let previous = self.cache.load_full();
                self.cache.store(Arc::new(CacheState {
                    last_error: Some(failure.clone()),
                    last_attempt: Some(now),
                    ..(*previous).clone()
                }));
                Err(failure)
            }
        };

        self.in_flight.lock().take();
        self.listeners.notify();

        outcome
    }
}

/// Background task driving scheduled refreshes. Stops when dropped.
#[derive(Debug)]
pub struct RefreshLoop {
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
