//! Core library for SMHI point forecasts.
//!
//! This crate defines:
//! - A fetcher for the SMHI Open Data point-forecast API
//! - A per-location coordinator caching the latest forecast and refreshing it
//! - Pure views over the cached time series (current readings, daily aggregates)
//! - Configuration and the registry of configured locations
//!
//! It is used by `smhi-cli`, but any host that supplies coordinates and polls
//! the coordinator can embed it.

pub mod condition;
pub mod config;
pub mod coordinator;
pub mod current;
pub mod daily;
pub mod fetcher;
pub mod listeners;
pub mod model;
pub mod registry;

pub use condition::{ConditionTag, classify};
pub use config::{Config, LocationConfig, ProviderConfig};
pub use coordinator::{CacheState, Coordinator, CoordinatorStatus, RefreshLoop, UpdateFailure};
pub use current::CurrentConditions;
pub use daily::{DailyAggregate, MAX_FORECAST_DAYS};
pub use fetcher::{FetchError, ForecastFetcher, SmhiFetcher};
pub use listeners::{ListenerRegistry, Subscription};
pub use model::{Coordinates, Parameters, RawPayload, TimePoint};
pub use registry::{LocationId, LocationRegistry, SetupError, validate_location};

/// Credit line hosts should show next to SMHI data.
pub const ATTRIBUTION: &str = "Weather data from SMHI Open Data (https://opendata.smhi.se/)";
