//! Explicit map of configured locations to their coordinators.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use chrono_tz::Tz;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{LocationConfig, ProviderConfig},
    coordinator::{Coordinator, RefreshLoop, UpdateFailure},
    fetcher::{ForecastFetcher, SmhiFetcher},
    model::Coordinates,
};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("a location at {0} is already configured")]
    AlreadyConfigured(Coordinates),

    #[error("invalid coordinates {0}: latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates(Coordinates),

    #[error("cannot connect to SMHI: {0}")]
    CannotConnect(#[source] UpdateFailure),
}

impl SetupError {
    /// Short message a user can act on.
    pub fn user_message(&self) -> &'static str {
        match self {
            SetupError::AlreadyConfigured(_) => "This location is already configured.",
            SetupError::InvalidCoordinates(_) => "Those coordinates are out of range.",
            SetupError::CannotConnect(_) => {
                "Could not get a forecast from SMHI for this location. Check the coordinates and your connection."
            }
        }
    }
}

/// Opaque handle for a set-up location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(u64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location-{}", self.0)
    }
}

struct Entry {
    coordinator: Coordinator,
    _refresh_loop: RefreshLoop,
}

/// Owns one coordinator and its refresh loop per configured location.
pub struct LocationRegistry {
    fetcher: Arc<dyn ForecastFetcher>,
    timezone: Tz,
    refresh_interval: Duration,
    next_id: u64,
    entries: HashMap<LocationId, Entry>,
}

impl fmt::Debug for LocationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationRegistry")
            .field("fetcher", &self.fetcher)
            .field("timezone", &self.timezone)
            .field("refresh_interval", &self.refresh_interval)
            .field("locations", &self.entries.len())
            .finish()
    }
}

impl LocationRegistry {
    pub fn new(fetcher: Arc<dyn ForecastFetcher>, timezone: Tz, refresh_interval: Duration) -> Self {
        Self {
            fetcher,
            timezone,
            refresh_interval,
            next_id: 0,
            entries: HashMap::new(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let fetcher = SmhiFetcher::from_config(config)?;
        Ok(Self::new(
            Arc::new(fetcher),
            config.timezone()?,
            config.refresh_interval(),
        ))
    }

    /// Create a coordinator for `location`, refresh it once and start its
    /// schedule. Nothing is registered unless that first refresh succeeds.
    pub async fn setup(&mut self, location: &LocationConfig) -> Result<LocationId, SetupError> {
        let coordinates = location.coordinates();
        if !coordinates.is_valid() {
            return Err(SetupError::InvalidCoordinates(coordinates));
        }
        if self.find(coordinates).is_some() {
            return Err(SetupError::AlreadyConfigured(coordinates));
        }

        let coordinator = Coordinator::new(
            location.name.clone(),
            coordinates,
            self.timezone,
            Arc::clone(&self.fetcher),
        );

        if let Err(err) = coordinator.first_refresh().await {
            warn!(location = %location.name, error = %err, "Location setup failed");
            return Err(SetupError::CannotConnect(err));
        }

        let id = LocationId(self.next_id);
        self.next_id += 1;

        let refresh_loop = coordinator.spawn_refresh_loop(self.refresh_interval);
        self.entries.insert(
            id,
            Entry {
                coordinator,
                _refresh_loop: refresh_loop,
            },
        );

        info!(location = %location.name, %id, "Location set up");
        Ok(id)
    }

    /// Stop the location's schedule and drop its coordinator.
    pub fn unload(&mut self, id: LocationId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                info!(location = %entry.coordinator.name(), %id, "Location unloaded");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: LocationId) -> Option<&Coordinator> {
        self.entries.get(&id).map(|entry| &entry.coordinator)
    }

    pub fn find(&self, coordinates: Coordinates) -> Option<LocationId> {
        let key = coordinates.key();
        self.entries
            .iter()
            .find(|(_, entry)| entry.coordinator.coordinates().key() == key)
            .map(|(id, _)| *id)
    }

    pub fn ids(&self) -> Vec<LocationId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One validation fetch for a location that is about to be persisted.
pub async fn validate_location(
    fetcher: &dyn ForecastFetcher,
    location: &LocationConfig,
) -> Result<(), SetupError> {
    let coordinates = location.coordinates();
    if !coordinates.is_valid() {
        return Err(SetupError::InvalidCoordinates(coordinates));
    }

    fetcher.fetch(coordinates).await.map(|_| ()).map_err(|err| {
        warn!(location = %location.name, error = %err, "SMHI connection test failed");
        SetupError::CannotConnect(UpdateFailure::from(err))
    })
}
