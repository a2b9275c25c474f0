use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::model::{Coordinates, RawPayload};

pub mod smhi;

pub use smhi::SmhiFetcher;

/// Classified failure of a single forecast download.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, TLS, timeout, refused connection or a body cut short.
    #[error("connection error: {0}")]
    Connect(#[source] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// The API answered 2xx but the body is not a forecast document.
    #[error("failed to decode forecast payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl FetchError {
    pub fn is_connect(&self) -> bool {
        matches!(self, FetchError::Connect(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Source of forecast payloads for a point. One call is one attempt.
#[async_trait]
pub trait ForecastFetcher: Send + Sync + Debug {
    async fn fetch(&self, coordinates: Coordinates) -> Result<RawPayload, FetchError>;
}
