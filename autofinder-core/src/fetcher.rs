use async_trait::async_trait;
use reqwest::Url;
use std::fmt::Debug;
use thiserror::Error;

use crate::model::{FlexAvailability, StationAvailability};

pub mod http;

pub use http::HttpFetcher;

/// Why a single availability call did not produce a usable response.
///
/// The search loop treats every variant the same way: the search ends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to reach availability API: {0}")]
    Transport(String),

    #[error("Availability API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode availability response: {0}")]
    Decode(String),
}

/// One GET against the availability API, decoded into the shape the caller asked for.
#[async_trait]
pub trait AvailabilityFetcher: Send + Sync + Debug {
    async fn fetch_flex(&self, url: &Url) -> Result<FlexAvailability, FetchError>;

    async fn fetch_stations(&self, url: &Url) -> Result<StationAvailability, FetchError>;
}
