//! Core library for the `autofinder` CLI.
//!
//! This crate defines:
//! - Geometry helpers (search box, haversine distance)
//! - Closest-vehicle selection
//! - The availability API boundary and its HTTP implementation
//! - The polling search loop with cooperative cancellation
//! - Configuration handling
//!
//! It is used by `autofinder-cli`, but can also be driven from any tokio
//! application that wants to wait for a car next to other work.

pub mod config;
pub mod fetcher;
pub mod geo;
pub mod model;
pub mod search;
pub mod selector;

pub use config::Config;
pub use fetcher::{AvailabilityFetcher, FetchError, HttpFetcher};
pub use geo::haversine_distance_km;
pub use model::{
    BoundingBox, CityId, Coordinate, Found, Location, SearchMode, SearchOutcome, SearchRequest,
    Station, Vehicle, VehicleTypeFilter,
};
pub use search::CarSearcher;
pub use selector::closest_vehicle;

pub use tokio_util::sync::CancellationToken;
