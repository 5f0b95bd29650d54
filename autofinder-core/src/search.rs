use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use reqwest::Url;
use std::{sync::Arc, time::Duration};
use tokio::sync::oneshot;
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, DEFAULT_POLL_INTERVAL},
    fetcher::{AvailabilityFetcher, FetchError, HttpFetcher},
    model::{
        CityId, Coordinate, FlexAvailability, Found, Location, SearchKind, SearchMode,
        SearchOutcome, SearchRequest, StationAvailability, VehicleTypeFilter,
    },
    selector::closest_vehicle,
};

/// Date format accepted by the availability API (local time, no offset).
pub const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Polls the availability API until a car shows up, the search is cancelled,
/// or a call fails.
///
/// Cloning is cheap; every search owns its own cancellation token and result
/// channel, nothing else is shared between searches.
#[derive(Debug, Clone)]
pub struct CarSearcher {
    fetcher: Arc<dyn AvailabilityFetcher>,
    base_url: Url,
    poll_interval: Duration,
}

impl CarSearcher {
    pub fn new(fetcher: Arc<dyn AvailabilityFetcher>, base_url: Url) -> Self {
        Self { fetcher, base_url, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// HTTP-backed searcher using the configured API host and cadence.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = Url::parse(config.api_base_url())
            .with_context(|| format!("Invalid API base URL: {}", config.api_base_url()))?;

        Ok(Self::new(Arc::new(HttpFetcher::new()), base_url)
            .with_poll_interval(config.poll_interval()))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until at least one station slot is bookable.
    pub async fn search_station_car(
        &self,
        city_id: CityId,
        coordinate: Coordinate,
        margin_km: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        vehicle_type: VehicleTypeFilter,
    ) -> SearchOutcome {
        let request =
            SearchRequest::station(city_id, coordinate, margin_km, start, end, vehicle_type);
        self.search(request).await
    }

    /// Wait until a free-floating car is parked in the area.
    pub async fn search_flex_car(
        &self,
        city_id: CityId,
        coordinate: Coordinate,
        margin_km: f64,
    ) -> SearchOutcome {
        self.search(SearchRequest::flex(city_id, coordinate, margin_km)).await
    }

    /// Run a search to completion. Only a fetch failure can stop it early.
    pub async fn search(&self, request: SearchRequest) -> SearchOutcome {
        let cancel = CancellationToken::new();
        self.run(&request, &cancel).await
    }

    /// Station search meant to run next to other work. See [`CarSearcher::search_task`].
    #[allow(clippy::too_many_arguments)]
    pub async fn search_station_car_task(
        &self,
        city_id: CityId,
        coordinate: Coordinate,
        margin_km: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        vehicle_type: VehicleTypeFilter,
        results: oneshot::Sender<SearchOutcome>,
        cancel: CancellationToken,
    ) -> SearchOutcome {
        let request =
            SearchRequest::station(city_id, coordinate, margin_km, start, end, vehicle_type);
        self.search_task(request, results, cancel).await
    }

    /// Flex search meant to run next to other work. See [`CarSearcher::search_task`].
    pub async fn search_flex_car_task(
        &self,
        city_id: CityId,
        coordinate: Coordinate,
        margin_km: f64,
        results: oneshot::Sender<SearchOutcome>,
        cancel: CancellationToken,
    ) -> SearchOutcome {
        let request = SearchRequest::flex(city_id, coordinate, margin_km);
        self.search_task(request, results, cancel).await
    }

    /// Cancellable search that reports on `results`.
    ///
    /// The loop runs in its own tokio task. Whatever happens inside it,
    /// including a panic, exactly one outcome is sent on `results` and the
    /// same outcome is returned. A fetch failure also cancels `cancel`, so
    /// anything else listening on that token stops too. Dropping the returned
    /// future aborts the loop; nothing is sent in that case.
    pub async fn search_task(
        &self,
        request: SearchRequest,
        results: oneshot::Sender<SearchOutcome>,
        cancel: CancellationToken,
    ) -> SearchOutcome {
        let searcher = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { searcher.run(&request, &token).await });
        let handle = AbortOnDropHandle::new(task);

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Car search task crashed");
                SearchOutcome::Failed { reason: format!("search task aborted: {e}") }
            }
        };

        if results.send(outcome.clone()).is_err() {
            debug!("Search result receiver already dropped");
        }

        outcome
    }

    async fn run(&self, request: &SearchRequest, cancel: &CancellationToken) -> SearchOutcome {
        let url = build_url(&self.base_url, request);
        let mode = request.mode();
        let target = Location::from(request.coordinate);

        info!(city_id = %request.city_id, %mode, %url, "Starting car search");

        loop {
            if cancel.is_cancelled() {
                info!(%mode, "Car search cancelled");
                return SearchOutcome::Cancelled;
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => continue,
                polled = self.poll(&url, mode, target) => polled,
            };

            match polled {
                Ok(Some(found)) => {
                    info!(%mode, ?found, "Car found");
                    return SearchOutcome::Found(found);
                }
                Ok(None) => debug!(%mode, "Nothing available yet"),
                Err(e) => {
                    warn!(%mode, error = %e, "Availability call failed, stopping search");
                    cancel.cancel();
                    return SearchOutcome::Failed { reason: e.to_string() };
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn poll(
        &self,
        url: &Url,
        mode: SearchMode,
        target: Location,
    ) -> Result<Option<Found>, FetchError> {
        match mode {
            SearchMode::Flex => {
                let availability = self.fetcher.fetch_flex(url).await?;
                Ok(flex_result(&availability, target))
            }
            SearchMode::Station => {
                let availability = self.fetcher.fetch_stations(url).await?;
                Ok(station_result(&availability))
            }
        }
    }
}

fn flex_result(availability: &FlexAvailability, target: Location) -> Option<Found> {
    if availability.vehicles.is_empty() {
        return None;
    }

    let vehicle = closest_vehicle(&availability.vehicles, target).or_else(|| {
        warn!("Failed to find closest vehicle, falling back to the first one");
        availability.vehicles.first()
    })?;

    // Ids must stay positive so they never collide with the -1 sentinel.
    if vehicle.vehicle_id <= 0 {
        warn!(vehicle_id = vehicle.vehicle_id, "Ignoring vehicle with non-positive id");
        return None;
    }

    Some(Found::Vehicle { vehicle_id: vehicle.vehicle_id })
}

fn station_result(availability: &StationAvailability) -> Option<Found> {
    let count = availability.stations.iter().filter(|s| s.is_bookable()).count() as i64;

    (count > 0).then_some(Found::Stations { count })
}

/// Request URL for one search. Built once; every poll reuses it.
pub fn build_url(base: &Url, request: &SearchRequest) -> Url {
    let bbox = request.coordinate.expand(request.margin_km);
    let endpoint = match request.kind {
        SearchKind::Flex => "api/v2/Vehicle/FreeFloatingAvailability",
        SearchKind::Station { .. } => "api/v2/StationAvailability",
    };

    let mut url = base.clone();
    let path = format!("{}/{endpoint}", base.path().trim_end_matches('/'));
    url.set_path(&path);

    {
        let mut query = url.query_pairs_mut();
        query
            .clear()
            .append_pair("CityId", &request.city_id.to_string())
            .append_pair("MaxLatitude", &format!("{:.6}", bbox.max.latitude))
            .append_pair("MinLatitude", &format!("{:.6}", bbox.min.latitude))
            .append_pair("MaxLongitude", &format!("{:.6}", bbox.max.longitude))
            .append_pair("MinLongitude", &format!("{:.6}", bbox.min.longitude));

        if let SearchKind::Station { start, end, vehicle_type } = &request.kind {
            query
                .append_pair("StartDate", &start.format(API_DATE_FORMAT).to_string())
                .append_pair("EndDate", &end.format(API_DATE_FORMAT).to_string());

            if let Some(code) = vehicle_type.api_code() {
                query.append_pair("VehicleTypes", &code.to_string());
            }
        }
    }

    url
}
