use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::model::{FlexAvailability, StationAvailability};

use super::{AvailabilityFetcher, FetchError};

/// Fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self { http: Client::new() }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        debug!(%url, "Calling availability API");

        let res = self.http.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, error = %e, "Availability API unreachable");
            FetchError::Transport(e.to_string())
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            warn!(%url, error = %e, "Failed to read availability response body");
            FetchError::Transport(e.to_string())
        })?;

        parse_response(status, &body).inspect_err(|e| {
            warn!(%url, error = %e, "Availability API call failed");
        })
    }
}

#[async_trait]
impl AvailabilityFetcher for HttpFetcher {
    async fn fetch_flex(&self, url: &Url) -> Result<FlexAvailability, FetchError> {
        self.get_json(url).await
    }

    async fn fetch_stations(&self, url: &Url) -> Result<StationAvailability, FetchError> {
        self.get_json(url).await
    }
}

/// Only `200 OK` with a body matching `T` counts as success.
fn parse_response<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, FetchError> {
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_with_valid_body_decodes() {
        let parsed: FlexAvailability =
            parse_response(StatusCode::OK, r#"{"totalNbVehicles": 0, "vehicles": []}"#).unwrap();
        assert_eq!(parsed.total_nb_vehicles, 0);
        assert!(parsed.vehicles.is_empty());
    }

    #[test]
    fn non_ok_status_is_status_error() {
        let err = parse_response::<StationAvailability>(StatusCode::BAD_GATEWAY, "upstream")
            .unwrap_err();
        assert_eq!(err, FetchError::Status { status: 502, body: "upstream".into() });
    }

    #[test]
    fn other_success_codes_are_rejected_too() {
        let err = parse_response::<StationAvailability>(StatusCode::NO_CONTENT, "").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 204, .. }));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_response::<StationAvailability>(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "é".repeat(500);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
    }
}
