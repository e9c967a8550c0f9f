//! Google Maps web-services client

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Departure, Geocoder, LatLng, SourceError, SourceResult, TravelTimeSource};

const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Google Maps Directions and Geocoding web services
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest client with static configuration");

        Self {
            http,
            api_key: api_key.into(),
        }
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> SourceResult<Value> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Transient("request timed out".into())
                } else {
                    SourceError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SourceError::Transient(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(SourceError::Api(format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TravelTimeSource for GoogleMapsClient {
    async fn travel_time(
        &self,
        origin: LatLng,
        destination: LatLng,
        departure: Departure,
    ) -> SourceResult<Option<Duration>> {
        let params = [
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("mode", "driving".to_string()),
            ("departure_time", departure.as_query_param()),
            ("traffic_model", "best_guess".to_string()),
            ("key", self.api_key.clone()),
        ];

        let payload = self.get_json(DIRECTIONS_URL, &params).await?;

        if !check_status(&payload)? {
            warn!(%origin, %destination, "No route found");
            return Ok(None);
        }

        match extract_travel_time(&payload) {
            Some(duration) => {
                debug!(
                    %origin,
                    %destination,
                    travel_secs = duration.as_secs(),
                    "Travel time retrieved"
                );
                Ok(Some(duration))
            }
            None => {
                // Unexpected response shape is treated the same as no route
                warn!(%origin, %destination, "Response missing traffic duration");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> SourceResult<Option<LatLng>> {
        let address = address.trim();
        if address.is_empty() {
            warn!("Empty address provided for geocoding");
            return Ok(None);
        }

        let params = [
            ("address", address.to_string()),
            ("key", self.api_key.clone()),
        ];

        let payload = self.get_json(GEOCODE_URL, &params).await?;

        if !check_status(&payload)? {
            warn!(address, "No geocoding results");
            return Ok(None);
        }

        let coords = extract_location(&payload)
            .ok_or_else(|| SourceError::Malformed("geocode result missing location".into()))?;

        debug!(address, %coords, "Address geocoded");
        Ok(Some(coords))
    }
}

/// Interpret the `status` field shared by the Maps web services.
///
/// Returns `Ok(true)` when results are present, `Ok(false)` for the empty
/// result statuses, and an error for everything else.
fn check_status(payload: &Value) -> SourceResult<bool> {
    let status = payload
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("response missing status field".into()))?;

    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR" => Err(SourceError::Transient(status.to_string())),
        other => {
            let detail = payload
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or(other);
            Err(SourceError::Api(detail.to_string()))
        }
    }
}

/// Pull `routes[0].legs[0].duration_in_traffic.value` out of a Directions
/// response. Any missing step yields `None`.
fn extract_travel_time(payload: &Value) -> Option<Duration> {
    let secs = payload
        .get("routes")?
        .get(0)?
        .get("legs")?
        .get(0)?
        .get("duration_in_traffic")?
        .get("value")?
        .as_u64()?;
    Some(Duration::from_secs(secs))
}

/// Pull `results[0].geometry.location` out of a Geocoding response
fn extract_location(payload: &Value) -> Option<LatLng> {
    let location = payload
        .get("results")?
        .get(0)?
        .get("geometry")?
        .get("location")?;
    Some(LatLng::new(
        location.get("lat")?.as_f64()?,
        location.get("lng")?.as_f64()?,
    ))
}
