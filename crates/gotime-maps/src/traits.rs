//! Source traits

use async_trait::async_trait;
use std::time::Duration;

use crate::{Departure, LatLng, SourceResult};

/// A capability that answers "how long to drive from A to B right now".
///
/// `Ok(None)` is the no-route signal: the provider answered but found no
/// usable route (or returned a payload that could not be navigated, which is
/// deliberately indistinguishable).
#[async_trait]
pub trait TravelTimeSource: Send + Sync {
    async fn travel_time(
        &self,
        origin: LatLng,
        destination: LatLng,
        departure: Departure,
    ) -> SourceResult<Option<Duration>>;
}

/// Address-to-coordinate translation.
///
/// `Ok(None)` means the address produced no results (including blank input).
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> SourceResult<Option<LatLng>>;
}
