//! Mock travel-time source for testing

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{Departure, Geocoder, LatLng, SourceResult, TravelTimeSource};

/// Scripted travel-time source for unit/integration testing.
///
/// Responses queued with the `push_*` helpers are returned in order; once
/// the queue is empty every further call returns the fallback (no route
/// unless `set_fallback` was called).
pub struct MockSource {
    responses: Mutex<VecDeque<SourceResult<Option<Duration>>>>,
    fallback: Mutex<SourceResult<Option<Duration>>>,
    geocode_results: Mutex<HashMap<String, LatLng>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(None)),
            geocode_results: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a successful observation of `seconds`
    pub fn push_travel_time(&self, seconds: u64) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Some(Duration::from_secs(seconds))));
    }

    /// Queue a no-route response
    pub fn push_no_route(&self) {
        self.responses.lock().unwrap().push_back(Ok(None));
    }

    /// Queue an error response
    pub fn push_error(&self, error: crate::SourceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Response returned once the scripted queue is drained
    pub fn set_fallback(&self, response: SourceResult<Option<Duration>>) {
        *self.fallback.lock().unwrap() = response;
    }

    /// Register a geocoding result for an address
    pub fn add_geocode_result(&self, address: impl Into<String>, coords: LatLng) {
        self.geocode_results
            .lock()
            .unwrap()
            .insert(address.into(), coords);
    }

    /// Number of travel-time calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TravelTimeSource for MockSource {
    async fn travel_time(
        &self,
        _origin: LatLng,
        _destination: LatLng,
        _departure: Departure,
    ) -> SourceResult<Option<Duration>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.responses.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self.fallback.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl Geocoder for MockSource {
    async fn geocode(&self, address: &str) -> SourceResult<Option<LatLng>> {
        Ok(self
            .geocode_results
            .lock()
            .unwrap()
            .get(address.trim())
            .copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceError;

    #[tokio::test]
    async fn scripted_responses_in_order() {
        let source = MockSource::new();
        source.push_travel_time(900);
        source.push_no_route();
        source.push_error(SourceError::Api("denied".into()));

        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(1.0, 1.0);

        assert_eq!(
            source.travel_time(a, b, Departure::Now).await.unwrap(),
            Some(Duration::from_secs(900))
        );
        assert_eq!(source.travel_time(a, b, Departure::Now).await.unwrap(), None);
        assert!(source.travel_time(a, b, Departure::Now).await.is_err());

        // Queue drained: fallback applies
        assert_eq!(source.travel_time(a, b, Departure::Now).await.unwrap(), None);
        assert_eq!(source.call_count(), 4);
    }

    #[tokio::test]
    async fn geocode_lookup() {
        let source = MockSource::new();
        source.add_geocode_result("1 Main St", LatLng::new(40.0, -70.0));

        assert_eq!(
            source.geocode("1 Main St").await.unwrap(),
            Some(LatLng::new(40.0, -70.0))
        );
        assert_eq!(source.geocode("unknown").await.unwrap(), None);
    }
}
