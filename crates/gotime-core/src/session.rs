//! Session state machine

use chrono::{DateTime, Local};
use gotime_config::ServiceSettings;
use gotime_maps::LatLng;
use gotime_util::SessionId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Monitoring session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    TargetReached,
    TimedOut,
    Cancelled,
    Error,
}

impl SessionStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::TargetReached
                | SessionStatus::TimedOut
                | SessionStatus::Cancelled
                | SessionStatus::Error
        )
    }
}

/// Parameters for creating a monitoring session.
///
/// Timeout and poll interval default from service settings when `None`.
#[derive(Debug, Clone)]
pub struct WatchParams {
    pub origin: LatLng,
    pub destination: LatLng,
    pub target: Duration,
    pub timeout: Option<Duration>,
    pub poll_interval: Option<Duration>,
    pub label: Option<String>,
}

/// One in-flight monitoring request.
///
/// Wall-clock times are carried for display in results; all enforcement
/// (due-ness, timeout) uses the monotonic clock.
#[derive(Debug)]
pub struct Session {
    /// Unique identity, assigned at creation
    pub id: SessionId,

    /// Display label for logs and notifications
    pub label: Option<String>,

    pub origin: LatLng,
    pub destination: LatLng,

    /// Notify once observed travel time drops to this duration
    pub target: Duration,

    /// Give up after this long without reaching the target
    pub timeout: Duration,

    /// Minimum spacing between polls of this session
    pub poll_interval: Duration,

    /// Wall-clock creation time (for display)
    pub created_at: DateTime<Local>,

    /// Monotonic creation time (for enforcement)
    pub created_at_mono: Instant,

    /// Current state
    pub status: SessionStatus,

    /// Most recent observed travel time
    pub current_travel_time: Option<Duration>,

    /// Monotonic time of the last successful observation
    pub last_check: Option<Instant>,

    /// Detail of the failure that terminated this session, if any
    pub error_detail: Option<String>,
}

impl Session {
    /// Create a new session in `Pending` state
    pub fn new(
        params: WatchParams,
        settings: &ServiceSettings,
        now: DateTime<Local>,
        now_mono: Instant,
    ) -> Self {
        Self {
            id: SessionId::new(),
            label: params.label,
            origin: params.origin,
            destination: params.destination,
            target: params.target,
            timeout: params.timeout.unwrap_or(settings.default_timeout),
            poll_interval: params.poll_interval.unwrap_or(settings.polling_interval),
            created_at: now,
            created_at_mono: now_mono,
            status: SessionStatus::Pending,
            current_travel_time: None,
            last_check: None,
            error_detail: None,
        }
    }

    /// Transition `Pending -> Active` on registration
    pub fn start(&mut self) {
        debug_assert_eq!(self.status, SessionStatus::Pending);
        self.status = SessionStatus::Active;
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Whether the poll interval has elapsed since the last observation.
    /// A session that has never been observed is due immediately.
    pub fn is_due(&self, now_mono: Instant) -> bool {
        match self.last_check {
            None => true,
            Some(checked) => now_mono.duration_since(checked) >= self.poll_interval,
        }
    }

    /// Whether the session has outlived its timeout
    pub fn is_expired(&self, now_mono: Instant) -> bool {
        now_mono.duration_since(self.created_at_mono) > self.timeout
    }

    /// Record a successful travel-time observation
    pub fn record_observation(&mut self, travel_time: Duration, now_mono: Instant) {
        self.current_travel_time = Some(travel_time);
        self.last_check = Some(now_mono);
    }

    /// Move into a terminal state and produce the session's one result.
    ///
    /// Callers must remove the session from the active set immediately
    /// afterwards; a terminal session is never polled again.
    pub fn complete(
        &mut self,
        status: SessionStatus,
        message: impl Into<String>,
        now: DateTime<Local>,
    ) -> MonitoringResult {
        debug_assert!(status.is_terminal());
        debug_assert!(!self.status.is_terminal());
        self.status = status;

        MonitoringResult {
            session_id: self.id.clone(),
            label: self.label.clone(),
            status,
            final_travel_time: self.current_travel_time,
            target_duration: self.target,
            message: message.into(),
            completed_at: now,
        }
    }
}

/// Immutable snapshot produced at the moment a session becomes terminal
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringResult {
    pub session_id: SessionId,
    pub label: Option<String>,
    pub status: SessionStatus,
    pub final_travel_time: Option<Duration>,
    pub target_duration: Duration,
    pub message: String,
    pub completed_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> ServiceSettings {
        ServiceSettings {
            polling_interval: Duration::from_secs(30),
            default_timeout: Duration::from_secs(600),
            ..Default::default()
        }
    }

    fn make_params(target_secs: u64) -> WatchParams {
        WatchParams {
            origin: LatLng::new(37.77, -122.41),
            destination: LatLng::new(37.42, -122.08),
            target: Duration::from_secs(target_secs),
            timeout: None,
            poll_interval: None,
            label: None,
        }
    }

    #[tokio::test]
    async fn session_defaults_from_settings() {
        let session = Session::new(
            make_params(600),
            &test_settings(),
            Local::now(),
            Instant::now(),
        );

        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.poll_interval, Duration::from_secs(30));
        assert_eq!(session.timeout, Duration::from_secs(600));
        assert!(session.current_travel_time.is_none());
    }

    #[tokio::test]
    async fn explicit_budgets_override_defaults() {
        let mut params = make_params(600);
        params.timeout = Some(Duration::from_secs(120));
        params.poll_interval = Some(Duration::from_secs(5));

        let session = Session::new(params, &test_settings(), Local::now(), Instant::now());

        assert_eq!(session.timeout, Duration::from_secs(120));
        assert_eq!(session.poll_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn due_and_expired_checks() {
        let start = Instant::now();
        let mut session = Session::new(make_params(600), &test_settings(), Local::now(), start);
        session.start();

        // Never checked: due immediately
        assert!(session.is_due(start));

        session.record_observation(Duration::from_secs(900), start);
        assert!(!session.is_due(start + Duration::from_secs(29)));
        assert!(session.is_due(start + Duration::from_secs(30)));

        // Timeout is strict: exactly at the boundary is not yet expired
        assert!(!session.is_expired(start + Duration::from_secs(600)));
        assert!(session.is_expired(start + Duration::from_secs(601)));
    }

    #[tokio::test]
    async fn complete_snapshots_last_observation() {
        let start = Instant::now();
        let mut session = Session::new(make_params(600), &test_settings(), Local::now(), start);
        session.start();
        session.record_observation(Duration::from_secs(550), start);

        let result = session.complete(SessionStatus::TargetReached, "done", Local::now());

        assert_eq!(result.session_id, session.id);
        assert_eq!(result.status, SessionStatus::TargetReached);
        assert_eq!(result.final_travel_time, Some(Duration::from_secs(550)));
        assert_eq!(result.target_duration, Duration::from_secs(600));
        assert!(session.status.is_terminal());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::TargetReached.is_terminal());
        assert!(SessionStatus::TimedOut.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
    }
}
