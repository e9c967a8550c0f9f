//! The monitoring engine
//!
//! One periodic sweep task drives all session polling. Sessions poll
//! independently of each other and of the sweep cadence: each is checked
//! only once its own poll interval has elapsed. All external calls go
//! through the shared rate limiter.

use chrono::Local;
use gotime_config::ServiceSettings;
use gotime_maps::{Departure, LatLng, TravelTimeSource};
use gotime_util::{GotimeError, RateLimiter, RateLimiterUsage, SessionId, format_duration};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::{MonitoringResult, Session, SessionStatus, WatchParams};

/// Callback invoked with the result of every completed session.
/// Invocations are serialized; the callback is never run concurrently
/// with itself.
pub type NotificationCallback = Box<dyn Fn(MonitoringResult) + Send + Sync>;

/// Extra sleep applied when a sweep pass fails unexpectedly
const ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// How long shutdown waits for an in-flight sweep iteration before
/// abandoning it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

/// Engine for managing and executing monitoring sessions
#[derive(Clone)]
pub struct MonitoringEngine {
    inner: Arc<Inner>,
}

struct Inner {
    settings: ServiceSettings,
    source: Arc<dyn TravelTimeSource>,
    limiter: Arc<RateLimiter>,
    sessions: Mutex<HashMap<SessionId, Session>>,
    callback: std::sync::Mutex<Option<NotificationCallback>>,
    running: AtomicBool,
    wake: Notify,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

/// Snapshot of one due session, taken under the sessions lock so the
/// external call can happen without holding it
struct PollPlan {
    id: SessionId,
    origin: LatLng,
    destination: LatLng,
    expired: bool,
}

/// What a single poll concluded about its session
enum PollOutcome {
    TimedOut,
    Observed(Duration),
    NoResult,
    Failed(String),
}

impl MonitoringEngine {
    /// Create a new engine over a travel-time source and shared rate limiter
    pub fn new(
        settings: ServiceSettings,
        source: Arc<dyn TravelTimeSource>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        info!(
            max_sessions = settings.max_concurrent_sessions,
            sweep_secs = settings.sweep_interval.as_secs(),
            "Monitoring engine initialized"
        );

        Self {
            inner: Arc::new(Inner {
                settings,
                source,
                limiter,
                sessions: Mutex::new(HashMap::new()),
                callback: std::sync::Mutex::new(None),
                running: AtomicBool::new(false),
                wake: Notify::new(),
                sweep_task: Mutex::new(None),
            }),
        }
    }

    /// Build a `Pending` session with this engine's configured defaults
    pub fn new_session(&self, params: WatchParams) -> Session {
        let session = Session::new(params, &self.inner.settings, Local::now(), Instant::now());
        info!(session_id = %session.id, "Created monitoring session");
        session
    }

    /// Replace the notification callback. At most one callback is active.
    pub fn set_notification_callback<F>(&self, callback: F)
    where
        F: Fn(MonitoringResult) + Send + Sync + 'static,
    {
        *self.inner.callback.lock().unwrap() = Some(Box::new(callback));
        info!("Notification callback set");
    }

    /// Register a session for monitoring.
    ///
    /// The session moves to `Active` and the sweep loop is started lazily if
    /// it is not already running. Fails when the engine is at capacity or the
    /// session id is already tracked.
    pub async fn register(&self, mut session: Session) -> gotime_util::Result<SessionId> {
        let id = {
            let mut sessions = self.inner.sessions.lock().await;

            if sessions.contains_key(&session.id) {
                return Err(GotimeError::DuplicateSession(session.id.clone()));
            }

            let max = self.inner.settings.max_concurrent_sessions;
            if sessions.len() >= max {
                return Err(GotimeError::CapacityExceeded {
                    active: sessions.len(),
                    max,
                });
            }

            session.start();
            let id = session.id.clone();
            info!(
                session_id = %id,
                origin = %session.origin,
                destination = %session.destination,
                target_secs = session.target.as_secs(),
                "Session registered"
            );
            sessions.insert(id.clone(), session);
            id
        };

        // Start the sweep lazily. The loop only parks itself after seeing an
        // empty session map, and the insert above happened under that same
        // lock, so the handoff cannot lose a wakeup.
        if !self.inner.running.swap(true, Ordering::SeqCst) {
            let inner = self.inner.clone();
            let handle = tokio::spawn(Inner::run(inner));
            *self.inner.sweep_task.lock().await = Some(handle);
        }

        Ok(id)
    }

    /// Cancel a tracked session.
    ///
    /// Returns the `Cancelled` result after delivering it to the callback,
    /// or `None` if the id is unknown (not an error).
    pub async fn cancel(&self, session_id: &SessionId) -> Option<MonitoringResult> {
        let mut session = {
            let mut sessions = self.inner.sessions.lock().await;
            sessions.remove(session_id)?
        };

        let result = session.complete(
            SessionStatus::Cancelled,
            "Session cancelled by user",
            Local::now(),
        );
        info!(session_id = %session_id, "Session cancelled");

        if let Err(e) = self.inner.notify(&result) {
            warn!(session_id = %session_id, error = %e, "Notification failed");
        }
        Some(result)
    }

    /// Number of currently active sessions
    pub async fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().await.len()
    }

    /// Current consumption of the shared API budgets
    pub fn api_usage(&self) -> RateLimiterUsage {
        self.inner.limiter.usage()
    }

    /// Stop the sweep and cancel every still-active session.
    ///
    /// The in-flight sweep iteration is given a bounded grace period, then
    /// abandoned. Remaining sessions each receive a `Cancelled` result
    /// tagged as shutdown-initiated. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.wake.notify_waiters();

        if let Some(handle) = self.inner.sweep_task.lock().await.take() {
            let abort = handle.abort_handle();
            if timeout(SHUTDOWN_GRACE, handle).await.is_err() {
                warn!("Sweep did not stop within grace period, aborting");
                abort.abort();
            }
        }

        let drained: Vec<Session> = {
            let mut sessions = self.inner.sessions.lock().await;
            sessions.drain().map(|(_, session)| session).collect()
        };

        if drained.is_empty() {
            return;
        }

        info!(count = drained.len(), "Cancelling active sessions for shutdown");
        let now = Local::now();
        for mut session in drained {
            let result = session.complete(SessionStatus::Cancelled, "Engine shutdown", now);
            if let Err(e) = self.inner.notify(&result) {
                warn!(session_id = %result.session_id, error = %e, "Notification failed");
            }
        }
        info!("Monitoring engine shutdown complete");
    }
}

impl Inner {
    /// Deliver a result to the registered callback, serialized under the
    /// callback lock. A panicking callback is contained and reported as an
    /// error rather than unwinding into the sweep.
    fn notify(&self, result: &MonitoringResult) -> gotime_util::Result<()> {
        let guard = self.callback.lock().unwrap();
        if let Some(callback) = guard.as_ref() {
            catch_unwind(AssertUnwindSafe(|| callback(result.clone())))
                .map_err(|_| GotimeError::internal("notification callback panicked"))?;
        }
        Ok(())
    }

    /// Main monitoring loop: sweep, then park until the next tick. Stops
    /// when shut down or when the active set drains (the next `register`
    /// restarts it).
    async fn run(inner: Arc<Inner>) {
        info!("Monitoring loop started");

        loop {
            if !inner.running.load(Ordering::SeqCst) {
                break;
            }

            let pause = match Self::sweep(&inner).await {
                Ok(()) => inner.settings.sweep_interval,
                Err(e) => {
                    error!(error = %e, "Sweep failed, backing off");
                    ERROR_BACKOFF
                }
            };

            {
                let sessions = inner.sessions.lock().await;
                if sessions.is_empty() {
                    inner.running.store(false, Ordering::SeqCst);
                    break;
                }
            }

            tokio::select! {
                _ = sleep(pause) => {}
                _ = inner.wake.notified() => {}
            }
        }

        info!("Monitoring loop stopped");
    }

    /// One sweep pass over all due sessions.
    ///
    /// Per-session failures never escape this function as errors; they
    /// terminate only the session that hit them. The returned error covers
    /// failures outside per-session handling (a panicking callback).
    async fn sweep(inner: &Arc<Inner>) -> gotime_util::Result<()> {
        let now_mono = Instant::now();

        let due: Vec<PollPlan> = {
            let sessions = inner.sessions.lock().await;
            sessions
                .values()
                .filter(|s| s.is_active() && s.is_due(now_mono))
                .map(|s| PollPlan {
                    id: s.id.clone(),
                    origin: s.origin,
                    destination: s.destination,
                    expired: s.is_expired(now_mono),
                })
                .collect()
        };

        let mut completions: Vec<MonitoringResult> = Vec::new();

        for plan in due {
            if !inner.running.load(Ordering::SeqCst) {
                break;
            }

            let outcome = Self::poll(inner, &plan).await;

            // Re-acquire the lock to apply; the session may have been
            // cancelled while the call was in flight, in which case its
            // result already went out and this observation is dropped.
            let mut sessions = inner.sessions.lock().await;
            let Some(session) = sessions.get_mut(&plan.id) else {
                debug!(session_id = %plan.id, "Session completed elsewhere during poll");
                continue;
            };

            let now = Local::now();
            let result = match outcome {
                PollOutcome::TimedOut => {
                    let minutes = session.timeout.as_secs() / 60;
                    Some(session.complete(
                        SessionStatus::TimedOut,
                        format!("Session timed out after {} minutes", minutes),
                        now,
                    ))
                }
                PollOutcome::Observed(observed) => {
                    session.record_observation(observed, Instant::now());
                    if observed <= session.target {
                        let message = format!(
                            "Target reached! Current travel time: {} (target: {})",
                            format_duration(observed),
                            format_duration(session.target)
                        );
                        Some(session.complete(SessionStatus::TargetReached, message, now))
                    } else {
                        debug!(
                            session_id = %plan.id,
                            travel_secs = observed.as_secs(),
                            target_secs = session.target.as_secs(),
                            "Target not yet reached"
                        );
                        None
                    }
                }
                PollOutcome::NoResult => None,
                PollOutcome::Failed(detail) => {
                    session.error_detail = Some(detail.clone());
                    Some(session.complete(
                        SessionStatus::Error,
                        format!("Error: {}", detail),
                        now,
                    ))
                }
            };

            // Terminal sessions leave the active set at once so no further
            // poll or cancellation can touch them.
            if let Some(result) = result {
                sessions.remove(&plan.id);
                completions.push(result);
            }
        }

        for result in completions {
            info!(
                session_id = %result.session_id,
                status = ?result.status,
                message = %result.message,
                "Session completed"
            );
            inner.notify(&result)?;
        }

        Ok(())
    }

    /// Poll one due session: timeout check first, then a rate-limited call
    /// to the travel-time source.
    async fn poll(inner: &Arc<Inner>, plan: &PollPlan) -> PollOutcome {
        if plan.expired {
            return PollOutcome::TimedOut;
        }

        inner.limiter.acquire().await;

        match inner
            .source
            .travel_time(plan.origin, plan.destination, Departure::Now)
            .await
        {
            Ok(Some(observed)) => PollOutcome::Observed(observed),
            Ok(None) => {
                warn!(session_id = %plan.id, "Could not get travel time");
                PollOutcome::NoResult
            }
            Err(e) if e.is_retryable() => {
                warn!(session_id = %plan.id, error = %e, "Travel time check failed, will retry");
                PollOutcome::NoResult
            }
            Err(e) => PollOutcome::Failed(e.to_string()),
        }
    }
}
