use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::domain::models::{StationStatus, Verdict};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Rising-edge detector over successive availability observations.
///
/// An unknown previous value counts as "not available", so the first `true`
/// ever observed fires.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityEdge {
    last_available: Option<bool>,
}

impl AvailabilityEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, available: bool) -> bool {
        let rising = available && self.last_available != Some(true);
        self.last_available = Some(available);
        rising
    }

    pub fn last_available(&self) -> Option<bool> {
        self.last_available
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionDecision {
    pub should_notify: bool,
    pub status: StationStatus,
}

#[derive(Debug, Default)]
struct TrackerState {
    status: StationStatus,
    edge: AvailabilityEdge,
}

pub struct StatusTracker<Cl = SystemClock> {
    clock: Cl,
    state: Mutex<TrackerState>,
}

impl StatusTracker<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for StatusTracker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cl: Clock> StatusTracker<Cl> {
    pub fn with_clock(clock: Cl) -> Self {
        Self {
            clock,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn apply_verdict(&self, verdict: &Verdict) -> TransitionDecision {
        let mut state = self.lock_state();
        let checked_at = self.clock.now();

        let should_notify = state.edge.observe(verdict.available);
        state.status = StationStatus {
            available: verdict.available,
            last_update_time: verdict.update_time.clone(),
            last_check: Some(checked_at),
            error: verdict.error.clone(),
        };

        TransitionDecision {
            should_notify,
            status: state.status.clone(),
        }
    }

    pub fn snapshot(&self) -> StationStatus {
        self.lock_state().status.clone()
    }

    // A poisoned lock still holds a whole record: every write replaces the
    // status in one assignment after the edge update.
    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
