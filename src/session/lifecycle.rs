//! Start/stop state machine over a user's sessions.
//!
//! There is no cached "current session": every operation receives the latest
//! snapshot from the store and derives [`Activity`] from it. A user is
//! `Active` exactly when the snapshot holds an open session.

use crate::error::{TrackerError, WriteAction};
use crate::session::models::{NewSession, Session, SessionPatch, UserId};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activity<'a> {
    Idle,
    Active(&'a Session),
}

impl Activity<'_> {
    pub fn is_active(&self) -> bool {
        matches!(self, Activity::Active(_))
    }
}

/// Derive the activity state from a snapshot.
///
/// If a cross-client race left several open sessions, the one that started
/// last is the active one.
pub fn activity(snapshot: &[Session]) -> Activity<'_> {
    let mut open = snapshot.iter().filter(|s| s.is_open());
    let Some(first) = open.next() else {
        return Activity::Idle;
    };

    let mut newest = first;
    let mut count = 1;
    for session in open {
        count += 1;
        if session.start_time > newest.start_time {
            newest = session;
        }
    }
    if count > 1 {
        warn!(open_sessions = count, active = %newest.id, "snapshot holds more than one open session");
    }
    Activity::Active(newest)
}

/// Whole minutes between two instants, rounded half up. Never negative.
pub fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - start).num_milliseconds().max(0);
    (millis + 30_000) / 60_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    Started(Session),
    /// Rejected: this session is still running.
    AlreadyActive(Session),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    Stopped(Session),
    NotActive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted { session: Session, was_active: bool },
    NotFound,
}

/// Proof that the user explicitly agreed to delete one specific session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    session_id: String,
}

impl DeleteConfirmation {
    /// Accepts only an affirmative answer (`y` or `yes`, any case).
    pub fn from_answer(session_id: &str, answer: &str) -> Option<Self> {
        let answer = answer.trim().to_ascii_lowercase();
        if answer == "y" || answer == "yes" {
            Some(Self::assume_yes(session_id))
        } else {
            None
        }
    }

    /// Confirmation given up front, e.g. through a `--yes` flag.
    pub fn assume_yes(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

pub struct SessionLifecycle<'a, S: SessionStore + ?Sized, C: Clock = SystemClock> {
    store: &'a S,
    user: &'a UserId,
    clock: C,
}

impl<'a, S: SessionStore + ?Sized> SessionLifecycle<'a, S, SystemClock> {
    pub fn new(store: &'a S, user: &'a UserId) -> Self {
        Self {
            store,
            user,
            clock: SystemClock,
        }
    }
}

impl<'a, S: SessionStore + ?Sized, C: Clock> SessionLifecycle<'a, S, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> SessionLifecycle<'a, S, C2> {
        SessionLifecycle {
            store: self.store,
            user: self.user,
            clock,
        }
    }

    /// Open a new session unless one is already running.
    pub fn start(&self, snapshot: &[Session], job_name: &str) -> Result<StartOutcome, TrackerError> {
        if let Activity::Active(current) = activity(snapshot) {
            debug!(session = %current.id, "start rejected, session already active");
            return Ok(StartOutcome::AlreadyActive(current.clone()));
        }

        let new_session = NewSession::open(self.clock.now(), job_name);
        let id = self
            .store
            .create(self.user, &new_session)
            .map_err(|e| TrackerError::write(WriteAction::Create, e))?;

        debug!(session = %id, job = %new_session.job_name, "session started");
        Ok(StartOutcome::Started(new_session.into_session(id)))
    }

    /// Close the active session, stamping its end time and rounded duration.
    pub fn stop(&self, snapshot: &[Session]) -> Result<StopOutcome, TrackerError> {
        let Activity::Active(current) = activity(snapshot) else {
            warn!(user = %self.user, "stop requested but no open session found");
            return Ok(StopOutcome::NotActive);
        };

        let now = self.clock.now();
        let patch = SessionPatch {
            end_time: now,
            duration_minutes: elapsed_minutes(current.start_time, now),
        };
        self.store
            .update(self.user, &current.id, &patch)
            .map_err(|e| TrackerError::write(WriteAction::Update, e))?;

        let mut stopped = current.clone();
        patch.apply(&mut stopped);
        debug!(session = %stopped.id, minutes = patch.duration_minutes, "session stopped");
        Ok(StopOutcome::Stopped(stopped))
    }

    /// Remove a session in any state. Deleting the running session leaves the user idle.
    pub fn delete(
        &self,
        snapshot: &[Session],
        confirmation: DeleteConfirmation,
    ) -> Result<DeleteOutcome, TrackerError> {
        let id = confirmation.session_id();
        let Some(target) = snapshot.iter().find(|s| s.id == id) else {
            return Ok(DeleteOutcome::NotFound);
        };

        let was_active = matches!(activity(snapshot), Activity::Active(s) if s.id == id);
        self.store
            .remove(self.user, id)
            .map_err(|e| TrackerError::write(WriteAction::Delete, e))?;

        debug!(session = %id, was_active, "session deleted");
        Ok(DeleteOutcome::Deleted {
            session: target.clone(),
            was_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn open(id: &str, start: &str) -> Session {
        Session {
            id: id.to_string(),
            start_time: at(start),
            end_time: None,
            duration_minutes: None,
            job_name: "Work".to_string(),
        }
    }

    #[test]
    fn test_elapsed_minutes_rounds_half_up() {
        let start = at("2026-10-12T09:00:00Z");
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(29)), 0);
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(30)), 1);
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(89)), 1);
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(90)), 2);
        assert_eq!(elapsed_minutes(start, start + Duration::minutes(90)), 90);
    }

    #[test]
    fn test_elapsed_minutes_clock_skew_is_zero() {
        let start = at("2026-10-12T09:00:00Z");
        assert_eq!(elapsed_minutes(start, start - Duration::minutes(5)), 0);
    }

    #[test]
    fn test_activity_idle_on_empty_snapshot() {
        assert_eq!(activity(&[]), Activity::Idle);
    }

    #[test]
    fn test_activity_picks_newest_open_session() {
        let snapshot = vec![
            open("older", "2026-10-12T08:00:00Z"),
            open("newer", "2026-10-12T10:00:00Z"),
        ];
        match activity(&snapshot) {
            Activity::Active(s) => assert_eq!(s.id, "newer"),
            Activity::Idle => panic!("expected active"),
        }
    }

    #[test]
    fn test_confirmation_requires_affirmative_answer() {
        assert!(DeleteConfirmation::from_answer("s1", "y").is_some());
        assert!(DeleteConfirmation::from_answer("s1", " YES \n").is_some());
        assert!(DeleteConfirmation::from_answer("s1", "").is_none());
        assert!(DeleteConfirmation::from_answer("s1", "n").is_none());
        assert!(DeleteConfirmation::from_answer("s1", "yep").is_none());
    }
}
