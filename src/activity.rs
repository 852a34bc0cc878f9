//! Activity state machine
//!
//! Tracks whether the subject is active or resting and turns control calls
//! into edge-triggered session events. Calls that re-affirm the current
//! state (start while already in a session, pause while already resting)
//! change nothing and produce no event, so collaborators receive exactly one
//! notification per actual transition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{ActivityState, SessionEvent, SessionEventKind};

/// State machine behind the start/pause/resume/stop control surface.
///
/// A fresh session id is minted on every `start` edge and attached to all
/// events of that session.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    state: ActivityState,
    in_session: bool,
    session_id: Option<Uuid>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    /// Initial state: resting, no open session
    pub fn new() -> Self {
        Self {
            state: ActivityState::Resting,
            in_session: false,
            session_id: None,
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn is_in_session(&self) -> bool {
        self.in_session
    }

    /// Identity of the current (or most recently ended) session
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Open a session and go active. No effect while a session is open.
    pub fn start(&mut self, at: DateTime<Utc>) -> Option<SessionEvent> {
        if self.in_session {
            return None;
        }
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.in_session = true;
        self.state = ActivityState::Active;
        Some(SessionEvent {
            kind: SessionEventKind::SessionStarted,
            at,
            session_id,
        })
    }

    /// Begin a rest. No effect outside a session or while already resting.
    pub fn pause(&mut self, at: DateTime<Utc>) -> Option<SessionEvent> {
        if !self.in_session || self.state != ActivityState::Active {
            return None;
        }
        self.state = ActivityState::Resting;
        self.event(SessionEventKind::RestBegan, at)
    }

    /// End a rest and go active again. No effect outside a session or while
    /// already active.
    pub fn resume(&mut self, at: DateTime<Utc>) -> Option<SessionEvent> {
        if !self.in_session || self.state != ActivityState::Resting {
            return None;
        }
        self.state = ActivityState::Active;
        self.event(SessionEventKind::RestEnded, at)
    }

    /// Close the session and go resting. No effect without an open session.
    pub fn stop(&mut self, at: DateTime<Utc>) -> Option<SessionEvent> {
        if !self.in_session {
            return None;
        }
        self.in_session = false;
        self.state = ActivityState::Resting;
        self.event(SessionEventKind::SessionEnded, at)
    }

    /// Emergency notification for the current session. `None` when no
    /// session is open; an alert cannot belong to a session that does not
    /// exist.
    pub fn emergency(&self, at: DateTime<Utc>) -> Option<SessionEvent> {
        if !self.in_session {
            return None;
        }
        self.event(SessionEventKind::Emergency, at)
    }

    fn event(&self, kind: SessionEventKind, at: DateTime<Utc>) -> Option<SessionEvent> {
        self.session_id.map(|session_id| SessionEvent {
            kind,
            at,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_initial_state_is_resting() {
        let tracker = ActivityTracker::new();
        assert_eq!(tracker.state(), ActivityState::Resting);
        assert!(!tracker.is_in_session());
        assert!(tracker.session_id().is_none());
    }

    #[test]
    fn test_start_opens_session_and_goes_active() {
        let mut tracker = ActivityTracker::new();

        let event = tracker.start(now()).unwrap();
        assert_eq!(event.kind, SessionEventKind::SessionStarted);
        assert_eq!(tracker.state(), ActivityState::Active);
        assert!(tracker.is_in_session());
        assert_eq!(tracker.session_id(), Some(event.session_id));
    }

    #[test]
    fn test_repeated_start_produces_no_event() {
        let mut tracker = ActivityTracker::new();
        let first = tracker.start(now()).unwrap();

        assert!(tracker.start(now()).is_none());
        // Still the same session
        assert_eq!(tracker.session_id(), Some(first.session_id));
    }

    #[test]
    fn test_pause_resume_edges() {
        let mut tracker = ActivityTracker::new();
        tracker.start(now());

        let paused = tracker.pause(now()).unwrap();
        assert_eq!(paused.kind, SessionEventKind::RestBegan);
        assert_eq!(tracker.state(), ActivityState::Resting);

        // Re-affirming pause produces nothing
        assert!(tracker.pause(now()).is_none());

        let resumed = tracker.resume(now()).unwrap();
        assert_eq!(resumed.kind, SessionEventKind::RestEnded);
        assert_eq!(tracker.state(), ActivityState::Active);

        assert!(tracker.resume(now()).is_none());
    }

    #[test]
    fn test_controls_outside_session_do_nothing() {
        let mut tracker = ActivityTracker::new();

        assert!(tracker.pause(now()).is_none());
        assert!(tracker.resume(now()).is_none());
        assert!(tracker.stop(now()).is_none());
        assert_eq!(tracker.state(), ActivityState::Resting);
    }

    #[test]
    fn test_stop_closes_session_once() {
        let mut tracker = ActivityTracker::new();
        tracker.start(now());

        let stopped = tracker.stop(now()).unwrap();
        assert_eq!(stopped.kind, SessionEventKind::SessionEnded);
        assert_eq!(tracker.state(), ActivityState::Resting);
        assert!(!tracker.is_in_session());

        assert!(tracker.stop(now()).is_none());
    }

    #[test]
    fn test_sessions_get_fresh_ids() {
        let mut tracker = ActivityTracker::new();

        let first = tracker.start(now()).unwrap();
        tracker.stop(now());
        let second = tracker.start(now()).unwrap();

        assert_ne!(first.session_id, second.session_id);
    }

    #[test]
    fn test_events_within_session_share_the_id() {
        let mut tracker = ActivityTracker::new();

        let started = tracker.start(now()).unwrap();
        let paused = tracker.pause(now()).unwrap();
        let resumed = tracker.resume(now()).unwrap();
        let emergency = tracker.emergency(now()).unwrap();
        let stopped = tracker.stop(now()).unwrap();

        for event in [paused, resumed, emergency, stopped] {
            assert_eq!(event.session_id, started.session_id);
        }
    }

    #[test]
    fn test_emergency_requires_open_session() {
        let mut tracker = ActivityTracker::new();
        assert!(tracker.emergency(now()).is_none());

        tracker.start(now());
        tracker.stop(now());
        assert!(tracker.emergency(now()).is_none());
    }
}
