//! Read-side computations over the event log. Nothing here mutates the
//! store; every answer is recomputed from the current log state on demand.

pub mod analytics;
pub mod ghost;
pub mod notes;
pub mod warmup;

use crate::domain::event::{EventKind, EventPayload};
use crate::store::{EventFilter, EventStore};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SetRow {
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
    pub recorded_at: String,
}

/// One past session's sets for a single exercise, with enough context to
/// order sessions and restrict them by gym.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionHistory {
    pub session_id: String,
    pub started_at: String,
    pub gym_id: Option<String>,
    /// Append position of the session's first set, the tie-breaker when two
    /// sessions share a start timestamp.
    pub appended_order: usize,
    pub sets: Vec<SetRow>,
}

/// Groups `set.logged` events for an exercise by session, ascending by
/// `(started_at, appended_order)`. The session start falls back to the first
/// set's timestamp when no `workout.started` event exists.
pub(crate) fn exercise_sessions(store: &EventStore, exercise_id: &str) -> Vec<SessionHistory> {
    let filter = EventFilter {
        kind: Some(EventKind::SetLogged),
        entity_id: Some(exercise_id.to_string()),
        ..EventFilter::default()
    };

    let mut sessions: Vec<SessionHistory> = Vec::new();
    for (order, event) in store.query(&filter).enumerate() {
        if let EventPayload::SetLogged {
            session_id,
            set_number,
            weight,
            reps,
            ..
        } = &event.payload
        {
            let row = SetRow {
                set_number: *set_number,
                weight: *weight,
                reps: *reps,
                recorded_at: event.recorded_at.clone(),
            };
            match sessions
                .iter_mut()
                .find(|session| session.session_id == *session_id)
            {
                Some(session) => session.sets.push(row),
                None => {
                    let (started_at, gym_id) = session_start(store, session_id)
                        .map(|(at, gym)| (at, Some(gym)))
                        .unwrap_or_else(|| (event.recorded_at.clone(), None));
                    sessions.push(SessionHistory {
                        session_id: session_id.clone(),
                        started_at,
                        gym_id,
                        appended_order: order,
                        sets: vec![row],
                    });
                }
            }
        }
    }

    sessions.sort_by(|a, b| {
        (a.started_at.as_str(), a.appended_order).cmp(&(b.started_at.as_str(), b.appended_order))
    });
    sessions
}

/// Start timestamp and gym of a session, from its `workout.started` event.
pub(crate) fn session_start(store: &EventStore, session_id: &str) -> Option<(String, String)> {
    let filter = EventFilter {
        kind: Some(EventKind::WorkoutStarted),
        entity_id: Some(session_id.to_string()),
        ..EventFilter::default()
    };
    store.query(&filter).find_map(|event| {
        if let EventPayload::WorkoutStarted {
            session_id: started,
            gym_id,
            ..
        } = &event.payload
        {
            if started == session_id {
                return Some((event.recorded_at.clone(), gym_id.clone()));
            }
        }
        None
    })
}
