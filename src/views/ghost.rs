use serde::{Deserialize, Serialize};

use crate::store::EventStore;

use super::exercise_sessions;

/// How to choose the "most recent" session when two share a start
/// timestamp. The observed behavior does not pin this down, so it is a
/// configuration knob rather than a hard-coded rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The session appended later to the log wins.
    #[default]
    LaterAppend,
    /// The session appended earlier to the log wins.
    EarlierAppend,
}

/// Placeholder values for one input row of the active session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GhostSet {
    pub set_number: u32,
    pub weight: f64,
    pub reps: u32,
}

/// The previous session's sets, offered as pre-fill suggestions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GhostSession {
    pub session_id: String,
    pub started_at: String,
    pub sets: Vec<GhostSet>,
}

/// Most recent prior session for `exercise_id` at `gym_id`, excluding the
/// active session. `None` means no history — the caller shows a first-time
/// hint instead of numbers. When a set number was logged more than once in
/// that session, the last logged values win.
pub fn ghost_for(
    store: &EventStore,
    exercise_id: &str,
    gym_id: &str,
    exclude_session: Option<&str>,
    tie_break: TieBreak,
) -> Option<GhostSession> {
    let candidates: Vec<_> = exercise_sessions(store, exercise_id)
        .into_iter()
        .filter(|session| session.gym_id.as_deref() == Some(gym_id))
        .filter(|session| Some(session.session_id.as_str()) != exclude_session)
        .collect();

    let latest_start = candidates
        .iter()
        .map(|session| session.started_at.clone())
        .max()?;
    let session = match tie_break {
        TieBreak::LaterAppend => candidates
            .into_iter()
            .rev()
            .find(|session| session.started_at == latest_start)?,
        TieBreak::EarlierAppend => candidates
            .into_iter()
            .find(|session| session.started_at == latest_start)?,
    };

    let mut sets: Vec<GhostSet> = Vec::new();
    for row in &session.sets {
        let ghost = GhostSet {
            set_number: row.set_number,
            weight: row.weight,
            reps: row.reps,
        };
        match sets.iter_mut().find(|s| s.set_number == row.set_number) {
            Some(existing) => *existing = ghost,
            None => sets.push(ghost),
        }
    }
    sets.sort_by_key(|set| set.set_number);

    Some(GhostSession {
        session_id: session.session_id,
        started_at: session.started_at,
        sets,
    })
}

#[cfg(test)]
mod tests {
    use super::{ghost_for, TieBreak};
    use crate::views::fixtures::{log_set, start_workout};
    use crate::store::EventStore;

    fn two_session_store() -> EventStore {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 80.0, 5);
        start_workout(&mut store, "w-2", "2026-03-10T18:00:00Z", "S-2", "G-1");
        log_set(&mut store, "s-2", "2026-03-10T18:05:00Z", "S-2", "E-1", 1, 95.0, 5);
        store
    }

    #[test]
    fn ghost_prefers_the_most_recent_session() {
        let store = two_session_store();
        let ghost = ghost_for(&store, "E-1", "G-1", None, TieBreak::LaterAppend)
            .expect("history exists");
        assert_eq!(ghost.session_id, "S-2");
        assert_eq!(ghost.sets.len(), 1);
        assert_eq!(ghost.sets[0].weight, 95.0);
    }

    #[test]
    fn ghost_is_restricted_to_the_requested_gym() {
        let mut store = two_session_store();
        // A newer session at another gym must not shadow G-1 history.
        start_workout(&mut store, "w-3", "2026-03-12T18:00:00Z", "S-3", "G-2");
        log_set(&mut store, "s-3", "2026-03-12T18:05:00Z", "S-3", "E-1", 1, 100.0, 5);

        let ghost = ghost_for(&store, "E-1", "G-1", None, TieBreak::LaterAppend)
            .expect("history exists");
        assert_eq!(ghost.session_id, "S-2");

        assert!(ghost_for(&store, "E-1", "G-3", None, TieBreak::LaterAppend).is_none());
    }

    #[test]
    fn active_session_is_excluded_from_its_own_ghost() {
        let mut store = two_session_store();
        start_workout(&mut store, "w-3", "2026-03-12T18:00:00Z", "S-3", "G-1");
        log_set(&mut store, "s-3", "2026-03-12T18:05:00Z", "S-3", "E-1", 1, 97.5, 3);

        let ghost = ghost_for(&store, "E-1", "G-1", Some("S-3"), TieBreak::LaterAppend)
            .expect("history exists");
        assert_eq!(ghost.session_id, "S-2");
    }

    #[test]
    fn no_prior_session_yields_none() {
        let store = EventStore::new();
        assert!(ghost_for(&store, "E-1", "G-1", None, TieBreak::LaterAppend).is_none());
    }

    #[test]
    fn equal_timestamps_resolve_by_the_configured_tie_break() {
        let mut store = EventStore::new();
        let same_stamp = "2026-03-03T18:00:00Z";
        start_workout(&mut store, "w-1", same_stamp, "S-1", "G-1");
        log_set(&mut store, "s-1", same_stamp, "S-1", "E-1", 1, 80.0, 5);
        start_workout(&mut store, "w-2", same_stamp, "S-2", "G-1");
        log_set(&mut store, "s-2", same_stamp, "S-2", "E-1", 1, 90.0, 5);

        let later = ghost_for(&store, "E-1", "G-1", None, TieBreak::LaterAppend)
            .expect("history exists");
        assert_eq!(later.session_id, "S-2");

        let earlier = ghost_for(&store, "E-1", "G-1", None, TieBreak::EarlierAppend)
            .expect("history exists");
        assert_eq!(earlier.session_id, "S-1");
    }

    #[test]
    fn relogged_set_numbers_keep_the_last_values() {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 80.0, 5);
        log_set(&mut store, "s-2", "2026-03-03T18:06:00Z", "S-1", "E-1", 1, 82.5, 5);
        log_set(&mut store, "s-3", "2026-03-03T18:09:00Z", "S-1", "E-1", 2, 85.0, 3);

        let ghost = ghost_for(&store, "E-1", "G-1", None, TieBreak::LaterAppend)
            .expect("history exists");
        assert_eq!(ghost.sets.len(), 2);
        assert_eq!(ghost.sets[0].set_number, 1);
        assert_eq!(ghost.sets[0].weight, 82.5);
        assert_eq!(ghost.sets[1].set_number, 2);
    }
}
