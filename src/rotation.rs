//! Cyclic workout-plan scheduling. The "current rotation" is never held as
//! mutable state; it is folded from the log on every query, so clearing
//! history or importing a backup can never leave a stale pointer behind.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::event::{EventKind, EventPayload};
use crate::store::{EventFilter, EventStore};

/// Folded state of the active rotation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RotationState {
    pub rotation_id: String,
    pub name: String,
    pub plan_sequence: Vec<String>,
    pub current_index: u32,
}

impl RotationState {
    pub fn current_plan(&self) -> &str {
        &self.plan_sequence[self.current_index as usize]
    }

    /// One-based `(position, total)` pair for display.
    pub fn position(&self) -> (u32, u32) {
        (self.current_index + 1, self.plan_sequence.len() as u32)
    }
}

/// Answer for the host's rotation query surface.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RotationStatus {
    pub rotation_id: String,
    pub name: String,
    pub plan_id: String,
    pub position: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gym_id: Option<String>,
}

/// Folds the log into the currently active rotation, if any. Activation
/// resets the index to 0; `rotation.advanced` events appended afterwards
/// move it. A definition with an empty plan list can never become active
/// state, so `current_plan` stays in bounds.
pub fn active_rotation(store: &EventStore) -> Option<RotationState> {
    let mut definitions: HashMap<&str, (&str, &[String])> = HashMap::new();
    let mut active: Option<&str> = None;
    let mut index: u32 = 0;

    for event in store.events() {
        match &event.payload {
            EventPayload::RotationCreated {
                rotation_id,
                name,
                plan_ids,
            } => {
                definitions.insert(rotation_id, (name, plan_ids));
            }
            EventPayload::RotationActivated { rotation_id } => {
                active = Some(rotation_id);
                index = 0;
            }
            EventPayload::RotationAdvanced {
                rotation_id,
                current_index,
            } => {
                if active == Some(rotation_id.as_str()) {
                    index = *current_index;
                }
            }
            _ => {}
        }
    }

    let rotation_id = active?;
    let (name, plan_ids) = definitions.get(rotation_id)?;
    if plan_ids.is_empty() {
        return None;
    }
    Some(RotationState {
        rotation_id: rotation_id.to_string(),
        name: (*name).to_string(),
        plan_sequence: plan_ids.to_vec(),
        current_index: index % plan_ids.len() as u32,
    })
}

/// Decides whether a finished-and-saved session advances the active
/// rotation. Returns the `rotation.advanced` payload to append, or `None`
/// when the session does not complete the rotation's current plan. The
/// caller appends; this function never mutates the log.
pub fn advancement_for(store: &EventStore, session_id: &str) -> Option<EventPayload> {
    let rotation = active_rotation(store)?;

    let session_plan = session_plan_id(store, session_id)?;
    if session_plan != rotation.current_plan() {
        return None;
    }
    if !session_has_kind(store, session_id, EventKind::WorkoutFinished)
        || !session_has_kind(store, session_id, EventKind::WorkoutSaved)
    {
        return None;
    }

    let next = (rotation.current_index + 1) % rotation.plan_sequence.len() as u32;
    Some(EventPayload::RotationAdvanced {
        rotation_id: rotation.rotation_id,
        current_index: next,
    })
}

/// Rotation state plus the gym to suggest alongside it. An explicitly
/// configured gym wins; otherwise the gym of the most recently started
/// workout stands in.
pub fn rotation_status(store: &EventStore, configured_gym: Option<&str>) -> Option<RotationStatus> {
    let rotation = active_rotation(store)?;
    let gym_id = configured_gym
        .map(str::to_string)
        .or_else(|| latest_gym(store));
    let (position, total) = rotation.position();
    Some(RotationStatus {
        plan_id: rotation.current_plan().to_string(),
        rotation_id: rotation.rotation_id,
        name: rotation.name,
        position,
        total,
        gym_id,
    })
}

fn session_plan_id(store: &EventStore, session_id: &str) -> Option<String> {
    store
        .query(&EventFilter::entity(session_id))
        .find_map(|event| match &event.payload {
            EventPayload::WorkoutStarted {
                session_id: started,
                plan_id,
                ..
            } if started == session_id => plan_id.clone(),
            _ => None,
        })
}

fn session_has_kind(store: &EventStore, session_id: &str, kind: EventKind) -> bool {
    let filter = EventFilter {
        kind: Some(kind),
        entity_id: Some(session_id.to_string()),
        ..EventFilter::default()
    };
    store.query(&filter).next().is_some()
}

fn latest_gym(store: &EventStore) -> Option<String> {
    let mut best: Option<(&str, &str)> = None;
    let filter = EventFilter::kind(EventKind::WorkoutStarted);
    for event in store.query(&filter) {
        if let EventPayload::WorkoutStarted { gym_id, .. } = &event.payload {
            // RFC3339 UTC strings compare lexicographically; ties go to the
            // later append.
            if best.map_or(true, |(at, _)| event.recorded_at.as_str() >= at) {
                best = Some((&event.recorded_at, gym_id));
            }
        }
    }
    best.map(|(_, gym)| gym.to_string())
}

#[cfg(test)]
mod tests {
    use super::{active_rotation, advancement_for, rotation_status};
    use crate::domain::event::{Event, EventPayload};
    use crate::store::EventStore;

    fn seed_rotation(store: &mut EventStore, rotation_id: &str, plans: &[&str]) {
        store.append(Event::with_identity(
            format!("create-{rotation_id}"),
            "2026-03-01T09:00:00Z",
            EventPayload::RotationCreated {
                rotation_id: rotation_id.to_string(),
                name: format!("{rotation_id} block"),
                plan_ids: plans.iter().map(|p| (*p).to_string()).collect(),
            },
        ));
        store.append(Event::with_identity(
            format!("activate-{rotation_id}"),
            "2026-03-01T09:01:00Z",
            EventPayload::RotationActivated {
                rotation_id: rotation_id.to_string(),
            },
        ));
    }

    fn complete_session(store: &mut EventStore, session_id: &str, plan_id: &str, at: &str) {
        store.append(Event::with_identity(
            format!("start-{session_id}"),
            at,
            EventPayload::WorkoutStarted {
                session_id: session_id.to_string(),
                gym_id: "G-1".to_string(),
                plan_id: Some(plan_id.to_string()),
                template_id: None,
            },
        ));
        store.append(Event::with_identity(
            format!("finish-{session_id}"),
            at,
            EventPayload::WorkoutFinished {
                session_id: session_id.to_string(),
            },
        ));
        store.append(Event::with_identity(
            format!("save-{session_id}"),
            at,
            EventPayload::WorkoutSaved {
                session_id: session_id.to_string(),
            },
        ));
    }

    fn advance(store: &mut EventStore, session_id: &str) {
        let payload = advancement_for(store, session_id).expect("session should advance");
        store.append(Event::new(payload));
    }

    #[test]
    fn activation_starts_at_the_first_plan() {
        let mut store = EventStore::new();
        seed_rotation(&mut store, "R-1", &["P-1", "P-2"]);

        let rotation = active_rotation(&store).expect("rotation is active");
        assert_eq!(rotation.current_plan(), "P-1");
        assert_eq!(rotation.position(), (1, 2));
    }

    #[test]
    fn completed_workouts_advance_and_wrap() {
        let mut store = EventStore::new();
        seed_rotation(&mut store, "R-1", &["P-1", "P-2"]);

        complete_session(&mut store, "S-1", "P-1", "2026-03-02T18:00:00Z");
        advance(&mut store, "S-1");
        let rotation = active_rotation(&store).expect("rotation is active");
        assert_eq!(rotation.current_index, 1);
        assert_eq!(rotation.current_plan(), "P-2");

        complete_session(&mut store, "S-2", "P-2", "2026-03-04T18:00:00Z");
        advance(&mut store, "S-2");
        let rotation = active_rotation(&store).expect("rotation is active");
        assert_eq!(rotation.current_index, 0);
        assert_eq!(rotation.current_plan(), "P-1");
    }

    #[test]
    fn off_plan_or_unsaved_sessions_do_not_advance() {
        let mut store = EventStore::new();
        seed_rotation(&mut store, "R-1", &["P-1", "P-2"]);

        // Wrong plan.
        complete_session(&mut store, "S-1", "P-2", "2026-03-02T18:00:00Z");
        assert!(advancement_for(&store, "S-1").is_none());

        // Right plan, finished but never saved.
        store.append(Event::with_identity(
            "start-S-2",
            "2026-03-03T18:00:00Z",
            EventPayload::WorkoutStarted {
                session_id: "S-2".to_string(),
                gym_id: "G-1".to_string(),
                plan_id: Some("P-1".to_string()),
                template_id: None,
            },
        ));
        store.append(Event::with_identity(
            "finish-S-2",
            "2026-03-03T19:00:00Z",
            EventPayload::WorkoutFinished {
                session_id: "S-2".to_string(),
            },
        ));
        assert!(advancement_for(&store, "S-2").is_none());

        // No plan at all.
        store.append(Event::with_identity(
            "start-S-3",
            "2026-03-04T18:00:00Z",
            EventPayload::WorkoutStarted {
                session_id: "S-3".to_string(),
                gym_id: "G-1".to_string(),
                plan_id: None,
                template_id: None,
            },
        ));
        assert!(advancement_for(&store, "S-3").is_none());
    }

    #[test]
    fn activating_a_new_rotation_resets_position_and_keeps_history() {
        let mut store = EventStore::new();
        seed_rotation(&mut store, "R-1", &["P-1", "P-2"]);
        complete_session(&mut store, "S-1", "P-1", "2026-03-02T18:00:00Z");
        advance(&mut store, "S-1");

        seed_rotation(&mut store, "R-2", &["P-3"]);
        let rotation = active_rotation(&store).expect("rotation is active");
        assert_eq!(rotation.rotation_id, "R-2");
        assert_eq!(rotation.current_index, 0);
        // The old rotation's definition events are still in the log.
        assert!(store.events().iter().any(|event| {
            matches!(
                &event.payload,
                EventPayload::RotationCreated { rotation_id, .. } if rotation_id == "R-1"
            )
        }));
    }

    #[test]
    fn status_reports_plan_position_and_gym_fallback() {
        let mut store = EventStore::new();
        seed_rotation(&mut store, "R-1", &["P-1", "P-2"]);
        assert_eq!(
            rotation_status(&store, None).expect("rotation is active").gym_id,
            None
        );

        complete_session(&mut store, "S-1", "P-1", "2026-03-02T18:00:00Z");
        let status = rotation_status(&store, None).expect("rotation is active");
        assert_eq!(status.plan_id, "P-1");
        assert_eq!((status.position, status.total), (1, 2));
        assert_eq!(status.gym_id.as_deref(), Some("G-1"));

        let configured = rotation_status(&store, Some("G-9")).expect("rotation is active");
        assert_eq!(configured.gym_id.as_deref(), Some("G-9"));
    }

    #[test]
    fn no_active_rotation_yields_none() {
        let mut store = EventStore::new();
        assert!(active_rotation(&store).is_none());
        store.append(Event::with_identity(
            "create-R-1",
            "2026-03-01T09:00:00Z",
            EventPayload::RotationCreated {
                rotation_id: "R-1".to_string(),
                name: "R-1 block".to_string(),
                plan_ids: vec!["P-1".to_string()],
            },
        ));
        // Defined but never activated.
        assert!(active_rotation(&store).is_none());
    }
}
