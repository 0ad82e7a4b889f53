use serde::Serialize;

use crate::domain::event::{EventKind, EventPayload};
use crate::store::{EventFilter, EventStore};

/// One `exercise.note_logged` fact, full text, no truncation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NoteEntry {
    pub session_id: String,
    pub logged_at: String,
    pub text: String,
}

/// All notes for an exercise across past sessions, newest first.
pub fn note_history(store: &EventStore, exercise_id: &str) -> Vec<NoteEntry> {
    let filter = EventFilter {
        kind: Some(EventKind::ExerciseNoteLogged),
        entity_id: Some(exercise_id.to_string()),
        ..EventFilter::default()
    };
    let mut notes: Vec<NoteEntry> = store
        .query(&filter)
        .filter_map(|event| {
            if let EventPayload::ExerciseNoteLogged {
                session_id, text, ..
            } = &event.payload
            {
                Some(NoteEntry {
                    session_id: session_id.clone(),
                    logged_at: event.recorded_at.clone(),
                    text: text.clone(),
                })
            } else {
                None
            }
        })
        .collect();
    notes.reverse();
    notes
}
