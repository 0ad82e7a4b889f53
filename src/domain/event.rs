use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of facts the log can record. Adding a variant is a schema
/// change and must bump the backup format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GymCreated,
    ExerciseCreated,
    TemplateCreated,
    TemplateDeleted,
    PlanCreated,
    RotationCreated,
    RotationActivated,
    RotationAdvanced,
    WorkoutStarted,
    WorkoutFinished,
    WorkoutSaved,
    SetLogged,
    ExerciseNoteLogged,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::GymCreated,
        EventKind::ExerciseCreated,
        EventKind::TemplateCreated,
        EventKind::TemplateDeleted,
        EventKind::PlanCreated,
        EventKind::RotationCreated,
        EventKind::RotationActivated,
        EventKind::RotationAdvanced,
        EventKind::WorkoutStarted,
        EventKind::WorkoutFinished,
        EventKind::WorkoutSaved,
        EventKind::SetLogged,
        EventKind::ExerciseNoteLogged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::GymCreated => "gym.created",
            EventKind::ExerciseCreated => "exercise.created",
            EventKind::TemplateCreated => "template.created",
            EventKind::TemplateDeleted => "template.deleted",
            EventKind::PlanCreated => "plan.created",
            EventKind::RotationCreated => "rotation.created",
            EventKind::RotationActivated => "rotation.activated",
            EventKind::RotationAdvanced => "rotation.advanced",
            EventKind::WorkoutStarted => "workout.started",
            EventKind::WorkoutFinished => "workout.finished",
            EventKind::WorkoutSaved => "workout.saved",
            EventKind::SetLogged => "set.logged",
            EventKind::ExerciseNoteLogged => "exercise.note_logged",
        }
    }

    pub fn parse(value: &str) -> Option<EventKind> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
    }

    /// Stable wire tag used by the binary backup format.
    pub fn code(self) -> u8 {
        match self {
            EventKind::GymCreated => 1,
            EventKind::ExerciseCreated => 2,
            EventKind::TemplateCreated => 3,
            EventKind::TemplateDeleted => 4,
            EventKind::PlanCreated => 5,
            EventKind::RotationCreated => 6,
            EventKind::RotationActivated => 7,
            EventKind::RotationAdvanced => 8,
            EventKind::WorkoutStarted => 9,
            EventKind::WorkoutFinished => 10,
            EventKind::WorkoutSaved => 11,
            EventKind::SetLogged => 12,
            EventKind::ExerciseNoteLogged => 13,
        }
    }

    pub fn from_code(code: u8) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Identity-defining kinds survive `clear_historical`.
    pub fn is_identity(self) -> bool {
        matches!(self, EventKind::GymCreated | EventKind::ExerciseCreated)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    #[serde(rename = "gym.created")]
    GymCreated {
        gym_id: String,
        name: String,
        location: String,
    },
    #[serde(rename = "exercise.created")]
    ExerciseCreated {
        exercise_id: String,
        name: String,
        muscle_group: String,
    },
    #[serde(rename = "template.created")]
    TemplateCreated {
        template_id: String,
        name: String,
        exercise_ids: Vec<String>,
    },
    #[serde(rename = "template.deleted")]
    TemplateDeleted { template_id: String },
    #[serde(rename = "plan.created")]
    PlanCreated {
        plan_id: String,
        name: String,
        exercise_ids: Vec<String>,
    },
    #[serde(rename = "rotation.created")]
    RotationCreated {
        rotation_id: String,
        name: String,
        plan_ids: Vec<String>,
    },
    #[serde(rename = "rotation.activated")]
    RotationActivated { rotation_id: String },
    #[serde(rename = "rotation.advanced")]
    RotationAdvanced {
        rotation_id: String,
        current_index: u32,
    },
    #[serde(rename = "workout.started")]
    WorkoutStarted {
        session_id: String,
        gym_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        plan_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        template_id: Option<String>,
    },
    #[serde(rename = "workout.finished")]
    WorkoutFinished { session_id: String },
    #[serde(rename = "workout.saved")]
    WorkoutSaved { session_id: String },
    #[serde(rename = "set.logged")]
    SetLogged {
        session_id: String,
        exercise_id: String,
        set_number: u32,
        weight: f64,
        reps: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        rir: Option<u32>,
    },
    #[serde(rename = "exercise.note_logged")]
    ExerciseNoteLogged {
        exercise_id: String,
        session_id: String,
        text: String,
    },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::GymCreated { .. } => EventKind::GymCreated,
            EventPayload::ExerciseCreated { .. } => EventKind::ExerciseCreated,
            EventPayload::TemplateCreated { .. } => EventKind::TemplateCreated,
            EventPayload::TemplateDeleted { .. } => EventKind::TemplateDeleted,
            EventPayload::PlanCreated { .. } => EventKind::PlanCreated,
            EventPayload::RotationCreated { .. } => EventKind::RotationCreated,
            EventPayload::RotationActivated { .. } => EventKind::RotationActivated,
            EventPayload::RotationAdvanced { .. } => EventKind::RotationAdvanced,
            EventPayload::WorkoutStarted { .. } => EventKind::WorkoutStarted,
            EventPayload::WorkoutFinished { .. } => EventKind::WorkoutFinished,
            EventPayload::WorkoutSaved { .. } => EventKind::WorkoutSaved,
            EventPayload::SetLogged { .. } => EventKind::SetLogged,
            EventPayload::ExerciseNoteLogged { .. } => EventKind::ExerciseNoteLogged,
        }
    }

    /// Every entity id this payload references, used for the store's entity
    /// index. Session ids count as entities so session history scans stay
    /// index-backed.
    pub fn entity_refs(&self) -> Vec<&str> {
        match self {
            EventPayload::GymCreated { gym_id, .. } => vec![gym_id],
            EventPayload::ExerciseCreated { exercise_id, .. } => vec![exercise_id],
            EventPayload::TemplateCreated {
                template_id,
                exercise_ids,
                ..
            } => {
                let mut refs: Vec<&str> = vec![template_id];
                refs.extend(exercise_ids.iter().map(String::as_str));
                refs
            }
            EventPayload::TemplateDeleted { template_id } => vec![template_id],
            EventPayload::PlanCreated {
                plan_id,
                exercise_ids,
                ..
            } => {
                let mut refs: Vec<&str> = vec![plan_id];
                refs.extend(exercise_ids.iter().map(String::as_str));
                refs
            }
            EventPayload::RotationCreated {
                rotation_id,
                plan_ids,
                ..
            } => {
                let mut refs: Vec<&str> = vec![rotation_id];
                refs.extend(plan_ids.iter().map(String::as_str));
                refs
            }
            EventPayload::RotationActivated { rotation_id } => vec![rotation_id],
            EventPayload::RotationAdvanced { rotation_id, .. } => vec![rotation_id],
            EventPayload::WorkoutStarted {
                session_id,
                gym_id,
                plan_id,
                template_id,
            } => {
                let mut refs: Vec<&str> = vec![session_id, gym_id];
                if let Some(plan) = plan_id {
                    refs.push(plan);
                }
                if let Some(template) = template_id {
                    refs.push(template);
                }
                refs
            }
            EventPayload::WorkoutFinished { session_id } => vec![session_id],
            EventPayload::WorkoutSaved { session_id } => vec![session_id],
            EventPayload::SetLogged {
                session_id,
                exercise_id,
                ..
            } => vec![session_id, exercise_id],
            EventPayload::ExerciseNoteLogged {
                exercise_id,
                session_id,
                ..
            } => vec![exercise_id, session_id],
        }
    }
}

/// One immutable fact in the log. Never mutated after append; ordering is
/// the append sequence held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub recorded_at: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self::with_identity(new_event_id(), now_utc_rfc3339(), payload)
    }

    pub fn with_identity(
        event_id: impl Into<String>,
        recorded_at: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            recorded_at: recorded_at.into(),
            payload,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn is_identity(&self) -> bool {
        self.kind().is_identity()
    }
}

pub fn new_event_id() -> String {
    Uuid::now_v7().to_string()
}

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}
