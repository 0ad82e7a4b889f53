//! Current-state folds over the log. None of this is stored anywhere; a
//! catalog is recomputed from the event sequence on every call, so it can
//! never go stale against an import or a historical clear.

use serde::Serialize;

use crate::domain::event::{EventKind, EventPayload};
use crate::store::{EventFilter, EventStore};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GymRecord {
    pub gym_id: String,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExerciseRecord {
    pub exercise_id: String,
    pub name: String,
    pub muscle_group: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemplateRecord {
    pub template_id: String,
    pub name: String,
    pub exercise_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanRecord {
    pub plan_id: String,
    pub name: String,
    pub exercise_ids: Vec<String>,
}

pub fn gyms(store: &EventStore) -> Vec<GymRecord> {
    store
        .query(&EventFilter::kind(EventKind::GymCreated))
        .filter_map(|event| match &event.payload {
            EventPayload::GymCreated {
                gym_id,
                name,
                location,
            } => Some(GymRecord {
                gym_id: gym_id.clone(),
                name: name.clone(),
                location: location.clone(),
            }),
            _ => None,
        })
        .collect()
}

pub fn exercises(store: &EventStore) -> Vec<ExerciseRecord> {
    store
        .query(&EventFilter::kind(EventKind::ExerciseCreated))
        .filter_map(|event| match &event.payload {
            EventPayload::ExerciseCreated {
                exercise_id,
                name,
                muscle_group,
            } => Some(ExerciseRecord {
                exercise_id: exercise_id.clone(),
                name: name.clone(),
                muscle_group: muscle_group.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Live templates: creations in append order with tombstones applied. A
/// deleted template drops out of the catalog; the sets logged under it are
/// untouched and stay queryable through the views.
pub fn templates(store: &EventStore) -> Vec<TemplateRecord> {
    let mut records: Vec<TemplateRecord> = Vec::new();
    for event in store.events() {
        match &event.payload {
            EventPayload::TemplateCreated {
                template_id,
                name,
                exercise_ids,
            } => {
                records.push(TemplateRecord {
                    template_id: template_id.clone(),
                    name: name.clone(),
                    exercise_ids: exercise_ids.clone(),
                });
            }
            EventPayload::TemplateDeleted { template_id } => {
                records.retain(|record| record.template_id != *template_id);
            }
            _ => {}
        }
    }
    records
}

pub fn plans(store: &EventStore) -> Vec<PlanRecord> {
    store
        .query(&EventFilter::kind(EventKind::PlanCreated))
        .filter_map(|event| match &event.payload {
            EventPayload::PlanCreated {
                plan_id,
                name,
                exercise_ids,
            } => Some(PlanRecord {
                plan_id: plan_id.clone(),
                name: name.clone(),
                exercise_ids: exercise_ids.clone(),
            }),
            _ => None,
        })
        .collect()
}
