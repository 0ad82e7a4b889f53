use serde::Serialize;

use crate::store::EventStore;

use super::exercise_sessions;

/// One session's aggregates for an exercise, ready for charting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    /// Calendar date portion of the session start, `YYYY-MM-DD`.
    pub date: String,
    pub top_weight: f64,
    /// Sum of weight * reps across every set in the session.
    pub total_volume: f64,
}

/// Time-ordered per-session series for an exercise, oldest first. Always
/// recomputed from the current log, so it reflects a historical clear
/// immediately and keeps answering for exercises whose template was since
/// tombstoned.
pub fn exercise_series(store: &EventStore, exercise_id: &str) -> Vec<SessionSummary> {
    exercise_sessions(store, exercise_id)
        .into_iter()
        .map(|session| {
            let top_weight = session
                .sets
                .iter()
                .map(|set| set.weight)
                .fold(f64::MIN, f64::max);
            let total_volume = session
                .sets
                .iter()
                .map(|set| set.weight * f64::from(set.reps))
                .sum();
            SessionSummary {
                date: session.started_at.chars().take(10).collect(),
                session_id: session.session_id,
                top_weight,
                total_volume,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::exercise_series;
    use crate::domain::event::{Event, EventPayload};
    use crate::views::fixtures::{log_set, start_workout};
    use crate::store::EventStore;

    #[test]
    fn series_orders_sessions_and_sums_volume() {
        let mut store = EventStore::new();
        start_workout(&mut store, "w-2", "2026-03-10T18:00:00Z", "S-2", "G-1");
        log_set(&mut store, "s-3", "2026-03-10T18:05:00Z", "S-2", "E-1", 1, 100.0, 3);
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 80.0, 5);
        log_set(&mut store, "s-2", "2026-03-03T18:08:00Z", "S-1", "E-1", 2, 85.0, 3);

        let series = exercise_series(&store, "E-1");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].session_id, "S-1");
        assert_eq!(series[0].date, "2026-03-03");
        assert_eq!(series[0].top_weight, 85.0);
        assert_eq!(series[0].total_volume, 80.0 * 5.0 + 85.0 * 3.0);
        assert_eq!(series[1].session_id, "S-2");
        assert_eq!(series[1].total_volume, 300.0);
    }

    #[test]
    fn history_survives_a_template_tombstone() {
        let mut store = EventStore::new();
        store.append(Event::with_identity(
            "evt-t",
            "2026-03-01T09:00:00Z",
            EventPayload::TemplateCreated {
                template_id: "T-1".to_string(),
                name: "Push Day".to_string(),
                exercise_ids: vec!["E-1".to_string()],
            },
        ));
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 80.0, 5);
        store.append(Event::with_identity(
            "evt-d",
            "2026-03-04T09:00:00Z",
            EventPayload::TemplateDeleted {
                template_id: "T-1".to_string(),
            },
        ));

        let series = exercise_series(&store, "E-1");
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].top_weight, 80.0);
    }

    #[test]
    fn series_reflects_a_historical_clear_immediately() {
        let mut store = EventStore::new();
        store.append(Event::with_identity(
            "evt-e",
            "2026-03-01T09:00:00Z",
            EventPayload::ExerciseCreated {
                exercise_id: "E-1".to_string(),
                name: "Squat".to_string(),
                muscle_group: "legs".to_string(),
            },
        ));
        start_workout(&mut store, "w-1", "2026-03-03T18:00:00Z", "S-1", "G-1");
        log_set(&mut store, "s-1", "2026-03-03T18:05:00Z", "S-1", "E-1", 1, 80.0, 5);
        assert_eq!(exercise_series(&store, "E-1").len(), 1);

        store.clear_historical();
        assert!(exercise_series(&store, "E-1").is_empty());
    }
}
