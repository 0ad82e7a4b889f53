use std::fmt;

use log::info;
use serde::Serialize;

use crate::domain::event::Event;
use crate::store::{Appended, EventStore};

/// Result of merging a foreign event sequence into the local store.
/// `imported + skipped` always equals the number of events offered.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: u64,
    pub skipped: u64,
}

impl ImportReport {
    pub fn total(&self) -> u64 {
        self.imported + self.skipped
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} events ({} duplicates skipped)",
            self.imported, self.skipped
        )
    }
}

/// Applies events in input order; identity collisions are absorbed into the
/// skipped tally rather than surfaced as errors. Appends are individual, so
/// an interrupted caller still holds an exact tally for everything offered
/// so far.
pub fn import_events(
    store: &mut EventStore,
    events: impl IntoIterator<Item = Event>,
) -> ImportReport {
    let mut report = ImportReport::default();
    for event in events {
        match store.append(event) {
            Appended::Inserted => report.imported += 1,
            Appended::Duplicate => report.skipped += 1,
        }
    }
    info!(
        "import merged {} events ({} imported, {} skipped)",
        report.total(),
        report.imported,
        report.skipped
    );
    report
}

#[cfg(test)]
mod tests {
    use super::import_events;
    use crate::domain::event::{Event, EventPayload};
    use crate::store::EventStore;

    fn session_event(event_id: &str, session: &str) -> Event {
        Event::with_identity(
            event_id,
            "2026-03-02T18:00:00Z",
            EventPayload::WorkoutFinished {
                session_id: session.to_string(),
            },
        )
    }

    #[test]
    fn import_into_empty_store_takes_everything_in_order() {
        let mut store = EventStore::new();
        let batch = vec![
            session_event("evt-1", "S-1"),
            session_event("evt-2", "S-2"),
            session_event("evt-3", "S-3"),
        ];
        let report = import_events(&mut store, batch.clone());
        assert_eq!(report.imported, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.events(), batch.as_slice());
    }

    #[test]
    fn re_import_of_the_same_batch_is_idempotent() {
        let mut store = EventStore::new();
        let batch = vec![session_event("evt-1", "S-1"), session_event("evt-2", "S-2")];
        import_events(&mut store, batch.clone());

        let second = import_events(&mut store, batch);
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn partial_overlap_counts_sum_to_the_input_length() {
        let mut store = EventStore::new();
        import_events(
            &mut store,
            vec![session_event("evt-1", "S-1"), session_event("evt-2", "S-2")],
        );

        let batch = vec![
            session_event("evt-2", "S-2"),
            session_event("evt-3", "S-3"),
            session_event("evt-4", "S-4"),
        ];
        let input_len = batch.len() as u64;
        let report = import_events(&mut store, batch);
        assert_eq!(report.imported, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total(), input_len);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn report_renders_the_user_facing_line() {
        let report = super::ImportReport {
            imported: 12,
            skipped: 3,
        };
        assert_eq!(
            report.to_string(),
            "Imported 12 events (3 duplicates skipped)"
        );
    }
}
