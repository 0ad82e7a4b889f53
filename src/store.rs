use std::collections::HashMap;

use crate::domain::event::{Event, EventKind};

/// Outcome of an append. A duplicate id is a counted no-op, not a failure:
/// the log already holds that fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appended {
    Inserted,
    Duplicate,
}

/// Predicate for [`EventStore::query`]. All bounds are inclusive; timestamps
/// are RFC3339 UTC strings, which order lexicographically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub entity_id: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
}

impl EventFilter {
    pub fn kind(kind: EventKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn entity(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..Self::default()
        }
    }

    fn matches(&self, event: &Event) -> bool {
        if let Some(kind) = self.kind {
            if event.kind() != kind {
                return false;
            }
        }
        if let Some(entity) = self.entity_id.as_deref() {
            if !event.payload.entity_refs().contains(&entity) {
                return false;
            }
        }
        if let Some(since) = self.since.as_deref() {
            if event.recorded_at.as_str() < since {
                return false;
            }
        }
        if let Some(until) = self.until.as_deref() {
            if event.recorded_at.as_str() > until {
                return false;
            }
        }
        true
    }
}

/// The single source of truth: an append-only, identity-indexed, append-ordered
/// event log held in memory. Durability is the checkpoint layer's job.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
    by_id: HashMap<String, usize>,
    by_kind: HashMap<EventKind, Vec<usize>>,
    by_entity: HashMap<String, Vec<usize>>,
    generation: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the event at the tail unless its id is already present.
    pub fn append(&mut self, event: Event) -> Appended {
        if self.by_id.contains_key(&event.event_id) {
            return Appended::Duplicate;
        }
        let position = self.events.len();
        self.index_event(&event, position);
        self.events.push(event);
        Appended::Inserted
    }

    fn index_event(&mut self, event: &Event, position: usize) {
        self.by_id.insert(event.event_id.clone(), position);
        self.by_kind.entry(event.kind()).or_default().push(position);
        for entity in event.payload.entity_refs() {
            self.by_entity
                .entry(entity.to_string())
                .or_default()
                .push(position);
        }
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.by_id.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count_by_kind(&self, kind: EventKind) -> usize {
        self.by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// Per-kind counts in declaration order, for diagnostics output.
    pub fn counts_by_kind(&self) -> Vec<(EventKind, usize)> {
        EventKind::ALL
            .into_iter()
            .map(|kind| (kind, self.count_by_kind(kind)))
            .collect()
    }

    /// All events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Lazy scan in append order. Picks the narrowest index the filter
    /// allows; the iterator borrows the store and can be restarted by
    /// calling `query` again.
    pub fn query<'a>(&'a self, filter: &'a EventFilter) -> QueryIter<'a> {
        let cursor = if let Some(entity) = filter.entity_id.as_deref() {
            let positions = self
                .by_entity
                .get(entity)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            Cursor::Indexed(positions.iter())
        } else if let Some(kind) = filter.kind {
            let positions = self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
            Cursor::Indexed(positions.iter())
        } else {
            Cursor::All(0..self.events.len())
        };
        QueryIter {
            store: self,
            filter,
            cursor,
        }
    }

    /// Monotonic counter bumped whenever the log is rewritten in place
    /// (today: only `clear_historical`). The checkpoint layer compares it
    /// against the persisted generation to decide incremental vs full flush.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Restores a recovered log wholesale. Only the recovery path uses this.
    pub(crate) fn hydrate(events: Vec<Event>, generation: u64) -> Self {
        let mut store = Self {
            generation,
            ..Self::default()
        };
        for event in events {
            store.append(event);
        }
        store
    }

    /// Drops everything except identity-defining events (`gym.created`,
    /// `exercise.created`). The retained log and its indexes are built on
    /// the side and swapped in at the end, so an interrupted clear leaves
    /// the store either fully cleared or untouched. Returns the retained
    /// event count.
    pub fn clear_historical(&mut self) -> usize {
        let retained: Vec<Event> = self
            .events
            .iter()
            .filter(|event| event.is_identity())
            .cloned()
            .collect();
        let mut replacement = Self::hydrate(retained, self.generation + 1);
        std::mem::swap(self, &mut replacement);
        self.events.len()
    }
}

enum Cursor<'a> {
    All(std::ops::Range<usize>),
    Indexed(std::slice::Iter<'a, usize>),
}

pub struct QueryIter<'a> {
    store: &'a EventStore,
    filter: &'a EventFilter,
    cursor: Cursor<'a>,
}

impl<'a> Iterator for QueryIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<&'a Event> {
        loop {
            let position = match &mut self.cursor {
                Cursor::All(range) => range.next()?,
                Cursor::Indexed(positions) => *positions.next()?,
            };
            let event = &self.store.events[position];
            if self.filter.matches(event) {
                return Some(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Appended, EventFilter, EventStore};
    use crate::domain::event::{Event, EventKind, EventPayload};

    fn gym(event_id: &str, gym_id: &str) -> Event {
        Event::with_identity(
            event_id,
            "2026-03-01T08:00:00Z",
            EventPayload::GymCreated {
                gym_id: gym_id.to_string(),
                name: format!("gym {gym_id}"),
                location: "home".to_string(),
            },
        )
    }

    fn set(event_id: &str, at: &str, session: &str, exercise: &str, weight: f64) -> Event {
        Event::with_identity(
            event_id,
            at,
            EventPayload::SetLogged {
                session_id: session.to_string(),
                exercise_id: exercise.to_string(),
                set_number: 1,
                weight,
                reps: 5,
                rir: None,
            },
        )
    }

    #[test]
    fn append_rejects_duplicate_ids_without_mutating_the_log() {
        let mut store = EventStore::new();
        assert_eq!(store.append(gym("evt-1", "G-1")), Appended::Inserted);
        assert_eq!(store.append(gym("evt-1", "G-2")), Appended::Duplicate);
        assert_eq!(store.len(), 1);
        assert!(store.contains("evt-1"));
    }

    #[test]
    fn events_keep_append_order() {
        let mut store = EventStore::new();
        store.append(set("evt-1", "2026-03-02T10:00:00Z", "S-1", "E-1", 80.0));
        store.append(set("evt-2", "2026-03-01T10:00:00Z", "S-2", "E-1", 95.0));
        let ids: Vec<&str> = store
            .events()
            .iter()
            .map(|event| event.event_id.as_str())
            .collect();
        assert_eq!(ids, vec!["evt-1", "evt-2"]);
    }

    #[test]
    fn query_by_kind_and_entity_uses_append_order() {
        let mut store = EventStore::new();
        store.append(gym("evt-1", "G-1"));
        store.append(set("evt-2", "2026-03-02T10:00:00Z", "S-1", "E-1", 80.0));
        store.append(set("evt-3", "2026-03-03T10:00:00Z", "S-2", "E-2", 60.0));
        store.append(set("evt-4", "2026-03-04T10:00:00Z", "S-3", "E-1", 95.0));

        let filter = EventFilter::kind(EventKind::SetLogged);
        let kinds: Vec<&str> = store
            .query(&filter)
            .map(|event| event.event_id.as_str())
            .collect();
        assert_eq!(kinds, vec!["evt-2", "evt-3", "evt-4"]);

        let filter = EventFilter::entity("E-1");
        let for_exercise: Vec<&str> = store
            .query(&filter)
            .map(|event| event.event_id.as_str())
            .collect();
        assert_eq!(for_exercise, vec!["evt-2", "evt-4"]);

        // The iterator is restartable: a second query sees the same scan.
        let again: Vec<&str> = store
            .query(&filter)
            .map(|event| event.event_id.as_str())
            .collect();
        assert_eq!(again, for_exercise);
    }

    #[test]
    fn query_time_range_bounds_are_inclusive() {
        let mut store = EventStore::new();
        store.append(set("evt-1", "2026-03-01T10:00:00Z", "S-1", "E-1", 80.0));
        store.append(set("evt-2", "2026-03-02T10:00:00Z", "S-2", "E-1", 85.0));
        store.append(set("evt-3", "2026-03-03T10:00:00Z", "S-3", "E-1", 90.0));

        let filter = EventFilter {
            since: Some("2026-03-02T10:00:00Z".to_string()),
            until: Some("2026-03-03T10:00:00Z".to_string()),
            ..EventFilter::default()
        };
        let hits: Vec<&str> = store
            .query(&filter)
            .map(|event| event.event_id.as_str())
            .collect();
        assert_eq!(hits, vec!["evt-2", "evt-3"]);
    }

    #[test]
    fn clear_historical_keeps_identity_events_only() {
        let mut store = EventStore::new();
        store.append(gym("evt-1", "G-1"));
        store.append(Event::with_identity(
            "evt-2",
            "2026-03-01T08:00:00Z",
            EventPayload::ExerciseCreated {
                exercise_id: "E-1".to_string(),
                name: "Squat".to_string(),
                muscle_group: "legs".to_string(),
            },
        ));
        store.append(set("evt-3", "2026-03-02T10:00:00Z", "S-1", "E-1", 80.0));
        store.append(Event::with_identity(
            "evt-4",
            "2026-03-02T11:00:00Z",
            EventPayload::WorkoutFinished {
                session_id: "S-1".to_string(),
            },
        ));

        let generation_before = store.generation();
        let retained = store.clear_historical();
        assert_eq!(retained, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.generation(), generation_before + 1);
        assert_eq!(store.count_by_kind(EventKind::SetLogged), 0);
        assert_eq!(store.count_by_kind(EventKind::GymCreated), 1);
        assert_eq!(store.count_by_kind(EventKind::ExerciseCreated), 1);

        // Identity events are still queryable through the entity index.
        let filter = EventFilter::entity("G-1");
        assert_eq!(store.query(&filter).count(), 1);
        // Cleared ids may be appended again later.
        assert_eq!(
            store.append(set("evt-3", "2026-03-02T10:00:00Z", "S-1", "E-1", 80.0)),
            Appended::Inserted
        );
    }

    #[test]
    fn counts_by_kind_covers_the_whole_tag_set() {
        let mut store = EventStore::new();
        store.append(gym("evt-1", "G-1"));
        let counts = store.counts_by_kind();
        assert_eq!(counts.len(), EventKind::ALL.len());
        let total: usize = counts.iter().map(|(_, count)| count).sum();
        assert_eq!(total, store.len());
    }
}
