use std::error::Error;
use std::fmt;

use log::{debug, info};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::db;
use crate::domain::event::Event;
use crate::store::EventStore;

const META_PERSISTED_COUNT: &str = "persisted_count";
const META_LOG_GENERATION: &str = "log_generation";

/// Makes the in-memory log crash-durable. The durable image is the
/// `event_log` table keyed by append position; `meta` records how many
/// events the image holds and which log generation it belongs to. Every
/// flush is one SQLite transaction, so a failed write rolls back and the
/// previous image stays valid.
#[derive(Debug)]
pub struct CheckpointManager {
    conn: Connection,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CheckpointSummary {
    pub flushed: u64,
    pub persisted_total: u64,
    pub full_rewrite: bool,
}

#[derive(Debug)]
pub enum CheckpointError {
    /// The durable write failed; the previous image is intact and the
    /// operation may be retried.
    Storage(rusqlite::Error),
    Serialize(serde_json::Error),
    /// The durable image is truncated or malformed. Recovery refuses to
    /// present it as an empty store.
    CorruptStore(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Storage(err) => write!(f, "storage write failed: {}", err),
            CheckpointError::Serialize(err) => {
                write!(f, "failed to serialize event for storage: {}", err)
            }
            CheckpointError::CorruptStore(message) => {
                write!(f, "corrupt durable store: {}", message)
            }
        }
    }
}

impl Error for CheckpointError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CheckpointError::Storage(err) => Some(err),
            CheckpointError::Serialize(err) => Some(err),
            CheckpointError::CorruptStore(_) => None,
        }
    }
}

impl From<rusqlite::Error> for CheckpointError {
    fn from(value: rusqlite::Error) -> Self {
        CheckpointError::Storage(value)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(value: serde_json::Error) -> Self {
        CheckpointError::Serialize(value)
    }
}

impl CheckpointManager {
    pub fn open(path: &str) -> Result<Self, CheckpointError> {
        Ok(Self {
            conn: db::open_connection(path)?,
        })
    }

    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Flushes all events appended since the last successful checkpoint in
    /// one transaction. A no-op when nothing new was appended. After
    /// `clear_historical` the store generation moves, and the durable image
    /// is rewritten wholesale inside the same transaction.
    pub fn checkpoint(
        &mut self,
        store: &EventStore,
    ) -> Result<CheckpointSummary, CheckpointError> {
        let tx = self.conn.transaction()?;

        let persisted_count = read_meta_count(&tx, META_PERSISTED_COUNT)?;
        let persisted_generation = read_meta_count(&tx, META_LOG_GENERATION)? as u64;
        let full_rewrite = persisted_generation != store.generation();

        let flushed = if full_rewrite {
            tx.execute("DELETE FROM event_log", [])?;
            insert_events(&tx, store.events(), 0)?;
            store.len()
        } else {
            if persisted_count > store.len() {
                return Err(CheckpointError::CorruptStore(format!(
                    "durable image holds {} events but the log holds {}",
                    persisted_count,
                    store.len()
                )));
            }
            insert_events(&tx, &store.events()[persisted_count..], persisted_count)?;
            store.len() - persisted_count
        };

        db::set_meta(&tx, META_PERSISTED_COUNT, &store.len().to_string())?;
        db::set_meta(&tx, META_LOG_GENERATION, &store.generation().to_string())?;
        tx.commit()?;

        if flushed > 0 || full_rewrite {
            info!(
                "checkpoint flushed {} events (total {}, full_rewrite={})",
                flushed,
                store.len(),
                full_rewrite
            );
        }
        Ok(CheckpointSummary {
            flushed: flushed as u64,
            persisted_total: store.len() as u64,
            full_rewrite,
        })
    }

    /// Rehydrates the log from the durable image. An empty image yields an
    /// empty store; a truncated or malformed one fails loudly.
    pub fn recover(&self) -> Result<EventStore, CheckpointError> {
        let persisted_count = read_meta_count(&self.conn, META_PERSISTED_COUNT)?;
        let generation = read_meta_count(&self.conn, META_LOG_GENERATION)? as u64;

        let mut stmt = self
            .conn
            .prepare("SELECT seq, event_id, kind, payload FROM event_log ORDER BY seq")?;
        let mut rows = stmt.query([])?;
        let mut events: Vec<Event> = Vec::with_capacity(persisted_count);
        while let Some(row) = rows.next()? {
            let seq: i64 = row.get(0)?;
            let event_id: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let payload: String = row.get(3)?;

            if seq != events.len() as i64 {
                return Err(CheckpointError::CorruptStore(format!(
                    "event sequence has a gap at position {} (seq {})",
                    events.len(),
                    seq
                )));
            }
            let event: Event = serde_json::from_str(&payload).map_err(|err| {
                CheckpointError::CorruptStore(format!(
                    "event {} has a malformed payload: {}",
                    event_id, err
                ))
            })?;
            if event.event_id != event_id || event.kind().as_str() != kind {
                return Err(CheckpointError::CorruptStore(format!(
                    "event {} does not match its indexed identity",
                    event_id
                )));
            }
            events.push(event);
        }

        if events.len() != persisted_count {
            return Err(CheckpointError::CorruptStore(format!(
                "durable image is truncated: expected {} events, found {}",
                persisted_count,
                events.len()
            )));
        }

        let total = events.len();
        let store = EventStore::hydrate(events, generation);
        if store.len() != total {
            return Err(CheckpointError::CorruptStore(
                "durable image contains duplicate event ids".to_string(),
            ));
        }
        debug!("recovered {} events (generation {})", total, generation);
        Ok(store)
    }
}

fn insert_events(
    conn: &Connection,
    events: &[Event],
    first_seq: usize,
) -> Result<(), CheckpointError> {
    let mut stmt = conn.prepare(
        "INSERT INTO event_log (seq, event_id, kind, recorded_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (offset, event) in events.iter().enumerate() {
        let payload = serde_json::to_string(event)?;
        stmt.execute(params![
            (first_seq + offset) as i64,
            event.event_id,
            event.kind().as_str(),
            event.recorded_at,
            payload
        ])?;
    }
    Ok(())
}

fn read_meta_count(conn: &Connection, key: &str) -> Result<usize, CheckpointError> {
    match db::get_meta(conn, key)? {
        None => Ok(0),
        Some(value) => value.parse::<usize>().map_err(|_| {
            CheckpointError::CorruptStore(format!("meta key '{}' holds non-numeric '{}'", key, value))
        }),
    }
}
