//! Portable binary backup format for the event log.
//!
//! The file is columnar: one section per event kind, each section a
//! struct-of-arrays of that kind's typed fields, plus an ordinal column
//! recording every event's position in the original log so decode restores
//! exact append order. The body is framed by a magic/version header and a
//! SHA-256 trailer; weights travel as raw f64 bits.

mod wire;

use std::error::Error;
use std::fmt;

use sha2::{Digest, Sha256};
use time::{Date, OffsetDateTime};

use crate::domain::event::{Event, EventKind, EventPayload};
use wire::{ByteReader, ByteWriter, WireError};

pub const SCHEMA_VERSION: u16 = 1;
pub const BACKUP_EXTENSION: &str = "lfb";

const MAGIC: [u8; 4] = *b"LFBK";
const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 2 + 4;
// A row costs at least its ordinal plus two string length prefixes.
const MIN_ROW_LEN: usize = 12;

#[derive(Debug)]
pub enum DecodeError {
    /// The file announces a schema this build does not read.
    SchemaMismatch { found: u16 },
    /// Structural violation: bad framing, failed digest, inconsistent
    /// columns.
    Corrupt(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::SchemaMismatch { found } => write!(
                f,
                "backup file uses schema version {}; this build reads version {}",
                found, SCHEMA_VERSION
            ),
            DecodeError::Corrupt(message) => write!(f, "corrupt backup file: {}", message),
        }
    }
}

impl Error for DecodeError {}

impl From<WireError> for DecodeError {
    fn from(value: WireError) -> Self {
        DecodeError::Corrupt(value.to_string())
    }
}

/// Stamped export name, e.g. `2026-08-23-event_log.lfb`.
pub fn backup_file_name(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}-event_log.{}",
        date.year(),
        u8::from(date.month()),
        date.day(),
        BACKUP_EXTENSION
    )
}

pub fn default_backup_file_name() -> String {
    backup_file_name(OffsetDateTime::now_utc().date())
}

pub fn encode(events: &[Event]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.put_raw(&MAGIC);
    writer.put_u16(SCHEMA_VERSION);
    writer.put_u32(events.len() as u32);

    for kind in EventKind::ALL {
        let rows: Vec<(u32, &Event)> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| event.kind() == kind)
            .map(|(ordinal, event)| (ordinal as u32, event))
            .collect();
        if rows.is_empty() {
            continue;
        }

        writer.put_u8(kind.code());
        writer.put_u32(rows.len() as u32);
        for (ordinal, _) in &rows {
            writer.put_u32(*ordinal);
        }
        for (_, event) in &rows {
            writer.put_str(&event.event_id);
        }
        for (_, event) in &rows {
            writer.put_str(&event.recorded_at);
        }
        write_payload_columns(&mut writer, kind, &rows);
    }

    let digest = Sha256::digest(writer.as_bytes());
    writer.put_raw(&digest);
    writer.into_bytes()
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Event>, DecodeError> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(DecodeError::Corrupt("file too short".to_string()));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_LEN);
    let mut reader = ByteReader::new(body);

    if reader.get_raw(4)? != MAGIC.as_slice() {
        return Err(DecodeError::Corrupt("unrecognized file magic".to_string()));
    }
    let version = reader.get_u16()?;
    if version != SCHEMA_VERSION {
        return Err(DecodeError::SchemaMismatch { found: version });
    }
    let digest = Sha256::digest(body);
    if digest.as_slice() != trailer {
        return Err(DecodeError::Corrupt(
            "integrity digest mismatch".to_string(),
        ));
    }

    let count = reader.get_u32()? as usize;
    if count > body.len() / MIN_ROW_LEN {
        return Err(DecodeError::Corrupt(format!(
            "event count {} is implausible for a {}-byte file",
            count,
            bytes.len()
        )));
    }

    let mut slots: Vec<Option<Event>> = vec![None; count];
    while reader.remaining() > 0 {
        let code = reader.get_u8()?;
        let kind = EventKind::from_code(code)
            .ok_or_else(|| DecodeError::Corrupt(format!("unknown event kind tag {}", code)))?;
        let rows = reader.get_u32()? as usize;
        if rows > count {
            return Err(DecodeError::Corrupt(format!(
                "section '{}' claims {} rows but the file holds {} events",
                kind.as_str(),
                rows,
                count
            )));
        }

        let ordinals = read_u32_column(&mut reader, rows)?;
        let event_ids = read_str_column(&mut reader, rows)?;
        let stamps = read_str_column(&mut reader, rows)?;
        let payloads = read_payload_rows(&mut reader, kind, rows)?;

        for (((ordinal, event_id), recorded_at), payload) in ordinals
            .into_iter()
            .zip(event_ids)
            .zip(stamps)
            .zip(payloads)
        {
            let slot = slots.get_mut(ordinal as usize).ok_or_else(|| {
                DecodeError::Corrupt(format!("event position {} out of range", ordinal))
            })?;
            if slot.is_some() {
                return Err(DecodeError::Corrupt(format!(
                    "duplicate event position {}",
                    ordinal
                )));
            }
            *slot = Some(Event::with_identity(event_id, recorded_at, payload));
        }
    }

    let mut events = Vec::with_capacity(count);
    for (position, slot) in slots.into_iter().enumerate() {
        events.push(slot.ok_or_else(|| {
            DecodeError::Corrupt(format!("missing event at position {}", position))
        })?);
    }
    Ok(events)
}

fn write_payload_columns(writer: &mut ByteWriter, kind: EventKind, rows: &[(u32, &Event)]) {
    match kind {
        EventKind::GymCreated => {
            let mut gym_ids = Vec::with_capacity(rows.len());
            let mut names = Vec::with_capacity(rows.len());
            let mut locations = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::GymCreated {
                    gym_id,
                    name,
                    location,
                } = &event.payload
                {
                    gym_ids.push(gym_id.as_str());
                    names.push(name.as_str());
                    locations.push(location.as_str());
                }
            }
            put_str_column(writer, &gym_ids);
            put_str_column(writer, &names);
            put_str_column(writer, &locations);
        }
        EventKind::ExerciseCreated => {
            let mut exercise_ids = Vec::with_capacity(rows.len());
            let mut names = Vec::with_capacity(rows.len());
            let mut muscle_groups = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::ExerciseCreated {
                    exercise_id,
                    name,
                    muscle_group,
                } = &event.payload
                {
                    exercise_ids.push(exercise_id.as_str());
                    names.push(name.as_str());
                    muscle_groups.push(muscle_group.as_str());
                }
            }
            put_str_column(writer, &exercise_ids);
            put_str_column(writer, &names);
            put_str_column(writer, &muscle_groups);
        }
        EventKind::TemplateCreated => {
            let mut template_ids = Vec::with_capacity(rows.len());
            let mut names = Vec::with_capacity(rows.len());
            let mut exercise_lists = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::TemplateCreated {
                    template_id,
                    name,
                    exercise_ids,
                } = &event.payload
                {
                    template_ids.push(template_id.as_str());
                    names.push(name.as_str());
                    exercise_lists.push(exercise_ids.as_slice());
                }
            }
            put_str_column(writer, &template_ids);
            put_str_column(writer, &names);
            put_list_column(writer, &exercise_lists);
        }
        EventKind::TemplateDeleted => {
            let mut template_ids = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::TemplateDeleted { template_id } = &event.payload {
                    template_ids.push(template_id.as_str());
                }
            }
            put_str_column(writer, &template_ids);
        }
        EventKind::PlanCreated => {
            let mut plan_ids = Vec::with_capacity(rows.len());
            let mut names = Vec::with_capacity(rows.len());
            let mut exercise_lists = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::PlanCreated {
                    plan_id,
                    name,
                    exercise_ids,
                } = &event.payload
                {
                    plan_ids.push(plan_id.as_str());
                    names.push(name.as_str());
                    exercise_lists.push(exercise_ids.as_slice());
                }
            }
            put_str_column(writer, &plan_ids);
            put_str_column(writer, &names);
            put_list_column(writer, &exercise_lists);
        }
        EventKind::RotationCreated => {
            let mut rotation_ids = Vec::with_capacity(rows.len());
            let mut names = Vec::with_capacity(rows.len());
            let mut plan_lists = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::RotationCreated {
                    rotation_id,
                    name,
                    plan_ids,
                } = &event.payload
                {
                    rotation_ids.push(rotation_id.as_str());
                    names.push(name.as_str());
                    plan_lists.push(plan_ids.as_slice());
                }
            }
            put_str_column(writer, &rotation_ids);
            put_str_column(writer, &names);
            put_list_column(writer, &plan_lists);
        }
        EventKind::RotationActivated => {
            let mut rotation_ids = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::RotationActivated { rotation_id } = &event.payload {
                    rotation_ids.push(rotation_id.as_str());
                }
            }
            put_str_column(writer, &rotation_ids);
        }
        EventKind::RotationAdvanced => {
            let mut rotation_ids = Vec::with_capacity(rows.len());
            let mut indexes = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::RotationAdvanced {
                    rotation_id,
                    current_index,
                } = &event.payload
                {
                    rotation_ids.push(rotation_id.as_str());
                    indexes.push(*current_index);
                }
            }
            put_str_column(writer, &rotation_ids);
            put_u32_column(writer, &indexes);
        }
        EventKind::WorkoutStarted => {
            let mut session_ids = Vec::with_capacity(rows.len());
            let mut gym_ids = Vec::with_capacity(rows.len());
            let mut plan_ids = Vec::with_capacity(rows.len());
            let mut template_ids = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::WorkoutStarted {
                    session_id,
                    gym_id,
                    plan_id,
                    template_id,
                } = &event.payload
                {
                    session_ids.push(session_id.as_str());
                    gym_ids.push(gym_id.as_str());
                    plan_ids.push(plan_id.as_deref());
                    template_ids.push(template_id.as_deref());
                }
            }
            put_str_column(writer, &session_ids);
            put_str_column(writer, &gym_ids);
            put_opt_str_column(writer, &plan_ids);
            put_opt_str_column(writer, &template_ids);
        }
        EventKind::WorkoutFinished => {
            let mut session_ids = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::WorkoutFinished { session_id } = &event.payload {
                    session_ids.push(session_id.as_str());
                }
            }
            put_str_column(writer, &session_ids);
        }
        EventKind::WorkoutSaved => {
            let mut session_ids = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::WorkoutSaved { session_id } = &event.payload {
                    session_ids.push(session_id.as_str());
                }
            }
            put_str_column(writer, &session_ids);
        }
        EventKind::SetLogged => {
            let mut session_ids = Vec::with_capacity(rows.len());
            let mut exercise_ids = Vec::with_capacity(rows.len());
            let mut set_numbers = Vec::with_capacity(rows.len());
            let mut weights = Vec::with_capacity(rows.len());
            let mut reps_column = Vec::with_capacity(rows.len());
            let mut rirs = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::SetLogged {
                    session_id,
                    exercise_id,
                    set_number,
                    weight,
                    reps,
                    rir,
                } = &event.payload
                {
                    session_ids.push(session_id.as_str());
                    exercise_ids.push(exercise_id.as_str());
                    set_numbers.push(*set_number);
                    weights.push(*weight);
                    reps_column.push(*reps);
                    rirs.push(*rir);
                }
            }
            put_str_column(writer, &session_ids);
            put_str_column(writer, &exercise_ids);
            put_u32_column(writer, &set_numbers);
            put_f64_column(writer, &weights);
            put_u32_column(writer, &reps_column);
            put_opt_u32_column(writer, &rirs);
        }
        EventKind::ExerciseNoteLogged => {
            let mut exercise_ids = Vec::with_capacity(rows.len());
            let mut session_ids = Vec::with_capacity(rows.len());
            let mut texts = Vec::with_capacity(rows.len());
            for (_, event) in rows {
                if let EventPayload::ExerciseNoteLogged {
                    exercise_id,
                    session_id,
                    text,
                } = &event.payload
                {
                    exercise_ids.push(exercise_id.as_str());
                    session_ids.push(session_id.as_str());
                    texts.push(text.as_str());
                }
            }
            put_str_column(writer, &exercise_ids);
            put_str_column(writer, &session_ids);
            put_str_column(writer, &texts);
        }
    }
}

fn read_payload_rows(
    reader: &mut ByteReader<'_>,
    kind: EventKind,
    rows: usize,
) -> Result<Vec<EventPayload>, DecodeError> {
    let mut out = Vec::with_capacity(rows);
    match kind {
        EventKind::GymCreated => {
            let gym_ids = read_str_column(reader, rows)?;
            let names = read_str_column(reader, rows)?;
            let locations = read_str_column(reader, rows)?;
            for ((gym_id, name), location) in gym_ids.into_iter().zip(names).zip(locations) {
                out.push(EventPayload::GymCreated {
                    gym_id,
                    name,
                    location,
                });
            }
        }
        EventKind::ExerciseCreated => {
            let exercise_ids = read_str_column(reader, rows)?;
            let names = read_str_column(reader, rows)?;
            let muscle_groups = read_str_column(reader, rows)?;
            for ((exercise_id, name), muscle_group) in
                exercise_ids.into_iter().zip(names).zip(muscle_groups)
            {
                out.push(EventPayload::ExerciseCreated {
                    exercise_id,
                    name,
                    muscle_group,
                });
            }
        }
        EventKind::TemplateCreated => {
            let template_ids = read_str_column(reader, rows)?;
            let names = read_str_column(reader, rows)?;
            let exercise_lists = read_list_column(reader, rows)?;
            for ((template_id, name), exercise_ids) in
                template_ids.into_iter().zip(names).zip(exercise_lists)
            {
                out.push(EventPayload::TemplateCreated {
                    template_id,
                    name,
                    exercise_ids,
                });
            }
        }
        EventKind::TemplateDeleted => {
            for template_id in read_str_column(reader, rows)? {
                out.push(EventPayload::TemplateDeleted { template_id });
            }
        }
        EventKind::PlanCreated => {
            let plan_ids = read_str_column(reader, rows)?;
            let names = read_str_column(reader, rows)?;
            let exercise_lists = read_list_column(reader, rows)?;
            for ((plan_id, name), exercise_ids) in
                plan_ids.into_iter().zip(names).zip(exercise_lists)
            {
                out.push(EventPayload::PlanCreated {
                    plan_id,
                    name,
                    exercise_ids,
                });
            }
        }
        EventKind::RotationCreated => {
            let rotation_ids = read_str_column(reader, rows)?;
            let names = read_str_column(reader, rows)?;
            let plan_lists = read_list_column(reader, rows)?;
            for ((rotation_id, name), plan_ids) in
                rotation_ids.into_iter().zip(names).zip(plan_lists)
            {
                out.push(EventPayload::RotationCreated {
                    rotation_id,
                    name,
                    plan_ids,
                });
            }
        }
        EventKind::RotationActivated => {
            for rotation_id in read_str_column(reader, rows)? {
                out.push(EventPayload::RotationActivated { rotation_id });
            }
        }
        EventKind::RotationAdvanced => {
            let rotation_ids = read_str_column(reader, rows)?;
            let indexes = read_u32_column(reader, rows)?;
            for (rotation_id, current_index) in rotation_ids.into_iter().zip(indexes) {
                out.push(EventPayload::RotationAdvanced {
                    rotation_id,
                    current_index,
                });
            }
        }
        EventKind::WorkoutStarted => {
            let session_ids = read_str_column(reader, rows)?;
            let gym_ids = read_str_column(reader, rows)?;
            let plan_ids = read_opt_str_column(reader, rows)?;
            let template_ids = read_opt_str_column(reader, rows)?;
            for (((session_id, gym_id), plan_id), template_id) in session_ids
                .into_iter()
                .zip(gym_ids)
                .zip(plan_ids)
                .zip(template_ids)
            {
                out.push(EventPayload::WorkoutStarted {
                    session_id,
                    gym_id,
                    plan_id,
                    template_id,
                });
            }
        }
        EventKind::WorkoutFinished => {
            for session_id in read_str_column(reader, rows)? {
                out.push(EventPayload::WorkoutFinished { session_id });
            }
        }
        EventKind::WorkoutSaved => {
            for session_id in read_str_column(reader, rows)? {
                out.push(EventPayload::WorkoutSaved { session_id });
            }
        }
        EventKind::SetLogged => {
            let session_ids = read_str_column(reader, rows)?;
            let exercise_ids = read_str_column(reader, rows)?;
            let set_numbers = read_u32_column(reader, rows)?;
            let weights = read_f64_column(reader, rows)?;
            let reps_column = read_u32_column(reader, rows)?;
            let rirs = read_opt_u32_column(reader, rows)?;
            for (((((session_id, exercise_id), set_number), weight), reps), rir) in session_ids
                .into_iter()
                .zip(exercise_ids)
                .zip(set_numbers)
                .zip(weights)
                .zip(reps_column)
                .zip(rirs)
            {
                out.push(EventPayload::SetLogged {
                    session_id,
                    exercise_id,
                    set_number,
                    weight,
                    reps,
                    rir,
                });
            }
        }
        EventKind::ExerciseNoteLogged => {
            let exercise_ids = read_str_column(reader, rows)?;
            let session_ids = read_str_column(reader, rows)?;
            let texts = read_str_column(reader, rows)?;
            for ((exercise_id, session_id), text) in
                exercise_ids.into_iter().zip(session_ids).zip(texts)
            {
                out.push(EventPayload::ExerciseNoteLogged {
                    exercise_id,
                    session_id,
                    text,
                });
            }
        }
    }
    Ok(out)
}

fn put_str_column(writer: &mut ByteWriter, values: &[&str]) {
    for value in values {
        writer.put_str(value);
    }
}

fn put_opt_str_column(writer: &mut ByteWriter, values: &[Option<&str>]) {
    for value in values {
        writer.put_u8(u8::from(value.is_some()));
    }
    for value in values.iter().flatten() {
        writer.put_str(value);
    }
}

fn put_u32_column(writer: &mut ByteWriter, values: &[u32]) {
    for value in values {
        writer.put_u32(*value);
    }
}

fn put_opt_u32_column(writer: &mut ByteWriter, values: &[Option<u32>]) {
    for value in values {
        writer.put_u8(u8::from(value.is_some()));
    }
    for value in values.iter().flatten() {
        writer.put_u32(*value);
    }
}

fn put_f64_column(writer: &mut ByteWriter, values: &[f64]) {
    for value in values {
        writer.put_f64(*value);
    }
}

fn put_list_column(writer: &mut ByteWriter, lists: &[&[String]]) {
    for list in lists {
        writer.put_u32(list.len() as u32);
    }
    for list in lists {
        for item in *list {
            writer.put_str(item);
        }
    }
}

fn read_str_column(reader: &mut ByteReader<'_>, rows: usize) -> Result<Vec<String>, DecodeError> {
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        out.push(reader.get_str()?);
    }
    Ok(out)
}

fn read_opt_str_column(
    reader: &mut ByteReader<'_>,
    rows: usize,
) -> Result<Vec<Option<String>>, DecodeError> {
    let flags = read_flag_column(reader, rows)?;
    let mut out = Vec::with_capacity(rows);
    for present in flags {
        out.push(if present {
            Some(reader.get_str()?)
        } else {
            None
        });
    }
    Ok(out)
}

fn read_u32_column(reader: &mut ByteReader<'_>, rows: usize) -> Result<Vec<u32>, DecodeError> {
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        out.push(reader.get_u32()?);
    }
    Ok(out)
}

fn read_opt_u32_column(
    reader: &mut ByteReader<'_>,
    rows: usize,
) -> Result<Vec<Option<u32>>, DecodeError> {
    let flags = read_flag_column(reader, rows)?;
    let mut out = Vec::with_capacity(rows);
    for present in flags {
        out.push(if present {
            Some(reader.get_u32()?)
        } else {
            None
        });
    }
    Ok(out)
}

fn read_f64_column(reader: &mut ByteReader<'_>, rows: usize) -> Result<Vec<f64>, DecodeError> {
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        out.push(reader.get_f64()?);
    }
    Ok(out)
}

fn read_list_column(
    reader: &mut ByteReader<'_>,
    rows: usize,
) -> Result<Vec<Vec<String>>, DecodeError> {
    let lengths = read_u32_column(reader, rows)?;
    let mut out = Vec::with_capacity(rows);
    for length in lengths {
        let mut list = Vec::with_capacity(length as usize);
        for _ in 0..length {
            list.push(reader.get_str()?);
        }
        out.push(list);
    }
    Ok(out)
}

fn read_flag_column(reader: &mut ByteReader<'_>, rows: usize) -> Result<Vec<bool>, DecodeError> {
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        match reader.get_u8()? {
            0 => out.push(false),
            1 => out.push(true),
            other => {
                return Err(DecodeError::Corrupt(format!(
                    "invalid presence flag {}",
                    other
                )))
            }
        }
    }
    Ok(out)
}
