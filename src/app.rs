use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::backup::{self, DecodeError};
use crate::checkpoint::{CheckpointError, CheckpointManager, CheckpointSummary};
use crate::config::{Config, ConfigError};
use crate::domain::catalog::{self, ExerciseRecord, GymRecord, PlanRecord, TemplateRecord};
use crate::domain::event::{Event, EventPayload};
use crate::imports::{import_events, ImportReport};
use crate::rotation::{self, RotationStatus};
use crate::store::EventStore;
use crate::views::analytics::{exercise_series, SessionSummary};
use crate::views::ghost::{ghost_for, GhostSession};
use crate::views::notes::{note_history, NoteEntry};
use crate::views::warmup::{warmup_hint, WarmupHint};

/// Host facade: owns the log, the durable checkpoint, and the config.
/// Mutating commands append events and flush immediately, so the durable
/// image is never more than one command behind.
#[derive(Debug)]
pub struct App {
    store: EventStore,
    checkpoint: CheckpointManager,
    config: Config,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub by_kind: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub events: usize,
}

impl App {
    /// Opens the durable store and rehydrates the log. A corrupt durable
    /// image is a hard failure here, distinct from a legitimately empty
    /// store.
    pub fn open(db_path: &str, config_path: &Path) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let config = Config::load(config_path)?;
        let checkpoint = CheckpointManager::open(db_path)?;
        let store = checkpoint.recover()?;
        info!("opened store with {} events", store.len());
        Ok(Self {
            store,
            checkpoint,
            config,
        })
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- catalog commands -------------------------------------------------

    pub fn create_gym(&mut self, name: &str, location: &str) -> Result<GymRecord, AppError> {
        let gym_id = format!("G-{}", Uuid::now_v7());
        self.commit(EventPayload::GymCreated {
            gym_id: gym_id.clone(),
            name: name.to_string(),
            location: location.to_string(),
        })?;
        Ok(GymRecord {
            gym_id,
            name: name.to_string(),
            location: location.to_string(),
        })
    }

    pub fn create_exercise(
        &mut self,
        name: &str,
        muscle_group: &str,
    ) -> Result<ExerciseRecord, AppError> {
        let exercise_id = format!("E-{}", Uuid::now_v7());
        self.commit(EventPayload::ExerciseCreated {
            exercise_id: exercise_id.clone(),
            name: name.to_string(),
            muscle_group: muscle_group.to_string(),
        })?;
        Ok(ExerciseRecord {
            exercise_id,
            name: name.to_string(),
            muscle_group: muscle_group.to_string(),
        })
    }

    pub fn create_template(
        &mut self,
        name: &str,
        exercise_ids: Vec<String>,
    ) -> Result<TemplateRecord, AppError> {
        let template_id = format!("T-{}", Uuid::now_v7());
        self.commit(EventPayload::TemplateCreated {
            template_id: template_id.clone(),
            name: name.to_string(),
            exercise_ids: exercise_ids.clone(),
        })?;
        Ok(TemplateRecord {
            template_id,
            name: name.to_string(),
            exercise_ids,
        })
    }

    /// Appends a tombstone; logged history under the template is untouched.
    pub fn delete_template(&mut self, template_id: &str) -> Result<(), AppError> {
        if !catalog::templates(&self.store)
            .iter()
            .any(|t| t.template_id == template_id)
        {
            return Err(AppError::NotFound(format!(
                "template '{template_id}' does not exist or was already deleted"
            )));
        }
        self.commit(EventPayload::TemplateDeleted {
            template_id: template_id.to_string(),
        })
    }

    pub fn create_plan(
        &mut self,
        name: &str,
        exercise_ids: Vec<String>,
    ) -> Result<PlanRecord, AppError> {
        let plan_id = format!("P-{}", Uuid::now_v7());
        self.commit(EventPayload::PlanCreated {
            plan_id: plan_id.clone(),
            name: name.to_string(),
            exercise_ids: exercise_ids.clone(),
        })?;
        Ok(PlanRecord {
            plan_id,
            name: name.to_string(),
            exercise_ids,
        })
    }

    pub fn create_rotation(&mut self, name: &str, plan_ids: Vec<String>) -> Result<String, AppError> {
        if plan_ids.is_empty() {
            return Err(AppError::InvalidArgument(
                "a rotation needs at least one plan".to_string(),
            ));
        }
        let rotation_id = format!("R-{}", Uuid::now_v7());
        self.commit(EventPayload::RotationCreated {
            rotation_id: rotation_id.clone(),
            name: name.to_string(),
            plan_ids,
        })?;
        Ok(rotation_id)
    }

    pub fn activate_rotation(&mut self, rotation_id: &str) -> Result<(), AppError> {
        self.commit(EventPayload::RotationActivated {
            rotation_id: rotation_id.to_string(),
        })
    }

    // --- workout commands -------------------------------------------------

    pub fn start_workout(
        &mut self,
        gym_id: &str,
        plan_id: Option<&str>,
        template_id: Option<&str>,
    ) -> Result<String, AppError> {
        let session_id = format!("S-{}", Uuid::now_v7());
        self.commit(EventPayload::WorkoutStarted {
            session_id: session_id.clone(),
            gym_id: gym_id.to_string(),
            plan_id: plan_id.map(str::to_string),
            template_id: template_id.map(str::to_string),
        })?;
        Ok(session_id)
    }

    pub fn log_set(
        &mut self,
        session_id: &str,
        exercise_id: &str,
        set_number: u32,
        weight: f64,
        reps: u32,
        rir: Option<u32>,
    ) -> Result<(), AppError> {
        self.commit(EventPayload::SetLogged {
            session_id: session_id.to_string(),
            exercise_id: exercise_id.to_string(),
            set_number,
            weight,
            reps,
            rir,
        })
    }

    pub fn log_note(
        &mut self,
        exercise_id: &str,
        session_id: &str,
        text: &str,
    ) -> Result<(), AppError> {
        self.commit(EventPayload::ExerciseNoteLogged {
            exercise_id: exercise_id.to_string(),
            session_id: session_id.to_string(),
            text: text.to_string(),
        })
    }

    /// Finishes a session and, when `save` is set, records it and lets the
    /// rotation advance if the session completed the active rotation's
    /// current plan. Returns the rotation state after any advance.
    pub fn finish_workout(
        &mut self,
        session_id: &str,
        save: bool,
    ) -> Result<Option<RotationStatus>, AppError> {
        self.store.append(Event::new(EventPayload::WorkoutFinished {
            session_id: session_id.to_string(),
        }));
        if save {
            self.store.append(Event::new(EventPayload::WorkoutSaved {
                session_id: session_id.to_string(),
            }));
            if let Some(advance) = rotation::advancement_for(&self.store, session_id) {
                self.store.append(Event::new(advance));
            }
        }
        self.checkpoint.checkpoint(&self.store)?;
        Ok(self.rotation_status())
    }

    // --- persistence and transfer ----------------------------------------

    pub fn checkpoint(&mut self) -> Result<CheckpointSummary, AppError> {
        Ok(self.checkpoint.checkpoint(&self.store)?)
    }

    /// Writes the dated backup file into `dir`.
    pub fn export(&self, dir: &Path) -> Result<ExportOutcome, AppError> {
        let bytes = backup::encode(self.store.events());
        let path = dir.join(backup::default_backup_file_name());
        fs::write(&path, &bytes)?;
        info!(
            "exported {} events ({} bytes) to {}",
            self.store.len(),
            bytes.len(),
            path.display()
        );
        Ok(ExportOutcome {
            path,
            events: self.store.len(),
        })
    }

    /// Decodes a backup file and merges it. Events already present count as
    /// skipped; re-importing a file exported from this store imports 0.
    pub fn import(&mut self, path: &Path) -> Result<ImportReport, AppError> {
        let bytes = fs::read(path)?;
        let events = backup::decode(&bytes)?;
        let report = import_events(&mut self.store, events);
        self.checkpoint.checkpoint(&self.store)?;
        Ok(report)
    }

    /// Removes everything except identity-defining events. Returns the
    /// post-clear event count.
    pub fn clear_history(&mut self) -> Result<usize, AppError> {
        let retained = self.store.clear_historical();
        self.checkpoint.checkpoint(&self.store)?;
        info!("cleared history, {} identity events retained", retained);
        Ok(retained)
    }

    // --- queries ----------------------------------------------------------

    pub fn stats(&self) -> Stats {
        Stats {
            total: self.store.len(),
            by_kind: self
                .store
                .counts_by_kind()
                .into_iter()
                .map(|(kind, count)| (kind.as_str().to_string(), count))
                .collect(),
        }
    }

    pub fn gyms(&self) -> Vec<GymRecord> {
        catalog::gyms(&self.store)
    }

    pub fn exercises(&self) -> Vec<ExerciseRecord> {
        catalog::exercises(&self.store)
    }

    pub fn templates(&self) -> Vec<TemplateRecord> {
        catalog::templates(&self.store)
    }

    pub fn plans(&self) -> Vec<PlanRecord> {
        catalog::plans(&self.store)
    }

    pub fn ghost(
        &self,
        exercise_id: &str,
        gym_id: &str,
        exclude_session: Option<&str>,
    ) -> Option<GhostSession> {
        ghost_for(
            &self.store,
            exercise_id,
            gym_id,
            exclude_session,
            self.config.ghost_tie_break,
        )
    }

    pub fn warmup(&self, exercise_id: &str) -> WarmupHint {
        warmup_hint(&self.store, exercise_id, &self.config.warmup_fractions)
    }

    pub fn analytics(&self, exercise_id: &str) -> Vec<SessionSummary> {
        exercise_series(&self.store, exercise_id)
    }

    pub fn notes(&self, exercise_id: &str) -> Vec<NoteEntry> {
        note_history(&self.store, exercise_id)
    }

    pub fn rotation_status(&self) -> Option<RotationStatus> {
        rotation::rotation_status(&self.store, self.config.default_gym.as_deref())
    }

    fn commit(&mut self, payload: EventPayload) -> Result<(), AppError> {
        self.store.append(Event::new(payload));
        self.checkpoint.checkpoint(&self.store)?;
        Ok(())
    }
}

fn ensure_parent_dir(db_path: &str) -> Result<(), AppError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Config(ConfigError),
    Checkpoint(CheckpointError),
    Decode(DecodeError),
    InvalidArgument(String),
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Checkpoint(err) => write!(f, "{}", err),
            AppError::Decode(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Checkpoint(err) => Some(err),
            AppError::Decode(err) => Some(err),
            AppError::InvalidArgument(_) => None,
            AppError::NotFound(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<CheckpointError> for AppError {
    fn from(value: CheckpointError) -> Self {
        AppError::Checkpoint(value)
    }
}

impl From<DecodeError> for AppError {
    fn from(value: DecodeError) -> Self {
        AppError::Decode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::App;
    use crate::views::warmup::WarmupHint;

    fn open_app(dir: &tempfile::TempDir) -> App {
        let db = dir
            .path()
            .join("state.sqlite")
            .to_str()
            .expect("temp path should be UTF-8")
            .to_string();
        App::open(&db, &dir.path().join("liftlog.toml")).expect("open app")
    }

    #[test]
    fn commands_survive_a_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut app = open_app(&dir);
            let gym = app.create_gym("Iron Temple", "Oslo").expect("gym");
            let exercise = app.create_exercise("Squat", "legs").expect("exercise");
            let session = app
                .start_workout(&gym.gym_id, None, None)
                .expect("start workout");
            app.log_set(&session, &exercise.exercise_id, 1, 100.0, 5, None)
                .expect("log set");
            app.finish_workout(&session, true).expect("finish");
        }

        let app = open_app(&dir);
        assert_eq!(app.gyms().len(), 1);
        assert_eq!(app.exercises().len(), 1);
        // gym + exercise + started + set + finished + saved
        let stats = app.stats();
        assert_eq!(stats.total, 6);
    }

    #[test]
    fn finish_workout_advances_the_active_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = open_app(&dir);
        let gym = app.create_gym("Garage", "home").expect("gym");
        let plan_a = app.create_plan("Lower A", vec![]).expect("plan");
        let plan_b = app.create_plan("Upper A", vec![]).expect("plan");
        let rotation = app
            .create_rotation("Block 1", vec![plan_a.plan_id.clone(), plan_b.plan_id.clone()])
            .expect("rotation");
        app.activate_rotation(&rotation).expect("activate");

        let session = app
            .start_workout(&gym.gym_id, Some(&plan_a.plan_id), None)
            .expect("start");
        let status = app
            .finish_workout(&session, true)
            .expect("finish")
            .expect("rotation active");
        assert_eq!(status.plan_id, plan_b.plan_id);
        assert_eq!((status.position, status.total), (2, 2));
    }

    #[test]
    fn finish_without_save_leaves_the_rotation_in_place() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = open_app(&dir);
        let gym = app.create_gym("Garage", "home").expect("gym");
        let plan = app.create_plan("Lower A", vec![]).expect("plan");
        let rotation = app
            .create_rotation("Block 1", vec![plan.plan_id.clone()])
            .expect("rotation");
        app.activate_rotation(&rotation).expect("activate");

        let session = app
            .start_workout(&gym.gym_id, Some(&plan.plan_id), None)
            .expect("start");
        let status = app
            .finish_workout(&session, false)
            .expect("finish")
            .expect("rotation active");
        assert_eq!((status.position, status.total), (1, 1));
    }

    #[test]
    fn clear_history_keeps_identities_and_empties_views() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = open_app(&dir);
        let gym = app.create_gym("Garage", "home").expect("gym");
        let exercise = app.create_exercise("Bench", "chest").expect("exercise");
        let session = app
            .start_workout(&gym.gym_id, None, None)
            .expect("start");
        app.log_set(&session, &exercise.exercise_id, 1, 60.0, 8, None)
            .expect("log set");

        let retained = app.clear_history().expect("clear");
        assert_eq!(retained, 2);
        assert_eq!(app.gyms().len(), 1);
        assert_eq!(app.exercises().len(), 1);
        assert!(app.analytics(&exercise.exercise_id).is_empty());
        assert_eq!(app.warmup(&exercise.exercise_id), WarmupHint::NoHistory);
    }

    #[test]
    fn deleting_a_missing_template_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = open_app(&dir);
        let err = app.delete_template("T-missing").expect_err("must fail");
        assert!(err.to_string().contains("T-missing"));
    }
}
