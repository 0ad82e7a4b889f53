use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "lift")]
#[command(bin_name = "lift")]
#[command(version)]
#[command(about = "A local-first, event-sourced workout log")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "LIFTLOG_DB_PATH",
        default_value = ".liftlog/state.sqlite",
        help = "Path to the local SQLite durable store."
    )]
    pub db: String,

    #[arg(
        short = 'c',
        long,
        env = "LIFTLOG_CONFIG",
        default_value = ".liftlog/config.toml",
        help = "Path to the TOML config file (defaults apply when missing)."
    )]
    pub config: PathBuf,

    #[arg(
        long,
        env = "LIFTLOG_LOG_DIR",
        default_value = ".liftlog/logs",
        help = "Directory for rolling log files."
    )]
    pub log_dir: PathBuf,

    #[arg(
        long,
        env = "LIFTLOG_LOG_LEVEL",
        default_value = "info",
        help = "Log level: trace|debug|info|warn|error."
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Manage gyms.")]
    Gym {
        #[command(subcommand)]
        command: GymCommands,
    },
    #[command(about = "Manage exercises.")]
    Exercise {
        #[command(subcommand)]
        command: ExerciseCommands,
    },
    #[command(about = "Manage workout templates.")]
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    #[command(about = "Manage workout plans.")]
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    #[command(about = "Manage plan rotations.")]
    Rotation {
        #[command(subcommand)]
        command: RotationCommands,
    },
    #[command(about = "Start, log, and finish workout sessions.")]
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    #[command(about = "Show the previous session's sets for pre-fill.")]
    Ghost(GhostArgs),
    #[command(about = "Suggest warm-up weights for an exercise.")]
    Warmup(ExerciseArg),
    #[command(about = "Per-session top weight and volume for an exercise.")]
    Analytics(ExerciseArg),
    #[command(about = "Show logged notes for an exercise, newest first.")]
    Notes(ExerciseArg),
    #[command(about = "Show total and per-kind event counts.")]
    Stats,
    #[command(about = "Write a dated binary backup of the event log.")]
    Export(ExportArgs),
    #[command(about = "Merge a backup file into the local log.")]
    Import(ImportArgs),
    #[command(about = "Flush the in-memory log to durable storage.")]
    Checkpoint,
    #[command(about = "Erase session history, keeping gyms and exercises.")]
    ClearHistory(ClearHistoryArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Subcommand)]
pub enum GymCommands {
    #[command(about = "Register a gym.")]
    Add {
        name: String,
        #[arg(long, default_value = "", help = "Free-form location label.")]
        location: String,
    },
    #[command(about = "List gyms.")]
    Ls,
}

#[derive(Debug, Subcommand)]
pub enum ExerciseCommands {
    #[command(about = "Register an exercise.")]
    Add {
        name: String,
        #[arg(long, default_value = "", help = "Muscle group label.")]
        muscle_group: String,
    },
    #[command(about = "List exercises.")]
    Ls,
}

#[derive(Debug, Subcommand)]
pub enum TemplateCommands {
    #[command(about = "Create a workout template.")]
    Add {
        name: String,
        #[arg(long = "exercise", help = "Exercise id, repeatable.")]
        exercises: Vec<String>,
    },
    #[command(about = "Delete a template (its history stays queryable).")]
    Rm { template_id: String },
    #[command(about = "List live templates.")]
    Ls,
}

#[derive(Debug, Subcommand)]
pub enum PlanCommands {
    #[command(about = "Create a workout plan.")]
    Add {
        name: String,
        #[arg(long = "exercise", help = "Exercise id, repeatable.")]
        exercises: Vec<String>,
    },
    #[command(about = "List plans.")]
    Ls,
}

#[derive(Debug, Subcommand)]
pub enum RotationCommands {
    #[command(about = "Create a rotation over an ordered list of plans.")]
    Add {
        name: String,
        #[arg(long = "plan", required = true, help = "Plan id in rotation order, repeatable.")]
        plans: Vec<String>,
    },
    #[command(about = "Make a rotation the active one.")]
    Activate { rotation_id: String },
    #[command(about = "Show the active rotation's current plan and position.")]
    Status,
}

#[derive(Debug, Subcommand)]
pub enum WorkoutCommands {
    #[command(about = "Start a session at a gym.")]
    Start {
        #[arg(long, help = "Gym id for the session.")]
        gym: String,
        #[arg(long, help = "Plan the session follows, if any.")]
        plan: Option<String>,
        #[arg(long, help = "Template the session follows, if any.")]
        template: Option<String>,
    },
    #[command(about = "Log one set.")]
    Set {
        session_id: String,
        exercise_id: String,
        #[arg(long, help = "Set number within the exercise, 1-based.")]
        number: u32,
        #[arg(long, help = "Load in the unit you train in.")]
        weight: f64,
        #[arg(long)]
        reps: u32,
        #[arg(long, help = "Reps in reserve, if tracked.")]
        rir: Option<u32>,
    },
    #[command(about = "Attach a note to an exercise within a session.")]
    Note {
        session_id: String,
        exercise_id: String,
        text: String,
    },
    #[command(about = "Finish a session; saving it may advance the rotation.")]
    Finish {
        session_id: String,
        #[arg(long, help = "Discard the session instead of saving it.")]
        discard: bool,
    },
}

#[derive(Debug, Args)]
pub struct ExerciseArg {
    pub exercise_id: String,
}

#[derive(Debug, Args)]
pub struct GhostArgs {
    pub exercise_id: String,
    #[arg(long, help = "Gym the active session is at.")]
    pub gym: String,
    #[arg(long, help = "Active session id to exclude from the lookup.")]
    pub exclude_session: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(long, default_value = ".", help = "Directory to write the backup into.")]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ClearHistoryArgs {
    #[arg(long, help = "Skip the confirmation prompt.")]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name; detected from $SHELL when omitted.")]
    pub shell: Option<String>,
    #[arg(long, help = "Install into the shell's completion directory.")]
    pub install: bool,
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}
