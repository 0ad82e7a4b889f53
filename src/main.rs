use std::io::{self, Write};

use clap::Parser;

use liftlog::app::{App, AppError};
use liftlog::cli::{
    Cli, Commands, ExerciseCommands, GymCommands, PlanCommands, RotationCommands,
    TemplateCommands, WorkoutCommands,
};
use liftlog::views::warmup::WarmupHint;
use liftlog::{completions, logging};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    if let Err(message) = logging::init(&cli.log_level, &cli.log_dir) {
        eprintln!("warning: {message}");
    }

    let mut app = App::open(&cli.db, &cli.config)?;

    match cli.command {
        Commands::Gym { command } => match command {
            GymCommands::Add { name, location } => {
                let gym = app.create_gym(&name, &location)?;
                println!("created gym {} ({})", gym.gym_id, gym.name);
            }
            GymCommands::Ls => {
                for gym in app.gyms() {
                    println!("{}  {}  {}", gym.gym_id, gym.name, gym.location);
                }
            }
        },
        Commands::Exercise { command } => match command {
            ExerciseCommands::Add { name, muscle_group } => {
                let exercise = app.create_exercise(&name, &muscle_group)?;
                println!("created exercise {} ({})", exercise.exercise_id, exercise.name);
            }
            ExerciseCommands::Ls => {
                for exercise in app.exercises() {
                    println!(
                        "{}  {}  {}",
                        exercise.exercise_id, exercise.name, exercise.muscle_group
                    );
                }
            }
        },
        Commands::Template { command } => match command {
            TemplateCommands::Add { name, exercises } => {
                let template = app.create_template(&name, exercises)?;
                println!("created template {} ({})", template.template_id, template.name);
            }
            TemplateCommands::Rm { template_id } => {
                app.delete_template(&template_id)?;
                println!("deleted template {} (history kept)", template_id);
            }
            TemplateCommands::Ls => {
                for template in app.templates() {
                    println!(
                        "{}  {}  [{}]",
                        template.template_id,
                        template.name,
                        template.exercise_ids.join(", ")
                    );
                }
            }
        },
        Commands::Plan { command } => match command {
            PlanCommands::Add { name, exercises } => {
                let plan = app.create_plan(&name, exercises)?;
                println!("created plan {} ({})", plan.plan_id, plan.name);
            }
            PlanCommands::Ls => {
                for plan in app.plans() {
                    println!(
                        "{}  {}  [{}]",
                        plan.plan_id,
                        plan.name,
                        plan.exercise_ids.join(", ")
                    );
                }
            }
        },
        Commands::Rotation { command } => match command {
            RotationCommands::Add { name, plans } => {
                let rotation_id = app.create_rotation(&name, plans)?;
                println!("created rotation {} ({})", rotation_id, name);
            }
            RotationCommands::Activate { rotation_id } => {
                app.activate_rotation(&rotation_id)?;
                println!("activated rotation {}", rotation_id);
            }
            RotationCommands::Status => match app.rotation_status() {
                Some(status) => {
                    println!(
                        "{}: plan {} (position {} of {}){}",
                        status.name,
                        status.plan_id,
                        status.position,
                        status.total,
                        status
                            .gym_id
                            .as_deref()
                            .map(|gym| format!(" at {gym}"))
                            .unwrap_or_default()
                    );
                }
                None => println!("no active rotation"),
            },
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Start { gym, plan, template } => {
                let session_id =
                    app.start_workout(&gym, plan.as_deref(), template.as_deref())?;
                println!("started session {}", session_id);
            }
            WorkoutCommands::Set {
                session_id,
                exercise_id,
                number,
                weight,
                reps,
                rir,
            } => {
                app.log_set(&session_id, &exercise_id, number, weight, reps, rir)?;
                println!("logged set {} for {}: {}x{}", number, exercise_id, weight, reps);
            }
            WorkoutCommands::Note {
                session_id,
                exercise_id,
                text,
            } => {
                app.log_note(&exercise_id, &session_id, &text)?;
                println!("noted");
            }
            WorkoutCommands::Finish {
                session_id,
                discard,
            } => {
                let status = app.finish_workout(&session_id, !discard)?;
                println!(
                    "finished session {}{}",
                    session_id,
                    if discard { " (discarded)" } else { "" }
                );
                if let Some(status) = status {
                    println!(
                        "next up: plan {} (position {} of {})",
                        status.plan_id, status.position, status.total
                    );
                }
            }
        },
        Commands::Ghost(args) => {
            match app.ghost(&args.exercise_id, &args.gym, args.exclude_session.as_deref()) {
                Some(ghost) => print_json(&ghost),
                None => println!("no prior session for this exercise at this gym"),
            }
        }
        Commands::Warmup(args) => match app.warmup(&args.exercise_id) {
            WarmupHint::NoHistory => println!("no history yet for {}", args.exercise_id),
            WarmupHint::Steps(steps) => {
                for step in steps {
                    println!("{:>3}%  {:.1}", step.percent(), step.weight);
                }
            }
        },
        Commands::Analytics(args) => print_json(&app.analytics(&args.exercise_id)),
        Commands::Notes(args) => {
            for note in app.notes(&args.exercise_id) {
                println!("{}  [{}]\n  {}", note.logged_at, note.session_id, note.text);
            }
        }
        Commands::Stats => {
            let stats = app.stats();
            println!("{} events", stats.total);
            for (kind, count) in stats.by_kind {
                println!("{:>6}  {}", count, kind);
            }
        }
        Commands::Export(args) => {
            let outcome = app.export(&args.dir)?;
            println!("exported {} events to {}", outcome.events, outcome.path.display());
        }
        Commands::Import(args) => {
            let report = app.import(&args.file)?;
            println!("{}", report);
        }
        Commands::Checkpoint => {
            let summary = app.checkpoint()?;
            println!(
                "flushed {} events ({} persisted)",
                summary.flushed, summary.persisted_total
            );
        }
        Commands::ClearHistory(args) => {
            if !args.yes && !confirm("Erase all session history? Gyms and exercises are kept.")? {
                println!("aborted");
                return Ok(());
            }
            let remaining = app.clear_history()?;
            println!("history cleared, {} events remain", remaining);
        }
        Commands::Completions(_) => unreachable!("handled before opening the store"),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool, AppError> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
