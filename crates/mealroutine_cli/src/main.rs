//! CLI probe for a meal routine database.
//!
//! # Responsibility
//! - Inspect a local store without the app: stage, day sections, removal.
//! - Exercise core config, logging and services end to end.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mealroutine_core::db::{open_db_with_options, DbOptions};
use mealroutine_core::{
    decide_navigation, init_from_config, now_epoch_ms, select_day, CoreConfig, LifecycleService,
    LifecycleState, MealRepository, MealSelectionService, SqliteMealRepository,
    SqliteRoutineRepository,
};
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mealroutine", version, about = "Meal routine store probe")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides config and MEALROUTINE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the wizard stage of a creator and its destination
    Status {
        creator: String,
        /// Evaluation time in epoch ms (defaults to now)
        #[arg(long)]
        now: Option<i64>,
        /// States the caller already shows
        #[arg(long = "ignore", value_parser = parse_state)]
        ignore: Vec<LifecycleState>,
    },
    /// Print the meal sections of one day of the active routine
    Day {
        creator: String,
        /// Zero-based day index (defaults to the first day)
        #[arg(long)]
        index: Option<usize>,
        #[arg(long)]
        now: Option<i64>,
    },
    /// Remove one meal assignment from its day
    Remove { assignment: Uuid },
    /// Move a routine one stage forward
    Advance { routine: Uuid },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::default(),
    }
    .with_env_overrides()?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    init_from_config(&config.logging).context("failed to start logging")?;

    let Some(db_path) = config.database.path.clone() else {
        bail!("no database configured; pass --db or set MEALROUTINE_DB_PATH");
    };
    let mut conn = open_db_with_options(&db_path, DbOptions::from(&config.database))
        .with_context(|| format!("failed to open `{}`", db_path.display()))?;

    match cli.command {
        Commands::Status {
            creator,
            now,
            ignore,
        } => status(&mut conn, &creator, now.unwrap_or_else(now_epoch_ms), &ignore),
        Commands::Day {
            creator,
            index,
            now,
        } => day(&mut conn, &creator, index, now.unwrap_or_else(now_epoch_ms)),
        Commands::Remove { assignment } => remove(&mut conn, assignment),
        Commands::Advance { routine } => {
            let repo = SqliteRoutineRepository::try_new(&mut conn)?;
            let advanced = LifecycleService::new(repo).advance(routine)?;
            println!("state={}", advanced.state);
            Ok(())
        }
    }
}

fn status(
    conn: &mut Connection,
    creator: &str,
    now: i64,
    ignore: &[LifecycleState],
) -> anyhow::Result<()> {
    let repo = SqliteRoutineRepository::try_new(conn)?;
    let state = LifecycleService::new(repo).resolve_lifecycle_state(creator, now)?;
    println!("state={state}");
    match decide_navigation(state, ignore) {
        Some(destination) => println!("navigate={}", destination.route()),
        None => println!("navigate=none"),
    }
    Ok(())
}

fn day(
    conn: &mut Connection,
    creator: &str,
    index: Option<usize>,
    now: i64,
) -> anyhow::Result<()> {
    let days = {
        let repo = SqliteRoutineRepository::try_new(conn)?;
        let service = LifecycleService::new(repo);
        let Some(routine) = service.active_routine(creator, now)? else {
            bail!("creator `{creator}` has no active routine");
        };
        service.routine_days(routine.id)?
    };
    let Some(selected) = select_day(&days, index) else {
        bail!("day index {} is out of range ({} days)", index.unwrap_or(0), days.len());
    };

    let repo = SqliteMealRepository::try_new(conn)?;
    let sections = MealSelectionService::new(repo).day_sections(selected.id)?;
    println!("day={} date={}", selected.day_label, selected.date);
    for section in sections {
        let marker = if section.pending_review_count() > 0 { " [done]" } else { "" };
        println!("{}{marker}", section.meal_type);
        if section.is_awaiting_selection() {
            println!("  (nothing to show)");
            continue;
        }
        for assignment in &section.assignments {
            println!(
                "  {} {} {}",
                assignment.id,
                assignment.state,
                assignment.recipe_ref.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn remove(conn: &mut Connection, assignment_id: Uuid) -> anyhow::Result<()> {
    let repo = SqliteMealRepository::try_new(conn)?;
    let Some(target) = repo.get_assignment(assignment_id)? else {
        bail!("meal assignment {assignment_id} not found");
    };
    let siblings = repo.list_assignments(target.daily_meal_id)?;

    let applied = MealSelectionService::new(repo).remove_assignment(&target, &siblings)?;
    println!("applied={:?} id={}", applied.plan(), applied.assignment_id());
    Ok(())
}

fn parse_state(value: &str) -> Result<LifecycleState, String> {
    LifecycleState::parse(&value.trim().to_ascii_uppercase())
        .ok_or_else(|| format!("unknown lifecycle state `{value}`"))
}
