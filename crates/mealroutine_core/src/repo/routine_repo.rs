//! Routine/day repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist routines and their day rows.
//! - Select the active routine of a creator for a point in time.
//! - Advance a routine's stage atomically with its exit check.
//!
//! # Invariants
//! - Active selection uses `start_date <= now < end_date`, earliest
//!   `start_date` first, then `id`.
//! - Day listing is ordered by `date ASC, id ASC`.
//! - A routine holds at most one day per `date`, inside its own range.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::meal::{DailyMeal, DailyMealId, MealValidationError};
use crate::model::routine::{
    ExitBlocker, LifecycleState, Routine, RoutineId, RoutineValidationError, StageProgress,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ROUTINE_SELECT_SQL: &str = "SELECT
    id,
    creator_id,
    meal_routine_state,
    start_date,
    end_date,
    created_at
FROM meal_routines";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by routine and meal persistence.
#[derive(Debug)]
pub enum RepoError {
    InvalidRoutine(RoutineValidationError),
    InvalidMeal(MealValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRoutine(err) => write!(f, "{err}"),
            Self::InvalidMeal(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRoutine(err) => Some(err),
            Self::InvalidMeal(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<RoutineValidationError> for RepoError {
    fn from(value: RoutineValidationError) -> Self {
        Self::InvalidRoutine(value)
    }
}

impl From<MealValidationError> for RepoError {
    fn from(value: MealValidationError) -> Self {
        Self::InvalidMeal(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of an atomic stage advance attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// State moved one step; carries the updated routine.
    Advanced {
        from: LifecycleState,
        routine: Routine,
    },
    /// Exit condition of the current stage does not hold.
    Blocked {
        state: LifecycleState,
        blocker: ExitBlocker,
    },
    /// Routine is already `Complete`.
    Terminal,
}

/// Repository interface for routines and their day rows.
pub trait RoutineRepository {
    fn create_routine(&self, routine: &Routine) -> RepoResult<RoutineId>;
    fn get_routine(&self, id: RoutineId) -> RepoResult<Option<Routine>>;
    /// First routine of `creator_id` whose window contains `now`.
    fn find_active_routine(&self, creator_id: &str, now: i64) -> RepoResult<Option<Routine>>;
    fn create_daily_meal(&self, day: &DailyMeal) -> RepoResult<DailyMealId>;
    fn list_daily_meals(&self, routine_id: RoutineId) -> RepoResult<Vec<DailyMeal>>;
    fn stage_progress(&self, routine_id: RoutineId) -> RepoResult<StageProgress>;
    /// Checks the exit condition and moves one stage forward in one transaction.
    fn advance_state(&mut self, routine_id: RoutineId) -> RepoResult<AdvanceOutcome>;
}

/// SQLite-backed routine repository.
pub struct SqliteRoutineRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteRoutineRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RoutineRepository for SqliteRoutineRepository<'_> {
    fn create_routine(&self, routine: &Routine) -> RepoResult<RoutineId> {
        routine.validate()?;

        self.conn.execute(
            "INSERT INTO meal_routines (
                id,
                creator_id,
                meal_routine_state,
                start_date,
                end_date,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                routine.id.to_string(),
                routine.creator_id.as_str(),
                routine.state.as_str(),
                routine.start_date,
                routine.end_date,
                routine.created_at,
            ],
        )?;

        Ok(routine.id)
    }

    fn get_routine(&self, id: RoutineId) -> RepoResult<Option<Routine>> {
        load_routine(self.conn, id)
    }

    fn find_active_routine(&self, creator_id: &str, now: i64) -> RepoResult<Option<Routine>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ROUTINE_SELECT_SQL}
             WHERE creator_id = ?1
               AND start_date <= ?2
               AND end_date > ?2
             ORDER BY start_date ASC, id ASC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![creator_id, now])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_routine_row(row)?)),
            None => Ok(None),
        }
    }

    fn create_daily_meal(&self, day: &DailyMeal) -> RepoResult<DailyMealId> {
        let routine = load_routine(self.conn, day.routine_id)?.ok_or(RepoError::NotFound {
            entity: "routine",
            id: day.routine_id,
        })?;
        day.validate_within(&routine)?;

        if day_date_taken(self.conn, day.routine_id, day.date)? {
            return Err(MealValidationError::DuplicateDay {
                routine_id: day.routine_id,
                date: day.date,
            }
            .into());
        }

        self.conn.execute(
            "INSERT INTO daily_meals (id, routine_id, date, day)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                day.id.to_string(),
                day.routine_id.to_string(),
                day.date,
                day.day_label.as_str(),
            ],
        )?;

        Ok(day.id)
    }

    fn list_daily_meals(&self, routine_id: RoutineId) -> RepoResult<Vec<DailyMeal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, routine_id, date, day
             FROM daily_meals
             WHERE routine_id = ?1
             ORDER BY date ASC, id ASC;",
        )?;

        let mut rows = stmt.query([routine_id.to_string()])?;
        let mut days = Vec::new();
        while let Some(row) = rows.next()? {
            days.push(DailyMeal {
                id: parse_uuid(row, "id", "daily_meals.id")?,
                routine_id: parse_uuid(row, "routine_id", "daily_meals.routine_id")?,
                date: row.get("date")?,
                day_label: row.get("day")?,
            });
        }

        Ok(days)
    }

    fn stage_progress(&self, routine_id: RoutineId) -> RepoResult<StageProgress> {
        load_progress(self.conn, routine_id)
    }

    fn advance_state(&mut self, routine_id: RoutineId) -> RepoResult<AdvanceOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let routine = load_routine(&tx, routine_id)?.ok_or(RepoError::NotFound {
            entity: "routine",
            id: routine_id,
        })?;

        let Some(next) = routine.state.next() else {
            return Ok(AdvanceOutcome::Terminal);
        };

        let progress = load_progress(&tx, routine_id)?;
        if let Some(blocker) = routine.state.exit_blocker(&progress) {
            return Ok(AdvanceOutcome::Blocked {
                state: routine.state,
                blocker,
            });
        }

        tx.execute(
            "UPDATE meal_routines
             SET meal_routine_state = ?2
             WHERE id = ?1
               AND meal_routine_state = ?3;",
            params![routine_id.to_string(), next.as_str(), routine.state.as_str()],
        )?;
        tx.commit()?;

        let from = routine.state;
        Ok(AdvanceOutcome::Advanced {
            from,
            routine: routine.with_state(next),
        })
    }
}

fn load_routine(conn: &Connection, id: RoutineId) -> RepoResult<Option<Routine>> {
    conn.query_row(
        &format!("{ROUTINE_SELECT_SQL} WHERE id = ?1;"),
        [id.to_string()],
        |row| Ok(parse_routine_row(row)),
    )
    .optional()?
    .transpose()
}

fn load_progress(conn: &Connection, routine_id: RoutineId) -> RepoResult<StageProgress> {
    let progress = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(slots.slot_count = 0), 0),
            COALESCE(SUM(slots.slot_count), 0),
            COALESCE(SUM(slots.unfilled), 0)
         FROM (
            SELECT
                d.id,
                COUNT(m.id) AS slot_count,
                COALESCE(SUM(m.meal_state = 'PENDING_MEAL_SELECTION'), 0) AS unfilled
            FROM daily_meals d
            LEFT JOIN meals m ON m.daily_meal_id = d.id
            WHERE d.routine_id = ?1
            GROUP BY d.id
         ) AS slots;",
        [routine_id.to_string()],
        |row| {
            Ok(StageProgress {
                day_count: row.get(0)?,
                days_without_slots: row.get(1)?,
                slot_count: row.get(2)?,
                unfilled_slots: row.get(3)?,
            })
        },
    )?;
    Ok(progress)
}

fn day_date_taken(conn: &Connection, routine_id: RoutineId, date: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM daily_meals WHERE routine_id = ?1 AND date = ?2);",
        params![routine_id.to_string(), date],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_routine_row(row: &Row<'_>) -> RepoResult<Routine> {
    let state_text: String = row.get("meal_routine_state")?;
    let state = LifecycleState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid state `{state_text}` in meal_routines.meal_routine_state"
        ))
    })?;

    let routine = Routine {
        id: parse_uuid(row, "id", "meal_routines.id")?,
        creator_id: row.get("creator_id")?,
        state,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        created_at: row.get("created_at")?,
    };
    routine.validate()?;
    Ok(routine)
}

pub(crate) fn parse_uuid(row: &Row<'_>, column: &str, label: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {label}")))
}

pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
