//! Meal slot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist meal slots of a day and list them in insertion order.
//! - Own the transactional removal of one slot.
//!
//! # Invariants
//! - Removal decides between clear and delete from the same-type count read
//!   inside its own immediate transaction.
//! - Removal writes exactly one row; a failed removal changes nothing.

use crate::model::meal::{
    AppliedMutation, DailyMealId, MealAssignment, MealAssignmentId, MealState, MealType,
    RemovalPlan,
};
use crate::repo::routine_repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

const MEAL_SELECT_SQL: &str = "SELECT
    id,
    daily_meal_id,
    meal_type,
    meal_state,
    recipe_id
FROM meals";

/// Repository interface for meal slots.
pub trait MealRepository {
    fn create_assignment(&self, assignment: &MealAssignment) -> RepoResult<MealAssignmentId>;
    fn get_assignment(&self, id: MealAssignmentId) -> RepoResult<Option<MealAssignment>>;
    /// Slots of one day in insertion order.
    fn list_assignments(&self, daily_meal_id: DailyMealId) -> RepoResult<Vec<MealAssignment>>;
    /// Clears or deletes one slot depending on its same-type siblings.
    fn remove_assignment(&mut self, id: MealAssignmentId) -> RepoResult<AppliedMutation>;
}

/// SQLite-backed meal slot repository.
pub struct SqliteMealRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteMealRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MealRepository for SqliteMealRepository<'_> {
    fn create_assignment(&self, assignment: &MealAssignment) -> RepoResult<MealAssignmentId> {
        assignment.validate()?;

        if !daily_meal_exists(self.conn, assignment.daily_meal_id)? {
            return Err(RepoError::NotFound {
                entity: "daily meal",
                id: assignment.daily_meal_id,
            });
        }

        self.conn.execute(
            "INSERT INTO meals (id, daily_meal_id, meal_type, meal_state, recipe_id)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                assignment.id.to_string(),
                assignment.daily_meal_id.to_string(),
                assignment.meal_type.as_str(),
                assignment.state.as_str(),
                assignment.recipe_ref.as_deref(),
            ],
        )?;

        Ok(assignment.id)
    }

    fn get_assignment(&self, id: MealAssignmentId) -> RepoResult<Option<MealAssignment>> {
        load_assignment(self.conn, id)
    }

    fn list_assignments(&self, daily_meal_id: DailyMealId) -> RepoResult<Vec<MealAssignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEAL_SELECT_SQL}
             WHERE daily_meal_id = ?1
             ORDER BY rowid ASC;"
        ))?;

        let mut rows = stmt.query([daily_meal_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_meal_row(row)?);
        }

        Ok(assignments)
    }

    fn remove_assignment(&mut self, id: MealAssignmentId) -> RepoResult<AppliedMutation> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut target = load_assignment(&tx, id)?.ok_or(RepoError::NotFound {
            entity: "meal assignment",
            id,
        })?;

        let same_type_count: i64 = tx.query_row(
            "SELECT COUNT(*)
             FROM meals
             WHERE daily_meal_id = ?1
               AND meal_type = ?2;",
            params![target.daily_meal_id.to_string(), target.meal_type.as_str()],
            |row| row.get(0),
        )?;
        let same_type_count = usize::try_from(same_type_count).map_err(|_| {
            RepoError::InvalidData(format!(
                "negative same-type count {same_type_count} for meal assignment {id}"
            ))
        })?;
        let plan = RemovalPlan::for_same_type_count(same_type_count);
        debug!(
            "event=meal_remove module=repo status=planned same_type_count={same_type_count} plan={plan:?}"
        );

        let applied = match plan {
            RemovalPlan::ClearSelection => {
                target.clear_selection();
                tx.execute(
                    "UPDATE meals
                     SET recipe_id = NULL,
                         meal_state = ?2
                     WHERE id = ?1;",
                    params![id.to_string(), MealState::PendingMealSelection.as_str()],
                )?;
                AppliedMutation::Cleared(target)
            }
            RemovalPlan::DeleteRow => {
                tx.execute("DELETE FROM meals WHERE id = ?1;", [id.to_string()])?;
                AppliedMutation::Deleted(id)
            }
        };

        tx.commit()?;
        Ok(applied)
    }
}

fn load_assignment(conn: &Connection, id: MealAssignmentId) -> RepoResult<Option<MealAssignment>> {
    conn.query_row(
        &format!("{MEAL_SELECT_SQL} WHERE id = ?1;"),
        [id.to_string()],
        |row| Ok(parse_meal_row(row)),
    )
    .optional()?
    .transpose()
}

fn daily_meal_exists(conn: &Connection, id: DailyMealId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM daily_meals WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_meal_row(row: &Row<'_>) -> RepoResult<MealAssignment> {
    let type_text: String = row.get("meal_type")?;
    let meal_type = MealType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid meal type `{type_text}` in meals.meal_type"))
    })?;

    let state_text: String = row.get("meal_state")?;
    let state = MealState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid meal state `{state_text}` in meals.meal_state"
        ))
    })?;

    let assignment = MealAssignment {
        id: parse_uuid(row, "id", "meals.id")?,
        daily_meal_id: parse_uuid(row, "daily_meal_id", "meals.daily_meal_id")?,
        meal_type,
        state,
        recipe_ref: row.get("recipe_id")?,
    };
    assignment.validate()?;
    Ok(assignment)
}
