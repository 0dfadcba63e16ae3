//! Day containers and meal slot model.
//!
//! # Responsibility
//! - Define `DailyMeal` (one calendar day of a routine) and `MealAssignment`
//!   (one meal-type slot of that day).
//! - Validate the recipe/selection-state invariant of a slot.
//!
//! # Invariants
//! - A day's `date` lies inside its routine's `[start_date, end_date)`.
//! - `recipe_ref == None` implies `state == PendingMealSelection`.
//! - `recipe_ref == Some(_)` implies `state != PendingMealSelection`.

use crate::model::routine::{Routine, RoutineId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DailyMealId = Uuid;
pub type MealAssignmentId = Uuid;

/// Opaque reference into the external recipe domain.
pub type RecipeRef = String;

/// Meal-type category of a slot. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Fixed display order for day views.
    pub const DISPLAY_ORDER: [MealType; 4] =
        [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "BREAKFAST",
            Self::Lunch => "LUNCH",
            Self::Dinner => "DINNER",
            Self::Snack => "SNACK",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::DISPLAY_ORDER
            .into_iter()
            .find(|meal_type| meal_type.as_str() == value)
    }
}

impl Display for MealType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection/consumption state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealState {
    /// No recipe chosen yet.
    PendingMealSelection,
    /// Recipe chosen and eaten, awaiting a review.
    PendingReview,
    Reviewed,
}

impl MealState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingMealSelection => "PENDING_MEAL_SELECTION",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Reviewed => "REVIEWED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING_MEAL_SELECTION" => Some(Self::PendingMealSelection),
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "REVIEWED" => Some(Self::Reviewed),
            _ => None,
        }
    }
}

impl Display for MealState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar day inside a routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMeal {
    pub id: DailyMealId,
    /// Non-owning back-reference to the parent routine.
    pub routine_id: RoutineId,
    /// Unix epoch milliseconds of the day.
    pub date: i64,
    /// Human label for the day, e.g. `Monday`.
    pub day_label: String,
}

impl DailyMeal {
    pub fn new(routine_id: RoutineId, date: i64, day_label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            routine_id,
            date,
            day_label: day_label.into(),
        }
    }

    /// Checks that the day belongs to `routine` and falls inside its range.
    pub fn validate_within(&self, routine: &Routine) -> Result<(), MealValidationError> {
        if self.routine_id != routine.id {
            return Err(MealValidationError::ForeignRoutine {
                day_id: self.id,
                routine_id: routine.id,
            });
        }
        if self.date < routine.start_date || self.date >= routine.end_date {
            return Err(MealValidationError::DayOutsideRoutine {
                date: self.date,
                start_date: routine.start_date,
                end_date: routine.end_date,
            });
        }
        Ok(())
    }
}

/// Validation error for meal slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealValidationError {
    /// Slot without recipe is not awaiting selection.
    MissingRecipe {
        id: MealAssignmentId,
        state: MealState,
    },
    /// Slot with recipe still claims to await selection.
    UnexpectedRecipe { id: MealAssignmentId },
    /// Recipe reference is blank.
    EmptyRecipeRef { id: MealAssignmentId },
    /// Day row points at a different routine than the one checked against.
    ForeignRoutine {
        day_id: DailyMealId,
        routine_id: RoutineId,
    },
    /// Day date is outside the routine's `[start_date, end_date)`.
    DayOutsideRoutine {
        date: i64,
        start_date: i64,
        end_date: i64,
    },
    /// Routine already has a day with this date.
    DuplicateDay { routine_id: RoutineId, date: i64 },
}

impl Display for MealValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRecipe { id, state } => write!(
                f,
                "meal assignment {id} has no recipe but state {state}"
            ),
            Self::UnexpectedRecipe { id } => write!(
                f,
                "meal assignment {id} has a recipe but is still {}",
                MealState::PendingMealSelection
            ),
            Self::EmptyRecipeRef { id } => {
                write!(f, "meal assignment {id} has a blank recipe reference")
            }
            Self::ForeignRoutine { day_id, routine_id } => {
                write!(f, "daily meal {day_id} does not belong to routine {routine_id}")
            }
            Self::DayOutsideRoutine {
                date,
                start_date,
                end_date,
            } => write!(
                f,
                "day {date} is outside routine range [{start_date}, {end_date})"
            ),
            Self::DuplicateDay { routine_id, date } => {
                write!(f, "routine {routine_id} already has a day at {date}")
            }
        }
    }
}

impl Error for MealValidationError {}

/// One meal-type slot of a day, optionally bound to a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealAssignment {
    pub id: MealAssignmentId,
    pub daily_meal_id: DailyMealId,
    pub meal_type: MealType,
    pub state: MealState,
    pub recipe_ref: Option<RecipeRef>,
}

impl MealAssignment {
    /// Creates an empty slot awaiting selection.
    pub fn pending(daily_meal_id: DailyMealId, meal_type: MealType) -> Self {
        Self {
            id: Uuid::new_v4(),
            daily_meal_id,
            meal_type,
            state: MealState::PendingMealSelection,
            recipe_ref: None,
        }
    }

    /// Creates a slot already bound to a recipe.
    pub fn with_recipe(
        daily_meal_id: DailyMealId,
        meal_type: MealType,
        recipe_ref: impl Into<RecipeRef>,
        state: MealState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            daily_meal_id,
            meal_type,
            state,
            recipe_ref: Some(recipe_ref.into()),
        }
    }

    /// Drops the recipe and returns the slot to selection.
    pub fn clear_selection(&mut self) {
        self.recipe_ref = None;
        self.state = MealState::PendingMealSelection;
    }

    pub fn has_recipe(&self) -> bool {
        self.recipe_ref.is_some()
    }

    pub fn validate(&self) -> Result<(), MealValidationError> {
        match (&self.recipe_ref, self.state) {
            (None, MealState::PendingMealSelection) => Ok(()),
            (None, state) => Err(MealValidationError::MissingRecipe { id: self.id, state }),
            (Some(_), MealState::PendingMealSelection) => {
                Err(MealValidationError::UnexpectedRecipe { id: self.id })
            }
            (Some(recipe), _) if recipe.trim().is_empty() => {
                Err(MealValidationError::EmptyRecipeRef { id: self.id })
            }
            (Some(_), _) => Ok(()),
        }
    }
}

/// Write chosen when a slot is removed from a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPlan {
    /// Last slot of its type: keep the row, drop the recipe.
    ClearSelection,
    /// Other slots of the same type remain: delete the row.
    DeleteRow,
}

impl RemovalPlan {
    /// Chooses the write from the number of same-type slots on the day,
    /// the removed slot included.
    pub fn for_same_type_count(count: usize) -> Self {
        if count > 1 {
            Self::DeleteRow
        } else {
            Self::ClearSelection
        }
    }
}

/// Write that a removal actually committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedMutation {
    /// Row kept and returned to selection; carries the updated row.
    Cleared(MealAssignment),
    /// Row deleted.
    Deleted(MealAssignmentId),
}

impl AppliedMutation {
    pub fn plan(&self) -> RemovalPlan {
        match self {
            Self::Cleared(_) => RemovalPlan::ClearSelection,
            Self::Deleted(_) => RemovalPlan::DeleteRow,
        }
    }

    pub fn assignment_id(&self) -> MealAssignmentId {
        match self {
            Self::Cleared(assignment) => assignment.id,
            Self::Deleted(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DailyMeal, MealAssignment, MealState, MealType, MealValidationError, RemovalPlan,
    };
    use crate::model::routine::Routine;
    use uuid::Uuid;

    #[test]
    fn day_must_fall_inside_its_routine_range() {
        let routine = Routine::new("u1", 1_000, 3_000, 0);

        assert!(DailyMeal::new(routine.id, 1_000, "Monday")
            .validate_within(&routine)
            .is_ok());
        assert!(DailyMeal::new(routine.id, 2_999, "Tuesday")
            .validate_within(&routine)
            .is_ok());
        assert!(matches!(
            DailyMeal::new(routine.id, 3_000, "Wednesday").validate_within(&routine),
            Err(MealValidationError::DayOutsideRoutine { date: 3_000, .. })
        ));
        assert!(matches!(
            DailyMeal::new(routine.id, 999, "Sunday").validate_within(&routine),
            Err(MealValidationError::DayOutsideRoutine { .. })
        ));
        assert!(matches!(
            DailyMeal::new(Uuid::new_v4(), 1_000, "Monday").validate_within(&routine),
            Err(MealValidationError::ForeignRoutine { .. })
        ));
    }

    #[test]
    fn pending_slot_is_valid_and_has_no_recipe() {
        let slot = MealAssignment::pending(Uuid::new_v4(), MealType::Lunch);
        assert!(slot.validate().is_ok());
        assert!(!slot.has_recipe());
    }

    #[test]
    fn validate_enforces_recipe_state_invariant() {
        let day = Uuid::new_v4();

        let mut missing = MealAssignment::pending(day, MealType::Dinner);
        missing.state = MealState::PendingReview;
        assert!(matches!(
            missing.validate(),
            Err(MealValidationError::MissingRecipe { .. })
        ));

        let mut unexpected =
            MealAssignment::with_recipe(day, MealType::Dinner, "recipe-a", MealState::PendingReview);
        unexpected.state = MealState::PendingMealSelection;
        assert!(matches!(
            unexpected.validate(),
            Err(MealValidationError::UnexpectedRecipe { .. })
        ));

        let blank = MealAssignment::with_recipe(day, MealType::Snack, " ", MealState::Reviewed);
        assert!(matches!(
            blank.validate(),
            Err(MealValidationError::EmptyRecipeRef { .. })
        ));
    }

    #[test]
    fn clear_selection_restores_pending_state() {
        let mut slot = MealAssignment::with_recipe(
            Uuid::new_v4(),
            MealType::Breakfast,
            "recipe-a",
            MealState::PendingReview,
        );
        slot.clear_selection();
        assert_eq!(slot.recipe_ref, None);
        assert_eq!(slot.state, MealState::PendingMealSelection);
        assert!(slot.validate().is_ok());
    }

    #[test]
    fn display_order_is_breakfast_lunch_dinner_snack() {
        let names: Vec<&str> = MealType::DISPLAY_ORDER
            .iter()
            .map(|meal_type| meal_type.as_str())
            .collect();
        assert_eq!(names, ["BREAKFAST", "LUNCH", "DINNER", "SNACK"]);
        assert_eq!(MealType::parse("SNACK"), Some(MealType::Snack));
        assert_eq!(MealType::parse("BRUNCH"), None);
    }

    #[test]
    fn removal_plan_keeps_the_last_slot_of_a_type() {
        assert_eq!(RemovalPlan::for_same_type_count(1), RemovalPlan::ClearSelection);
        assert_eq!(RemovalPlan::for_same_type_count(2), RemovalPlan::DeleteRow);
        assert_eq!(RemovalPlan::for_same_type_count(0), RemovalPlan::ClearSelection);
    }
}
