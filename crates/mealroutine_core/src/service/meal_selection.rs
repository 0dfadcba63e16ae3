//! Meal slot removal use-case service.
//!
//! # Responsibility
//! - Decide whether removing a slot clears it or deletes it.
//! - Apply that decision through the repository's single transaction.
//! - Load a day's slots already grouped for display.
//!
//! # Invariants
//! - A day never loses the last slot of a meal type; it is cleared instead.
//! - Exactly one row is written per removal; failures write nothing.
//! - The store's same-type count is authoritative over the caller's view.

use crate::model::meal::{
    AppliedMutation, DailyMealId, MealAssignment, MealAssignmentId, RemovalPlan,
};
use crate::repo::meal_repo::MealRepository;
use crate::repo::routine_repo::RepoError;
use crate::service::meal_sections::{aggregate_by_meal_type, MealSection};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from slot removal.
#[derive(Debug)]
pub enum MealSelectionError {
    /// A sibling belongs to another day than the target.
    ForeignSibling {
        sibling_id: MealAssignmentId,
        expected_day: DailyMealId,
    },
    TargetNotFound(MealAssignmentId),
    /// Store transaction failed; nothing was changed.
    Store(RepoError),
}

impl Display for MealSelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignSibling {
                sibling_id,
                expected_day,
            } => write!(
                f,
                "meal assignment {sibling_id} does not belong to daily meal {expected_day}"
            ),
            Self::TargetNotFound(id) => write!(f, "meal assignment not found: {id}"),
            Self::Store(err) => write!(f, "meal removal failed: {err}"),
        }
    }
}

impl Error for MealSelectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for MealSelectionError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "meal assignment",
                id,
            } => Self::TargetNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Pure removal decision from the caller's view of the day.
///
/// `siblings` are the slots of the target's day; the target itself counts
/// whether or not it is listed.
pub fn plan_removal(
    target: &MealAssignment,
    siblings: &[MealAssignment],
) -> Result<RemovalPlan, MealSelectionError> {
    if let Some(foreign) = siblings
        .iter()
        .find(|sibling| sibling.daily_meal_id != target.daily_meal_id)
    {
        return Err(MealSelectionError::ForeignSibling {
            sibling_id: foreign.id,
            expected_day: target.daily_meal_id,
        });
    }

    let others = siblings
        .iter()
        .filter(|sibling| sibling.id != target.id && sibling.meal_type == target.meal_type)
        .count();
    Ok(RemovalPlan::for_same_type_count(others + 1))
}

/// Meal slot service facade over a meal repository.
pub struct MealSelectionService<R: MealRepository> {
    repo: R,
}

impl<R: MealRepository> MealSelectionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Removes `target` from its day.
    ///
    /// Clears the recipe when `target` is the last slot of its type, else
    /// deletes the row.
    ///
    /// # Errors
    /// - `ForeignSibling` before any write when `siblings` mix days.
    /// - `TargetNotFound` when the row no longer exists.
    /// - `Store` when the transaction fails; all rows stay unchanged.
    pub fn remove_assignment(
        &mut self,
        target: &MealAssignment,
        siblings: &[MealAssignment],
    ) -> Result<AppliedMutation, MealSelectionError> {
        let expected = plan_removal(target, siblings)?;

        let applied = self.repo.remove_assignment(target.id).map_err(|err| {
            error!(
                "event=meal_remove module=meal_selection status=error meal_type={} error={err}",
                target.meal_type
            );
            MealSelectionError::from(err)
        })?;

        if applied.plan() != expected {
            warn!(
                "event=meal_remove module=meal_selection status=stale_view meal_type={} expected={expected:?} applied={:?}",
                target.meal_type,
                applied.plan()
            );
        }
        info!(
            "event=meal_remove module=meal_selection status=ok meal_type={} applied={:?}",
            target.meal_type,
            applied.plan()
        );
        Ok(applied)
    }

    /// Slots of one day in insertion order.
    pub fn day_assignments(
        &self,
        daily_meal_id: DailyMealId,
    ) -> Result<Vec<MealAssignment>, MealSelectionError> {
        Ok(self.repo.list_assignments(daily_meal_id)?)
    }

    /// Slots of one day grouped into display sections.
    pub fn day_sections(
        &self,
        daily_meal_id: DailyMealId,
    ) -> Result<Vec<MealSection>, MealSelectionError> {
        Ok(aggregate_by_meal_type(self.day_assignments(daily_meal_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_removal, MealSelectionError};
    use crate::model::meal::{MealAssignment, MealState, MealType, RemovalPlan};
    use uuid::Uuid;

    #[test]
    fn only_slot_of_its_type_is_cleared() {
        let day = Uuid::new_v4();
        let lunch = MealAssignment::with_recipe(day, MealType::Lunch, "a", MealState::PendingReview);
        let dinner = MealAssignment::pending(day, MealType::Dinner);

        assert_eq!(
            plan_removal(&lunch, &[lunch.clone(), dinner]).unwrap(),
            RemovalPlan::ClearSelection
        );
    }

    #[test]
    fn one_of_many_same_type_slots_is_deleted() {
        let day = Uuid::new_v4();
        let first =
            MealAssignment::with_recipe(day, MealType::Breakfast, "a", MealState::PendingReview);
        let second =
            MealAssignment::with_recipe(day, MealType::Breakfast, "b", MealState::PendingReview);

        assert_eq!(
            plan_removal(&first, &[first.clone(), second.clone()]).unwrap(),
            RemovalPlan::DeleteRow
        );
        assert_eq!(plan_removal(&first, &[second]).unwrap(), RemovalPlan::DeleteRow);
        assert_eq!(plan_removal(&first, &[]).unwrap(), RemovalPlan::ClearSelection);
    }

    #[test]
    fn siblings_from_other_days_are_rejected() {
        let target = MealAssignment::pending(Uuid::new_v4(), MealType::Snack);
        let foreign = MealAssignment::pending(Uuid::new_v4(), MealType::Snack);

        assert!(matches!(
            plan_removal(&target, &[foreign.clone()]),
            Err(MealSelectionError::ForeignSibling { sibling_id, .. }) if sibling_id == foreign.id
        ));
    }
}
