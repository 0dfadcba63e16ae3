//! Day view grouping of meal slots.
//!
//! # Invariants
//! - Output always has four sections in `MealType::DISPLAY_ORDER`.
//! - Types without slots yield empty sections.
//! - Slot order inside a section follows input order.

use crate::model::meal::{MealAssignment, MealState, MealType};
use serde::Serialize;

/// Slots of one meal type for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealSection {
    pub meal_type: MealType,
    pub assignments: Vec<MealAssignment>,
}

impl MealSection {
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Slots eaten and waiting for a review; a section header marks the
    /// type as done once this is at least one.
    pub fn pending_review_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|assignment| assignment.state == MealState::PendingReview)
            .count()
    }

    /// True when nothing in the section has a recipe yet.
    pub fn is_awaiting_selection(&self) -> bool {
        self.assignments
            .iter()
            .all(|assignment| assignment.state == MealState::PendingMealSelection)
    }
}

/// Groups slots into BREAKFAST, LUNCH, DINNER, SNACK sections.
pub fn aggregate_by_meal_type(
    assignments: impl IntoIterator<Item = MealAssignment>,
) -> Vec<MealSection> {
    let mut sections: Vec<MealSection> = MealType::DISPLAY_ORDER
        .into_iter()
        .map(|meal_type| MealSection {
            meal_type,
            assignments: Vec::new(),
        })
        .collect();

    for assignment in assignments {
        // DISPLAY_ORDER lists every variant, so the slot always finds its section.
        if let Some(section) = sections
            .iter_mut()
            .find(|section| section.meal_type == assignment.meal_type)
        {
            section.assignments.push(assignment);
        }
    }

    sections
}
