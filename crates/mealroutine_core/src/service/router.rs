//! Lifecycle stage routing.
//!
//! # Responsibility
//! - Map every `LifecycleState` to exactly one wizard destination.
//! - Suppress navigation for states the caller already shows.
//! - Emit a decision once per change of the observed state.
//!
//! # Invariants
//! - The state-to-destination table is an exhaustive `match`; adding a
//!   state fails to compile until it is routed.
//! - An unchanged state never produces a second navigation.

use crate::model::routine::LifecycleState;
use log::debug;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Wizard stage screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    DateRange,
    MealSelection,
    Shopping,
    Confirmation,
    Viewing,
    Completion,
}

impl Destination {
    /// Route path understood by the host navigator.
    pub fn route(self) -> &'static str {
        match self {
            Self::DateRange => "mealroutine/states/1_selecting_date_range",
            Self::MealSelection => "mealroutine/states/2_selecting_meals_day",
            Self::Shopping => "mealroutine/states/3_shopping",
            Self::Confirmation => "mealroutine/states/4_confirm_creation",
            Self::Viewing => "mealroutine/states/5_viewing",
            Self::Completion => "mealroutine/states/6_complete",
        }
    }

    /// One-based wizard step number.
    pub fn stage_index(self) -> u8 {
        match self {
            Self::DateRange => 1,
            Self::MealSelection => 2,
            Self::Shopping => 3,
            Self::Confirmation => 4,
            Self::Viewing => 5,
            Self::Completion => 6,
        }
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.route())
    }
}

/// Fixed destination of a stage.
pub fn destination_for(state: LifecycleState) -> Destination {
    match state {
        LifecycleState::ActiveMealRoutineNull | LifecycleState::SelectingDateRange => {
            Destination::DateRange
        }
        LifecycleState::SelectingMeals => Destination::MealSelection,
        LifecycleState::Shopping => Destination::Shopping,
        LifecycleState::ConfirmCreation => Destination::Confirmation,
        LifecycleState::Viewing => Destination::Viewing,
        LifecycleState::Complete => Destination::Completion,
    }
}

/// Stateless decision: `None` when `state` is ignored, else its destination.
///
/// An empty `ignore` set ignores nothing.
pub fn decide_navigation(state: LifecycleState, ignore: &[LifecycleState]) -> Option<Destination> {
    if ignore.contains(&state) {
        return None;
    }
    Some(destination_for(state))
}

/// Change-detecting router bound to one host screen.
#[derive(Debug, Clone, Default)]
pub struct LifecycleRouter {
    ignore: Vec<LifecycleState>,
    last_seen: Option<LifecycleState>,
}

impl LifecycleRouter {
    /// Creates a router that never redirects away from `ignore` states.
    pub fn new(ignore: impl IntoIterator<Item = LifecycleState>) -> Self {
        Self {
            ignore: ignore.into_iter().collect(),
            last_seen: None,
        }
    }

    /// Feeds the latest resolved state.
    ///
    /// Returns a destination only when the state differs from the previous
    /// observation and is not ignored. Observations are handled in call order.
    pub fn observe(&mut self, state: LifecycleState) -> Option<Destination> {
        if self.last_seen == Some(state) {
            return None;
        }
        let previous = self.last_seen.replace(state);
        let decision = decide_navigation(state, &self.ignore);
        debug!(
            "event=lifecycle_route module=router previous={} state={state} destination={}",
            previous.map_or("none", LifecycleState::as_str),
            decision.map_or("none", Destination::route)
        );
        decision
    }

    pub fn last_seen(&self) -> Option<LifecycleState> {
        self.last_seen
    }

    /// Forgets the last observation, e.g. when the host screen is re-mounted.
    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{decide_navigation, destination_for, Destination, LifecycleRouter};
    use crate::model::routine::LifecycleState;

    #[test]
    fn every_state_maps_to_its_fixed_destination() {
        let expected = [
            (LifecycleState::ActiveMealRoutineNull, Destination::DateRange),
            (LifecycleState::SelectingDateRange, Destination::DateRange),
            (LifecycleState::SelectingMeals, Destination::MealSelection),
            (LifecycleState::Shopping, Destination::Shopping),
            (LifecycleState::ConfirmCreation, Destination::Confirmation),
            (LifecycleState::Viewing, Destination::Viewing),
            (LifecycleState::Complete, Destination::Completion),
        ];
        for (state, destination) in expected {
            assert_eq!(destination_for(state), destination);
            assert_eq!(decide_navigation(state, &[]), Some(destination));
        }
    }

    #[test]
    fn ignored_state_never_navigates() {
        assert_eq!(
            decide_navigation(
                LifecycleState::SelectingMeals,
                &[LifecycleState::SelectingMeals]
            ),
            None
        );
        for state in LifecycleState::ALL {
            assert_eq!(decide_navigation(state, &LifecycleState::ALL), None);
        }
    }

    #[test]
    fn sentinel_routes_to_date_range() {
        assert_eq!(
            decide_navigation(LifecycleState::ActiveMealRoutineNull, &[]).map(Destination::route),
            Some("mealroutine/states/1_selecting_date_range")
        );
    }

    #[test]
    fn router_navigates_once_per_state_change() {
        let mut router = LifecycleRouter::default();

        assert_eq!(
            router.observe(LifecycleState::SelectingMeals),
            Some(Destination::MealSelection)
        );
        assert_eq!(router.observe(LifecycleState::SelectingMeals), None);
        assert_eq!(router.observe(LifecycleState::SelectingMeals), None);
        assert_eq!(
            router.observe(LifecycleState::Shopping),
            Some(Destination::Shopping)
        );
        assert_eq!(
            router.observe(LifecycleState::SelectingMeals),
            Some(Destination::MealSelection)
        );
    }

    #[test]
    fn router_records_ignored_states_without_navigating() {
        let mut router = LifecycleRouter::new([LifecycleState::SelectingMeals]);

        assert_eq!(router.observe(LifecycleState::SelectingMeals), None);
        assert_eq!(router.last_seen(), Some(LifecycleState::SelectingMeals));
        assert_eq!(
            router.observe(LifecycleState::Shopping),
            Some(Destination::Shopping)
        );
        assert_eq!(router.observe(LifecycleState::Shopping), None);
    }

    #[test]
    fn reset_allows_the_same_state_to_navigate_again() {
        let mut router = LifecycleRouter::default();
        assert!(router.observe(LifecycleState::Viewing).is_some());
        assert!(router.observe(LifecycleState::Viewing).is_none());

        router.reset();
        assert_eq!(
            router.observe(LifecycleState::Viewing),
            Some(Destination::Viewing)
        );
    }
}
