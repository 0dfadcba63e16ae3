//! Core domain logic for meal routine planning.
//! This crate is the single source of truth for routine and meal slot invariants.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use identity::{IdentityError, IdentityProvider, StaticIdentity};
pub use logging::{
    default_log_level, init_from_config, init_logging, logging_status, LoggingError,
};
pub use model::meal::{
    AppliedMutation, DailyMeal, DailyMealId, MealAssignment, MealAssignmentId, MealState,
    MealType, MealValidationError, RecipeRef, RemovalPlan,
};
pub use model::routine::{
    ExitBlocker, LifecycleState, Routine, RoutineId, RoutineValidationError, StageProgress,
};
pub use repo::meal_repo::{MealRepository, SqliteMealRepository};
pub use repo::routine_repo::{
    AdvanceOutcome, RepoError, RepoResult, RoutineRepository, SqliteRoutineRepository,
};
pub use service::lifecycle_service::{select_day, LifecycleError, LifecycleService};
pub use service::meal_sections::{aggregate_by_meal_type, MealSection};
pub use service::meal_selection::{plan_removal, MealSelectionError, MealSelectionService};
pub use service::router::{decide_navigation, destination_for, Destination, LifecycleRouter};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Current wall-clock time as Unix epoch milliseconds.
///
/// Falls back to `0` when the system clock is before the epoch.
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

#[cfg(test)]
mod tests {
    use super::{core_version, now_epoch_ms};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn clock_is_after_epoch() {
        assert!(now_epoch_ms() > 0);
    }
}
