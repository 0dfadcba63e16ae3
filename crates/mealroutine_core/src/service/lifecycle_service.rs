//! Routine lifecycle use-case service.
//!
//! # Responsibility
//! - Resolve the wizard stage of a creator from the active routine.
//! - Advance a routine one stage when its exit condition holds.
//! - Pick the day shown by day views.
//!
//! # Invariants
//! - No active routine resolves to `ActiveMealRoutineNull`, never an error.
//! - Resolution is read-only.
//! - Advancement is forward-only and one step at a time.

use crate::identity::{IdentityError, IdentityProvider};
use crate::model::meal::DailyMeal;
use crate::model::routine::{ExitBlocker, LifecycleState, Routine, RoutineId};
use crate::repo::routine_repo::{AdvanceOutcome, RepoError, RoutineRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    Identity(IdentityError),
    /// Store read or write failed.
    Repo(RepoError),
    RoutineNotFound(RoutineId),
    AlreadyComplete(RoutineId),
    ExitConditionNotMet {
        routine_id: RoutineId,
        state: LifecycleState,
        blocker: ExitBlocker,
    },
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::RoutineNotFound(id) => write!(f, "routine not found: {id}"),
            Self::AlreadyComplete(id) => write!(f, "routine already complete: {id}"),
            Self::ExitConditionNotMet {
                routine_id,
                state,
                blocker,
            } => write!(f, "routine {routine_id} cannot leave {state}: {blocker}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Identity(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IdentityError> for LifecycleError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "routine",
                id,
            } => Self::RoutineNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Lifecycle service facade over a routine repository.
pub struct LifecycleService<R: RoutineRepository> {
    repo: R,
}

impl<R: RoutineRepository> LifecycleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the routine of `creator_id` active at `now` (epoch ms).
    pub fn active_routine(
        &self,
        creator_id: &str,
        now: i64,
    ) -> Result<Option<Routine>, LifecycleError> {
        Ok(self.repo.find_active_routine(creator_id, now)?)
    }

    /// Resolves the wizard stage of `creator_id` at `now` (epoch ms).
    ///
    /// # Errors
    /// - `Repo` when the store read fails or exceeds the busy timeout.
    pub fn resolve_lifecycle_state(
        &self,
        creator_id: &str,
        now: i64,
    ) -> Result<LifecycleState, LifecycleError> {
        let started_at = Instant::now();
        let routine = self.active_routine(creator_id, now).inspect_err(|err| {
            warn!(
                "event=lifecycle_resolve module=lifecycle status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
        })?;

        let state = routine
            .as_ref()
            .map_or(LifecycleState::ActiveMealRoutineNull, |routine| routine.state);
        info!(
            "event=lifecycle_resolve module=lifecycle status=ok state={state} has_routine={} duration_ms={}",
            routine.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(state)
    }

    /// Resolves the current user through `identity`, then their stage.
    pub fn resolve_current(
        &self,
        identity: &dyn IdentityProvider,
        now: i64,
    ) -> Result<LifecycleState, LifecycleError> {
        let creator_id = identity.current_user_id()?;
        self.resolve_lifecycle_state(&creator_id, now)
    }

    /// Moves a routine one stage forward.
    ///
    /// # Errors
    /// - `AlreadyComplete` for terminal routines.
    /// - `ExitConditionNotMet` when the current stage is not finished.
    pub fn advance(&mut self, routine_id: RoutineId) -> Result<Routine, LifecycleError> {
        match self.repo.advance_state(routine_id)? {
            AdvanceOutcome::Advanced { from, routine } => {
                info!(
                    "event=lifecycle_advance module=lifecycle status=ok from={from} to={}",
                    routine.state
                );
                Ok(routine)
            }
            AdvanceOutcome::Blocked { state, blocker } => {
                info!(
                    "event=lifecycle_advance module=lifecycle status=blocked state={state} blocker={blocker:?}"
                );
                Err(LifecycleError::ExitConditionNotMet {
                    routine_id,
                    state,
                    blocker,
                })
            }
            AdvanceOutcome::Terminal => Err(LifecycleError::AlreadyComplete(routine_id)),
        }
    }

    /// Day rows of a routine ordered by date.
    pub fn routine_days(&self, routine_id: RoutineId) -> Result<Vec<DailyMeal>, LifecycleError> {
        Ok(self.repo.list_daily_meals(routine_id)?)
    }
}

/// Picks the day a day view shows: `day_index` when given, else the first.
///
/// Returns `None` for an empty routine or an out-of-range index.
pub fn select_day(days: &[DailyMeal], day_index: Option<usize>) -> Option<&DailyMeal> {
    days.get(day_index.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::select_day;
    use crate::model::meal::DailyMeal;
    use uuid::Uuid;

    #[test]
    fn select_day_defaults_to_first_and_rejects_out_of_range() {
        let routine_id = Uuid::new_v4();
        let days = vec![
            DailyMeal::new(routine_id, 1_000, "Monday"),
            DailyMeal::new(routine_id, 2_000, "Tuesday"),
        ];

        assert_eq!(select_day(&days, None).map(|day| day.date), Some(1_000));
        assert_eq!(select_day(&days, Some(1)).map(|day| day.date), Some(2_000));
        assert_eq!(select_day(&days, Some(2)), None);
        assert_eq!(select_day(&[], None), None);
    }
}
