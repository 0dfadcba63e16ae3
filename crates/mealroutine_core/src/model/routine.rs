//! Routine and lifecycle stage model.
//!
//! # Responsibility
//! - Define the `Routine` record and its `LifecycleState` stage value.
//! - Expose the forward stage sequence used by resolver, router and advance.
//!
//! # Invariants
//! - `start_date` is strictly earlier than `end_date`.
//! - Stage order is fixed: sentinel, date range, meals, shopping, confirm,
//!   viewing, complete.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a routine row.
pub type RoutineId = Uuid;

/// Wizard stage a routine is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    /// No active routine exists for the creator.
    ActiveMealRoutineNull,
    SelectingDateRange,
    SelectingMeals,
    Shopping,
    ConfirmCreation,
    Viewing,
    /// Terminal stage.
    Complete,
}

impl LifecycleState {
    /// All stages in forward order.
    pub const ALL: [LifecycleState; 7] = [
        Self::ActiveMealRoutineNull,
        Self::SelectingDateRange,
        Self::SelectingMeals,
        Self::Shopping,
        Self::ConfirmCreation,
        Self::Viewing,
        Self::Complete,
    ];

    /// Zero-based position in the forward sequence.
    pub fn ordinal(self) -> usize {
        match self {
            Self::ActiveMealRoutineNull => 0,
            Self::SelectingDateRange => 1,
            Self::SelectingMeals => 2,
            Self::Shopping => 3,
            Self::ConfirmCreation => 4,
            Self::Viewing => 5,
            Self::Complete => 6,
        }
    }

    /// Returns the following stage, or `None` for `Complete`.
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Complete
    }

    /// Whether this value can be stored on a routine row.
    pub fn is_persistable(self) -> bool {
        self != Self::ActiveMealRoutineNull
    }

    /// Canonical stored/serialized name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActiveMealRoutineNull => "ACTIVE_MEAL_ROUTINE_NULL",
            Self::SelectingDateRange => "SELECTING_DATE_RANGE",
            Self::SelectingMeals => "SELECTING_MEALS",
            Self::Shopping => "SHOPPING",
            Self::ConfirmCreation => "CONFIRM_CREATION",
            Self::Viewing => "VIEWING",
            Self::Complete => "COMPLETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == value)
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation error for routine records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineValidationError {
    /// Creator id is blank after trim.
    EmptyCreator,
    /// Date range is empty or inverted.
    InvalidDateRange { start_date: i64, end_date: i64 },
    /// The resolver sentinel was used as a stored state.
    SentinelState,
}

impl Display for RoutineValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCreator => write!(f, "routine creator_id must not be blank"),
            Self::InvalidDateRange {
                start_date,
                end_date,
            } => write!(
                f,
                "routine start_date ({start_date}) must be earlier than end_date ({end_date})"
            ),
            Self::SentinelState => write!(
                f,
                "routine state must not be {}",
                LifecycleState::ActiveMealRoutineNull
            ),
        }
    }
}

impl Error for RoutineValidationError {}

/// A user's planned meal schedule over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: RoutineId,
    /// Identity-provider user id that owns this routine.
    pub creator_id: String,
    pub state: LifecycleState,
    /// Unix epoch milliseconds, inclusive.
    pub start_date: i64,
    /// Unix epoch milliseconds, exclusive.
    pub end_date: i64,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Routine {
    /// Creates a routine in `SelectingDateRange` with a generated id.
    pub fn new(
        creator_id: impl Into<String>,
        start_date: i64,
        end_date: i64,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator_id: creator_id.into(),
            state: LifecycleState::SelectingDateRange,
            start_date,
            end_date,
            created_at,
        }
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    /// Half-open window check: `start_date <= now < end_date`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.start_date <= now && now < self.end_date
    }

    pub fn validate(&self) -> Result<(), RoutineValidationError> {
        if self.creator_id.trim().is_empty() {
            return Err(RoutineValidationError::EmptyCreator);
        }
        if self.start_date >= self.end_date {
            return Err(RoutineValidationError::InvalidDateRange {
                start_date: self.start_date,
                end_date: self.end_date,
            });
        }
        if !self.state.is_persistable() {
            return Err(RoutineValidationError::SentinelState);
        }
        Ok(())
    }
}

/// Snapshot of how far a routine's days and slots have been filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageProgress {
    pub day_count: u32,
    /// Days that have no meal slot at all.
    pub days_without_slots: u32,
    pub slot_count: u32,
    /// Slots still in `PendingMealSelection`.
    pub unfilled_slots: u32,
}

/// Reason a routine cannot leave its current stage yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitBlocker {
    /// Date range produced no day rows.
    NoDays,
    /// Some days have no slots.
    DaysWithoutSlots(u32),
    /// Some slots still await a recipe.
    UnfilledSlots(u32),
}

impl Display for ExitBlocker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDays => write!(f, "routine has no days"),
            Self::DaysWithoutSlots(count) => write!(f, "{count} day(s) have no meal slots"),
            Self::UnfilledSlots(count) => write!(f, "{count} meal slot(s) have no recipe"),
        }
    }
}

impl LifecycleState {
    /// Checks whether a routine in this stage may move to `next()`.
    ///
    /// Stages after meal selection exit on explicit user confirmation only.
    pub fn exit_blocker(self, progress: &StageProgress) -> Option<ExitBlocker> {
        match self {
            Self::SelectingDateRange if progress.day_count == 0 => Some(ExitBlocker::NoDays),
            Self::SelectingMeals if progress.day_count == 0 => Some(ExitBlocker::NoDays),
            Self::SelectingMeals if progress.days_without_slots > 0 => {
                Some(ExitBlocker::DaysWithoutSlots(progress.days_without_slots))
            }
            Self::SelectingMeals if progress.unfilled_slots > 0 => {
                Some(ExitBlocker::UnfilledSlots(progress.unfilled_slots))
            }
            _ => None,
        }
    }
}
