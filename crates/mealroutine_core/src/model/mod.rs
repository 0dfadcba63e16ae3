//! Domain model for meal routine planning.
//!
//! # Responsibility
//! - Define the records persisted for routines, day containers and meal slots.
//! - Own the lifecycle stage sequence and the per-slot selection invariant.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - `ActiveMealRoutineNull` is a resolver sentinel and is never persisted.
//! - A meal slot without a recipe is always `PendingMealSelection`.

pub mod meal;
pub mod routine;
