//! Local data store repositories.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for routines and meals.
//! - Keep SQL details out of the lifecycle and meal selection services.
//!
//! # Invariants
//! - Writes validate records before touching SQL.
//! - Reads reject invalid persisted rows instead of masking them.
//! - Multi-statement decisions run inside one immediate transaction.

pub mod meal_repo;
pub mod routine_repo;
