//! Core use-case services.
//!
//! # Responsibility
//! - Resolve and route lifecycle stages.
//! - Group and remove meal slots for day views.
//! - Keep presentation callers decoupled from storage details.

pub mod lifecycle_service;
pub mod meal_sections;
pub mod meal_selection;
pub mod router;
