//! Service Layer
//!
//! Request orchestration lives here so route handlers stay thin and only
//! translate between HTTP shapes and [`GenerationService`] calls.

mod generation;

pub use generation::*;
