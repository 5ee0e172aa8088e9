//! Provider implementations
//!
//! Concrete implementations of the GenerationProvider and
//! EnhancementProvider traits.

pub mod dashscope;

pub use dashscope::{DashScopeClient, DashScopeEnhancementProvider, DashScopeGenerationProvider};
