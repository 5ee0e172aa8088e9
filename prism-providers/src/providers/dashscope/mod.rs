//! DashScope provider implementation
//!
//! Asynchronous image and video synthesis tasks plus text generation for
//! prompt enhancement, all over the DashScope REST API.

pub mod client;
pub mod enhancement;
pub mod generation;
pub mod types;

pub use client::{DashScopeClient, DEFAULT_BASE_URL};
pub use enhancement::{DashScopeEnhancementProvider, DEFAULT_TEXT_MODEL};
pub use generation::{DashScopeGenerationProvider, DEFAULT_IMAGE_MODEL, DEFAULT_VIDEO_MODEL};

pub(crate) const PROVIDER_NAME: &str = "dashscope";
