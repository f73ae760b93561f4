//! Song recommendation library - shared modules for all binaries.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod hybrid;
pub mod models;
pub mod normalize;
pub mod popularity;
pub mod progress;
pub mod safety;
pub mod similarity;

#[cfg(test)]
mod test_support;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use engine::RecommendationEngine;
pub use error::{RecommendError, Result};
pub use hybrid::HybridMode;
pub use models::{RecommendationResult, Track};
