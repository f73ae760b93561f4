//! Engine configuration.
//!
//! Values come from an optional TOML file; CLI flags override them in
//! `main.rs`. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! default_k = 5
//! default_alpha = 0.5
//! hybrid_mode = "popularity_rerank"   # or "blend"
//! suggestion_limit = 5
//! min_suggestion_score = 0.75
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{RecommendError, Result};
use crate::hybrid::HybridMode;

pub const DEFAULT_K: usize = 5;
pub const DEFAULT_ALPHA: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub default_k: usize,
    pub default_alpha: f64,
    pub hybrid_mode: HybridMode,
    pub suggestion_limit: usize,
    pub min_suggestion_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_k: DEFAULT_K,
            default_alpha: DEFAULT_ALPHA,
            hybrid_mode: HybridMode::default(),
            suggestion_limit: 5,
            min_suggestion_score: 0.75,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_k == 0 {
            return Err(RecommendError::Config(
                "default_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.default_alpha) {
            return Err(RecommendError::Config(format!(
                "default_alpha must be within [0, 1], got {}",
                self.default_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.min_suggestion_score) {
            return Err(RecommendError::Config(format!(
                "min_suggestion_score must be within [0, 1], got {}",
                self.min_suggestion_score
            )));
        }
        Ok(())
    }
}
