//! The read-only engine context.
//!
//! Built once from a loaded catalog, then shared by reference or `Arc`
//! across any number of concurrent queries. Nothing in here mutates after
//! construction.

use chrono::{Local, NaiveDate};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::features::{normalize, FeatureNormalizer, NormalizedFeatureMatrix};
use crate::hybrid::HybridRecommender;
use crate::models::{CatalogStats, RecommendationResult, Track};
use crate::popularity::parse_release_date;
use crate::progress::format_duration;
use crate::similarity::SimilarityRanker;

/// Number of most-duplicated names listed in catalog stats.
const TOP_DUPLICATES: usize = 20;

pub struct RecommendationEngine {
    catalog: Catalog,
    normalizer: FeatureNormalizer,
    matrix: NormalizedFeatureMatrix,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(catalog: Catalog, config: EngineConfig) -> Self {
        let start = Instant::now();
        let (normalizer, matrix) = normalize(&catalog);
        let constant = normalizer.constant_columns();
        if !constant.is_empty() {
            info!(?constant, "constant feature columns normalize to 0");
        }
        info!(
            tracks = catalog.len(),
            "feature matrix ready in {}",
            format_duration(start.elapsed())
        );
        Self {
            catalog,
            normalizer,
            matrix,
            config,
        }
    }

    pub fn load(path: &Path, config: EngineConfig) -> Result<Self> {
        let catalog = Catalog::load(path)?;
        Ok(Self::new(catalog, config))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn matrix(&self) -> &NormalizedFeatureMatrix {
        &self.matrix
    }

    pub fn normalizer(&self) -> &FeatureNormalizer {
        &self.normalizer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ranker(&self) -> SimilarityRanker<'_> {
        SimilarityRanker::new(&self.catalog, &self.matrix)
    }

    pub fn hybrid(&self) -> HybridRecommender<'_> {
        HybridRecommender::new(self.ranker(), self.config.hybrid_mode)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tracks most similar to `track_name`, ordered by cosine similarity.
    pub fn get_content_based_recommendations(
        &self,
        track_name: &str,
        k: usize,
    ) -> Result<Vec<RecommendationResult>> {
        let seed = self.catalog.resolve(track_name, None)?;
        self.content_based_by_index(seed, k)
    }

    pub fn content_based_by_index(&self, seed: usize, k: usize) -> Result<Vec<RecommendationResult>> {
        let results: Vec<RecommendationResult> = self
            .ranker()
            .rank_by_index(seed, k)?
            .iter()
            .map(|s| RecommendationResult::from_scored(s, s.similarity))
            .collect();
        debug!(seed, k, returned = results.len(), "content-based query");
        Ok(results)
    }

    /// Hybrid recommendations relative to today's local date.
    pub fn get_hybrid_recommendations(
        &self,
        track_name: &str,
        k: usize,
        alpha: f64,
    ) -> Result<Vec<RecommendationResult>> {
        self.get_hybrid_recommendations_at(track_name, k, alpha, Local::now().date_naive())
    }

    pub fn get_hybrid_recommendations_at(
        &self,
        track_name: &str,
        k: usize,
        alpha: f64,
        now: NaiveDate,
    ) -> Result<Vec<RecommendationResult>> {
        let seed = self.catalog.resolve(track_name, None)?;
        self.hybrid_by_index(seed, k, alpha, now)
    }

    pub fn hybrid_by_index(
        &self,
        seed: usize,
        k: usize,
        alpha: f64,
        now: NaiveDate,
    ) -> Result<Vec<RecommendationResult>> {
        let results = self.hybrid().recommend_by_index(seed, k, alpha, now)?;
        debug!(
            seed,
            k,
            alpha,
            %now,
            mode = ?self.config.hybrid_mode,
            returned = results.len(),
            "hybrid query"
        );
        Ok(results)
    }

    /// "Did you mean" candidates using the configured limit and threshold.
    pub fn suggest(&self, query: &str) -> Vec<&Track> {
        self.catalog
            .suggest(
                query,
                self.config.suggestion_limit,
                self.config.min_suggestion_score,
            )
            .into_iter()
            .map(|(track, _)| track)
            .collect()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> CatalogStats {
        let tracks = self.catalog.tracks();

        let mut duplicates: Vec<(String, usize)> = self
            .catalog
            .name_index()
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, ids)| (name.clone(), ids.len()))
            .collect();
        duplicates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let invalid_dates = tracks
            .iter()
            .filter(|t| parse_release_date(&t.release_date).is_none())
            .count();
        let zero_norm = self
            .matrix
            .rows()
            .iter()
            .filter(|row| row.iter().all(|v| *v == 0.0))
            .count();

        let (pop_min, pop_max) = tracks.iter().fold(None, |acc: Option<(f64, f64)>, t| {
            Some(match acc {
                None => (t.popularity, t.popularity),
                Some((lo, hi)) => (lo.min(t.popularity), hi.max(t.popularity)),
            })
        })
        .unwrap_or((0.0, 0.0));

        let mut by_name: FxHashMap<&str, usize> = FxHashMap::default();
        for t in tracks {
            *by_name.entry(t.name.as_str()).or_default() += 1;
        }

        CatalogStats {
            total_tracks: tracks.len(),
            unique_names: by_name.len(),
            duplicated_names: duplicates.len(),
            rows_with_shared_name: duplicates.iter().map(|(_, n)| n).sum(),
            invalid_release_dates: invalid_dates,
            zero_norm_tracks: zero_norm,
            popularity_min: pop_min,
            popularity_max: pop_max,
            features: self.normalizer.column_stats(),
            top_duplicates: duplicates.into_iter().take(TOP_DUPLICATES).collect(),
        }
    }
}
