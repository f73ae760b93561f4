//! Cosine-similarity ranking over the normalized feature matrix.

use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::error::{RecommendError, Result};
use crate::features::NormalizedFeatureMatrix;
use crate::models::ScoredTrack;

/// Cosine similarity of two vectors. Defined as 0.0 when either norm is 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Ranks catalog tracks by similarity to a seed track.
#[derive(Clone, Copy)]
pub struct SimilarityRanker<'a> {
    catalog: &'a Catalog,
    matrix: &'a NormalizedFeatureMatrix,
}

impl<'a> SimilarityRanker<'a> {
    pub fn new(catalog: &'a Catalog, matrix: &'a NormalizedFeatureMatrix) -> Self {
        debug_assert_eq!(catalog.len(), matrix.len());
        Self { catalog, matrix }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Top `k` tracks most similar to the first track named `seed_name`.
    /// Returns `min(k, catalog_size - 1)` entries, never the seed itself.
    pub fn rank(&self, seed_name: &str, k: usize) -> Result<Vec<ScoredTrack<'a>>> {
        let seed = self
            .catalog
            .find_index(seed_name)
            .ok_or_else(|| RecommendError::TrackNotFound(seed_name.to_string()))?;
        self.rank_by_index(seed, k)
    }

    /// Same as `rank` for an already-resolved row.
    pub fn rank_by_index(&self, seed: usize, k: usize) -> Result<Vec<ScoredTrack<'a>>> {
        if k == 0 {
            return Err(RecommendError::InvalidArgument(
                "number of recommendations must be at least 1".to_string(),
            ));
        }
        let seed_row = self.matrix.row(seed).ok_or_else(|| {
            RecommendError::TrackNotFound(format!("row {seed}"))
        })?;

        let mut scored: Vec<(usize, f64)> = self
            .matrix
            .rows()
            .par_iter()
            .enumerate()
            .map(|(idx, row)| (idx, cosine_similarity(seed_row, row)))
            .collect();

        // Descending score, ties by catalog row.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let tracks = self.catalog.tracks();
        Ok(scored
            .into_iter()
            .filter(|(idx, _)| *idx != seed)
            .take(k)
            .map(|(idx, similarity)| ScoredTrack {
                track: &tracks[idx],
                similarity,
            })
            .collect())
    }
}
