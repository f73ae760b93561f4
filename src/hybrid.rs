//! Hybrid re-ranking of similarity candidates by popularity.
//!
//! ## Modes
//!
//! - `PopularityRerank` (default): the `k` nearest tracks are ordered by
//!   their static popularity. The seed takes part in the sort with its
//!   recency-weighted popularity and is then removed, so it only decides
//!   where it would have landed. `alpha` has no effect.
//! - `Blend`: each candidate scores
//!   `alpha * similarity + (1 - alpha) * weighted_popularity / 100`,
//!   using the candidate's own recency-weighted popularity.
//!
//! Both modes return the same candidate set as content-based ranking; only
//! the order differs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecommendError, Result};
use crate::models::{RecommendationResult, ScoredTrack, Track};
use crate::popularity::weighted_popularity;
use crate::similarity::SimilarityRanker;

/// Upper bound of the popularity scale, used to bring weighted popularity
/// into the same [0, 1] range as cosine similarity in blend mode.
pub const POPULARITY_SCALE: f64 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridMode {
    #[default]
    PopularityRerank,
    Blend,
}

pub struct HybridRecommender<'a> {
    ranker: SimilarityRanker<'a>,
    mode: HybridMode,
}

impl<'a> HybridRecommender<'a> {
    pub fn new(ranker: SimilarityRanker<'a>, mode: HybridMode) -> Self {
        Self { ranker, mode }
    }

    pub fn mode(&self) -> HybridMode {
        self.mode
    }

    pub fn recommend(
        &self,
        seed_name: &str,
        k: usize,
        alpha: f64,
        now: NaiveDate,
    ) -> Result<Vec<RecommendationResult>> {
        let seed = self
            .ranker
            .catalog()
            .find_index(seed_name)
            .ok_or_else(|| RecommendError::TrackNotFound(seed_name.to_string()))?;
        self.recommend_by_index(seed, k, alpha, now)
    }

    pub fn recommend_by_index(
        &self,
        seed: usize,
        k: usize,
        alpha: f64,
        now: NaiveDate,
    ) -> Result<Vec<RecommendationResult>> {
        let candidates = self.ranker.rank_by_index(seed, k)?;
        let seed_track = self
            .ranker
            .catalog()
            .get(seed)
            .ok_or_else(|| RecommendError::TrackNotFound(format!("row {seed}")))?;

        match self.mode {
            HybridMode::PopularityRerank => popularity_rerank(seed_track, &candidates, now),
            HybridMode::Blend => blend(&candidates, alpha, now),
        }
    }
}

fn popularity_rerank(
    seed: &Track,
    candidates: &[ScoredTrack<'_>],
    now: NaiveDate,
) -> Result<Vec<RecommendationResult>> {
    let seed_popularity = weighted_popularity(seed, now)?;

    // `None` marks the seed entry.
    let mut combined: Vec<(Option<&ScoredTrack<'_>>, f64)> = candidates
        .iter()
        .map(|c| (Some(c), c.track.popularity))
        .collect();
    combined.push((None, seed_popularity));

    // Stable: equal popularity keeps similarity order, seed last.
    combined.sort_by(|a, b| b.1.total_cmp(&a.1));

    if let Some(pos) = combined.iter().position(|(c, _)| c.is_none()) {
        debug!(
            seed = %seed.name,
            seed_popularity,
            seed_position = pos,
            "seed placed in popularity re-rank"
        );
    }

    Ok(combined
        .into_iter()
        .filter_map(|(c, popularity)| c.map(|c| RecommendationResult::from_scored(c, popularity)))
        .collect())
}

fn blend(
    candidates: &[ScoredTrack<'_>],
    alpha: f64,
    now: NaiveDate,
) -> Result<Vec<RecommendationResult>> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(RecommendError::InvalidArgument(format!(
            "alpha must be within [0, 1], got {alpha}"
        )));
    }

    let mut scored = candidates
        .iter()
        .map(|c| {
            let wp = weighted_popularity(c.track, now)?;
            Ok((c, alpha * c.similarity + (1.0 - alpha) * wp / POPULARITY_SCALE))
        })
        .collect::<Result<Vec<_>>>()?;

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(scored
        .into_iter()
        .map(|(c, score)| RecommendationResult::from_scored(c, score))
        .collect())
}
