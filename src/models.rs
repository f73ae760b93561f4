//! Core data models for the recommendation engine.
//!
//! This module contains the catalog track, the feature vector layout,
//! recommendation output rows, and catalog statistics.

use serde::Serialize;

// ============================================================================
// Feature Layout
// ============================================================================

/// Number of audio-feature dimensions per track.
pub const FEATURE_DIM: usize = 11;

/// Catalog column names for the audio features, in vector order.
pub const FEATURE_COLUMNS: [&str; FEATURE_DIM] = [
    "Danceability",
    "Energy",
    "Key",
    "Loudness",
    "Mode",
    "Speechiness",
    "Acousticness",
    "Instrumentalness",
    "Liveness",
    "Valence",
    "Tempo",
];

/// Catalog column names for the descriptive fields.
pub const NAME_COLUMN: &str = "Track Name";
pub const ARTISTS_COLUMN: &str = "Artists";
pub const ALBUM_COLUMN: &str = "Album Name";
pub const RELEASE_DATE_COLUMN: &str = "Release Date";
pub const POPULARITY_COLUMN: &str = "Popularity";

/// Raw or normalized audio features, ordered as `FEATURE_COLUMNS`.
pub type FeatureVector = [f64; FEATURE_DIM];

// ============================================================================
// Catalog Models
// ============================================================================

/// One catalog entry. Immutable after load.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: usize, // Row index assigned at load; the only unique identity
    pub name: String,
    pub artists: String,
    pub album: String,
    pub release_date: String, // Raw value, parsed on use (see popularity.rs)
    pub popularity: f64,      // 0-100
    pub features: FeatureVector,
}

/// A catalog track paired with its cosine similarity to a seed.
#[derive(Clone, Copy, Debug)]
pub struct ScoredTrack<'a> {
    pub track: &'a Track,
    pub similarity: f64,
}

// ============================================================================
// Output Models
// ============================================================================

/// One row of a recommendation list.
///
/// `score` is the value the list is ordered by:
/// - content-based: cosine similarity
/// - hybrid popularity re-rank: the track's popularity
/// - hybrid blend: `alpha * similarity + (1 - alpha) * weighted_popularity / 100`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub id: usize,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub release_date: String,
    pub popularity: f64,
    pub similarity: f64,
    pub score: f64,
}

impl RecommendationResult {
    pub fn from_scored(scored: &ScoredTrack<'_>, score: f64) -> Self {
        let t = scored.track;
        Self {
            id: t.id,
            name: t.name.clone(),
            artists: t.artists.clone(),
            album: t.album.clone(),
            release_date: t.release_date.clone(),
            popularity: t.popularity,
            similarity: scored.similarity,
            score,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Observed range of one feature column.
#[derive(Clone, Debug, Serialize)]
pub struct FeatureColumnStats {
    pub column: &'static str,
    pub min: f64,
    pub max: f64,
    pub constant: bool,
}

/// Catalog-wide statistics for the `catalog-report` binary.
#[derive(Default, Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_tracks: usize,
    pub unique_names: usize,
    pub duplicated_names: usize,    // Names shared by more than one row
    pub rows_with_shared_name: usize,
    pub invalid_release_dates: usize,
    pub zero_norm_tracks: usize,    // Rows whose normalized vector is all zeros
    pub popularity_min: f64,
    pub popularity_max: f64,
    pub features: Vec<FeatureColumnStats>,
    pub top_duplicates: Vec<(String, usize)>,
}

impl CatalogStats {
    /// Share of rows whose name is not unique, as a percentage
    pub fn duplicate_rate(&self) -> f64 {
        if self.total_tracks == 0 {
            0.0
        } else {
            100.0 * self.rows_with_shared_name as f64 / self.total_tracks as f64
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_columns_are_distinct() {
        let mut cols = FEATURE_COLUMNS.to_vec();
        cols.sort_unstable();
        cols.dedup();
        assert_eq!(cols.len(), FEATURE_DIM);
    }

    #[test]
    fn test_duplicate_rate() {
        let stats = CatalogStats {
            total_tracks: 8,
            rows_with_shared_name: 2,
            ..Default::default()
        };
        assert!((stats.duplicate_rate() - 25.0).abs() < 1e-9);
        assert_eq!(CatalogStats::default().duplicate_rate(), 0.0);
    }
}
