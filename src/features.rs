//! Min-max feature normalization.
//!
//! Each of the 11 feature columns is rescaled independently to [0, 1]
//! using the catalog-wide minimum and maximum observed at load time. A
//! constant column (max == min) maps every row to 0.0.

use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::models::{FeatureColumnStats, FeatureVector, FEATURE_COLUMNS, FEATURE_DIM};

/// Observed [min, max] of one column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub fn is_constant(&self) -> bool {
        self.max == self.min
    }

    pub fn scale(&self, value: f64) -> f64 {
        if self.is_constant() {
            0.0
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

impl Default for FeatureRange {
    fn default() -> Self {
        Self { min: 0.0, max: 0.0 }
    }
}

/// Per-column min-max scaler fitted on a catalog snapshot.
#[derive(Clone, Debug)]
pub struct FeatureNormalizer {
    ranges: [FeatureRange; FEATURE_DIM],
}

impl FeatureNormalizer {
    /// Fit column ranges. An empty input yields (0, 0) for every column.
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut ranges = [FeatureRange::default(); FEATURE_DIM];
        if rows.is_empty() {
            return Self { ranges };
        }

        let columns: Vec<FeatureRange> = (0..FEATURE_DIM)
            .into_par_iter()
            .map(|col| {
                rows.iter().fold(
                    FeatureRange {
                        min: f64::INFINITY,
                        max: f64::NEG_INFINITY,
                    },
                    |acc, row| FeatureRange {
                        min: acc.min.min(row[col]),
                        max: acc.max.max(row[col]),
                    },
                )
            })
            .collect();
        ranges.copy_from_slice(&columns);

        Self { ranges }
    }

    pub fn transform(&self, row: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_DIM];
        for (i, value) in row.iter().enumerate() {
            out[i] = self.ranges[i].scale(*value);
        }
        out
    }

    pub fn ranges(&self) -> &[FeatureRange; FEATURE_DIM] {
        &self.ranges
    }

    /// Names of columns that carry no information in this catalog.
    pub fn constant_columns(&self) -> Vec<&'static str> {
        FEATURE_COLUMNS
            .iter()
            .zip(self.ranges.iter())
            .filter(|(_, range)| range.is_constant())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn column_stats(&self) -> Vec<FeatureColumnStats> {
        FEATURE_COLUMNS
            .iter()
            .zip(self.ranges.iter())
            .map(|(name, range)| FeatureColumnStats {
                column: *name,
                min: range.min,
                max: range.max,
                constant: range.is_constant(),
            })
            .collect()
    }
}

/// One normalized vector per catalog row, in row order.
#[derive(Clone, Debug)]
pub struct NormalizedFeatureMatrix {
    rows: Vec<FeatureVector>,
}

impl NormalizedFeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&FeatureVector> {
        self.rows.get(idx)
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }
}

/// Fit on the catalog and transform every row.
pub fn normalize(catalog: &Catalog) -> (FeatureNormalizer, NormalizedFeatureMatrix) {
    let raw: Vec<FeatureVector> = catalog.tracks().iter().map(|t| t.features).collect();
    let normalizer = FeatureNormalizer::fit(&raw);
    let rows = raw.par_iter().map(|row| normalizer.transform(row)).collect();
    (normalizer, NormalizedFeatureMatrix { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fv, track};

    fn catalog(rows: &[FeatureVector]) -> Catalog {
        Catalog::from_tracks(
            rows.iter()
                .enumerate()
                .map(|(i, f)| track(&format!("T{i}"), "A", 10.0, "2020-01-01", *f))
                .collect(),
        )
    }

    #[test]
    fn test_min_max_scaling() {
        let cat = catalog(&[fv(0.0, 10.0, -60.0), fv(0.5, 20.0, -30.0), fv(1.0, 30.0, 0.0)]);
        let (_, matrix) = normalize(&cat);

        assert_eq!(matrix.len(), cat.len());
        let mid = matrix.row(1).expect("row 1");
        assert!((mid[0] - 0.5).abs() < 1e-12);
        assert!((mid[1] - 0.5).abs() < 1e-12);
        assert!((mid[2] - 0.5).abs() < 1e-12);
        assert_eq!(matrix.row(0).expect("row 0")[1], 0.0);
        assert_eq!(matrix.row(2).expect("row 2")[1], 1.0);
    }

    #[test]
    fn test_every_value_in_unit_range() {
        let cat = catalog(&[fv(3.0, -2.0, 7.0), fv(-1.0, 4.0, 7.5), fv(9.0, 0.0, 6.0)]);
        let (_, matrix) = normalize(&cat);
        for row in matrix.rows() {
            for v in row {
                assert!((0.0..=1.0).contains(v), "{v} out of range");
            }
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let cat = catalog(&[fv(0.2, 5.0, 1.0), fv(0.4, 5.0, 2.0)]);
        let (normalizer, matrix) = normalize(&cat);

        for row in matrix.rows() {
            assert_eq!(row[1], 0.0);
            assert!(row.iter().all(|v| v.is_finite()));
        }
        // Columns 3.. are all zero in the fixture, so they are constant too.
        let constant = normalizer.constant_columns();
        assert!(constant.contains(&"Energy"));
        assert!(!constant.contains(&"Danceability"));
        assert!(!constant.contains(&"Key"));
    }

    #[test]
    fn test_empty_fit() {
        let normalizer = FeatureNormalizer::fit(&[]);
        assert!(normalizer.ranges().iter().all(|r| r.is_constant()));
        assert_eq!(normalizer.transform(&fv(1.0, 2.0, 3.0)), [0.0; FEATURE_DIM]);
    }

    #[test]
    fn test_positive_scaling_leaves_matrix_unchanged() {
        let base = [fv(0.1, 4.0, -3.0), fv(0.9, 1.0, -9.0), fv(0.4, 2.5, -1.0)];
        let scaled: Vec<FeatureVector> = base.iter().map(|r| r.map(|v| v * 7.5)).collect();

        let (_, a) = normalize(&catalog(&base));
        let (_, b) = normalize(&catalog(&scaled));
        for (ra, rb) in a.rows().iter().zip(b.rows()) {
            for (x, y) in ra.iter().zip(rb) {
                assert!((x - y).abs() < 1e-12);
            }
        }
    }
}
