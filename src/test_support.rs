//! Fixtures shared by the unit tests.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::models::{FeatureVector, Track};

pub const CSV_HEADER: &str = "Track Name,Artists,Album Name,Release Date,Popularity,Danceability,Energy,Key,Loudness,Mode,Speechiness,Acousticness,Instrumentalness,Liveness,Valence,Tempo";

pub fn csv_catalog(rows: &[&str]) -> Result<Catalog> {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    Catalog::from_csv_reader(csv.as_bytes())
}

pub fn track(
    name: &str,
    artists: &str,
    popularity: f64,
    release_date: &str,
    features: FeatureVector,
) -> Track {
    Track {
        id: 0,
        name: name.to_string(),
        artists: artists.to_string(),
        album: format!("{name} (Album)"),
        release_date: release_date.to_string(),
        popularity,
        features,
    }
}

/// Feature vector with the first three dimensions set and the rest zero.
pub fn fv(a: f64, b: f64, c: f64) -> FeatureVector {
    let mut v = [0.0; crate::models::FEATURE_DIM];
    v[0] = a;
    v[1] = b;
    v[2] = c;
    v
}
