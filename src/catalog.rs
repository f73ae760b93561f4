//! Catalog loading and name lookup.
//!
//! A catalog is read once (CSV or SQLite), then frozen. Row order is the
//! track identity; names are a secondary, non-unique index where the first
//! row wins.

use csv::StringRecord;
use rayon::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{RecommendError, Result};
use crate::models::{
    FeatureVector, Track, ALBUM_COLUMN, ARTISTS_COLUMN, FEATURE_COLUMNS, FEATURE_DIM,
    NAME_COLUMN, POPULARITY_COLUMN, RELEASE_DATE_COLUMN,
};
use crate::normalize::{fold_to_ascii, search_key};
use crate::progress::{create_progress_bar, create_spinner, format_duration, log_progress, LOG_INTERVAL};

/// Table read by the SQLite loader.
pub const SQLITE_TABLE: &str = "tracks";

/// Name → row ids, in row order.
pub type NameIndex = FxHashMap<String, Vec<usize>>;

#[derive(Debug)]
pub struct Catalog {
    tracks: Vec<Track>,
    name_index: NameIndex,
    search_keys: Vec<String>,
}

impl Catalog {
    /// Build a catalog from tracks in row order. Track ids are reassigned
    /// to their row index.
    pub fn from_tracks(mut tracks: Vec<Track>) -> Self {
        for (i, track) in tracks.iter_mut().enumerate() {
            track.id = i;
        }

        let mut name_index: NameIndex = FxHashMap::default();
        for track in &tracks {
            name_index.entry(track.name.clone()).or_default().push(track.id);
        }

        let duplicated = name_index.values().filter(|ids| ids.len() > 1).count();
        if duplicated > 0 {
            warn!(
                duplicated,
                "catalog has duplicate track names, lookups resolve to the first row"
            );
        }

        let search_keys = tracks.par_iter().map(|t| search_key(&t.name)).collect();

        Self {
            tracks,
            name_index,
            search_keys,
        }
    }

    /// Load a catalog, choosing the reader by file extension
    /// (`.sqlite`, `.sqlite3`, `.db` → SQLite, anything else → CSV).
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("sqlite") | Some("sqlite3") | Some("db") => Self::load_sqlite(path),
            _ => Self::load_csv(path),
        }
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        info!("Opening catalog CSV: {}", path.display());
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let start = Instant::now();
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let columns = CsvColumns::from_headers(rdr.headers()?)?;

        let spinner = create_spinner("Loading catalog");
        let mut tracks = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(tracks.len() as u64 + 2);
            tracks.push(columns.parse_record(&record, line)?);
            spinner.inc(1);
            log_progress("catalog", tracks.len() as u64, None, LOG_INTERVAL);
        }
        spinner.finish_with_message(format!("Loaded {} tracks", tracks.len()));

        if tracks.is_empty() {
            return Err(RecommendError::invalid_data(
                1,
                NAME_COLUMN,
                "catalog contains no tracks",
            ));
        }

        info!(
            tracks = tracks.len(),
            "catalog loaded in {}",
            format_duration(start.elapsed())
        );
        Ok(Self::from_tracks(tracks))
    }

    pub fn load_sqlite(path: &Path) -> Result<Self> {
        info!("Opening catalog database: {}", path.display());
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Self::from_connection(&conn)
    }

    /// Read the `tracks` table in rowid order. Column names match the CSV
    /// headers.
    pub fn from_connection(conn: &Connection) -> Result<Self> {
        let start = Instant::now();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {SQLITE_TABLE}"),
            [],
            |row| row.get(0),
        )?;

        let mut columns = vec![
            NAME_COLUMN,
            ARTISTS_COLUMN,
            ALBUM_COLUMN,
            RELEASE_DATE_COLUMN,
            POPULARITY_COLUMN,
        ];
        columns.extend(FEATURE_COLUMNS);
        let select_list: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let sql = format!(
            "SELECT {} FROM {SQLITE_TABLE} ORDER BY rowid",
            select_list.join(", ")
        );
        debug!(%sql, "reading catalog rows");

        let pb = create_progress_bar(count.max(0) as u64, "Loading catalog");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tracks = Vec::with_capacity(count.max(0) as usize);

        while let Some(row) = rows.next()? {
            let line = tracks.len() as u64 + 1;
            let mut features: FeatureVector = [0.0; FEATURE_DIM];
            for (i, column) in FEATURE_COLUMNS.iter().enumerate() {
                features[i] = sql_number(row, 5 + i, column, line)?;
            }
            tracks.push(Track {
                id: tracks.len(),
                name: sql_text(row, 0, NAME_COLUMN, line, true)?,
                artists: sql_text(row, 1, ARTISTS_COLUMN, line, false)?,
                album: sql_text(row, 2, ALBUM_COLUMN, line, false)?,
                release_date: sql_text(row, 3, RELEASE_DATE_COLUMN, line, false)?,
                popularity: sql_number(row, 4, POPULARITY_COLUMN, line)?,
                features,
            });
            pb.inc(1);
            log_progress("catalog", line, Some(count as u64), LOG_INTERVAL);
        }
        pb.finish_with_message(format!("Loaded {} tracks", tracks.len()));

        if tracks.is_empty() {
            return Err(RecommendError::invalid_data(
                1,
                NAME_COLUMN,
                "catalog contains no tracks",
            ));
        }

        info!(
            tracks = tracks.len(),
            "catalog loaded in {}",
            format_duration(start.elapsed())
        );
        Ok(Self::from_tracks(tracks))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, id: usize) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn name_index(&self) -> &NameIndex {
        &self.name_index
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Exact, case-sensitive lookup. The first row wins on duplicates.
    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).and_then(|ids| ids.first().copied())
    }

    /// Every row carrying this exact name, in row order.
    pub fn find_all(&self, name: &str) -> &[usize] {
        self.name_index.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a seed. With `artist`, the first row of that name whose
    /// folded artists field contains the folded artist wins.
    pub fn resolve(&self, name: &str, artist: Option<&str>) -> Result<usize> {
        match artist {
            None => self
                .find_index(name)
                .ok_or_else(|| RecommendError::TrackNotFound(name.to_string())),
            Some(artist) => {
                let wanted = fold_to_ascii(artist.trim());
                self.find_all(name)
                    .iter()
                    .copied()
                    .find(|&id| fold_to_ascii(&self.tracks[id].artists).contains(&wanted))
                    .ok_or_else(|| {
                        RecommendError::TrackNotFound(format!("{name} (artist: {artist})"))
                    })
            }
        }
    }

    /// Distinct names in first-seen order.
    pub fn unique_names(&self) -> Vec<&str> {
        let mut seen = FxHashSet::default();
        self.tracks
            .iter()
            .map(|t| t.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Near-miss names for an unknown seed, best first.
    pub fn suggest(&self, query: &str, limit: usize, min_score: f64) -> Vec<(&Track, f64)> {
        let key = search_key(query);
        if key.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .search_keys
            .par_iter()
            .enumerate()
            .map(|(i, candidate)| (i, strsim::jaro_winkler(&key, candidate)))
            .filter(|(_, score)| *score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut seen = FxHashSet::default();
        scored
            .into_iter()
            .filter(|(i, _)| seen.insert(self.tracks[*i].name.as_str()))
            .take(limit)
            .map(|(i, score)| (&self.tracks[i], score))
            .collect()
    }
}

// ============================================================================
// CSV Parsing
// ============================================================================

struct CsvColumns {
    name: usize,
    artists: usize,
    album: usize,
    release_date: usize,
    popularity: usize,
    features: [usize; FEATURE_DIM],
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |column: &str| {
            headers.iter().position(|h| h == column).ok_or_else(|| {
                RecommendError::invalid_data(1, column, "missing column in catalog header")
            })
        };

        let mut features = [0usize; FEATURE_DIM];
        for (slot, column) in features.iter_mut().zip(FEATURE_COLUMNS) {
            *slot = find(column)?;
        }

        Ok(Self {
            name: find(NAME_COLUMN)?,
            artists: find(ARTISTS_COLUMN)?,
            album: find(ALBUM_COLUMN)?,
            release_date: find(RELEASE_DATE_COLUMN)?,
            popularity: find(POPULARITY_COLUMN)?,
            features,
        })
    }

    fn parse_record(&self, record: &StringRecord, line: u64) -> Result<Track> {
        let text = |idx: usize| record.get(idx).unwrap_or("").to_string();

        let mut features: FeatureVector = [0.0; FEATURE_DIM];
        for (i, (&idx, column)) in self.features.iter().zip(FEATURE_COLUMNS).enumerate() {
            features[i] = parse_number(record.get(idx).unwrap_or(""), column, line)?;
        }

        let name = text(self.name);
        if name.is_empty() {
            return Err(RecommendError::invalid_data(line, NAME_COLUMN, "empty track name"));
        }

        Ok(Track {
            id: 0,
            name,
            artists: text(self.artists),
            album: text(self.album),
            release_date: text(self.release_date),
            popularity: parse_number(
                record.get(self.popularity).unwrap_or(""),
                POPULARITY_COLUMN,
                line,
            )?,
            features,
        })
    }
}

/// Parse a numeric cell. Non-numeric and non-finite values are rejected.
fn parse_number(value: &str, column: &str, line: u64) -> Result<f64> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(RecommendError::invalid_data(
            line,
            column,
            format!("value '{trimmed}' is not finite"),
        )),
        Err(_) => Err(RecommendError::invalid_data(
            line,
            column,
            format!("value '{trimmed}' is not numeric"),
        )),
    }
}

// ============================================================================
// SQLite Parsing
// ============================================================================

fn sql_number(row: &Row<'_>, idx: usize, column: &str, line: u64) -> Result<f64> {
    match row.get_ref(idx)? {
        ValueRef::Integer(v) => Ok(v as f64),
        ValueRef::Real(v) if v.is_finite() => Ok(v),
        ValueRef::Real(v) => Err(RecommendError::invalid_data(
            line,
            column,
            format!("value '{v}' is not finite"),
        )),
        ValueRef::Text(bytes) => parse_number(&String::from_utf8_lossy(bytes), column, line),
        ValueRef::Null => Err(RecommendError::invalid_data(line, column, "value is NULL")),
        ValueRef::Blob(_) => Err(RecommendError::invalid_data(line, column, "value is a blob")),
    }
}

fn sql_text(row: &Row<'_>, idx: usize, column: &str, line: u64, required: bool) -> Result<String> {
    let value = match row.get_ref(idx)? {
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Null => String::new(),
        ValueRef::Blob(_) => {
            return Err(RecommendError::invalid_data(line, column, "value is a blob"))
        }
    };
    if required && value.is_empty() {
        return Err(RecommendError::invalid_data(line, column, "value is empty"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{csv_catalog, track, CSV_HEADER};
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_csv_loader_reads_rows_in_order() {
        let catalog = csv_catalog(&[
            "Alpha,Artist A,Album A,2020-01-01,50,0.5,0.6,1,-5.0,1,0.05,0.1,0.0,0.1,0.4,120",
            "Beta,Artist B,Album B,2021-06-30,70,0.7,0.8,5,-3.0,0,0.04,0.2,0.0,0.2,0.6,128",
        ])
        .expect("catalog");

        assert_eq!(catalog.len(), 2);
        let beta = catalog.get(1).expect("row 1");
        assert_eq!(beta.id, 1);
        assert_eq!(beta.name, "Beta");
        assert_eq!(beta.release_date, "2021-06-30");
        assert_eq!(beta.popularity, 70.0);
        assert_eq!(beta.features[10], 128.0);
    }

    #[test]
    fn test_csv_loader_ignores_extra_columns_and_order() {
        let csv = "Tempo,Extra,Track Name,Artists,Album Name,Release Date,Popularity,Danceability,Energy,Key,Loudness,Mode,Speechiness,Acousticness,Instrumentalness,Liveness,Valence\n\
                   99,x,Gamma,C,Alb,2019-02-03,10,0.1,0.2,3,-7,1,0.1,0.1,0.1,0.1,0.1\n";
        let catalog = Catalog::from_csv_reader(csv.as_bytes()).expect("catalog");
        let gamma = catalog.get(0).expect("row 0");
        assert_eq!(gamma.name, "Gamma");
        assert_eq!(gamma.features[0], 0.1);
        assert_eq!(gamma.features[10], 99.0);
    }

    #[test]
    fn test_csv_loader_rejects_non_numeric_feature() {
        let err = csv_catalog(&[
            "Alpha,A,Al,2020-01-01,50,0.5,loud,1,-5.0,1,0.05,0.1,0.0,0.1,0.4,120",
        ])
        .unwrap_err();
        match err {
            RecommendError::InvalidData { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "Energy");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_csv_loader_rejects_nan() {
        let err = csv_catalog(&[
            "Alpha,A,Al,2020-01-01,50,0.5,0.6,1,-5.0,1,0.05,0.1,0.0,0.1,0.4,NaN",
        ])
        .unwrap_err();
        assert!(matches!(err, RecommendError::InvalidData { ref column, .. } if column == "Tempo"));
    }

    #[test]
    fn test_csv_loader_rejects_missing_column() {
        let csv = "Track Name,Artists,Album Name,Release Date,Popularity\nA,B,C,2020-01-01,1\n";
        let err = Catalog::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidData { line: 1, ref column, .. } if column == "Danceability"));
    }

    #[test]
    fn test_csv_loader_rejects_empty_table() {
        let err = csv_catalog(&[]).unwrap_err();
        assert!(err.to_string().contains("no tracks"));
    }

    #[test]
    fn test_load_dispatches_csv_by_extension() {
        let mut file = Builder::new().suffix(".csv").tempfile().expect("temp file");
        writeln!(file, "{CSV_HEADER}").expect("write header");
        writeln!(
            file,
            "Alpha,A,Al,2020-01-01,50,0.5,0.6,1,-5.0,1,0.05,0.1,0.0,0.1,0.4,120"
        )
        .expect("write row");

        let catalog = Catalog::load(file.path()).expect("load CSV");
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_sqlite_loader() {
        let file = Builder::new().suffix(".sqlite3").tempfile().expect("temp file");
        {
            let conn = Connection::open(file.path()).expect("open");
            conn.execute_batch(
                "CREATE TABLE tracks (
                    \"Track Name\" TEXT, \"Artists\" TEXT, \"Album Name\" TEXT,
                    \"Release Date\" TEXT, \"Popularity\" INTEGER,
                    \"Danceability\" REAL, \"Energy\" REAL, \"Key\" INTEGER, \"Loudness\" REAL,
                    \"Mode\" INTEGER, \"Speechiness\" REAL, \"Acousticness\" REAL,
                    \"Instrumentalness\" REAL, \"Liveness\" REAL, \"Valence\" REAL, \"Tempo\" REAL
                );
                INSERT INTO tracks VALUES ('One', 'X', NULL, '2020-01-01', 40, 0.1, 0.2, 3, -6.5, 1, 0.1, 0.2, 0.0, 0.1, 0.5, 110.0);
                INSERT INTO tracks VALUES ('Two', 'Y', 'B', '2021-01-01', 60, 0.3, 0.4, 7, -4.0, 0, 0.1, 0.3, 0.0, 0.2, 0.7, 95.5);",
            )
            .expect("create");
        }

        let catalog = Catalog::load(file.path()).expect("load sqlite");
        assert_eq!(catalog.len(), 2);
        let one = catalog.get(0).expect("row 0");
        assert_eq!(one.name, "One");
        assert_eq!(one.album, "");
        assert_eq!(one.features[2], 3.0);
        assert_eq!(catalog.get(1).expect("row 1").features[10], 95.5);
    }

    #[test]
    fn test_sqlite_loader_rejects_null_feature() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "CREATE TABLE tracks (
                \"Track Name\" TEXT, \"Artists\" TEXT, \"Album Name\" TEXT,
                \"Release Date\" TEXT, \"Popularity\" INTEGER,
                \"Danceability\" REAL, \"Energy\" REAL, \"Key\" INTEGER, \"Loudness\" REAL,
                \"Mode\" INTEGER, \"Speechiness\" REAL, \"Acousticness\" REAL,
                \"Instrumentalness\" REAL, \"Liveness\" REAL, \"Valence\" REAL, \"Tempo\" REAL
            );
            INSERT INTO tracks VALUES ('One', 'X', 'A', '2020-01-01', 40, 0.1, NULL, 3, -6.5, 1, 0.1, 0.2, 0.0, 0.1, 0.5, 110.0);",
        )
        .expect("create");

        let err = Catalog::from_connection(&conn).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidData { line: 1, ref column, .. } if column == "Energy"));
    }

    #[test]
    fn test_first_match_on_duplicate_names() {
        let catalog = Catalog::from_tracks(vec![
            track("Intro", "Band One", 10.0, "2020-01-01", [0.1; FEATURE_DIM]),
            track("Other", "Band Two", 10.0, "2020-01-01", [0.2; FEATURE_DIM]),
            track("Intro", "Band Three", 10.0, "2020-01-01", [0.3; FEATURE_DIM]),
        ]);

        assert_eq!(catalog.find_index("Intro"), Some(0));
        assert_eq!(catalog.find_all("Intro"), &[0, 2]);
        assert_eq!(catalog.find_index("intro"), None);
        assert_eq!(catalog.unique_names(), vec!["Intro", "Other"]);
    }

    #[test]
    fn test_resolve_with_artist() {
        let catalog = Catalog::from_tracks(vec![
            track("Intro", "Band One", 10.0, "2020-01-01", [0.1; FEATURE_DIM]),
            track("Intro", "Björk, Band Three", 10.0, "2020-01-01", [0.3; FEATURE_DIM]),
        ]);

        assert_eq!(catalog.resolve("Intro", None).unwrap(), 0);
        assert_eq!(catalog.resolve("Intro", Some("bjork")).unwrap(), 1);
        assert!(matches!(
            catalog.resolve("Intro", Some("Nobody")),
            Err(RecommendError::TrackNotFound(_))
        ));
        assert!(matches!(
            catalog.resolve("Outro", None),
            Err(RecommendError::TrackNotFound(_))
        ));
    }

    #[test]
    fn test_suggest_ranks_close_names_first() {
        let catalog = Catalog::from_tracks(vec![
            track("Blinding Lights", "The Weeknd", 90.0, "2019-11-29", [0.1; FEATURE_DIM]),
            track("Save Your Tears", "The Weeknd", 85.0, "2020-03-20", [0.2; FEATURE_DIM]),
            track("Blinding Lights", "Cover Band", 5.0, "2021-01-01", [0.3; FEATURE_DIM]),
        ]);

        let suggestions = catalog.suggest("blinding light", 5, 0.75);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].0.name, "Blinding Lights");
        assert_eq!(suggestions[0].0.id, 0);

        assert!(catalog.suggest("", 5, 0.0).is_empty());
        assert!(catalog.suggest("zzzz qqqq", 5, 0.75).is_empty());
    }
}
