//! Recency-weighted popularity.
//!
//! `weight = 1 / (days + 1)` where `days` is the absolute number of whole
//! days between the release date and the reference date. The reference
//! date is always passed in; nothing here reads the clock.

use chrono::NaiveDate;

use crate::error::{RecommendError, Result};
use crate::models::Track;

/// Release dates are stored as ISO calendar dates.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_release_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RELEASE_DATE_FORMAT).ok()
}

/// Whole days between two dates. Future release dates count the same as
/// past ones, so the weight never exceeds 1.
pub fn days_between(release: NaiveDate, now: NaiveDate) -> i64 {
    (now - release).num_days().abs()
}

pub fn weight(release: NaiveDate, now: NaiveDate) -> f64 {
    1.0 / (days_between(release, now) as f64 + 1.0)
}

/// Parsed release date of a track, or `InvalidDate`.
pub fn release_date(track: &Track) -> Result<NaiveDate> {
    parse_release_date(&track.release_date).ok_or_else(|| RecommendError::InvalidDate {
        track: track.name.clone(),
        value: track.release_date.clone(),
    })
}

/// `popularity * weight(release_date, now)`.
pub fn weighted_popularity(track: &Track, now: NaiveDate) -> Result<f64> {
    Ok(track.popularity * weight(release_date(track)?, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fv, track};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_weight_is_one_on_release_day() {
        let today = date(2024, 5, 1);
        assert_eq!(weight(today, today), 1.0);
    }

    #[test]
    fn test_weight_strictly_decreases_with_age() {
        let now = date(2024, 5, 1);
        let mut previous = f64::INFINITY;
        for days in [0, 1, 2, 10, 100, 1000, 10_000] {
            let w = weight(now - chrono::Duration::days(days), now);
            assert!(w < previous, "weight did not decrease at {days} days");
            previous = w;
        }
    }

    #[test]
    fn test_weight_values() {
        let now = date(2024, 5, 1);
        assert!((weight(date(2024, 4, 30), now) - 0.5).abs() < 1e-12);
        assert!((weight(now - chrono::Duration::days(100), now) - 1.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_future_release_uses_absolute_gap() {
        let now = date(2024, 5, 1);
        let past = weight(date(2024, 4, 21), now);
        let future = weight(date(2024, 5, 11), now);
        assert_eq!(past, future);
        assert!(future > 0.0 && future <= 1.0);
    }

    #[test]
    fn test_parse_release_date() {
        assert_eq!(parse_release_date("2021-03-04"), Some(date(2021, 3, 4)));
        assert_eq!(parse_release_date(" 2021-03-04 "), Some(date(2021, 3, 4)));
        assert_eq!(parse_release_date("2021"), None);
        assert_eq!(parse_release_date("04/03/2021"), None);
        assert_eq!(parse_release_date("2021-02-30"), None);
    }

    #[test]
    fn test_weighted_popularity() {
        let now = date(2024, 5, 1);
        let t = track("Fresh", "A", 90.0, "2024-04-30", fv(0.1, 0.2, 0.3));
        assert!((weighted_popularity(&t, now).expect("weighted") - 45.0).abs() < 1e-12);

        let bad = track("Undated", "A", 90.0, "sometime", fv(0.1, 0.2, 0.3));
        match weighted_popularity(&bad, now) {
            Err(RecommendError::InvalidDate { track, value }) => {
                assert_eq!(track, "Undated");
                assert_eq!(value, "sometime");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
