use chrono::{DateTime, Utc};

use crate::error::{CIDoctorError, Result};

/// Parses an ISO-8601 timestamp (`Z` or explicit offset) into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CIDoctorError::MalformedResponse(format!("bad timestamp {value:?}: {e}")))
}

/// Milliseconds elapsed between two instants. Negative if `end` precedes `start`.
pub fn duration_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_milliseconds()
}

/// Median of millisecond durations.
///
/// Even-length inputs yield the floor of the mean of the two middle values.
/// Empty input yields 0; callers signal "no baseline" separately.
pub fn median_ms(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]).div_euclid(2)
    }
}

/// Formats a duration as `15s`, `2m05s` or `1h05m`. `None` renders as `n/a`.
pub fn humanize_ms(ms: Option<i64>) -> String {
    let Some(ms) = ms else {
        return "n/a".to_string();
    };

    let secs = ms / 1000;
    if secs < 60 {
        return format!("{secs}s");
    }

    let (minutes, secs) = (secs / 60, secs % 60);
    if minutes < 60 {
        return format!("{minutes}m{secs:02}s");
    }

    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{hours}h{minutes:02}m")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn parses_zulu_and_offset_forms_identically() {
        let z = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        let offset = parse_timestamp("2024-01-01T00:00:00+00:00").unwrap();
        assert_eq!(z, offset);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn computes_duration_in_milliseconds() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::seconds(90);
        assert_eq!(duration_ms(start, end), 90_000);
        assert_eq!(duration_ms(end, start), -90_000);
    }

    mod median {
        use super::*;

        #[test]
        fn returns_zero_for_empty_input() {
            assert_eq!(median_ms(&[]), 0);
        }

        #[test]
        fn returns_middle_element_for_odd_length() {
            assert_eq!(median_ms(&[1]), 1);
            assert_eq!(median_ms(&[1, 3, 2]), 2);
        }

        #[test]
        fn floors_mean_of_middle_pair_for_even_length() {
            assert_eq!(median_ms(&[1, 2, 3, 4]), 2);
            assert_eq!(median_ms(&[10, 13]), 11);
        }

        #[test]
        fn is_invariant_under_permutation() {
            let base = [120_000, 90_000, 300_000, 60_000, 75_000, 210_000];
            let expected = median_ms(&base);
            let mut reversed = base;
            reversed.reverse();
            let mut rotated = base;
            rotated.rotate_left(2);
            assert_eq!(median_ms(&reversed), expected);
            assert_eq!(median_ms(&rotated), expected);
            assert_eq!(expected, 105_000);
        }
    }

    mod humanize {
        use super::*;

        #[test]
        fn formats_reference_values() {
            assert_eq!(humanize_ms(None), "n/a");
            assert_eq!(humanize_ms(Some(15_000)), "15s");
            assert_eq!(humanize_ms(Some(125_000)), "2m05s");
            assert_eq!(humanize_ms(Some(3_900_000)), "1h05m");
        }

        #[test]
        fn switches_units_exactly_at_boundaries() {
            assert_eq!(humanize_ms(Some(59_999)), "59s");
            assert_eq!(humanize_ms(Some(60_000)), "1m00s");
            assert_eq!(humanize_ms(Some(3_599_999)), "59m59s");
            assert_eq!(humanize_ms(Some(3_600_000)), "1h00m");
        }
    }
}
