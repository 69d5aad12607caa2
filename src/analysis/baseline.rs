use crate::model::Run;
use crate::timeutil::median_ms;

/// Duration baseline derived from a sample of successful runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    /// Median duration of the sample; `None` when the sample was empty
    pub p50_ms: Option<i64>,
    /// Most recent prior success, see [`last_success_before`]
    pub last_success: Option<Run>,
}

/// Computes the baseline for `current` from `successes` (provider order).
pub fn compute_baseline(current: &Run, successes: &[Run]) -> Baseline {
    let durations: Vec<i64> = successes.iter().map(Run::duration_ms).collect();
    let p50_ms = (!durations.is_empty()).then(|| median_ms(&durations));

    Baseline {
        p50_ms,
        last_success: last_success_before(current, successes).cloned(),
    }
}

/// First run, in the order given, that started strictly before `current`.
///
/// This is not a max-timestamp search: if the provider returns runs out of
/// chronological order, the first qualifying one wins.
pub fn last_success_before<'a>(current: &Run, successes: &'a [Run]) -> Option<&'a Run> {
    successes
        .iter()
        .find(|run| run.started_at < current.started_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::run_at;

    #[test]
    fn empty_sample_has_no_baseline() {
        let current = run_at("100", "2024-05-01T12:00:00Z", 60);
        let baseline = compute_baseline(&current, &[]);
        assert_eq!(baseline.p50_ms, None);
        assert_eq!(baseline.last_success, None);
    }

    #[test]
    fn median_covers_every_sampled_run() {
        let current = run_at("100", "2024-05-01T12:00:00Z", 60);
        let successes = vec![
            run_at("99", "2024-05-01T11:00:00Z", 100),
            run_at("98", "2024-05-01T10:00:00Z", 300),
            // Started after the current run: still part of the median
            run_at("101", "2024-05-01T13:00:00Z", 200),
        ];

        let baseline = compute_baseline(&current, &successes);
        assert_eq!(baseline.p50_ms, Some(200_000));
        assert_eq!(baseline.last_success.unwrap().id, "99");
    }

    #[test]
    fn last_success_keeps_first_qualifying_in_provider_order() {
        let current = run_at("100", "2024-05-01T12:00:00Z", 60);
        let successes = vec![
            run_at("101", "2024-05-01T12:30:00Z", 60),
            run_at("90", "2024-05-01T08:00:00Z", 60),
            run_at("95", "2024-05-01T10:00:00Z", 60),
        ];

        let last = last_success_before(&current, &successes).unwrap();
        assert_eq!(last.id, "90");
    }

    #[test]
    fn same_start_time_does_not_count_as_before() {
        let current = run_at("100", "2024-05-01T12:00:00Z", 60);
        let successes = vec![run_at("100", "2024-05-01T12:00:00Z", 60)];
        assert!(last_success_before(&current, &successes).is_none());
    }
}
