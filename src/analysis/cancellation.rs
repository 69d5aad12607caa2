use crate::model::Job;

pub const AFTER_SIBLING_FAILURE: &str = "Cancelled after a failure in another job";
pub const TIMEOUT_REACHED: &str = "Timeout reached";
pub const OPERATION_CANCELED: &str = "Operation canceled (manual, concurrency, or timeout)";

fn conclusion_is(job: &Job, wanted: &[&str]) -> bool {
    job.conclusion
        .as_deref()
        .is_some_and(|c| wanted.iter().any(|w| c.eq_ignore_ascii_case(w)))
}

/// Best-effort reason for a cancelled run.
///
/// A sibling failure next to cancelled jobs wins over anything the logs say;
/// otherwise the failing jobs' excerpts are searched for timeout or
/// cancellation phrasing.
pub fn infer_cancellation_reason(jobs: &[Job], failing_jobs: &[Job]) -> Option<&'static str> {
    let any_failure = jobs.iter().any(|j| conclusion_is(j, &["failure", "failed"]));
    let any_cancelled = jobs.iter().any(|j| conclusion_is(j, &["cancelled"]));
    if any_failure && any_cancelled {
        return Some(AFTER_SIBLING_FAILURE);
    }

    let text = failing_jobs
        .iter()
        .filter_map(|j| j.log_lines.as_ref())
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    if text.contains("timeout") || text.contains("timed out") {
        Some(TIMEOUT_REACHED)
    } else if text.contains("the operation was canceled")
        || text.contains("the operation was cancelled")
    {
        Some(OPERATION_CANCELED)
    } else {
        None
    }
}
