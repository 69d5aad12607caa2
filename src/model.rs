use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timeutil::duration_ms;

/// Conclusions that mark a job, step or run as failing.
const FAILING_CONCLUSIONS: [&str; 3] = ["failure", "failed", "cancelled"];

/// Returns true if `conclusion` is failure, failed or cancelled (case-insensitive).
pub fn is_failing_conclusion(conclusion: Option<&str>) -> bool {
    conclusion.is_some_and(|c| {
        FAILING_CONCLUSIONS
            .iter()
            .any(|failing| c.eq_ignore_ascii_case(failing))
    })
}

/// Point-in-time snapshot of one CI execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    /// Provider tag (e.g., "github")
    pub provider: String,
    /// Provider-specific repository identifier (e.g., "owner/repo")
    pub repo: String,
    pub branch: String,
    /// Triggering event (e.g., "push", "workflow_dispatch")
    pub event: String,
    pub actor: Option<String>,
    pub status: String,
    pub conclusion: Option<String>,
    pub run_attempt: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub head_sha: Option<String>,
    pub web_url: String,
    pub workflow_id: Option<String>,
}

impl Run {
    /// Wall-clock duration from start to last update.
    pub fn duration_ms(&self) -> i64 {
        duration_ms(self.started_at, self.updated_at)
    }

    pub fn is_failed(&self) -> bool {
        is_failing_conclusion(self.conclusion.as_deref())
    }

    pub fn is_cancelled(&self) -> bool {
        self.conclusion
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("cancelled"))
    }
}

/// One command or action within a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One unit of work within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
    /// Log excerpt, written once by the analyzer. `None` means not extracted.
    pub log_lines: Option<Vec<String>>,
}

impl Job {
    pub fn is_failing(&self) -> bool {
        is_failing_conclusion(self.conclusion.as_deref())
    }

    /// First step (in declared order) whose conclusion is failing.
    pub fn first_failing_step(&self) -> Option<&Step> {
        self.steps
            .iter()
            .find(|step| is_failing_conclusion(step.conclusion.as_deref()))
    }

    pub fn duration_ms(&self) -> Option<i64> {
        Some(duration_ms(self.started_at?, self.completed_at?))
    }
}

/// A file touched between two commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl ChangedFile {
    pub fn named(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            status: None,
            additions: 0,
            deletions: 0,
        }
    }
}

/// Source changes between the last successful run and the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub total_commits: u64,
    pub files: Vec<ChangedFile>,
}

/// Final diagnosis of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run: Run,
    pub workflow_name: String,
    /// Present only when the run was cancelled and a reason could be inferred
    pub cancellation_reason: Option<String>,
    pub failing_jobs: Vec<Job>,
    pub baseline_p50_ms: Option<i64>,
    pub last_success: Option<Run>,
    pub compare: Option<Diff>,
    pub suspects: Vec<String>,
    pub logs_path: Option<PathBuf>,
    /// Free-text summary from the optional summarization service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
}
