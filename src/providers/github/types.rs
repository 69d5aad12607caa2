use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{ChangedFile, Job, Run, Step};

/// GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Status of the run (queued, in_progress, completed)
    pub status: String,
    /// Conclusion of the run (success, failure, cancelled, ...)
    pub conclusion: Option<String>,
    /// Event that triggered the run
    pub event: String,
    #[serde(default = "first_attempt")]
    pub run_attempt: u32,
    /// When the current attempt started; missing on very old runs
    pub run_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Head branch or tag name
    pub head_branch: Option<String>,
    /// SHA of the head commit
    pub head_sha: String,
    pub actor: Option<GitHubActor>,
    pub workflow_id: u64,
    pub html_url: String,
}

fn first_attempt() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubActor {
    pub login: String,
}

impl GitHubRun {
    pub fn into_run(self, owner: &str, repo: &str) -> Run {
        Run {
            id: self.id.to_string(),
            provider: "github".to_string(),
            repo: format!("{owner}/{repo}"),
            branch: self.head_branch.unwrap_or_default(),
            event: self.event,
            actor: self.actor.map(|a| a.login),
            status: self.status,
            conclusion: self.conclusion,
            run_attempt: self.run_attempt,
            started_at: self.run_started_at.unwrap_or(self.created_at),
            updated_at: self.updated_at,
            head_sha: Some(self.head_sha),
            web_url: self.html_url,
            workflow_id: Some(self.workflow_id.to_string()),
        }
    }
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubJob {
    pub id: u64,
    pub name: String,
    pub conclusion: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl From<GitHubJob> for Job {
    fn from(job: GitHubJob) -> Self {
        Job {
            id: job.id.to_string(),
            name: job.name,
            conclusion: job.conclusion,
            started_at: job.started_at,
            completed_at: job.completed_at,
            steps: job.steps,
            log_lines: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubWorkflow {
    pub name: Option<String>,
}

/// Response of the compare endpoint.
#[derive(Debug, Deserialize)]
pub struct GitHubComparison {
    #[serde(default)]
    pub total_commits: u64,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

/// Response from GitHub API for workflow runs.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub total_count: usize,
    pub workflow_runs: Vec<GitHubRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Debug, Deserialize)]
pub struct WorkflowJobsResponse {
    #[serde(default)]
    pub total_count: usize,
    pub jobs: Vec<GitHubJob>,
}
