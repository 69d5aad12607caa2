use std::time::Duration;

use async_trait::async_trait;
use log::info;

use crate::auth::Token;
use crate::error::{CIDoctorError, Result};
use crate::model::{Diff, Job, Run};
use crate::providers::DataSource;

use super::client::GitHubClient;
use super::run_url::RunRef;

/// GitHub Actions implementation of [`DataSource`].
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    /// Create a new GitHub Actions provider.
    ///
    /// # Arguments
    ///
    /// * `api_base` - GitHub API base URL
    /// * `token` - GitHub token
    /// * `timeout` - Per-request timeout
    /// * `use_cache` - Revalidate repeated requests with `ETag`s
    pub fn new(api_base: &str, token: &Token, timeout: Duration, use_cache: bool) -> Result<Self> {
        Ok(Self {
            client: GitHubClient::new(api_base, token, timeout, use_cache)?,
        })
    }
}

/// Splits `Run::repo` ("owner/repo") back into its parts.
fn owner_repo(run: &Run) -> Result<(&str, &str)> {
    run.repo
        .split_once('/')
        .ok_or_else(|| CIDoctorError::MalformedResponse(format!("bad repo id {:?}", run.repo)))
}

fn numeric_id(kind: &str, value: Option<&str>) -> Result<u64> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| CIDoctorError::MalformedResponse(format!("missing or bad {kind} id")))
}

#[async_trait]
impl DataSource for GitHubProvider {
    async fn get_run(&self, run_ref: &str) -> Result<Run> {
        let parsed = RunRef::parse(run_ref)?;
        info!(
            "Fetching run {} of {}/{}",
            parsed.run_id, parsed.owner, parsed.repo
        );
        let run = self
            .client
            .get_run(&parsed.owner, &parsed.repo, parsed.run_id)
            .await?;
        Ok(run.into_run(&parsed.owner, &parsed.repo))
    }

    async fn list_jobs(&self, run: &Run) -> Result<Vec<Job>> {
        let (owner, repo) = owner_repo(run)?;
        let run_id = numeric_id("run", Some(run.id.as_str()))?;
        let jobs = self.client.list_jobs(owner, repo, run_id).await?;
        Ok(jobs.into_iter().map(Job::from).collect())
    }

    async fn workflow_name(&self, run: &Run) -> Result<String> {
        let (owner, repo) = owner_repo(run)?;
        let workflow_id = numeric_id("workflow", run.workflow_id.as_deref())?;
        let workflow = self.client.get_workflow(owner, repo, workflow_id).await?;
        Ok(workflow
            .name
            .unwrap_or_else(|| format!("workflow_{workflow_id}")))
    }

    async fn list_successful_runs(&self, run: &Run, limit: usize) -> Result<Vec<Run>> {
        let (owner, repo) = owner_repo(run)?;
        let workflow_id = numeric_id("workflow", run.workflow_id.as_deref())?;
        let runs = self
            .client
            .list_successful_runs(owner, repo, workflow_id, &run.branch, limit)
            .await?;
        Ok(runs
            .into_iter()
            .map(|r| r.into_run(owner, repo))
            .collect())
    }

    async fn compare_since_last_success(
        &self,
        current: &Run,
        last_success: Option<&Run>,
    ) -> Result<Option<Diff>> {
        let Some(last_success) = last_success else {
            return Ok(None);
        };
        let (Some(base), Some(head)) = (&last_success.head_sha, &current.head_sha) else {
            return Ok(None);
        };

        let (owner, repo) = owner_repo(current)?;
        let comparison = self.client.compare(owner, repo, base, head).await?;
        Ok(Some(Diff {
            total_commits: comparison.total_commits,
            files: comparison.files,
        }))
    }

    async fn download_logs_archive(&self, run: &Run) -> Result<Vec<u8>> {
        let (owner, repo) = owner_repo(run)?;
        let run_id = numeric_id("run", Some(run.id.as_str()))?;
        info!("Downloading log archive for run {run_id}");
        self.client.download_logs(owner, repo, run_id).await
    }
}
