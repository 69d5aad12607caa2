mod github;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Diff, Job, Run};

pub use github::{GitHubProvider, DEFAULT_API_BASE};

/// Read-only view of a CI provider.
///
/// The analyzer depends on nothing else, so another provider only needs to
/// implement these lookups.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Resolves a provider-specific run reference (e.g., a run URL).
    async fn get_run(&self, run_ref: &str) -> Result<Run>;

    async fn list_jobs(&self, run: &Run) -> Result<Vec<Job>>;

    async fn workflow_name(&self, run: &Run) -> Result<String>;

    /// Successful runs of the same workflow and branch, at most `limit`.
    async fn list_successful_runs(&self, run: &Run, limit: usize) -> Result<Vec<Run>>;

    async fn compare_since_last_success(
        &self,
        current: &Run,
        last_success: Option<&Run>,
    ) -> Result<Option<Diff>>;

    /// Raw log archive for the whole run.
    async fn download_logs_archive(&self, run: &Run) -> Result<Vec<u8>>;
}
