//! Run diagnosis pipeline.
//!
//! [`analyze`] gathers metadata from a [`DataSource`], computes the duration
//! baseline, pulls log excerpts for failing jobs and derives suspects.
//! Metadata, baseline and diff failures abort the analysis; anything that goes
//! wrong with the log archive only degrades the report.

mod baseline;
mod cancellation;
pub mod logs;
mod suspects;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::Result;
use crate::model::{Job, Report};
use crate::providers::DataSource;

use baseline::compute_baseline;
use cancellation::infer_cancellation_reason;
use logs::{extract_excerpt, DEFAULT_CONTEXT_LINES, DEFAULT_MAX_LINES};
use suspects::generate_suspects;

/// Knobs for a single analysis.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Maximum number of successful runs sampled for the baseline
    pub sample_limit: usize,
    /// Fetch the log archive even when the run did not fail
    pub want_logs: bool,
    /// Persist the raw log archive under this directory
    pub save_logs_dir: Option<PathBuf>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            sample_limit: 50,
            want_logs: false,
            save_logs_dir: None,
        }
    }
}

/// Diagnoses the run referenced by `run_ref`.
///
/// # Errors
///
/// Returns an error if the run, its jobs, the workflow name, the successful
/// run sample or the diff cannot be fetched. Log archive problems are logged
/// as warnings and leave the excerpts and cancellation reason empty.
pub async fn analyze(
    source: &dyn DataSource,
    run_ref: &str,
    options: &AnalyzeOptions,
) -> Result<Report> {
    let run = source.get_run(run_ref).await?;
    info!("Analyzing run {} of {} on {}", run.id, run.repo, run.branch);

    let (mut jobs, workflow_name) =
        futures::try_join!(source.list_jobs(&run), source.workflow_name(&run))?;

    let successes = source
        .list_successful_runs(&run, options.sample_limit)
        .await?;
    info!("Sampled {} successful runs for baseline", successes.len());
    let baseline = compute_baseline(&run, &successes);

    let compare = match &baseline.last_success {
        Some(last) => {
            source
                .compare_since_last_success(&run, Some(last))
                .await?
        }
        None => None,
    };

    let mut logs_path = None;
    let mut logs_fetched = false;
    if run.is_failed() || options.want_logs {
        match source.download_logs_archive(&run).await {
            Ok(archive) => {
                attach_log_excerpts(&archive, &mut jobs);
                logs_fetched = true;

                if let Some(dir) = &options.save_logs_dir {
                    match persist_archive(dir, &run.id, &archive).await {
                        Ok(path) => logs_path = Some(path),
                        Err(e) => warn!("Could not save logs: {e}"),
                    }
                }
            }
            Err(e) => warn!("Could not extract logs: {e}"),
        }
    }

    let failing_jobs: Vec<Job> = jobs.iter().filter(|j| j.is_failing()).cloned().collect();
    info!("{} failing jobs", failing_jobs.len());

    let cancellation_reason = if run.is_cancelled() && logs_fetched {
        infer_cancellation_reason(&jobs, &failing_jobs).map(str::to_string)
    } else {
        None
    };

    let suspects = generate_suspects(&run, compare.as_ref(), baseline.p50_ms);

    Ok(Report {
        run,
        workflow_name,
        cancellation_reason,
        failing_jobs,
        baseline_p50_ms: baseline.p50_ms,
        last_success: baseline.last_success,
        compare,
        suspects,
        logs_path,
        ai_analysis: None,
    })
}

/// Fills `log_lines` for every failing job from the shared archive.
fn attach_log_excerpts(archive: &[u8], jobs: &mut [Job]) {
    for job in jobs.iter_mut().filter(|j| j.is_failing()) {
        let step_name = job.first_failing_step().map(|s| s.name.clone());
        job.log_lines = extract_excerpt(
            archive,
            &job.name,
            step_name.as_deref(),
            DEFAULT_MAX_LINES,
            DEFAULT_CONTEXT_LINES,
        );
    }
}

/// Writes the archive to `<dir>/run-<id>-logs.zip`, replacing any previous copy.
pub async fn persist_archive(dir: &Path, run_id: &str, archive: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("run-{run_id}-logs.zip"));
    tokio::fs::write(&path, archive).await?;
    info!("Saved log archive to {}", path.display());
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::test_support::{job, run_at, step};
    use super::*;
    use crate::error::CIDoctorError;
    use crate::model::{ChangedFile, Diff, Run};
    use async_trait::async_trait;
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct FakeSource {
        run: Run,
        jobs: Vec<Job>,
        successes: Vec<Run>,
        diff: Option<Diff>,
        archive: Option<Vec<u8>>,
        archive_calls: AtomicUsize,
        compare_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(run: Run, jobs: Vec<Job>) -> Self {
            Self {
                run,
                jobs,
                successes: vec![],
                diff: None,
                archive: None,
                archive_calls: AtomicUsize::new(0),
                compare_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DataSource for FakeSource {
        async fn get_run(&self, run_ref: &str) -> Result<Run> {
            if run_ref == "missing" {
                return Err(CIDoctorError::Api {
                    url: run_ref.to_string(),
                    status: 404,
                    message: "Not Found".to_string(),
                });
            }
            Ok(self.run.clone())
        }

        async fn list_jobs(&self, _run: &Run) -> Result<Vec<Job>> {
            Ok(self.jobs.clone())
        }

        async fn workflow_name(&self, _run: &Run) -> Result<String> {
            Ok("CI".to_string())
        }

        async fn list_successful_runs(&self, _run: &Run, limit: usize) -> Result<Vec<Run>> {
            Ok(self.successes.iter().take(limit).cloned().collect())
        }

        async fn compare_since_last_success(
            &self,
            _current: &Run,
            last_success: Option<&Run>,
        ) -> Result<Option<Diff>> {
            self.compare_calls.fetch_add(1, Ordering::SeqCst);
            Ok(last_success.and(self.diff.clone()))
        }

        async fn download_logs_archive(&self, _run: &Run) -> Result<Vec<u8>> {
            self.archive_calls.fetch_add(1, Ordering::SeqCst);
            self.archive
                .clone()
                .ok_or_else(|| CIDoctorError::MalformedResponse("archive unavailable".into()))
        }
    }

    fn archive_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn failed_run() -> Run {
        let mut run = run_at("500", "2024-05-01T12:00:00Z", 200);
        run.conclusion = Some("failure".to_string());
        run
    }

    fn failing_test_job() -> Job {
        let mut test = job("test", Some("failure"));
        test.steps = vec![step("Checkout", "success"), step("Run tests", "failure")];
        test
    }

    fn end_to_end_source() -> FakeSource {
        let jobs = vec![
            job("build", Some("success")),
            failing_test_job(),
            job("lint", Some("skipped")),
        ];
        let mut source = FakeSource::new(failed_run(), jobs);
        source.successes = vec![
            run_at("499", "2024-05-01T11:00:00Z", 180),
            run_at("498", "2024-05-01T10:00:00Z", 100),
            run_at("497", "2024-05-01T09:00:00Z", 240),
            run_at("496", "2024-05-01T08:00:00Z", 150),
            run_at("495", "2024-05-01T07:00:00Z", 200),
        ];
        source.diff = Some(Diff {
            total_commits: 2,
            files: vec![ChangedFile::named("Cargo.lock"), ChangedFile::named("src/lib.rs")],
        });
        source.archive = Some(archive_with(&[
            ("1_test/1_Checkout.txt", "checked out"),
            (
                "1_test/2_Run tests.txt",
                "running 3 tests\ntest a ... ok\nerror: test failed, to rerun pass `--lib`",
            ),
        ]));
        source
    }

    #[tokio::test]
    async fn end_to_end_failed_run() {
        let source = end_to_end_source();

        let report = analyze(&source, "run", &AnalyzeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.workflow_name, "CI");
        assert_eq!(report.baseline_p50_ms, Some(180_000));
        assert_eq!(report.last_success.as_ref().unwrap().id, "499");
        assert_eq!(report.failing_jobs.len(), 1);
        assert_eq!(report.failing_jobs[0].name, "test");
        assert_eq!(
            report.failing_jobs[0].log_lines.as_deref().unwrap().last().unwrap(),
            "error: test failed, to rerun pass `--lib`"
        );
        assert_eq!(report.suspects.len(), 1);
        assert!(report.suspects[0].contains("lockfile"));
        assert_eq!(report.cancellation_reason, None);
        assert_eq!(report.logs_path, None);
        assert_eq!(source.archive_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn log_archive_failure_is_not_fatal() {
        let mut source = end_to_end_source();
        source.archive = None;

        let report = tokio_test::assert_ok!(analyze(&source, "run", &AnalyzeOptions::default()).await);

        assert_eq!(report.failing_jobs.len(), 1);
        assert_eq!(report.failing_jobs[0].log_lines, None);
        assert_eq!(report.suspects.len(), 1);
    }

    #[tokio::test]
    async fn metadata_errors_propagate() {
        let source = end_to_end_source();
        let err = tokio_test::assert_err!(analyze(&source, "missing", &AnalyzeOptions::default()).await);
        assert!(matches!(err, CIDoctorError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn successful_run_skips_logs_unless_requested() {
        let mut source = end_to_end_source();
        source.run.conclusion = Some("success".to_string());
        source.jobs = vec![job("build", Some("success"))];

        let report = analyze(&source, "run", &AnalyzeOptions::default())
            .await
            .unwrap();
        assert!(report.failing_jobs.is_empty());
        assert_eq!(source.archive_calls.load(Ordering::SeqCst), 0);

        let options = AnalyzeOptions {
            want_logs: true,
            ..AnalyzeOptions::default()
        };
        analyze(&source, "run", &options).await.unwrap();
        assert_eq!(source.archive_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_sample_means_no_baseline_and_no_diff() {
        let mut source = end_to_end_source();
        source.successes.clear();

        let report = analyze(&source, "run", &AnalyzeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.baseline_p50_ms, None);
        assert_eq!(report.last_success, None);
        assert_eq!(report.compare, None);
        assert!(report.suspects.is_empty());
        assert_eq!(source.compare_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_run_after_sibling_failure() {
        let mut run = failed_run();
        run.conclusion = Some("cancelled".to_string());
        let mut source = FakeSource::new(
            run,
            vec![failing_test_job(), job("e2e", Some("cancelled"))],
        );
        source.archive = Some(archive_with(&[("1_test/2_Run tests.txt", "timeout waiting")]));

        let report = analyze(&source, "run", &AnalyzeOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failing_jobs.len(), 2);
        assert_eq!(
            report.cancellation_reason.as_deref(),
            Some("Cancelled after a failure in another job")
        );
    }

    #[tokio::test]
    async fn cancellation_reason_only_for_cancelled_runs() {
        let mut source = FakeSource::new(
            failed_run(),
            vec![failing_test_job(), job("e2e", Some("cancelled"))],
        );
        source.archive = Some(archive_with(&[("1_test/2_Run tests.txt", "boom")]));

        let report = analyze(&source, "run", &AnalyzeOptions::default())
            .await
            .unwrap();
        assert_eq!(report.cancellation_reason, None);
    }

    #[tokio::test]
    async fn saves_archive_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = dir.path().join("artifacts");
        let source = end_to_end_source();
        let options = AnalyzeOptions {
            save_logs_dir: Some(artifacts.clone()),
            ..AnalyzeOptions::default()
        };

        let first = analyze(&source, "run", &options).await.unwrap();
        let second = analyze(&source, "run", &options).await.unwrap();

        let expected = artifacts.join("run-500-logs.zip");
        assert_eq!(first.logs_path.as_deref(), Some(expected.as_path()));
        assert_eq!(second.logs_path, first.logs_path);
        assert_eq!(
            std::fs::read(&expected).unwrap(),
            source.archive.clone().unwrap()
        );
    }
}
