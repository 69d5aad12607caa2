use crate::model::{Diff, Run};

pub const MAX_SUSPECTS: usize = 3;

const DURATION_SPIKE: &str =
    "Duration spike vs median → cache miss, dependency install, or external service slowdown.";
const LOCKFILE_CHANGE: &str =
    "Dependency/lockfile changes may have broken build or invalidated caches.";
const WORKFLOW_CHANGE: &str =
    "Workflow changes detected → runner image, permissions, or cache keys altered.";
const DOCKERFILE_CHANGE: &str =
    "Dockerfile changes → base image/layer differences causing failures.";
const MANUAL_TRIGGER: &str = "Manual/dispatch trigger → verify inputs/secrets.";

const LOCKFILE_SUFFIXES: [&str; 10] = [
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "requirements.txt",
    "Pipfile.lock",
    "go.sum",
    "Cargo.lock",
    "Gemfile.lock",
    "composer.lock",
];

const WORKFLOW_MARKERS: [&str; 3] = [".github/workflows/", "ci.yml", "ci.yaml"];

const DISPATCH_EVENTS: [&str; 2] = ["workflow_dispatch", "repository_dispatch"];

/// Ratio of run duration to baseline median above which the run is a spike.
const SPIKE_FACTOR: f64 = 1.5;

/// Inputs shared by every suspect rule.
struct Signals<'a> {
    run: &'a Run,
    filenames: Vec<&'a str>,
    baseline_p50_ms: Option<i64>,
}

impl Signals<'_> {
    fn touches(&self, predicate: impl Fn(&str) -> bool) -> bool {
        self.filenames.iter().any(|name| predicate(name))
    }
}

type Rule = (fn(&Signals) -> bool, &'static str);

/// Evaluated in this order; the order is part of the output contract.
const RULES: [Rule; 5] = [
    (duration_spike, DURATION_SPIKE),
    (lockfile_changed, LOCKFILE_CHANGE),
    (workflow_changed, WORKFLOW_CHANGE),
    (dockerfile_changed, DOCKERFILE_CHANGE),
    (manual_trigger, MANUAL_TRIGGER),
];

fn duration_spike(s: &Signals) -> bool {
    match s.baseline_p50_ms {
        #[allow(clippy::cast_precision_loss)]
        Some(p50) if p50 > 0 => s.run.duration_ms() as f64 > p50 as f64 * SPIKE_FACTOR,
        _ => false,
    }
}

fn lockfile_changed(s: &Signals) -> bool {
    s.touches(|name| LOCKFILE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

fn workflow_changed(s: &Signals) -> bool {
    s.touches(|name| WORKFLOW_MARKERS.iter().any(|marker| name.contains(marker)))
}

fn dockerfile_changed(s: &Signals) -> bool {
    s.touches(|name| name.to_lowercase().ends_with("dockerfile"))
}

fn manual_trigger(s: &Signals) -> bool {
    DISPATCH_EVENTS.contains(&s.run.event.as_str())
}

/// Produces up to [`MAX_SUSPECTS`] root-cause hypotheses in rule order.
pub fn generate_suspects(run: &Run, diff: Option<&Diff>, baseline_p50_ms: Option<i64>) -> Vec<String> {
    let signals = Signals {
        run,
        filenames: diff
            .map(|d| d.files.iter().map(|f| f.filename.as_str()).collect())
            .unwrap_or_default(),
        baseline_p50_ms,
    };

    RULES
        .iter()
        .filter(|(fires, _)| fires(&signals))
        .map(|(_, message)| (*message).to_string())
        .take(MAX_SUSPECTS)
        .collect()
}
