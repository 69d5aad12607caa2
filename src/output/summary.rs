use std::fmt::Write;

use comfy_table::Cell;

use crate::model::Report;
use crate::timeutil::humanize_ms;

use super::styling::{accent, bright, conclusion, dim, log_line, success, warning};
use super::tables::{conclusion_cell, create_table, cyan_header, duration_cell};

/// Number of changed files listed in the "since last success" line.
const LISTED_FILES: usize = 5;

/// Prints a human-readable diagnosis of a run to stdout.
///
/// Sections, in order:
/// - Header: workflow, run, status, duration vs median, trigger
/// - Cancel reason (cancelled runs only), last success, changes since then
/// - Failing jobs table and one log excerpt per failing job
/// - Suspects table and the optional AI summary
pub fn print_report(report: &Report) {
    println!("{}", render_report(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn duration_delta(duration_ms: i64, baseline_ms: Option<i64>) -> String {
    match baseline_ms {
        Some(base) if base > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let pct = (duration_ms as f64 / base as f64 - 1.0) * 100.0;
            let arrow = if pct >= 0.0 { "↑" } else { "↓" };
            format!(
                "{arrow} {:.0}% vs median {}",
                pct.abs(),
                humanize_ms(Some(base))
            )
        }
        _ => "n/a".to_string(),
    }
}

fn render_header(output: &mut String, report: &Report) {
    let run = &report.run;
    let status = conclusion(run.conclusion.as_deref().unwrap_or(&run.status));
    let duration = run.duration_ms();

    let _ = writeln!(
        output,
        "  {} {}  {}",
        dim("Workflow:"),
        accent(&report.workflow_name),
        dim(format!("(run #{} on {})", run.id, run.branch))
    );
    let _ = writeln!(
        output,
        "  {} {}  {}",
        dim("Status:"),
        status,
        dim(format!("(attempt {})", run.run_attempt))
    );
    let _ = writeln!(
        output,
        "  {} {}  {}",
        dim("Duration:"),
        warning(humanize_ms(Some(duration))),
        dim(format!("({})", duration_delta(duration, report.baseline_p50_ms)))
    );
    let _ = writeln!(
        output,
        "  {} {}  {}",
        dim("Triggered by:"),
        run.event,
        dim(format!("({})", run.actor.as_deref().unwrap_or("unknown")))
    );
}

fn render_history(output: &mut String, report: &Report) {
    if report.run.is_cancelled() {
        if let Some(reason) = &report.cancellation_reason {
            let _ = writeln!(output, "  {} {}", dim("Cancel reason:"), warning(reason));
        }
    }

    match &report.last_success {
        Some(last) => {
            let _ = writeln!(
                output,
                "  {} run #{} {}",
                dim("Last success:"),
                success(&last.id),
                dim(format!("({})", last.web_url))
            );
        }
        None => {
            let _ = writeln!(
                output,
                "  {} {}",
                dim("Last success:"),
                warning("none found in sample window")
            );
        }
    }

    if let Some(diff) = &report.compare {
        let mut names = diff
            .files
            .iter()
            .take(LISTED_FILES)
            .map(|f| f.filename.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if diff.files.len() > LISTED_FILES {
            names.push('…');
        }
        if names.is_empty() {
            names = "no file changes".to_string();
        }
        let _ = writeln!(
            output,
            "  {} {}",
            dim(format!("Since last success ({} commits):", diff.total_commits)),
            names
        );
    }
    output.push('\n');
}

fn render_failing_jobs(output: &mut String, report: &Report) {
    add_section_header(output, "🧪", "Failing Jobs");

    if report.failing_jobs.is_empty() {
        let _ = writeln!(output, "  {}\n", success("No failing jobs detected."));
        return;
    }

    let mut table = create_table();
    table.set_header(cyan_header(&["Job", "Conclusion", "Failing Step", "Duration"]));
    for job in &report.failing_jobs {
        table.add_row(vec![
            Cell::new(&job.name),
            conclusion_cell(job.conclusion.as_deref()),
            Cell::new(job.first_failing_step().map_or("-", |s| s.name.as_str())),
            duration_cell(job.duration_ms()),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    for (i, job) in report.failing_jobs.iter().enumerate() {
        let step = job
            .first_failing_step()
            .map(|s| format!(" → step '{}'", s.name))
            .unwrap_or_default();
        let _ = writeln!(
            output,
            "{} {}",
            bright("📋"),
            bright(format!("Failing Job {}: {}{step}", i + 1, job.name))
        );

        match &job.log_lines {
            Some(lines) if !lines.is_empty() => {
                for line in lines {
                    let _ = writeln!(output, "  {} {}", dim("│"), log_line(line));
                }
            }
            _ => {
                let _ = writeln!(output, "  {}", dim("No log excerpt available."));
            }
        }
        output.push('\n');
    }
}

fn render_suspects(output: &mut String, report: &Report) {
    if report.suspects.is_empty() {
        return;
    }

    add_section_header(output, "💡", "Suspects");
    let mut table = create_table();
    table.set_header(cyan_header(&["#", "Potential cause"]));
    for (i, suspect) in report.suspects.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(suspect)]);
    }
    let _ = writeln!(output, "{table}\n");
}

fn render_report(report: &Report) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🩺", "Run Diagnosis");
    render_header(&mut output, report);
    render_history(&mut output, report);
    render_failing_jobs(&mut output, report);
    render_suspects(&mut output, report);

    if let Some(summary) = &report.ai_analysis {
        add_section_header(&mut output, "🤖", "AI Analysis");
        for line in summary.lines() {
            let _ = writeln!(output, "  {line}");
        }
    }

    output
}
