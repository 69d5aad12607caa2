//! Log excerpt extraction from a run's log archive.
//!
//! GitHub ships run logs as a ZIP with one text file per step, either flat
//! (`3_Run tests.txt`) or grouped per job (`0_build/3_Run tests.txt`).
//! Extraction locates the entry for a failing step (or job) and windows the
//! text around lines that look like errors.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use log::debug;
use regex::Regex;
use zip::ZipArchive;

use crate::error::Result;

pub const DEFAULT_MAX_LINES: usize = 50;
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// Lower-case markers that flag a log line as error context.
const ERROR_MARKERS: [&str; 10] = [
    "error:",
    "failed:",
    "fatal:",
    "assertion failed",
    "assertionerror",
    "exception:",
    "traceback",
    "exit code",
    "exit status",
    "command failed",
];

/// Returns true if the line contains one of the error markers (case-insensitive).
pub fn is_error_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Extracts a bounded log excerpt for a failing job.
///
/// Looks for the step's log first, then falls back to the job's. Returns
/// `None` when the archive is unreadable or holds no matching entry.
pub fn extract_excerpt(
    archive: &[u8],
    job_name: &str,
    step_name: Option<&str>,
    max_lines: usize,
    context_lines: usize,
) -> Option<Vec<String>> {
    match read_matching_entry(archive, job_name, step_name) {
        Ok(Some(text)) => Some(window_lines(&text, max_lines, context_lines)),
        Ok(None) => {
            debug!("No log entry found for job {job_name:?} (step {step_name:?})");
            None
        }
        Err(e) => {
            debug!("Could not read log archive for job {job_name:?}: {e}");
            None
        }
    }
}

fn read_matching_entry(
    archive: &[u8],
    job_name: &str,
    step_name: Option<&str>,
) -> Result<Option<String>> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    let names: Vec<String> = zip.file_names().map(str::to_string).collect();

    let located = step_name
        .filter(|step| !step.is_empty())
        .and_then(|step| find_step_entry(&names, step))
        .or_else(|| find_job_entry(&names, job_name));

    let Some(name) = located else {
        return Ok(None);
    };
    debug!("Using log entry {name:?} for job {job_name:?}");

    let mut bytes = Vec::new();
    zip.by_name(&name)?.read_to_end(&mut bytes)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// `^\d+_<name>\.txt$`, case-insensitive.
fn numbered_entry_pattern(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)^\d+_{}\.txt$", regex::escape(name))).ok()
}

fn basename(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

fn find_step_entry(names: &[String], step_name: &str) -> Option<String> {
    let pattern = numbered_entry_pattern(step_name)?;

    let exact = names.iter().find(|name| {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [flat] => pattern.is_match(flat),
            [_, nested] => pattern.is_match(nested),
            _ => false,
        }
    });

    exact
        .or_else(|| {
            let needle = step_name.to_lowercase();
            names
                .iter()
                .find(|name| name.ends_with(".txt") && name.to_lowercase().contains(&needle))
        })
        .cloned()
}

fn find_job_entry(names: &[String], job_name: &str) -> Option<String> {
    if job_name.is_empty() {
        return None;
    }
    let exact = numbered_entry_pattern(job_name)?;
    let prefix = Regex::new(&format!(
        r"(?i)^\d+_{}",
        regex::escape(&job_name.replace(' ', "_"))
    ))
    .ok()?;

    names
        .iter()
        .find(|name| exact.is_match(basename(name)))
        .or_else(|| {
            names.iter().find(|name| {
                name.ends_with(".txt")
                    && !name.to_lowercase().contains("system")
                    && prefix.is_match(basename(name))
            })
        })
        .cloned()
}

/// Splits on `\n`, `\r\n` and lone `\r`, the last being common in progress output.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\n' || c == '\r') {
            Some(idx) => {
                lines.push(&rest[..idx]);
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + skip..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Windows `text` around error lines.
///
/// Each error line contributes `context_lines` lines on either side. The
/// union is kept in original order and, past `max_lines`, trimmed to its tail
/// since CI logs usually end at the failure. Without any error line the last
/// `max_lines` lines are returned.
pub fn window_lines(text: &str, max_lines: usize, context_lines: usize) -> Vec<String> {
    let lines = split_lines(text);

    let mut selected = BTreeSet::new();
    for (idx, _) in lines.iter().enumerate().filter(|(_, l)| is_error_line(l)) {
        let start = idx.saturating_sub(context_lines);
        let end = (idx + context_lines + 1).min(lines.len());
        selected.extend(start..end);
    }

    let picked: Vec<&str> = if selected.is_empty() {
        lines
    } else {
        selected.into_iter().map(|idx| lines[idx]).collect()
    };

    let skip = picked.len().saturating_sub(max_lines);
    picked[skip..].iter().map(|line| (*line).to_string()).collect()
}
