mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_json;
pub use progress::StepProgress;
pub use styling::{dim, failure, magenta_bold};
pub use summary::print_report;

/// Prints the `ci-doctor` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🩺 ci-doctor"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("CI Run Diagnosis")
    );
}
