use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failure, success, warning};

/// Spinner on stderr for a single long-running step.
pub struct StepProgress {
    pb: ProgressBar,
}

impl StepProgress {
    pub fn start(message: &str) -> Self {
        Self {
            pb: create_spinner(warning(message).to_string()),
        }
    }

    pub fn finish(self, message: &str) {
        self.pb
            .finish_with_message(success(format!("{message} ✓")).to_string());
    }

    pub fn fail(self, message: &str) {
        self.pb
            .finish_with_message(failure(format!("{message} ✗")).to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
