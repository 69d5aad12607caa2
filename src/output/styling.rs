use std::fmt::Display;

use console::{style, StyledObject};

use crate::analysis::logs::is_error_line;
use crate::model::is_failing_conclusion;

pub type Styled = StyledObject<String>;

fn styled(text: impl Display) -> Styled {
    style(text.to_string())
}

pub fn success(text: impl Display) -> Styled {
    styled(text).bright().green()
}

pub fn failure(text: impl Display) -> Styled {
    styled(text).bright().red()
}

pub fn warning(text: impl Display) -> Styled {
    styled(text).bright().yellow()
}

pub fn accent(text: impl Display) -> Styled {
    styled(text).cyan()
}

pub fn dim(text: impl Display) -> Styled {
    styled(text).dim()
}

pub fn bright(text: impl Display) -> Styled {
    styled(text).bright()
}

pub fn magenta_bold(text: impl Display) -> Styled {
    styled(text).magenta().bold()
}

/// Run or job conclusion, colored by outcome.
pub fn conclusion(text: &str) -> Styled {
    if is_failing_conclusion(Some(text)) {
        failure(text)
    } else if text.eq_ignore_ascii_case("success") {
        success(text)
    } else {
        warning(text)
    }
}

/// Log excerpt line; error-looking lines are red.
pub fn log_line(line: &str) -> Styled {
    if is_error_line(line) {
        styled(line).red()
    } else {
        styled(line)
    }
}
