use std::io::Write;

use crate::error::Result;
use crate::model::Report;

/// Writes the report as pretty-printed JSON.
///
/// Absent optional fields are emitted as explicit `null`s so consumers can
/// rely on a stable set of keys. `ai_analysis` is the only key that is
/// omitted when empty.
pub fn export_json(report: &Report, output: &mut dyn Write) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writeln!(output, "{json}")?;
    Ok(())
}
