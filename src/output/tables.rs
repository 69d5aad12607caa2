use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::model::is_failing_conclusion;
use crate::timeutil::humanize_ms;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn conclusion_cell(conclusion: Option<&str>) -> Cell {
    let text = conclusion.unwrap_or("unknown");
    if is_failing_conclusion(conclusion) {
        Cell::new(text).fg(TableColor::Red)
    } else if text.eq_ignore_ascii_case("success") {
        Cell::new(text).fg(TableColor::Green)
    } else {
        Cell::new(text).fg(TableColor::Yellow)
    }
}

pub fn duration_cell(ms: Option<i64>) -> Cell {
    match ms {
        Some(_) => Cell::new(humanize_ms(ms)),
        None => Cell::new("n/a").fg(TableColor::DarkGrey),
    }
}
