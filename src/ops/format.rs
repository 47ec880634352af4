//! Text rendering helpers.
//!
//! Widths are measured in terminal columns, so CJK names line up in the ERD
//! boxes and in table output.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

use crate::models::RowSet;

/// How the CLI prints row-bearing results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON report (default)
    #[default]
    Json,
    /// ASCII table (like the MySQL CLI)
    Table,
}

pub fn display_width(text: &str) -> usize {
    text.width()
}

/// Left-justify `text` to `width` columns.
pub fn pad_right(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(fill))
}

/// Centre `text` in `width` columns.
///
/// When the margin is odd the extra space goes left only if `width` is also
/// odd, so a name centres the same way at every box width.
pub fn center(text: &str, width: usize) -> String {
    let margin = width.saturating_sub(display_width(text));
    let left = margin / 2 + (margin & width & 1);
    let right = margin - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a row set as a bordered table with a row-count footer.
pub fn format_as_table(set: &RowSet) -> String {
    if set.columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = set.columns.iter().map(|c| display_width(c)).collect();
    for row in &set.rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(&format_value(value)));
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = String::new();
    output.push_str(&separator);
    let header: String = set
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| format!("| {} ", center(name, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in &set.rows {
        let line: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = row.get(i).unwrap_or(&JsonValue::Null);
                let text = format_value(value);
                if matches!(value, JsonValue::Number(_)) {
                    let fill = w.saturating_sub(display_width(&text));
                    format!("| {}{} ", " ".repeat(fill), text)
                } else {
                    format!("| {} ", pad_right(&text, *w))
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&line);
    }
    output.push_str(&separator);

    let noun = if set.rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!("{} {} in set", set.rows.len(), noun));
    if set.truncated {
        output.push_str(" (truncated)");
    }
    output.push('\n');
    output
}
