//! Output rendering helpers for CLI surfaces.

use crate::core::error::UlwaziError;
use serde::Serialize;

/// Descriptions in reports are cut to this many characters.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const ELLIPSIS: &str = "...";

/// Collapse newlines/extra whitespace and bound length for terminal display.
///
/// The result never exceeds `max_chars`; a cut line ends in `...`.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let preview: String = collapsed.chars().take(keep).collect();
    format!("{}{}", preview, ELLIPSIS)
}

/// Report-ready description: compacted, truncated, never blank.
pub fn description_preview(description: &str) -> String {
    let line = compact_line(description, DESCRIPTION_PREVIEW_CHARS);
    if line.is_empty() {
        "(no description)".to_string()
    } else {
        line
    }
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, UlwaziError> {
    Ok(serde_json::to_string_pretty(value)?)
}
