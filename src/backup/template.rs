//! `{key}` substitution for text reports.
//!
//! Supported keys: `now`, `year`, `month`, `day`, `hour`, `minute`, `second`,
//! `size:<folder>` and `tree:<folder>` where `<folder>` is `output`, `archive`
//! or a path. Unknown keys render as nothing.

use crate::backup::clock::Clock;
use crate::backup::config::Defaults;
use crate::backup::humanize::{folder_size, tree_size};

use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::{Captures, Regex};

use std::sync::LazyLock;

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([\s\w.\-:%]+)\}").expect("valid variable pattern"));

/// Placeholder line that forces a blank line in trimmed templates.
pub static BLANK_LINE_MARKER: char = '_';

/// Substitutes every `{key}` once, left to right. Substituted values are not
/// scanned again.
pub fn render(template: &str, defaults: &Defaults, clock: &dyn Clock) -> String {
    let now = clock.now();
    VARIABLE_RE
        .replace_all(template, |caps: &Captures| variable(&caps[1], defaults, now))
        .into_owned()
}

fn variable(key: &str, defaults: &Defaults, now: NaiveDateTime) -> String {
    match key {
        "now" => now.format("%Y-%m-%d %H:%M").to_string(),
        "year" => now.year().to_string(),
        "month" => now.month().to_string(),
        "day" => now.day().to_string(),
        "hour" => now.hour().to_string(),
        "minute" => now.minute().to_string(),
        "second" => now.second().to_string(),
        _ => {
            if let Some(folder) = key.strip_prefix("size:") {
                folder_size(defaults.resolve_folder(folder))
            } else if let Some(folder) = key.strip_prefix("tree:") {
                tree_size(defaults.resolve_folder(folder))
            } else {
                String::new()
            }
        }
    }
}

/// Unifies line endings, turns a lone `_` line into a blank line, trims `_`
/// from both ends and emits CRLF line endings.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\n_\n", "\n\n")
        .trim_matches(BLANK_LINE_MARKER)
        .replace('\n', "\r\n")
}

/// `render` followed by `normalize_text`.
pub fn render_text(template: &str, defaults: &Defaults, clock: &dyn Clock) -> String {
    normalize_text(&render(template, defaults, clock))
}
