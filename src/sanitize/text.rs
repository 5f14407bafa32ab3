//! General text sanitization.
//!
//! # Pipeline (one pass, fixed order)
//! ```text
//! control chars → HTML → line breaks → whitespace
//!     → blacklisted chars → blacklisted patterns → truncate
//! ```
//!
//! At the strict level the blacklist steps run before encoding and skip
//! character entities, so removals never unbalance the encoder's output.
//!
//! # Design Decisions
//! - The pass repeats until its output is stable, so the function is idempotent
//! - Truncation is last; earlier removals are never counted against the limit
//! - Lengths are counted in `char`s, never bytes

use regex::Regex;
use std::sync::LazyLock;

use crate::sanitize::html;
use crate::sanitize::options::{HtmlLevel, SanitizationOptions};

/// Upper bound on re-applied passes.
const MAX_PASSES: usize = 8;

/// Longest named or numeric entity the strict encoder can leave behind.
const MAX_ENTITY_CHARS: usize = 10;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\r\n|\r|\n)+").expect("valid regex"));

/// Sanitize `value` according to `options`.
pub fn sanitize_text(value: &str, options: &SanitizationOptions) -> String {
    let mut current = sanitize_pass(value, options);
    for _ in 1..MAX_PASSES {
        let next = sanitize_pass(&current, options);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn sanitize_pass(value: &str, options: &SanitizationOptions) -> String {
    let mut out = if options.remove_control_characters {
        remove_control_characters(value)
    } else {
        value.to_string()
    };

    let encodes = options.allow_html && options.html_level == HtmlLevel::Strict;
    if encodes {
        out = html::map_outside_entities(&out, |segment| remove_blacklisted(segment, options));
    }

    out = if options.allow_html {
        html::apply_level(&out, options.html_level)
    } else {
        html::strip_tags(&out)
    };

    if options.remove_line_breaks {
        out = LINE_BREAKS.replace_all(&out, " ").into_owned();
    }

    if options.normalize_whitespace {
        out = out.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if !encodes {
        out = remove_blacklisted(&out, options);
    }

    if let Some(max) = options.max_length {
        out = truncate(out, max, options);
    }

    out
}

fn remove_blacklisted(value: &str, options: &SanitizationOptions) -> String {
    let mut out = value.to_string();
    if !options.blacklisted_characters.is_empty() {
        out.retain(|c| !options.blacklisted_characters.contains(&c));
    }

    for pattern in &options.blacklisted_patterns {
        let Some(regex) = pattern.regex() else {
            tracing::debug!(pattern = %pattern.source(), "Skipping uncompiled blacklisted pattern");
            continue;
        };
        loop {
            let next = regex.replace_all(&out, "");
            if next == out {
                break;
            }
            out = next.into_owned();
        }
    }
    out
}

/// Drop control and invisible formatting characters, keeping `\t`, `\n`, `\r`.
pub fn remove_control_characters(value: &str) -> String {
    value
        .chars()
        .filter(|c| matches!(c, '\t' | '\n' | '\r') || !(c.is_control() || is_invisible_format(*c)))
        .collect()
}

fn is_invisible_format(c: char) -> bool {
    matches!(c,
        '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2064}'
        | '\u{2066}'..='\u{2069}'
        | '\u{FEFF}')
}

fn truncate(value: String, max: usize, options: &SanitizationOptions) -> String {
    if value.chars().count() <= max {
        return value;
    }
    let mut out: String = value.chars().take(max).collect();

    if options.allow_html && options.html_level == HtmlLevel::Strict {
        // Never leave half an entity at the cut.
        let tail_start = out
            .char_indices()
            .rev()
            .nth(MAX_ENTITY_CHARS - 1)
            .map(|(i, _)| i)
            .unwrap_or(0);
        if let Some(amp) = out[tail_start..].rfind('&') {
            let amp = tail_start + amp;
            if !out[amp..].contains(';') {
                out.truncate(amp);
            }
        }
    }

    if options.normalize_whitespace {
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
    }
    out
}

/// Make a value safe to embed in a single log line.
pub fn sanitize_for_log(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || is_invisible_format(c) => {}
            c => out.push(c),
        }
    }
    out
}
