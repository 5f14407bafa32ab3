//! HTML handling for text sanitization.
//!
//! # Responsibilities
//! - Strip all markup, or filter it against a per-level tag allow-list
//! - Remove event handlers, inline styles and script-bearing URL attributes
//! - Encode markup characters for the strict level
//!
//! # Design Decisions
//! - Regex-based tag scanning; no DOM is built
//! - `script`/`style` elements go with their content at every non-encoding level
//! - Encoding never double-encodes an existing character entity

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::sanitize::options::HtmlLevel;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<\s*(script|style)\b[^>]*>.*?<\s*/\s*(script|style)\s*>").expect("valid regex")
});

static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<\s*/?\s*([a-zA-Z][a-zA-Z0-9]*)").expect("valid regex"));

static EVENT_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+style\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
});

static SCRIPT_URL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)[\s/]+(href|src|action|formaction|xlink:href|background|poster)\s*=\s*("\s*(javascript|vbscript|data)\s*:[^"]*"|'\s*(javascript|vbscript|data)\s*:[^']*'|(javascript|vbscript|data)\s*:[^\s>]*)"#,
    )
    .expect("valid regex")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").expect("valid regex")
});

static ANY_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});").expect("valid regex")
});

const BASIC_TAGS: &[&str] = &[
    "p", "br", "strong", "em", "b", "i", "u", "span", "div", "h1", "h2", "h3", "h4", "h5", "h6",
];

const STANDARD_EXTRA_TAGS: &[&str] = &[
    "ul", "ol", "li", "blockquote", "pre", "code", "a", "img", "table", "tr", "td", "th", "thead",
    "tbody",
];

const DANGEROUS_TAGS: &[&str] = &[
    "script", "object", "embed", "form", "input", "iframe", "meta", "link", "style", "svg", "math",
    "details", "template", "audio", "video", "canvas", "base",
];

/// Remove every tag, dropping script and style content.
pub fn strip_tags(input: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(input, "");
    TAG.replace_all(&without_blocks, "").into_owned()
}

/// Apply an HTML level to `input`.
pub fn apply_level(input: &str, level: HtmlLevel) -> String {
    match level {
        HtmlLevel::Strip => strip_tags(input),
        HtmlLevel::Strict => encode_markup(input),
        HtmlLevel::Basic => filter_tags(input, |name| BASIC_TAGS.contains(&name)),
        HtmlLevel::Standard => filter_tags(input, |name| {
            BASIC_TAGS.contains(&name) || STANDARD_EXTRA_TAGS.contains(&name)
        }),
        HtmlLevel::Relaxed => filter_relaxed(input),
    }
}

/// Encode `& < > " '`, leaving existing entities intact.
pub fn encode_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (idx, c) in input.char_indices() {
        match c {
            '&' if ENTITY.is_match(&input[idx..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Rewrite the text between character entities with `f`, keeping each entity intact.
pub fn map_outside_entities(input: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for entity in ANY_ENTITY.find_iter(input) {
        out.push_str(&f(&input[last..entity.start()]));
        out.push_str(entity.as_str());
        last = entity.end();
    }
    out.push_str(&f(&input[last..]));
    out
}

/// Strip event handlers, inline styles and script URLs from one tag.
pub fn clean_attributes(tag: &str) -> String {
    let tag = EVENT_ATTR.replace_all(tag, "");
    let tag = STYLE_ATTR.replace_all(&tag, "");
    SCRIPT_URL_ATTR.replace_all(&tag, "").into_owned()
}

fn tag_name(tag: &str) -> Option<String> {
    TAG_NAME
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

fn filter_tags(input: &str, allowed: impl Fn(&str) -> bool) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(input, "");
    TAG.replace_all(&without_blocks, |caps: &Captures| {
        let tag = &caps[0];
        match tag_name(tag) {
            Some(name) if allowed(&name) => clean_attributes(tag),
            _ => String::new(),
        }
    })
    .into_owned()
}

fn filter_relaxed(input: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(input, "");
    TAG.replace_all(&without_blocks, |caps: &Captures| {
        let tag = &caps[0];
        match tag_name(tag) {
            Some(name) if DANGEROUS_TAGS.contains(&name.as_str()) => String::new(),
            Some(_) => clean_attributes(tag),
            None => tag.to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_removes_script_with_content() {
        assert_eq!(strip_tags("hi <script>alert(1)</script> there"), "hi  there");
        assert_eq!(strip_tags("<b>bold</b>"), "bold");
    }

    #[test]
    fn test_strip_nested_payload() {
        let out = strip_tags("<scr<script>ipt>alert(1)");
        assert!(!out.contains('<'));
    }

    #[test]
    fn test_basic_keeps_allowed_tags() {
        let out = apply_level("<p onclick=\"x()\">hi</p><table><tr></tr></table>", HtmlLevel::Basic);
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn test_standard_keeps_links_without_script_urls() {
        let out = apply_level(
            "<a href=\"javascript:alert(1)\">x</a><a href=\"https://example.com\">y</a>",
            HtmlLevel::Standard,
        );
        assert_eq!(out, "<a>x</a><a href=\"https://example.com\">y</a>");
    }

    #[test]
    fn test_relaxed_removes_dangerous_only() {
        let out = apply_level(
            "<section style=\"color:red\"><iframe src=x></iframe><custom>ok</custom></section>",
            HtmlLevel::Relaxed,
        );
        assert_eq!(out, "<section><custom>ok</custom></section>");
    }

    #[test]
    fn test_relaxed_keeps_declarations() {
        let xml = "<?xml version=\"1.0\"?><note><!-- c --><to>Bob</to></note>";
        assert_eq!(apply_level(xml, HtmlLevel::Relaxed), xml);
    }

    #[test]
    fn test_strict_encodes_without_double_encoding() {
        let once = encode_markup("<a href='x'>&</a> &amp;");
        assert_eq!(once, "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt; &amp;");
        assert_eq!(encode_markup(&once), once);
    }

    #[test]
    fn test_map_outside_entities() {
        let out = map_outside_entities("a;&amp;b;&#39;", |seg| seg.replace(';', ""));
        assert_eq!(out, "a&amp;b&#39;");
    }

    #[test]
    fn test_clean_attributes_unquoted_handlers() {
        assert_eq!(clean_attributes("<img src=x onerror=alert(1)>"), "<img src=x>");
    }

    #[test]
    fn test_slash_separated_attributes_removed_at_every_kept_level() {
        assert_eq!(
            apply_level("<p/onclick=alert(1)>hi</p>", HtmlLevel::Basic),
            "<p>hi</p>"
        );
        assert_eq!(
            apply_level("<img/src=x/onerror=alert(1)>", HtmlLevel::Standard),
            "<img/src=x>"
        );
        assert_eq!(
            apply_level("<a/href=javascript:alert(1)>x</a>", HtmlLevel::Standard),
            "<a>x</a>"
        );
        assert_eq!(
            apply_level("<div/style=x/onmouseover=alert(1)>ok</div>", HtmlLevel::Relaxed),
            "<div>ok</div>"
        );
    }
}
