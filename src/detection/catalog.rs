//! Pattern catalog.
//!
//! # Responsibilities
//! - Map every `InjectionClass` to an ordered list of compiled matchers
//! - Append operator-supplied patterns from configuration
//! - Expose matchers behind a trait so they can be instrumented
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards (shared via `Arc`)
//! - Catalog order is `InjectionClass::ALL`; detectors rely on it for tie-breaks
//! - A pattern that fails to compile is logged and skipped, never fatal

use regex::{Regex, RegexBuilder};
use std::fmt;
use thiserror::Error;

use crate::config::schema::CustomPatternConfig;
use crate::detection::types::InjectionClass;

/// Compiled size cap for a single pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Errors produced by a pattern matcher.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern source could not be compiled.
    #[error("invalid pattern `{pattern}`: {reason}")]
    Invalid { pattern: String, reason: String },

    /// The pattern failed while running against an input.
    #[error("pattern `{pattern}` failed: {reason}")]
    Execution { pattern: String, reason: String },
}

/// A single compiled signature.
pub trait PatternMatcher: Send + Sync + fmt::Debug {
    /// Source text of the pattern, for diagnostics.
    fn pattern(&self) -> &str;

    /// Returns the first matched fragment, if any.
    fn find(&self, input: &str) -> Result<Option<String>, PatternError>;
}

/// Regex-backed matcher.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(pattern)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { regex })
    }
}

impl PatternMatcher for RegexMatcher {
    fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    fn find(&self, input: &str) -> Result<Option<String>, PatternError> {
        Ok(self.regex.find(input).map(|m| m.as_str().to_string()))
    }
}

/// All matchers for one attack class.
#[derive(Debug)]
pub struct CatalogEntry {
    pub class: InjectionClass,
    pub matchers: Vec<Box<dyn PatternMatcher>>,
}

impl CatalogEntry {
    pub fn new(class: InjectionClass, matchers: Vec<Box<dyn PatternMatcher>>) -> Self {
        Self { class, matchers }
    }
}

/// Ordered attack-class → matcher mapping.
#[derive(Debug)]
pub struct PatternCatalog {
    entries: Vec<CatalogEntry>,
}

impl PatternCatalog {
    /// Build a catalog from explicit entries, kept in the given order.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The built-in signature set.
    pub fn builtin() -> Self {
        let entries = InjectionClass::ALL
            .iter()
            .map(|class| CatalogEntry::new(*class, compile_all(*class, builtin_patterns(*class))))
            .collect();
        Self { entries }
    }

    /// The built-in signature set plus operator-supplied patterns.
    pub fn with_custom_patterns(custom: &[CustomPatternConfig]) -> Self {
        let mut catalog = Self::builtin();
        for custom_pattern in custom {
            match RegexMatcher::new(&custom_pattern.pattern) {
                Ok(matcher) => {
                    if let Some(entry) = catalog
                        .entries
                        .iter_mut()
                        .find(|e| e.class == custom_pattern.class)
                    {
                        entry.matchers.push(Box::new(matcher));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        class = %custom_pattern.class,
                        error = %e,
                        "Skipping custom pattern that failed to compile"
                    );
                }
            }
        }
        catalog
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Total number of matchers across all classes.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.matchers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn compile_all(class: InjectionClass, patterns: &[&str]) -> Vec<Box<dyn PatternMatcher>> {
    patterns
        .iter()
        .filter_map(|p| match RegexMatcher::new(p) {
            Ok(m) => Some(Box::new(m) as Box<dyn PatternMatcher>),
            Err(e) => {
                tracing::warn!(class = %class, error = %e, "Skipping built-in pattern");
                None
            }
        })
        .collect()
}

macro_rules! shell_commands {
    () => {
        "ls|cat|rm|mv|cp|chmod|chown|wget|curl|nc|ncat|netcat|bash|sh|zsh|python[23]?|perl|ruby|php|powershell|cmd|whoami|id|uname|ping|nslookup|kill|sudo|touch|echo"
    };
}

fn builtin_patterns(class: InjectionClass) -> &'static [&'static str] {
    match class {
        InjectionClass::SqlInjection => &[
            r"(?i)\bunion\b\s+(all\s+)?\bselect\b",
            r"(?i);\s*(drop|delete|insert|update|truncate|alter|create|exec|execute|shutdown)\b",
            r"(?i)\b(drop|truncate|alter)\s+(table|database|schema|index|view)\b",
            r#"(?i)'\s*(or|and)\s+['"\w]+\s*(=|<|>|\blike\b)"#,
            r"(?i)\b(or|and)\s+\d+\s*=\s*\d+",
            r"(?i)'\s*(--|#|/\*)|;\s*--",
            r"(?i)\b(sleep|benchmark|pg_sleep)\s*\(|\bwaitfor\s+delay\b",
            r"(?i)\b(xp_cmdshell|sp_executesql|information_schema|sysobjects)\b",
            r"(?i)'\s*\)*\s*;\s*(select|declare|waitfor)\b",
        ],
        InjectionClass::XssInjection => &[
            r"(?i)<\s*script\b",
            r"(?i)</\s*script\s*>",
            r#"(?i)(^|[\s"'/;])on(load|error|click|dblclick|mouse\w+|focus|blur|change|submit|key\w+|abort|unload|resize|scroll|input|animation\w*|toggle|pointer\w+|begin|end)\s*="#,
            r"(?i)\bjavascript\s*:",
            r"(?i)\bvbscript\s*:",
            r"(?i)<\s*(iframe|object|embed|applet|frame|frameset|svg|math|base|meta|link)\b",
            r"(?i)\bdata\s*:\s*text/html",
            r"(?i)(%3c|&lt;)\s*/?\s*script",
        ],
        InjectionClass::ScriptInjection => &[
            r"(?i)\beval\s*\(",
            r"(?i)\b(settimeout|setinterval)\s*\(",
            r"(?i)\bnew\s+function\s*\(",
            r"(?i)\bdocument\s*\.\s*(cookie|write|location|domain)\b",
            r"(?i)\bwindow\s*\.\s*(location|open|name)\b",
            r"(?i)\balert\s*\(",
            r"(?i)\bstring\s*\.\s*fromcharcode\s*\(",
            r"(?i)\b(atob|unescape)\s*\(",
        ],
        InjectionClass::CommandInjection => &[
            concat!(
                r"(?i)([;&|`]|\$\()\s*(",
                shell_commands!(),
                r")\s+(-{1,2}[a-z]|[/~]|\.{1,2}/|\$\{?\w|[a-z]+://|[<>|])"
            ),
            r"(?i)[;&|]\s*(whoami|uname|id|pwd|ls|ifconfig|hostname)\s*($|[;&|#`])",
            r"(?i)\|\s*((ba|z|k)?sh|python[23]?|perl|ruby|php|nc|ncat|netcat)\b",
            concat!(r"(?i)\$\(\s*(", shell_commands!(), r")\b[^)]*\)"),
            concat!(r"(?i)`\s*(", shell_commands!(), r")\b[^`]*`"),
            r"(?i)(/bin/(ba|z|k)?sh\b|/usr/bin/[a-z]+|\bcmd\.exe\b|\bpowershell(\.exe)?\s+-)",
            r"(?i)/dev/tcp/",
        ],
        InjectionClass::PathTraversal => &[
            r"\.\.[/\\]",
            r"(?i)(%2e%2e|%2e\.|\.%2e)(%2f|%5c|/|\\)|\.\.(%2f|%5c)",
            r"(?i)%252e%252e|%c0%ae|%c0%af|%e0%80%ae",
            r"(?i)(\betc/(passwd|shadow|group|hosts)\b|\b(win|boot)\.ini\b|c:\\windows\\)",
            r"%00|\x00",
        ],
        InjectionClass::LdapInjection => &[
            r"\(\s*[|&!]\s*\(",
            r"\*\s*\)\s*\(",
            r"(?i)\(\s*(uid|cn|sn|ou|dc|mail|objectclass|samaccountname|userpassword)\s*=",
            r"\)\s*\(\s*[|&]",
        ],
        InjectionClass::XPathInjection => &[
            r"(?i)'\s*or\s*'[^']*'\s*=\s*'",
            r"(?i)\b(count|string-length|substring|translate|concat|normalize-space|name)\s*\(\s*\.{0,2}/",
            r"(?i)\b(child|descendant|descendant-or-self|ancestor|parent|following-sibling|preceding-sibling)::",
            r"\]\s*\|\s*//",
        ],
        InjectionClass::CssInjection => &[
            r"(?i)\bexpression\s*\(",
            r#"(?i)url\s*\(\s*['"]?\s*(javascript|vbscript|data)\s*:"#,
            r"(?i)@import\b",
            r"(?i)-moz-binding\s*:",
            r"(?i)\bbehavior\s*:\s*url\s*\(",
        ],
        InjectionClass::TemplateInjection => &[
            r"\{\{[^}]*\}\}",
            r"\$\{[^}]*\}",
            r"<%[\s\S]*?%>",
            r"\{%[\s\S]*?%\}",
            r"#\{[^}]*\}",
            r"(?i)__(class|mro|subclasses|globals|builtins)__",
        ],
        InjectionClass::HeaderInjection => &[
            r"(?i)[\r\n]+\s*(set-cookie|location|content-type|content-length|host|x-[a-z0-9-]+)\s*:",
            r"(?i)%0d%0a|%0a%0d",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let catalog = PatternCatalog::builtin();
        let classes: Vec<_> = catalog.entries().iter().map(|e| e.class).collect();
        assert_eq!(classes, InjectionClass::ALL.to_vec());
    }

    #[test]
    fn test_all_builtin_patterns_compile() {
        for class in InjectionClass::ALL {
            let patterns = builtin_patterns(class);
            let compiled = compile_all(class, patterns);
            assert_eq!(compiled.len(), patterns.len(), "class {class} lost a pattern");
        }
    }

    #[test]
    fn test_custom_patterns_appended_and_invalid_skipped() {
        let base = PatternCatalog::builtin().len();
        let custom = vec![
            CustomPatternConfig {
                class: InjectionClass::TemplateInjection,
                pattern: r"(?i)\bfreemarker\b".into(),
            },
            CustomPatternConfig {
                class: InjectionClass::SqlInjection,
                pattern: "(unclosed".into(),
            },
        ];
        let catalog = PatternCatalog::with_custom_patterns(&custom);
        assert_eq!(catalog.len(), base + 1);
    }

    #[test]
    fn test_regex_matcher_reports_fragment() {
        let matcher = RegexMatcher::new(r"(?i)drop\s+table").unwrap();
        let found = matcher.find("x; DROP TABLE users").unwrap();
        assert_eq!(found.as_deref(), Some("DROP TABLE"));
        assert!(RegexMatcher::new("[").is_err());
    }
}
