//! Detection types: attack classes, risk levels and detection results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered severity classification.
///
/// The derived ordering is the policy ordering:
/// `None < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// One level up, saturating at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::None => RiskLevel::Low,
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RiskLevel::None),
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// Attack class recognised by the pattern catalog.
///
/// `InjectionClass::ALL` is the catalog order and doubles as the tie-break
/// order when two classes share the top risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionClass {
    SqlInjection,
    XssInjection,
    ScriptInjection,
    CommandInjection,
    PathTraversal,
    LdapInjection,
    #[serde(rename = "xpath_injection")]
    XPathInjection,
    CssInjection,
    TemplateInjection,
    HeaderInjection,
}

impl InjectionClass {
    pub const ALL: [InjectionClass; 10] = [
        InjectionClass::SqlInjection,
        InjectionClass::XssInjection,
        InjectionClass::ScriptInjection,
        InjectionClass::CommandInjection,
        InjectionClass::PathTraversal,
        InjectionClass::LdapInjection,
        InjectionClass::XPathInjection,
        InjectionClass::CssInjection,
        InjectionClass::TemplateInjection,
        InjectionClass::HeaderInjection,
    ];

    /// Fixed base severity of the class before escalation.
    pub fn base_severity(&self) -> RiskLevel {
        match self {
            InjectionClass::CommandInjection => RiskLevel::Critical,
            InjectionClass::SqlInjection
            | InjectionClass::XssInjection
            | InjectionClass::ScriptInjection => RiskLevel::High,
            InjectionClass::PathTraversal
            | InjectionClass::LdapInjection
            | InjectionClass::XPathInjection => RiskLevel::Medium,
            InjectionClass::CssInjection
            | InjectionClass::TemplateInjection
            | InjectionClass::HeaderInjection => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InjectionClass::SqlInjection => "sql_injection",
            InjectionClass::XssInjection => "xss_injection",
            InjectionClass::ScriptInjection => "script_injection",
            InjectionClass::CommandInjection => "command_injection",
            InjectionClass::PathTraversal => "path_traversal",
            InjectionClass::LdapInjection => "ldap_injection",
            InjectionClass::XPathInjection => "xpath_injection",
            InjectionClass::CssInjection => "css_injection",
            InjectionClass::TemplateInjection => "template_injection",
            InjectionClass::HeaderInjection => "header_injection",
        }
    }
}

impl fmt::Display for InjectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running the detector over one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionDetectionResult {
    pub detected: bool,
    #[serde(rename = "type")]
    pub injection_type: Option<InjectionClass>,
    pub risk_level: RiskLevel,
    /// Diagnostic matches, `"<class>: <matched text>"`.
    pub detected_patterns: Vec<String>,
    /// Always within `0..=100`.
    pub confidence_score: u8,
}

impl InjectionDetectionResult {
    /// A result with nothing detected.
    pub fn clean() -> Self {
        Self::default()
    }

    /// True when the result is detected and at or above `threshold`.
    pub fn meets(&self, threshold: RiskLevel) -> bool {
        self.detected && self.risk_level >= threshold
    }
}
