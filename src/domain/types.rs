use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Per-module sub-scores reported by the classification API (`ml`, `lexical`, ...).
pub type ModuleScores = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Legitimate,
    Suspicious,
    Phishing,
    Error,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Legitimate => "Legitimate",
            Classification::Suspicious => "Suspicious",
            Classification::Phishing => "Phishing",
            Classification::Error => "Error",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Also absorbs levels this host does not know about.
    #[default]
    #[serde(other)]
    Unknown,
}

/// Only `classification` is required from the API; a verdict is never dropped
/// because a secondary field is missing or unfamiliar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(default)]
    pub url: String,
    pub classification: Classification,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules: Option<ModuleScores>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

impl ScanResult {
    /// Result for pages that cannot be scanned (extension pages, local files, ...).
    pub fn skipped(url: &str) -> Self {
        Self {
            url: url.to_string(),
            classification: Classification::Legitimate,
            confidence: 0.0,
            risk_level: RiskLevel::Low,
            modules: None,
            skipped: true,
            error: false,
        }
    }

    /// Fail-open result produced once every attempt against the API has failed.
    pub fn unavailable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            classification: Classification::Error,
            confidence: 0.0,
            risk_level: RiskLevel::Unknown,
            modules: None,
            skipped: false,
            error: true,
        }
    }

    pub fn is_phishing(&self) -> bool {
        self.classification == Classification::Phishing
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}
