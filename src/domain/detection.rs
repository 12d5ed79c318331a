use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::types::{Classification, ModuleScores, RiskLevel, ScanResult};

/// Snapshot rendered by the blocking page for the most recent block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub original_url: String,
    pub classification: Classification,
    pub confidence: f64,
    #[serde(rename = "risk_level")]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub modules: ModuleScores,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl DetectionRecord {
    pub fn from_scan(original_url: &str, result: &ScanResult) -> Self {
        Self {
            original_url: original_url.to_string(),
            classification: result.classification,
            confidence: result.confidence,
            // Only phishing verdicts are recorded; an unrated one is shown as high risk.
            risk_level: match result.risk_level {
                RiskLevel::Unknown => RiskLevel::High,
                level => level,
            },
            modules: result.modules.clone().unwrap_or_default(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
