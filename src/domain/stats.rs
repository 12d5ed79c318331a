use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::Classification;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Daily counters shown in the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub scans_today: u64,
    pub threats_blocked: u64,
    pub last_reset: String,
}

impl ScanStats {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            scans_today: 0,
            threats_blocked: 0,
            last_reset: today.format(DATE_FORMAT).to_string(),
        }
    }

    /// Resets the daily counter when `today` differs from the stored date.
    /// Returns true when the stats changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today = today.format(DATE_FORMAT).to_string();
        if self.last_reset == today {
            return false;
        }
        self.scans_today = 0;
        self.last_reset = today;
        true
    }

    pub fn record_scan(&mut self, classification: Classification) {
        self.scans_today = self.scans_today.saturating_add(1);
        if classification == Classification::Phishing {
            self.threats_blocked = self.threats_blocked.saturating_add(1);
        }
    }
}
