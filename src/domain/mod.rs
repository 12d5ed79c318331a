pub mod detection;
pub mod navigation;
pub mod stats;
pub mod types;

pub use detection::DetectionRecord;
pub use navigation::{NavigationIntent, NavigationKey, TabId};
pub use stats::ScanStats;
pub use types::{Classification, ModuleScores, RiskLevel, ScanResult};
