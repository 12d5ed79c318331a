use anyhow::Result;
use futures::future::BoxFuture;

use crate::domain::{DetectionRecord, TabId};

pub mod navigation;
pub mod registry;
pub mod trust;

pub use navigation::{AllowReason, GuardOutcome, NavigationGuard, SkipReason};
pub use trust::TrustPolicy;

/// Tab commands the host asks the browser to carry out.
pub trait TabController: Send + Sync {
    fn open_block_page(&self, tab_id: TabId) -> BoxFuture<'_, Result<()>>;
    fn navigate(&self, tab_id: TabId, url: String) -> BoxFuture<'_, Result<()>>;
}

/// Single-slot storage for the detection shown on the blocking page.
pub trait DetectionStore: Send + Sync {
    fn save_detection(&self, record: DetectionRecord) -> BoxFuture<'_, Result<()>>;
    fn load_detection(&self) -> BoxFuture<'_, Result<Option<DetectionRecord>>>;
    fn clear_detection(&self) -> BoxFuture<'_, Result<()>>;
}
