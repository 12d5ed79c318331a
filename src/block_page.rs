use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::{
    domain::{DetectionRecord, TabId},
    guard::{DetectionStore, NavigationGuard, TabController},
};

/// Actions offered by the blocking page. Confirmation prompts stay in the UI;
/// by the time these run the user has already confirmed.
pub struct BlockPage {
    guard: Arc<NavigationGuard>,
    detections: Arc<dyn DetectionStore>,
    tabs: Arc<dyn TabController>,
    safe_url: String,
}

impl BlockPage {
    pub fn new(
        guard: Arc<NavigationGuard>,
        detections: Arc<dyn DetectionStore>,
        tabs: Arc<dyn TabController>,
        safe_url: String,
    ) -> Self {
        Self {
            guard,
            detections,
            tabs,
            safe_url,
        }
    }

    pub async fn detection(&self) -> Result<Option<DetectionRecord>> {
        self.detections
            .load_detection()
            .await
            .context("failed to load detection")
    }

    pub async fn go_back(&self, tab_id: TabId) -> Result<()> {
        tracing::info!(target: "guard", tab_id = tab_id.0, url = %self.safe_url, "leaving blocked page");
        self.tabs.navigate(tab_id, self.safe_url.clone()).await
    }

    /// Lets the tab continue to the blocked URL. Returns that URL.
    pub async fn proceed(&self, tab_id: TabId) -> Result<String> {
        let record = self
            .detection()
            .await?
            .ok_or_else(|| anyhow!("original URL unavailable"))?;
        let url = record.original_url;

        self.detections
            .clear_detection()
            .await
            .context("failed to clear detection")?;
        // The bypass has to exist before the navigation reaches the guard.
        self.guard.register_bypass(tab_id, &url);
        self.tabs.navigate(tab_id, url.clone()).await?;

        tracing::warn!(target: "guard", tab_id = tab_id.0, url = %url, "user proceeded past warning");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Classification, NavigationIntent},
        guard::{GuardOutcome, SkipReason},
        test_support::{Harness, TabCommand},
    };

    fn block_page(h: &Harness) -> BlockPage {
        BlockPage::new(
            h.guard.clone(),
            h.detections.clone(),
            h.tabs.clone(),
            "https://www.google.com".to_string(),
        )
    }

    fn nav(tab: i64, url: &str) -> NavigationIntent {
        NavigationIntent {
            tab_id: TabId(tab),
            frame_id: 0,
            url: url.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn proceed_registers_bypass_before_navigating() {
        let h = Harness::new().with_verdict("https://evil.test/", Classification::Phishing);
        let page = block_page(&h);
        assert_eq!(
            h.guard.handle_navigation(nav(1, "https://evil.test/")).await,
            GuardOutcome::Blocked
        );

        let url = page.proceed(TabId(1)).await.unwrap();

        assert_eq!(url, "https://evil.test/");
        assert!(h.detections.current().is_none());
        assert_eq!(
            h.tabs.commands(),
            vec![
                TabCommand::BlockPage(TabId(1)),
                TabCommand::Navigate(TabId(1), "https://evil.test/".to_string()),
            ]
        );

        // Even once the blocked marker and in-flight hold have lapsed.
        tokio::time::advance(std::time::Duration::from_secs(10)).await;
        assert_eq!(
            h.guard.handle_navigation(nav(1, "https://evil.test/")).await,
            GuardOutcome::Skipped(SkipReason::Bypassed)
        );
    }

    #[tokio::test]
    async fn proceed_without_detection_does_not_navigate() {
        let h = Harness::new();
        let page = block_page(&h);

        let err = page.proceed(TabId(1)).await.unwrap_err();

        assert_eq!(err.to_string(), "original URL unavailable");
        assert!(h.tabs.commands().is_empty());
    }

    #[tokio::test]
    async fn go_back_navigates_to_safe_url() {
        let h = Harness::new();
        block_page(&h).go_back(TabId(2)).await.unwrap();
        assert_eq!(
            h.tabs.commands(),
            vec![TabCommand::Navigate(TabId(2), "https://www.google.com".to_string())]
        );
    }
}
