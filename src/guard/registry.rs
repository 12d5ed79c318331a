use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::domain::TabId;

#[derive(Debug, Default)]
struct RegistryState {
    bypass: HashMap<TabId, HashSet<String>>,
    blocked_until: HashMap<TabId, Instant>,
}

/// Per-tab bypass sets and "just redirected to the block page" markers.
#[derive(Debug)]
pub struct TabRegistry {
    state: Mutex<RegistryState>,
    blocked_marker_ttl: Duration,
}

impl TabRegistry {
    pub fn new(blocked_marker_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            blocked_marker_ttl,
        }
    }

    pub fn allow(&self, tab_id: TabId, url: &str) -> bool {
        self.state
            .lock()
            .bypass
            .entry(tab_id)
            .or_default()
            .insert(url.to_string())
    }

    pub fn is_bypassed(&self, tab_id: TabId, url: &str) -> bool {
        self.state
            .lock()
            .bypass
            .get(&tab_id)
            .is_some_and(|urls| urls.contains(url))
    }

    /// Drops every bypass held by the tab. Returns how many were revoked.
    pub fn revoke_bypasses(&self, tab_id: TabId) -> usize {
        self.state
            .lock()
            .bypass
            .remove(&tab_id)
            .map(|urls| urls.len())
            .unwrap_or(0)
    }

    pub fn mark_blocked(&self, tab_id: TabId) {
        let until = Instant::now() + self.blocked_marker_ttl;
        self.state.lock().blocked_until.insert(tab_id, until);
    }

    pub fn clear_blocked(&self, tab_id: TabId) {
        self.state.lock().blocked_until.remove(&tab_id);
    }

    pub fn is_recently_blocked(&self, tab_id: TabId) -> bool {
        let mut state = self.state.lock();
        match state.blocked_until.get(&tab_id) {
            Some(until) if *until > Instant::now() => true,
            Some(_) => {
                state.blocked_until.remove(&tab_id);
                false
            }
            None => false,
        }
    }

    pub fn forget_tab(&self, tab_id: TabId) {
        let mut state = self.state.lock();
        state.bypass.remove(&tab_id);
        state.blocked_until.remove(&tab_id);
    }

    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.blocked_until.len();
        state.blocked_until.retain(|_, until| *until > now);
        before - state.blocked_until.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_is_scoped_to_tab_and_url() {
        let registry = TabRegistry::new(Duration::from_secs(4));
        assert!(registry.allow(TabId(1), "https://bad.test/"));
        assert!(!registry.allow(TabId(1), "https://bad.test/"));

        assert!(registry.is_bypassed(TabId(1), "https://bad.test/"));
        assert!(!registry.is_bypassed(TabId(2), "https://bad.test/"));
        assert!(!registry.is_bypassed(TabId(1), "https://bad.test/other"));
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_marker_self_expires() {
        let registry = TabRegistry::new(Duration::from_secs(4));
        registry.mark_blocked(TabId(7));
        assert!(registry.is_recently_blocked(TabId(7)));

        tokio::time::advance(Duration::from_millis(4_001)).await;
        assert!(!registry.is_recently_blocked(TabId(7)));
    }

    #[tokio::test]
    async fn forget_tab_clears_all_state() {
        let registry = TabRegistry::new(Duration::from_secs(4));
        registry.allow(TabId(3), "https://bad.test/");
        registry.mark_blocked(TabId(3));

        registry.forget_tab(TabId(3));

        assert!(!registry.is_bypassed(TabId(3), "https://bad.test/"));
        assert!(!registry.is_recently_blocked(TabId(3)));
        assert_eq!(registry.revoke_bypasses(TabId(3)), 0);
    }
}
