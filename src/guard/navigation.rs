use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    config::GuardConfig,
    domain::{Classification, DetectionRecord, NavigationIntent, NavigationKey, ScanResult, TabId},
    scan::ScanClient,
};

use super::{registry::TabRegistry, trust::TrustPolicy, DetectionStore, TabController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SubFrame,
    NotWeb,
    RecentlyBlocked,
    Bypassed,
    InFlight,
    /// The tab was closed while its transaction was running.
    TabClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    /// Anything but `Phishing`, including a failed scan.
    Verdict(Classification),
    /// Phishing verdict on a trusted domain.
    Trusted,
    /// The block could not be carried out.
    BlockFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Skipped(SkipReason),
    Allowed(AllowReason),
    Blocked,
}

#[derive(Debug, Clone, Copy)]
enum InFlight {
    Scanning { ticket: u64 },
    Settled { until: Instant },
}

type InFlightMap = Arc<Mutex<HashMap<NavigationKey, InFlight>>>;

/// Decides, for each top-level navigation, whether to scan it and whether to
/// redirect the tab to the blocking page.
///
/// At most one transaction runs per (tab, url). A finished transaction keeps
/// its key reserved for `in_flight_hold` so bursts of identical navigation
/// events do not trigger rescans or duplicate blocks.
///
/// A transaction is split in two: [`admit`](Self::admit) runs the synchronous
/// checks and takes the key, [`process`](Self::process) scans and acts. The
/// host admits in message order, so a later `forget_tab` always sees the key.
pub struct NavigationGuard {
    scanner: Arc<ScanClient>,
    trust: TrustPolicy,
    registry: TabRegistry,
    in_flight: InFlightMap,
    next_ticket: AtomicU64,
    detections: Arc<dyn DetectionStore>,
    tabs: Arc<dyn TabController>,
    in_flight_hold: Duration,
}

/// A navigation that passed the synchronous checks and holds its (tab, url) key.
pub struct Admission {
    reservation: Reservation,
}

impl NavigationGuard {
    pub fn new(
        scanner: Arc<ScanClient>,
        trust: TrustPolicy,
        detections: Arc<dyn DetectionStore>,
        tabs: Arc<dyn TabController>,
        config: &GuardConfig,
    ) -> Self {
        Self {
            scanner,
            trust,
            registry: TabRegistry::new(config.blocked_marker_ttl),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_ticket: AtomicU64::new(0),
            detections,
            tabs,
            in_flight_hold: config.in_flight_hold,
        }
    }

    pub fn scanner(&self) -> &Arc<ScanClient> {
        &self.scanner
    }

    pub async fn handle_navigation(&self, intent: NavigationIntent) -> GuardOutcome {
        match self.admit(intent) {
            Ok(admission) => self.process(admission).await,
            Err(reason) => GuardOutcome::Skipped(reason),
        }
    }

    pub fn admit(&self, intent: NavigationIntent) -> Result<Admission, SkipReason> {
        if !intent.is_top_level() {
            return Err(SkipReason::SubFrame);
        }
        if !intent.is_web() {
            return Err(SkipReason::NotWeb);
        }

        let NavigationIntent { tab_id, url, .. } = intent;

        if self.registry.is_recently_blocked(tab_id) {
            tracing::debug!(target: "guard", tab_id = tab_id.0, url = %url, "tab was just blocked; skipping");
            return Err(SkipReason::RecentlyBlocked);
        }
        if self.registry.is_bypassed(tab_id, &url) {
            tracing::info!(target: "guard", tab_id = tab_id.0, url = %url, "user bypass; skipping");
            return Err(SkipReason::Bypassed);
        }

        let reservation = self
            .reserve(NavigationKey::new(tab_id, url))
            .ok_or(SkipReason::InFlight)?;

        let revoked = self.registry.revoke_bypasses(tab_id);
        if revoked > 0 {
            tracing::debug!(target: "guard", tab_id = tab_id.0, revoked, "tab navigated away; bypasses revoked");
        }

        Ok(Admission { reservation })
    }

    pub async fn process(&self, admission: Admission) -> GuardOutcome {
        let reservation = admission.reservation;
        let NavigationKey { tab_id, url } = reservation.key.clone();

        if !reservation.is_live() {
            return GuardOutcome::Skipped(SkipReason::TabClosed);
        }

        // Trusted sites are still scanned so the popup shows a real verdict.
        let result = self.scanner.scan(&url).await;
        tracing::info!(
            target: "guard",
            tab_id = tab_id.0,
            url = %url,
            classification = %result.classification,
            confidence = result.confidence,
            "scan resolved"
        );

        if !reservation.is_live() {
            tracing::debug!(target: "guard", tab_id = tab_id.0, url = %url, "tab closed during scan; dropping verdict");
            return GuardOutcome::Skipped(SkipReason::TabClosed);
        }

        self.decide(tab_id, &url, &result).await
    }

    async fn decide(&self, tab_id: TabId, url: &str, result: &ScanResult) -> GuardOutcome {
        if !result.is_phishing() {
            return GuardOutcome::Allowed(AllowReason::Verdict(result.classification));
        }

        if self.trust.is_trusted(url) {
            tracing::info!(target: "guard", tab_id = tab_id.0, url, "trusted domain flagged as phishing; not blocking");
            return GuardOutcome::Allowed(AllowReason::Trusted);
        }

        match self.block(tab_id, url, result).await {
            Ok(()) => {
                tracing::warn!(target: "guard", tab_id = tab_id.0, url, "navigation blocked");
                GuardOutcome::Blocked
            }
            Err(err) => {
                self.registry.clear_blocked(tab_id);
                tracing::error!(target: "guard", tab_id = tab_id.0, url, error = ?err, "failed to block navigation");
                GuardOutcome::Allowed(AllowReason::BlockFailed)
            }
        }
    }

    async fn block(&self, tab_id: TabId, url: &str, result: &ScanResult) -> Result<()> {
        // Marked first so the redirect itself does not re-enter the guard.
        self.registry.mark_blocked(tab_id);
        self.detections
            .save_detection(DetectionRecord::from_scan(url, result))
            .await
            .context("failed to persist detection")?;
        self.tabs
            .open_block_page(tab_id)
            .await
            .with_context(|| format!("failed to redirect tab {tab_id} to the block page"))?;
        Ok(())
    }

    pub fn register_bypass(&self, tab_id: TabId, url: &str) {
        if self.registry.allow(tab_id, url) {
            tracing::info!(target: "guard", tab_id = tab_id.0, url, "bypass registered");
        }
    }

    /// Drops every piece of per-tab state once the tab is closed and cancels
    /// any transaction still running for it.
    pub fn forget_tab(&self, tab_id: TabId) {
        self.registry.forget_tab(tab_id);
        self.in_flight.lock().retain(|key, _| key.tab_id != tab_id);
        tracing::debug!(target: "guard", tab_id = tab_id.0, "tab state released");
    }

    /// Drops expired markers. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock();
        let before = in_flight.len();
        in_flight.retain(|_, state| match state {
            InFlight::Scanning { .. } => true,
            InFlight::Settled { until } => *until > now,
        });
        before - in_flight.len() + self.registry.sweep()
    }

    fn reserve(&self, key: NavigationKey) -> Option<Reservation> {
        let now = Instant::now();
        let mut in_flight = self.in_flight.lock();
        match in_flight.get(&key) {
            Some(InFlight::Scanning { .. }) => return None,
            Some(InFlight::Settled { until }) if *until > now => return None,
            _ => {}
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        in_flight.insert(key.clone(), InFlight::Scanning { ticket });
        Some(Reservation {
            in_flight: self.in_flight.clone(),
            key,
            ticket,
            hold: self.in_flight_hold,
        })
    }
}

/// Holds a (tab, url) key for the duration of a transaction and settles it on
/// drop, unless `forget_tab` cancelled it in the meantime.
struct Reservation {
    in_flight: InFlightMap,
    key: NavigationKey,
    ticket: u64,
    hold: Duration,
}

impl Reservation {
    fn is_live(&self) -> bool {
        matches!(
            self.in_flight.lock().get(&self.key),
            Some(InFlight::Scanning { ticket }) if *ticket == self.ticket
        )
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        let live = matches!(
            in_flight.get(&self.key),
            Some(InFlight::Scanning { ticket }) if *ticket == self.ticket
        );
        if live {
            let until = Instant::now() + self.hold;
            in_flight.insert(self.key.clone(), InFlight::Settled { until });
        }
    }
}
