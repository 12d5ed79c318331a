//! In-memory collaborators shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::{
    config::{CacheConfig, GuardConfig, RetryPolicy, TrustConfig},
    domain::{Classification, DetectionRecord, RiskLevel, ScanResult, TabId},
    guard::{DetectionStore, NavigationGuard, TabController, TrustPolicy},
    scan::{api::ScanError, ClassificationApi, ResultCache, ScanClient},
};

pub struct StubApi {
    verdicts: Mutex<HashMap<String, Classification>>,
    confidence: Mutex<f64>,
    failing: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl StubApi {
    fn new() -> Self {
        Self {
            verdicts: Mutex::new(HashMap::new()),
            confidence: Mutex::new(90.0),
            failing: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1024);
    }
}

impl ClassificationApi for StubApi {
    fn classify<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<ScanResult, ScanError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if self.gated.load(Ordering::SeqCst) {
                let _permit = self.gate.acquire().await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(ScanError::Decode("stub failure".into()));
            }
            let classification = self
                .verdicts
                .lock()
                .get(url)
                .copied()
                .unwrap_or(Classification::Legitimate);
            Ok(ScanResult {
                url: url.to_string(),
                classification,
                confidence: *self.confidence.lock(),
                risk_level: match classification {
                    Classification::Phishing => RiskLevel::High,
                    Classification::Suspicious => RiskLevel::Medium,
                    _ => RiskLevel::Low,
                },
                modules: None,
                skipped: false,
                error: false,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabCommand {
    BlockPage(TabId),
    Navigate(TabId, String),
}

#[derive(Default)]
pub struct RecordingTabs {
    commands: Mutex<Vec<TabCommand>>,
    failing: AtomicBool,
}

impl RecordingTabs {
    pub fn commands(&self) -> Vec<TabCommand> {
        self.commands.lock().clone()
    }

    pub fn fail_commands(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn record(&self, command: TabCommand) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("tab {command:?} rejected");
        }
        self.commands.lock().push(command);
        Ok(())
    }
}

impl TabController for RecordingTabs {
    fn open_block_page(&self, tab_id: TabId) -> BoxFuture<'_, Result<()>> {
        let outcome = self.record(TabCommand::BlockPage(tab_id));
        Box::pin(async move { outcome })
    }

    fn navigate(&self, tab_id: TabId, url: String) -> BoxFuture<'_, Result<()>> {
        let outcome = self.record(TabCommand::Navigate(tab_id, url));
        Box::pin(async move { outcome })
    }
}

#[derive(Default)]
pub struct MemoryDetections {
    slot: Mutex<Option<DetectionRecord>>,
}

impl MemoryDetections {
    pub fn current(&self) -> Option<DetectionRecord> {
        self.slot.lock().clone()
    }
}

impl DetectionStore for MemoryDetections {
    fn save_detection(&self, record: DetectionRecord) -> BoxFuture<'_, Result<()>> {
        *self.slot.lock() = Some(record);
        Box::pin(async { Ok(()) })
    }

    fn load_detection(&self) -> BoxFuture<'_, Result<Option<DetectionRecord>>> {
        let current = self.current();
        Box::pin(async move { Ok(current) })
    }

    fn clear_detection(&self) -> BoxFuture<'_, Result<()>> {
        *self.slot.lock() = None;
        Box::pin(async { Ok(()) })
    }
}

pub struct Harness {
    pub api: Arc<StubApi>,
    pub tabs: Arc<RecordingTabs>,
    pub detections: Arc<MemoryDetections>,
    pub guard: Arc<NavigationGuard>,
}

impl Harness {
    pub fn new() -> Self {
        let api = Arc::new(StubApi::new());
        let tabs = Arc::new(RecordingTabs::default());
        let detections = Arc::new(MemoryDetections::default());
        let scanner = Arc::new(ScanClient::new(
            api.clone(),
            Arc::new(ResultCache::new(&CacheConfig::default())),
            RetryPolicy::default(),
        ));
        let guard = Arc::new(NavigationGuard::new(
            scanner,
            TrustPolicy::from_config(&TrustConfig::default()),
            detections.clone(),
            tabs.clone(),
            &GuardConfig::default(),
        ));
        Self {
            api,
            tabs,
            detections,
            guard,
        }
    }

    pub fn with_verdict(self, url: &str, classification: Classification) -> Self {
        self.api
            .verdicts
            .lock()
            .insert(url.to_string(), classification);
        self
    }

    pub fn with_confidence(self, confidence: f64) -> Self {
        *self.api.confidence.lock() = confidence;
        self
    }

    pub fn failing(self) -> Self {
        self.api.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn gated(self) -> Self {
        self.api.gated.store(true, Ordering::SeqCst);
        self
    }
}
