use std::sync::Arc;

use anyhow::Result;
use tokio::{io::AsyncRead, task::JoinHandle};

use crate::{
    block_page::BlockPage,
    db::state::StateRepository,
    guard::NavigationGuard,
    infrastructure::shutdown::ShutdownListener,
};

use super::{
    bridge::CommandSink,
    protocol::{decode_message, read_frame, FrameError, HostEvent, InboundMessage, Reply},
};

const STORAGE_UNAVAILABLE: &str = "storage unavailable";

pub struct HostService {
    guard: Arc<NavigationGuard>,
    state: Arc<StateRepository>,
    block_page: Arc<BlockPage>,
    sink: CommandSink,
}

impl HostService {
    pub fn new(
        guard: Arc<NavigationGuard>,
        state: Arc<StateRepository>,
        block_page: Arc<BlockPage>,
        sink: CommandSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            guard,
            state,
            block_page,
            sink,
        })
    }

    /// Reads extension messages until the pipe closes or shutdown is requested.
    pub async fn run<R>(self: Arc<Self>, mut reader: R, mut shutdown: ShutdownListener) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        tracing::info!(target: "host", "listening for extension messages");
        loop {
            let frame = tokio::select! {
                reason = shutdown.notified() => {
                    tracing::info!(target: "host", reason, "shutdown requested; no longer reading messages");
                    break;
                }
                frame = read_frame(&mut reader) => frame,
            };

            match frame {
                Ok(Some(bytes)) => match decode_message(&bytes) {
                    Ok(message) => {
                        self.dispatch(message);
                    }
                    Err(err) => {
                        tracing::warn!(target: "host", error = %err, "ignoring malformed message");
                    }
                },
                Ok(None) => {
                    tracing::info!(target: "host", "extension closed the connection");
                    break;
                }
                Err(FrameError::TooLarge(len)) => {
                    tracing::warn!(target: "host", len, "ignoring oversized message");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Applies state changes inline so they are ordered with later messages;
    /// anything that awaits I/O runs on its own task.
    pub fn dispatch(self: &Arc<Self>, message: InboundMessage) -> Option<JoinHandle<()>> {
        let InboundMessage { id, event } = message;
        match event {
            HostEvent::NavigationIntent(intent) => match self.guard.admit(intent) {
                Ok(admission) => {
                    let guard = self.guard.clone();
                    Some(tokio::spawn(async move {
                        let outcome = guard.process(admission).await;
                        tracing::trace!(target: "host", ?outcome, "navigation handled");
                    }))
                }
                Err(reason) => {
                    tracing::trace!(target: "host", ?reason, "navigation skipped");
                    None
                }
            },
            HostEvent::TabRemoved { tab_id } => {
                self.guard.forget_tab(tab_id);
                None
            }
            HostEvent::ClearCache => {
                self.guard.scanner().clear_cache();
                self.sink.reply(id, Reply::Ack);
                None
            }
            HostEvent::AllowUrlForTab { tab_id, url } => {
                self.guard.register_bypass(tab_id, &url);
                self.sink.reply(id, Reply::Ack);
                None
            }
            HostEvent::ScanCurrentTab { url } => {
                let this = self.clone();
                Some(tokio::spawn(async move { this.scan_current_tab(id, url).await }))
            }
            HostEvent::GetLastDetection => {
                let this = self.clone();
                Some(tokio::spawn(async move {
                    let body = match this.block_page.detection().await {
                        Ok(detection) => Reply::Detection { detection },
                        Err(err) => {
                            tracing::error!(target: "db", error = ?err, "failed to read last detection");
                            Reply::Error {
                                message: STORAGE_UNAVAILABLE.to_string(),
                            }
                        }
                    };
                    this.sink.reply(id, body);
                }))
            }
            HostEvent::GetStats => {
                let this = self.clone();
                Some(tokio::spawn(async move {
                    let body = match this.state.load_stats().await {
                        Ok(stats) => Reply::Stats { stats },
                        Err(err) => {
                            tracing::error!(target: "db", error = ?err, "failed to read stats");
                            Reply::Error {
                                message: STORAGE_UNAVAILABLE.to_string(),
                            }
                        }
                    };
                    this.sink.reply(id, body);
                }))
            }
            HostEvent::BlockPageGoBack { tab_id } => {
                let this = self.clone();
                Some(tokio::spawn(async move {
                    let result = this.block_page.go_back(tab_id).await;
                    this.sink.reply(id, ack_or_error(result));
                }))
            }
            HostEvent::BlockPageProceed { tab_id } => {
                let this = self.clone();
                Some(tokio::spawn(async move {
                    let result = this.block_page.proceed(tab_id).await.map(|_| ());
                    this.sink.reply(id, ack_or_error(result));
                }))
            }
        }
    }

    async fn scan_current_tab(&self, id: Option<u64>, url: String) {
        if url.trim().is_empty() {
            self.sink.reply(
                id,
                Reply::Error {
                    message: "Unable to get current tab URL".to_string(),
                },
            );
            return;
        }

        let result = self.guard.scanner().scan(&url).await;
        if let Err(err) = self.state.record_scan(result.classification).await {
            tracing::warn!(target: "db", error = ?err, "failed to update scan stats");
        }
        self.sink.reply(id, Reply::Scan { result });
    }
}

fn ack_or_error(result: Result<()>) -> Reply {
    match result {
        Ok(()) => Reply::Ack,
        Err(err) => {
            tracing::warn!(target: "host", error = ?err, "block page action failed");
            Reply::Error {
                message: err.to_string(),
            }
        }
    }
}
