use tokio::sync::watch;

/// One-shot stop signal. The first trigger wins and its reason is what every
/// listener observes.
#[derive(Clone)]
pub struct Shutdown {
    sender: watch::Sender<Option<&'static str>>,
}

#[derive(Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<Option<&'static str>>,
}

impl Shutdown {
    pub fn new() -> (Self, ShutdownListener) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, ShutdownListener { receiver })
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self, reason: &'static str) {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            tracing::info!(target: "lifecycle", reason, "shutdown triggered");
            *current = Some(reason);
            true
        });
    }
}

impl ShutdownListener {
    /// Resolves with the trigger reason, immediately if already triggered.
    pub async fn notified(&mut self) -> &'static str {
        loop {
            if let Some(reason) = *self.receiver.borrow_and_update() {
                return reason;
            }
            if self.receiver.changed().await.is_err() {
                return "shutdown handle dropped";
            }
        }
    }
}

pub fn install_signal_handlers(shutdown: Shutdown) {
    let ctrlc = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.trigger("ctrl-c");
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = shutdown.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.trigger("SIGTERM");
            }
        });
    }
}
