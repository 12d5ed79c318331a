use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono_tz::Tz;
use reqwest::Client;
use tokio::{task::JoinHandle, time::timeout};
use tokio_cron_scheduler::JobScheduler;

use crate::{
    block_page::BlockPage,
    config::AppConfig,
    db::{self, state::StateRepository},
    guard::{NavigationGuard, TrustPolicy},
    host::{spawn_writer, CommandSink, HostService},
    infrastructure::{
        directories::ResolvedPaths, housekeeping::configure_housekeeping, shutdown::Shutdown,
    },
    scan::{ClassificationApi, HttpClassificationApi, ResultCache, ScanClient},
};

pub struct PhishGuardApp {
    scheduler: JobScheduler,
    writer_handle: JoinHandle<()>,
    host: Arc<HostService>,
    state: Arc<StateRepository>,
    shutdown: Shutdown,
}

impl PhishGuardApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let timezone: Tz = config.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(target: "lifecycle", timezone = %config.timezone, "unknown time zone; using Asia/Kolkata");
            chrono_tz::Asia::Kolkata
        });
        let pool = db::init_pool(&paths.db_path).await?;
        let state = Arc::new(StateRepository::new(pool, timezone));

        let http_client = Client::builder()
            .user_agent(format!("phishguard-host/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api: Arc<dyn ClassificationApi> =
            Arc::new(HttpClassificationApi::new(http_client, &config.api));
        let cache = Arc::new(ResultCache::new(&config.cache));
        let scanner = Arc::new(ScanClient::new(api, cache.clone(), config.api.retry.clone()));

        let (sink, commands) = CommandSink::channel();
        let writer_handle = spawn_writer(tokio::io::stdout(), commands);
        let tabs = Arc::new(sink.clone());

        let guard = Arc::new(NavigationGuard::new(
            scanner,
            TrustPolicy::from_config(&config.trust),
            state.clone(),
            tabs.clone(),
            &config.guard,
        ));
        let block_page = Arc::new(BlockPage::new(
            guard.clone(),
            state.clone(),
            tabs,
            config.guard.safe_url.clone(),
        ));
        let host = HostService::new(guard.clone(), state.clone(), block_page, sink);

        let scheduler =
            configure_housekeeping(&config.scheduler.housekeeping_cron, guard, cache).await?;

        tracing::info!(
            target: "lifecycle",
            endpoint = %config.api.endpoint,
            attempts = config.api.retry.attempt_timeouts.len(),
            cache_capacity = config.cache.capacity,
            data = %paths.data_dir.display(),
            "navigation guard ready"
        );

        Ok(Self {
            scheduler,
            writer_handle,
            host,
            state,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let PhishGuardApp {
            mut scheduler,
            writer_handle,
            host,
            state,
            shutdown,
        } = self;

        tracing::info!(target: "lifecycle", "PhishGuard host started");

        let shutdown_timeout = Duration::from_secs(5);
        let result = host.run(tokio::io::stdin(), shutdown.subscribe()).await;
        if let Err(err) = &result {
            tracing::error!(target: "host", error = ?err, "extension connection failed");
        }
        shutdown.trigger("extension disconnected");

        match timeout(shutdown_timeout, scheduler.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(target: "scheduler", ?err, "failed to stop scheduler");
            }
            Err(_) => {
                tracing::warn!(
                    target: "scheduler",
                    "scheduler did not stop within {:?}",
                    shutdown_timeout
                );
            }
        }

        if timeout(shutdown_timeout, state.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "state database did not close within {:?}",
                shutdown_timeout
            );
        }

        // In-flight scans still hold senders; don't wait on them.
        writer_handle.abort();

        tracing::info!(target: "lifecycle", "PhishGuard host stopped");
        result
    }
}
