use std::{io, path::Path};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "phishguard.log";

static INIT: OnceCell<()> = OnceCell::new();
static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Installs the global subscriber. Stdout is reserved for native-messaging
/// frames, so the only console sink is stderr, which browsers often discard.
pub fn init_tracing(config: &LoggingConfig, logs_dir: &Path) -> Result<()> {
    INIT.get_or_try_init::<_, anyhow::Error>(|| {
        let (file_writer, guard) = tracing_appender::non_blocking(
            tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX),
        );
        let _ = GUARD.set(guard);

        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        let stderr_layer = config.stderr.then(|| {
            fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true)
                .with_ansi(false)
        });

        tracing_subscriber::registry()
            .with(level_filter(&config.level))
            .with(file_layer)
            .with(stderr_layer)
            .try_init()?;

        tracing::info!(
            target: "lifecycle",
            logs = %logs_dir.display(),
            stderr = config.stderr,
            "tracing initialized"
        );
        Ok(())
    })?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level; an unparseable level falls back to `info`.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
