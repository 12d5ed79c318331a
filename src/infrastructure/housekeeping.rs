use std::sync::Arc;

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{guard::NavigationGuard, scan::ResultCache};

/// Schedules the periodic sweep of expired guard markers and cache entries.
/// Expiry is also enforced lazily on access; this only bounds memory.
pub async fn configure_housekeeping(
    cron_spec: &str,
    guard: Arc<NavigationGuard>,
    cache: Arc<ResultCache>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let job = Job::new_async(cron_spec, move |_id, _l| {
        let guard = guard.clone();
        let cache = cache.clone();
        Box::pin(async move {
            let markers = guard.sweep();
            let entries = cache.purge_expired();
            tracing::debug!(
                target: "scheduler",
                markers,
                entries,
                cached = cache.len(),
                "housekeeping sweep finished"
            );
        })
    })?;
    scheduler.add(job).await?;
    tracing::info!(target: "scheduler", cron = %cron_spec, "housekeeping job registered");
    scheduler.start().await?;
    Ok(scheduler)
}
