use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::Config;
use crate::retry::RetryConfig;
use crate::tor::{self, TorExitSet};

/// Initialize and start the scheduler
///
/// The exit list is refreshed once right away and then every
/// `exit_nodes_refresh_interval` seconds.
pub async fn start_scheduler(config: Arc<Config>, exit_set: Arc<TorExitSet>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let client = tor::http_client()?;
    let interval = Duration::from_secs(config.exit_nodes_refresh_interval);

    info!("Scheduling exit nodes refresh every {:?}", interval);

    let job = {
        let config = Arc::clone(&config);
        let exit_set = Arc::clone(&exit_set);
        let client = client.clone();

        Job::new_repeated_async(interval, move |_uuid, _l| {
            let config = Arc::clone(&config);
            let exit_set = Arc::clone(&exit_set);
            let client = client.clone();

            Box::pin(async move {
                refresh_exit_nodes(&client, &config.tor_exit_list_url, &exit_set).await;
            })
        })?
    };

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("✓ Scheduler started");

    tokio::spawn(async move {
        refresh_exit_nodes(&client, &config.tor_exit_list_url, &exit_set).await;
    });

    Ok(scheduler)
}

/// Run one refresh, logging the outcome. Errors leave the previous list in place.
pub async fn refresh_exit_nodes(client: &reqwest::Client, url: &str, exit_set: &TorExitSet) {
    match exit_set.update(client, url, &RetryConfig::exit_list()).await {
        Ok(count) => info!("Exit nodes refresh: {} addresses", count),
        Err(e) => error!("Exit nodes refresh failed: {:#}", e),
    }
}
