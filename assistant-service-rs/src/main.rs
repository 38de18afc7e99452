//! Service entrypoint: wires the monitor, cache tiers, HR client, scheduler
//! and assistant together and runs until interrupted.

mod assistant;
mod intent;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use briefing_cache::{BriefingCache, HttpBriefingStore, StoreConfig};
use error_monitor::{init_global, ErrorMonitor, LogChannel, MonitorConfig, WebhookChannel};
use hr_client::{ApiConfig, BriefingFetcher, CredentialSigner, HrApiClient};
use hr_directory::HttpUserDirectory;
use refresh_scheduler::{BulkRefreshScheduler, SchedulerConfig};

use crate::assistant::Assistant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    config_rs::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let service_name = config_rs::service_name();
    info!("Starting {}", service_name);

    let mut monitor = ErrorMonitor::new(MonitorConfig {
        service_name: service_name.clone(),
        history_limit: 1000,
    })
    .with_channel(Arc::new(LogChannel));
    if let Some(url) = config_rs::alert_webhook_url() {
        monitor = monitor.with_channel(Arc::new(WebhookChannel::new(
            url,
            config_rs::alert_webhook_token(),
        )?));
    }
    let monitor = Arc::new(monitor);
    init_global(monitor.clone());

    let store = Arc::new(HttpBriefingStore::new(
        StoreConfig {
            base_url: config_rs::briefing_store_url(),
            pool_size: config_rs::store_pool_size(),
            pool_min_available: config_rs::store_pool_min_available(),
            connect_timeout: config_rs::hr_connect_timeout(),
            total_timeout: config_rs::hr_total_timeout(),
        },
        monitor.clone(),
    )?);
    HttpBriefingStore::spawn_health_task(store.clone(), Duration::from_secs(60));

    let cache = Arc::new(BriefingCache::new(
        store,
        Duration::from_secs(config_rs::cache_freshness_secs()),
        config_rs::briefing_file_path(),
        monitor.clone(),
    ));

    let directory = Arc::new(HttpUserDirectory::new(
        config_rs::user_directory_url(),
        config_rs::hr_total_timeout(),
    )?);

    let client = HrApiClient::new(ApiConfig {
        base_url: config_rs::hr_api_base_url(),
        agent_id: config_rs::hr_agent_id(),
        chatlog_id: config_rs::hr_chatlog_id(),
        connect_timeout: config_rs::hr_connect_timeout(),
        total_timeout: config_rs::hr_total_timeout(),
    })?;

    let fetcher = Arc::new(BriefingFetcher::new(
        directory.clone(),
        client,
        cache.clone(),
        CredentialSigner::new(config_rs::credential_secret()),
        monitor.clone(),
    ));

    let scheduler = Arc::new(BulkRefreshScheduler::new(
        directory,
        fetcher.clone(),
        monitor,
        SchedulerConfig {
            morning_cron: config_rs::morning_refresh_cron(),
            evening_cron: config_rs::evening_refresh_cron(),
            gate_capacity: config_rs::refresh_gate_capacity(),
        },
    ));
    let scheduler_task = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduler.run_forever().await {
                error!("Refresh scheduler stopped: {}", e);
            }
        })
    };

    let assistant = Assistant::new(
        cache,
        fetcher,
        config_rs::interactive_timeout(),
        service_name,
    );
    info!("Service ready: {}", assistant.health());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    scheduler_task.abort();
    Ok(())
}
