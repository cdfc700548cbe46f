/// Athletics Live — live-stats service
///
/// What it does:
///   1. Refreshes the athletics schedule every hour and picks the games to watch
///   2. Polls the XML feeds / vendor API for those games on an adaptive cadence
///      (3s while a game is live, slower while waiting for the next one)
///   3. Sends start/end and data-changed notifications when a game changes
///
/// Run:
///   cargo run --bin live-stats

use anyhow::{Context, Result};
use dotenv::dotenv;
use livestats::{
    vendor_livestats_url, ConfigStore, FeedClient, FtpCredentials, HttpDispatcher,
    LiveStatsService, NotificationDispatcher, RecordingDispatcher, ScheduleClient,
    SourcePriorityConfig, SourceRouter,
};
use logger::EventLogger;
use std::env;
use std::fs::File;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn load_config() -> Result<SourcePriorityConfig> {
    match env::var("LIVESTATS_CONFIG") {
        Ok(path) if !path.is_empty() => {
            let raw = std::fs::read(&path).with_context(|| format!("reading {path}"))?;
            let config = SourcePriorityConfig::parse(&raw).with_context(|| format!("parsing {path}"))?;
            info!("Loaded live stats config from {}", path);
            Ok(config)
        }
        _ => {
            info!("LIVESTATS_CONFIG not set, using built-in source priorities");
            Ok(SourcePriorityConfig::default())
        }
    }
}

fn ftp_credentials() -> Option<FtpCredentials> {
    let host = env::var("XML_FEED_FTP_HOST").ok().filter(|h| !h.is_empty())?;
    Some(FtpCredentials {
        host,
        user:     env_or("XML_FEED_FTP_USER", "anonymous"),
        password: env::var("XML_FEED_FTP_PASSWORD").unwrap_or_default(),
    })
}

fn dispatcher(timeout: Duration) -> Result<Arc<dyn NotificationDispatcher>> {
    match (env::var("SS_HOST"), env::var("SS_INTERNAL_API_KEY")) {
        (Ok(host), Ok(key)) if !host.is_empty() && !key.is_empty() => {
            info!("Notifications go to {}", host);
            let http = HttpDispatcher::new(&host, key, timeout).context("building notification client")?;
            Ok(Arc::new(http))
        }
        _ => {
            warn!("SS_HOST / SS_INTERNAL_API_KEY not set, notifications are only kept in memory");
            Ok(Arc::new(RecordingDispatcher::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let log_dir = env_or("LIVESTATS_LOG_DIR", "logs");
    info!("=== Athletics Live — LIVE STATS ===");
    info!("Logs: ./{}/", log_dir);

    // Single instance lock
    let lock_file_path = env::temp_dir().join("athletics_live_stats.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-stats is already running! Exiting.");
            return Ok(());
        }
    };

    let timeout = Duration::from_secs(
        env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10),
    );
    let sidearm_host = env_or("SIDEARM_HOST", "https://fightingillini.com");
    let team_name = env_or("TEAM_NAME", "Illinois");

    let config = Arc::new(ConfigStore::new(load_config()?));
    let audit = Arc::new(EventLogger::new(&log_dir));

    let ftp = ftp_credentials();
    if ftp.is_none() {
        warn!("XML_FEED_FTP_HOST not set, XML feed sources will fail over to the vendor API");
    }
    let fetcher = Arc::new(FeedClient::new(ftp, timeout).context("building feed client")?);
    let router = SourceRouter::new(fetcher, vendor_livestats_url(&sidearm_host)).with_audit(audit.clone());

    let service = Arc::new(
        LiveStatsService::new(router, dispatcher(timeout)?, config, team_name).with_audit(audit),
    );
    let schedule = ScheduleClient::new(sidearm_host.clone(), timeout).context("building schedule client")?;

    info!("Schedule and vendor host: {}", sidearm_host);
    info!("Request timeout: {}s", timeout.as_secs());

    let cancel = CancellationToken::new();
    let schedule_task = tokio::spawn(service.clone().run_schedule_loop(schedule, cancel.clone()));
    let live_task = tokio::spawn(service.clone().run_live_loop(cancel.clone()));

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("Shutdown requested, stopping loops");
    cancel.cancel();

    schedule_task.await.context("schedule loop panicked")?;
    live_task.await.context("live loop panicked")?;
    info!("Stopped cleanly.");
    Ok(())
}
