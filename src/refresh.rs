//! Scheduled fare scans
//!
//! A scan asks the cache manager to cover the next 30 days for every tracked
//! destination. It runs once from the `scan` command, or periodically in the
//! background while the query API is being served.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::cache::{CacheError, CoverageReport, FareCacheManager};
use crate::data::{DateRange, DESTINATIONS};
use crate::provider::FareProvider;
use crate::store::FareStore;

/// Number of days ahead covered by a scan, starting tomorrow
pub const SCAN_HORIZON_DAYS: u64 = 30;

/// Outcome of one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The provider has no usable credentials; nothing was attempted
    ProviderUnavailable,
    /// Coverage was ensured for each destination
    Completed(Vec<(String, CoverageReport)>),
}

/// Covers the `SCAN_HORIZON_DAYS` days following `today` for every destination
///
/// # Returns
/// * `Ok(ScanOutcome::ProviderUnavailable)` if the provider cannot answer
/// * `Ok(ScanOutcome::Completed(..))` with one report per destination
/// * `Err(CacheError)` if the store failed
pub async fn scan_horizon<S, P>(
    manager: &FareCacheManager<S, P>,
    today: NaiveDate,
) -> Result<ScanOutcome, CacheError>
where
    S: FareStore,
    P: FareProvider,
{
    if !manager.provider().is_available() {
        warn!("aborting scan: provider unavailable");
        return Ok(ScanOutcome::ProviderUnavailable);
    }

    let range = DateRange::following(today, SCAN_HORIZON_DAYS);
    info!(start = %range.start(), end = %range.end(), "starting fare scan");

    let mut reports = Vec::with_capacity(DESTINATIONS.len());
    for destination in DESTINATIONS {
        let report = manager
            .ensure_coverage(destination, &range, manager.freshness_window())
            .await?;
        info!(
            destination,
            missing = report.missing,
            filled = report.filled,
            "destination scanned"
        );
        reports.push((destination.to_string(), report));
    }

    info!("fare scan finished");
    Ok(ScanOutcome::Completed(reports))
}

/// Configuration for periodic background scans
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between scans; the first scan runs immediately
    pub interval: Duration,
    /// Whether background scans run at all
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6 * 60 * 60), // 6 hours
            enabled: true,
        }
    }
}

impl RefreshConfig {
    /// Builds a config from a period in minutes, where zero disables scans
    pub fn from_minutes(minutes: u64) -> Self {
        Self {
            interval: Duration::from_secs(minutes.max(1) * 60),
            enabled: minutes > 0,
        }
    }
}

/// Handle for the background scan task
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Spawns the background scan task, unless disabled in `config`
    pub fn spawn<S, P>(manager: Arc<FareCacheManager<S, P>>, config: RefreshConfig) -> Self
    where
        S: FareStore + 'static,
        P: FareProvider + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = config.enabled.then(|| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let today = Local::now().date_naive();
                            if let Err(e) = scan_horizon(&manager, today).await {
                                error!(error = %e, "background scan failed");
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            })
        });

        Self { shutdown_tx, task }
    }

    /// Whether a background task was started
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the background task and waits for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task {
            let _ = task.await;
        }
    }
}
