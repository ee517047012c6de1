use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::core::alerts::LevelTracker;
use crate::core::orchestrator::{Collector, Refresh};

/// Called with every successful refresh, after alerts were checked.
pub type RefreshHook = Arc<dyn Fn(&Refresh) + Send + Sync>;

/// Runs one refresh, then starts the periodic refresh job.
///
/// The startup refresh completes before the schedule starts, so it never
/// overlaps the first cron tick. The returned scheduler keeps running until it is shut down or dropped
/// with the runtime.
pub async fn init(collector: Arc<Collector>, cron: &str, on_refresh: RefreshHook) -> Result<JobScheduler, anyhow::Error> {
    let sched = JobScheduler::new().await?;
    let tracker = Arc::new(Mutex::new(LevelTracker::new()));

    let job_collector = collector.clone();
    let job_tracker = tracker.clone();
    let job_hook = on_refresh.clone();
    sched.add(
        Job::new_async(cron, move |_uuid, _l| {
            let collector = job_collector.clone();
            let tracker = job_tracker.clone();
            let hook = job_hook.clone();
            Box::pin(async move {
                info!("Running scheduled refresh...");
                run_refresh(&collector, &tracker, &hook).await;
            })
        })?
    ).await?;

    info!("Running startup refresh...");
    run_refresh(&collector, &tracker, &on_refresh).await;

    sched.start().await?;
    info!("Watch schedule started ({})", cron);
    Ok(sched)
}

async fn run_refresh(collector: &Collector, tracker: &Mutex<LevelTracker>, hook: &RefreshHook) {
    match collector.refresh().await {
        Ok(refresh) => {
            tracker.lock().await.check(&refresh);
            hook(&refresh);
        }
        Err(e) => error!("Refresh failed: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::indicators::registry::Registry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_startup_refresh_finishes_before_init_returns() {
        let settings = Settings { throttle: false, ..Settings::default() };
        let collector = Arc::new(Collector::new(Registry::catalog().unwrap(), HashMap::new(), None, &settings, true));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook: RefreshHook = Arc::new(move |refresh: &Refresh| {
            assert!(refresh.feed.all_fallback);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Midnight on January 1st, far from any test run.
        let mut sched = init(collector, "0 0 0 1 1 *", hook).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sched.shutdown().await.unwrap();
    }
}
