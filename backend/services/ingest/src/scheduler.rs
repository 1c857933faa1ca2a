use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use strata_config::SchedulerConfig;

use crate::trigger::SyncTriggers;

/// Background sync jobs: one full sync after the bootstrap delay, then full and
/// board-only syncs on fixed intervals.
pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(triggers: Arc<dyn SyncTriggers>, config: &SchedulerConfig) -> Self {
        let bootstrap = {
            let triggers = triggers.clone();
            let delay = config.bootstrap_delay();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::info!("running bootstrap full sync");
                let summary = triggers.run_full_sync().await;
                tracing::info!(success = summary.success, message = %summary.message, "bootstrap sync finished");
            })
        };

        let full = spawn_periodic("full", config.full_sync_interval(), {
            let triggers = triggers.clone();
            move || {
                let triggers = triggers.clone();
                async move {
                    let summary = triggers.run_full_sync().await;
                    tracing::info!(success = summary.success, message = %summary.message, "scheduled full sync finished");
                }
            }
        });

        let boards = spawn_periodic("boards", config.board_sync_interval(), {
            let triggers = triggers.clone();
            move || {
                let triggers = triggers.clone();
                async move {
                    let boards = triggers.run_board_only_sync().await;
                    tracing::info!(boards, "scheduled board sync finished");
                }
            }
        });

        tracing::info!(
            bootstrap_secs = config.bootstrap_delay_secs,
            full_secs = config.full_sync_interval_secs,
            boards_secs = config.board_sync_interval_secs,
            "scheduler started"
        );

        Self {
            handles: vec![bootstrap, full, boards],
        }
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
        tracing::info!("scheduler stopped");
    }
}

/// First tick one `period` after start. A run that overruns delays the next tick
/// instead of bursting, so runs of one job never overlap.
fn spawn_periodic<F, Fut>(job: &'static str, period: Duration, mut run: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tracing::debug!(job, "scheduled sync starting");
            run().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{BoardSyncSummary, SyncSummary};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTriggers {
        full: AtomicUsize,
        boards: AtomicUsize,
    }

    #[async_trait]
    impl SyncTriggers for CountingTriggers {
        async fn run_full_sync(&self) -> SyncSummary {
            self.full.fetch_add(1, Ordering::SeqCst);
            SyncSummary {
                success: true,
                ..Default::default()
            }
        }

        async fn run_board_only_sync(&self) -> usize {
            self.boards.fetch_add(1, Ordering::SeqCst);
            0
        }

        async fn run_sync_for_board(&self, external_board_id: i64) -> BoardSyncSummary {
            BoardSyncSummary::failed(external_board_id, "unused")
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            bootstrap_delay_secs: 30,
            full_sync_interval_secs: 100,
            board_sync_interval_secs: 40,
            worker_threads: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_bootstrap_then_intervals() {
        let triggers = Arc::new(CountingTriggers::default());
        let scheduler = Scheduler::start(triggers.clone(), &config());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(triggers.full.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(triggers.full.load(Ordering::SeqCst), 1);
        assert_eq!(triggers.boards.load(Ordering::SeqCst), 0);

        // t = 85s: board ticks at 40 and 80
        tokio::time::sleep(Duration::from_secs(54)).await;
        assert_eq!(triggers.boards.load(Ordering::SeqCst), 2);
        assert_eq!(triggers.full.load(Ordering::SeqCst), 1);

        // t = 205s: full ticks at 100 and 200, board ticks through 200
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(triggers.full.load(Ordering::SeqCst), 3);
        assert_eq!(triggers.boards.load(Ordering::SeqCst), 5);

        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_future_runs() {
        let triggers = Arc::new(CountingTriggers::default());
        let scheduler = Scheduler::start(triggers.clone(), &config());

        tokio::time::sleep(Duration::from_secs(10)).await;
        scheduler.shutdown();
        tokio::time::sleep(Duration::from_secs(500)).await;

        assert_eq!(triggers.full.load(Ordering::SeqCst), 0);
        assert_eq!(triggers.boards.load(Ordering::SeqCst), 0);
    }
}
