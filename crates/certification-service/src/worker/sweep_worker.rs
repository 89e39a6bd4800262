//! 状态巡检 Worker（默认每周）

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::runner::run_every;
use crate::reminder::StatusSweeper;

pub struct StatusSweepWorker {
    sweeper: Arc<StatusSweeper>,
    interval: Duration,
    run_on_startup: bool,
}

impl StatusSweepWorker {
    pub fn new(sweeper: Arc<StatusSweeper>, interval_secs: u64, run_on_startup: bool) -> Self {
        Self {
            sweeper,
            interval: Duration::from_secs(interval_secs.max(1)),
            run_on_startup,
        }
    }

    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let sweeper = self.sweeper;
        run_every(
            "status_sweep_worker",
            self.interval,
            self.run_on_startup,
            shutdown,
            || sweeper.run_sweep(),
        )
        .await;
    }
}
