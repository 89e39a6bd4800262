//! 每日提醒 Worker

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::runner::run_every;
use crate::reminder::ReminderScheduler;

pub struct ReminderWorker {
    scheduler: Arc<ReminderScheduler>,
    interval: Duration,
    run_on_startup: bool,
}

impl ReminderWorker {
    pub fn new(scheduler: Arc<ReminderScheduler>, interval_secs: u64, run_on_startup: bool) -> Self {
        Self {
            scheduler,
            interval: Duration::from_secs(interval_secs.max(1)),
            run_on_startup,
        }
    }

    /// 主循环，直到关闭信号
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let scheduler = self.scheduler;
        run_every(
            "reminder_worker",
            self.interval,
            self.run_on_startup,
            shutdown,
            || scheduler.run_pass(),
        )
        .await;
    }
}
