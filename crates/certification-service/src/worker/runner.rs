//! 周期任务循环
//!
//! 以固定间隔触发任务，错过的触发直接跳过；关闭信号变为 `true` 时退出。
//! 正在执行的任务会自然完成后再检查关闭信号。

use std::future::Future;
use std::time::Duration;

use cert_shared::observability::metrics;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::error::Result;

/// 按固定间隔执行任务直到收到关闭信号
pub async fn run_every<F, Fut, T>(
    name: &str,
    period: Duration,
    run_on_startup: bool,
    mut shutdown: watch::Receiver<bool>,
    mut task: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    T: std::fmt::Debug,
{
    let start = if run_on_startup {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(worker = name, period = ?period, run_on_startup, "Worker 已启动");

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(worker = name, "收到关闭信号，Worker 退出");
                    break;
                }
            }

            _ = ticker.tick() => {
                match task().await {
                    Ok(outcome) => info!(worker = name, outcome = ?outcome, "Worker 本轮完成"),
                    Err(e) => error!(worker = name, error = %e, code = e.error_code(), "Worker 本轮失败"),
                }
                metrics::set_worker_last_run(name);
            }
        }
    }
}
