//! 认证调度进程
//!
//! 运行每日到期提醒和定期状态巡检两个 Worker。

use std::sync::Arc;

use anyhow::Result;
use cert_shared::{config::AppConfig, database::Database, observability};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use certification::{
    ReminderScheduler, ReminderSettings, ReminderWorker, RenewalLinks, Repositories,
    StatusSweepWorker, StatusSweeper, SystemClock, build_dispatcher, clock::Clock,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. 加载配置
    let config = AppConfig::load("certification-service").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化可观测性
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    observability::init(&obs_config)?;

    info!("Starting certification-scheduler...");
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 数据库与迁移
    let db = Database::connect(&config.database).await?;
    db.run_migrations("migrations").await?;
    info!("Database connection established");

    // 4. 仓储、发送器、调度器
    let repos = Repositories::postgres(db.pool().clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let dispatcher = build_dispatcher(
        &config.notification,
        config.scheduler.dispatch_timeout_ms,
    )?;
    info!(channel = dispatcher.channel().as_str(), "Notification dispatcher initialized");

    let scheduler = Arc::new(ReminderScheduler::new(
        repos.clone(),
        dispatcher,
        RenewalLinks::from(&config.notification),
        clock.clone(),
        ReminderSettings::from(&config.scheduler),
    ));
    let sweeper = Arc::new(StatusSweeper::new(
        repos,
        clock,
        config.scheduler.expiring_soon_days,
    ));

    // 5. 启动 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reminder_worker = ReminderWorker::new(
        scheduler,
        config.scheduler.reminder_interval_secs,
        config.scheduler.run_on_startup,
    );
    let sweep_worker = StatusSweepWorker::new(
        sweeper,
        config.scheduler.sweep_interval_secs,
        config.scheduler.run_on_startup,
    );

    let reminder_handle = tokio::spawn(reminder_worker.run(shutdown_rx.clone()));
    let sweep_handle = tokio::spawn(sweep_worker.run(shutdown_rx));
    info!("Workers started");

    // 6. 等待关闭信号
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    for (name, handle) in [("reminder_worker", reminder_handle), ("status_sweep_worker", sweep_handle)] {
        if let Err(e) = handle.await {
            error!(worker = name, error = %e, "Worker 异常退出");
        }
    }

    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
