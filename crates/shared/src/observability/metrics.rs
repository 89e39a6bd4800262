//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use super::ObservabilityConfig;

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动 exporter 自带的 HTTP 监听，必须在 tokio 运行时内调用。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_common_metrics(&config.service_name);
    info!("Metrics exporter listening on {}", addr);

    Ok(())
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("reminders_total", "Reminder dispatch attempts by tier and outcome");
    metrics::describe_histogram!(
        "reminder_pass_duration_seconds",
        "Duration of a full reminder pass in seconds"
    );
    metrics::describe_counter!(
        "certification_transitions_total",
        "Certification status transitions by target status"
    );
    metrics::describe_counter!("approval_decisions_total", "Approval decisions by outcome");
    metrics::describe_gauge!(
        "worker_last_run_timestamp_seconds",
        "Unix timestamp of the last completed worker run"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次提醒发送尝试
///
/// outcome: sent / failed / skipped
#[inline]
pub fn record_reminder(tier: &str, outcome: &str) {
    metrics::counter!(
        "reminders_total",
        "tier" => tier.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一轮提醒耗时
#[inline]
pub fn record_reminder_pass(duration_secs: f64) {
    metrics::histogram!("reminder_pass_duration_seconds").record(duration_secs);
}

/// 记录状态流转
#[inline]
pub fn record_status_transition(to_status: &str, count: u64) {
    metrics::counter!(
        "certification_transitions_total",
        "to" => to_status.to_string()
    )
    .increment(count);
}

/// 记录审批决定
#[inline]
pub fn record_approval_decision(outcome: &str) {
    metrics::counter!(
        "approval_decisions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录 Worker 最近一次完成时间
#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!(
        "worker_last_run_timestamp_seconds",
        "worker" => worker.to_string()
    )
    .set(chrono::Utc::now().timestamp() as f64);
}
