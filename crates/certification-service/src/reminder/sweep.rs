//! 状态巡检
//!
//! 按较慢的节奏把到期的记录推进到 EXPIRING_SOON / EXPIRED，与提醒发送互不依赖。

use std::sync::Arc;

use cert_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::{CertificationError, Result};
use crate::lifecycle::sweep_statuses;
use crate::models::CertificationStatus;
use crate::repository::Repositories;
use crate::worker::SingleFlight;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    /// 实际写入的流转数（并发修改过的记录会被跳过）
    pub applied: u64,
}

pub struct StatusSweeper {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    expiring_soon_days: i64,
    guard: SingleFlight,
}

impl StatusSweeper {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, expiring_soon_days: i64) -> Self {
        Self {
            repos,
            clock,
            expiring_soon_days,
            guard: SingleFlight::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn run_sweep(&self) -> Result<SweepSummary> {
        let Some(_guard) = self.guard.try_acquire() else {
            warn!("上一轮状态巡检仍在执行，跳过本次触发");
            return Err(CertificationError::PassInProgress("status_sweep".to_string()));
        };

        let today = self.clock.today();
        let instances = self
            .repos
            .instances
            .list_by_statuses(&CertificationStatus::reminder_eligible())
            .await?;

        let transitions = sweep_statuses(&instances, today, self.expiring_soon_days);
        let mut summary = SweepSummary {
            examined: instances.len(),
            ..Default::default()
        };
        for change in &transitions {
            match change.to {
                CertificationStatus::Expired => summary.expired += 1,
                CertificationStatus::ExpiringSoon => summary.expiring_soon += 1,
                _ => {}
            }
        }

        if !transitions.is_empty() {
            summary.applied = self
                .repos
                .instances
                .apply_transitions(&transitions, self.clock.now())
                .await?;
            metrics::record_status_transition(
                CertificationStatus::Expired.as_str(),
                summary.expired as u64,
            );
            metrics::record_status_transition(
                CertificationStatus::ExpiringSoon.as_str(),
                summary.expiring_soon as u64,
            );
        }

        info!(
            examined = summary.examined,
            expiring_soon = summary.expiring_soon,
            expired = summary.expired,
            applied = summary.applied,
            "状态巡检完成"
        );
        Ok(summary)
    }
}
