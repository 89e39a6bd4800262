//! 提醒档位计算
//!
//! 纯函数，不访问存储。剩余天数统一按 `到期日 - 今天` 的整天数计算。

use chrono::{DateTime, Duration, Utc};

use crate::models::UrgencyTier;

/// 有效期达到该月数的认证才有提前一年的规划提醒
pub const PLANNING_MIN_VALIDITY_MONTHS: i32 = 36;

/// 提醒计划中的一档
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub tier: UrgencyTier,
    pub days_before: i64,
}

impl From<UrgencyTier> for ScheduleEntry {
    fn from(tier: UrgencyTier) -> Self {
        Self {
            tier,
            days_before: tier.threshold_days(),
        }
    }
}

/// 按有效期生成提醒计划，阈值降序
pub fn derive_schedule(validity_months: i32) -> Vec<ScheduleEntry> {
    let mut tiers = Vec::with_capacity(6);
    if validity_months >= PLANNING_MIN_VALIDITY_MONTHS {
        tiers.push(UrgencyTier::Planning);
    }
    tiers.extend([
        UrgencyTier::Preparation,
        UrgencyTier::Action,
        UrgencyTier::Urgent,
        UrgencyTier::Critical,
        UrgencyTier::Expired,
    ]);
    tiers.into_iter().map(ScheduleEntry::from).collect()
}

/// 选出适用档位：阈值不小于剩余天数的档位中阈值最小的一个
///
/// 剩余天数超过所有阈值时返回 None
pub fn find_applicable_tier(days_until_expiration: i64, schedule: &[ScheduleEntry]) -> Option<UrgencyTier> {
    schedule
        .iter()
        .filter(|e| e.days_before >= days_until_expiration)
        .min_by_key(|e| e.days_before)
        .map(|e| e.tier)
}

/// 是否应当发送
///
/// 同一档位在冷却期内已成功投递过则不发；否则看剩余天数是否落在档位的触发窗口内
pub fn should_fire(
    tier: UrgencyTier,
    days_until_expiration: i64,
    last_delivered: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    if last_delivered.is_some_and(|at| now - at < cooldown) {
        return false;
    }
    tier.in_window(days_until_expiration)
}
