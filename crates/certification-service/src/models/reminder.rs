//! 提醒台账与用户联系方式

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{NotificationChannel, UrgencyTier};

/// 提醒记录（去重台账）
///
/// 只追加；成功与失败都会记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRecord {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub user_id: String,
    pub tier: UrgencyTier,
    pub channel: NotificationChannel,
    pub sent_at: DateTime<Utc>,
    /// 是否投递成功
    pub delivered: bool,
    pub days_remaining: i64,
    /// 消息摘要
    pub summary: String,
    #[sqlx(default)]
    pub error: Option<String>,
}

/// 用户联系方式及提醒偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    /// 是否接收邮件提醒
    pub email_enabled: bool,
}
