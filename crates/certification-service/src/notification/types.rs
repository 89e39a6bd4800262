//! 通知数据类型

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{NotificationChannel, UrgencyTier};

/// 到期提醒内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPayload {
    pub instance_id: Uuid,
    pub user_id: String,
    pub recipient_email: String,
    pub recipient_name: String,
    pub certification_name: String,
    pub vendor: String,
    pub expires_on: NaiveDate,
    pub days_remaining: i64,
    pub tier: UrgencyTier,
    pub renewal_url: Option<String>,
    pub certificate_number: Option<String>,
}

impl ReminderPayload {
    /// 台账里保存的一行摘要
    pub fn summary(&self) -> String {
        if self.days_remaining > 0 {
            format!(
                "[{}] {} 将于 {} 到期，剩余 {} 天",
                self.tier, self.certification_name, self.expires_on, self.days_remaining
            )
        } else {
            format!(
                "[{}] {} 已于 {} 到期",
                self.tier, self.certification_name, self.expires_on
            )
        }
    }

    /// 模板变量
    pub fn variables(&self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("user_name", self.recipient_name.clone());
        vars.insert("certification_name", self.certification_name.clone());
        vars.insert("vendor", self.vendor.clone());
        vars.insert("expires_on", self.expires_on.to_string());
        vars.insert("days_remaining", self.days_remaining.to_string());
        vars.insert("days_overdue", (-self.days_remaining).max(0).to_string());
        vars.insert(
            "renewal_url",
            self.renewal_url
                .clone()
                .unwrap_or_else(|| "请联系认证厂商获取续证方式".to_string()),
        );
        vars.insert(
            "certificate_number",
            self.certificate_number.clone().unwrap_or_else(|| "-".to_string()),
        );
        vars
    }
}

/// 渲染后的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// 发送回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub message_id: String,
    pub channel: NotificationChannel,
    pub sent_at: DateTime<Utc>,
}

impl DispatchReceipt {
    pub fn new(message_id: impl Into<String>, channel: NotificationChannel) -> Self {
        Self {
            message_id: message_id.into(),
            channel,
            sent_at: Utc::now(),
        }
    }
}
