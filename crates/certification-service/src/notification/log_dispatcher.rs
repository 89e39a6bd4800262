//! 日志发送器
//!
//! 只把渲染结果写入日志，用于开发环境和未接入邮件网关的部署。

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::NotificationDispatcher;
use super::template::TemplateEngine;
use super::types::{DispatchReceipt, ReminderPayload};
use crate::error::Result;
use crate::models::NotificationChannel;

pub struct LogDispatcher {
    templates: TemplateEngine,
}

impl LogDispatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            templates: TemplateEngine::with_defaults()?,
        })
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Log
    }

    async fn send(&self, payload: &ReminderPayload) -> Result<DispatchReceipt> {
        let message = self.templates.render_reminder(payload);
        let message_id = format!("log_{}", Uuid::new_v4());

        info!(
            message_id = %message_id,
            instance_id = %payload.instance_id,
            user_id = %payload.user_id,
            to = %payload.recipient_email,
            tier = %payload.tier,
            subject = %message.subject,
            body = %message.body,
            "到期提醒（日志渠道）"
        );

        Ok(DispatchReceipt::new(message_id, NotificationChannel::Log))
    }
}
