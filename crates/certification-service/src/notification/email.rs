//! 邮件通知
//!
//! 通过 HTTP 邮件网关投递，请求体为 JSON，鉴权使用 Bearer 密钥。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::NotificationDispatcher;
use super::template::TemplateEngine;
use super::types::{DispatchReceipt, ReminderPayload};
use crate::error::{CertificationError, Result};
use crate::models::NotificationChannel;

/// 邮件网关配置
#[derive(Debug, Clone)]
pub struct EmailGatewayConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub from_address: String,
    pub from_name: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct Mailbox<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: Mailbox<'a>,
    to: Mailbox<'a>,
    subject: &'a str,
    text: &'a str,
    /// 网关侧去重键
    reference: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

/// HTTP 邮件网关发送器
pub struct HttpEmailDispatcher {
    client: reqwest::Client,
    config: EmailGatewayConfig,
    templates: TemplateEngine,
}

impl HttpEmailDispatcher {
    pub fn new(config: EmailGatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CertificationError::Internal(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            config,
            templates: TemplateEngine::with_defaults()?,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> CertificationError {
        if err.is_timeout() {
            CertificationError::DispatchTimeout(self.config.timeout_ms)
        } else {
            CertificationError::DispatchFailure(format!("邮件网关请求失败: {}", err))
        }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpEmailDispatcher {
    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    async fn send(&self, payload: &ReminderPayload) -> Result<DispatchReceipt> {
        let start = Instant::now();
        let message = self.templates.render_reminder(payload);

        let body = SendRequest {
            from: Mailbox {
                email: &self.config.from_address,
                name: &self.config.from_name,
            },
            to: Mailbox {
                email: &payload.recipient_email,
                name: &payload.recipient_name,
            },
            subject: &message.subject,
            text: &message.body,
            reference: format!("{}:{}", payload.instance_id, payload.tier),
        };

        debug!(
            instance_id = %payload.instance_id,
            to = %payload.recipient_email,
            subject = %message.subject,
            "邮件发送中..."
        );

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| self.map_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            warn!(
                instance_id = %payload.instance_id,
                status = %status,
                "邮件网关返回错误"
            );
            return Err(CertificationError::DispatchFailure(format!(
                "邮件网关返回 HTTP {}: {}",
                status, detail
            )));
        }

        // 网关不返回消息 ID 时本地生成
        let message_id = resp
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.id)
            .unwrap_or_else(|| format!("email_{}", Uuid::new_v4()));

        info!(
            instance_id = %payload.instance_id,
            message_id = %message_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "邮件发送成功"
        );

        Ok(DispatchReceipt::new(message_id, NotificationChannel::Email))
    }
}
