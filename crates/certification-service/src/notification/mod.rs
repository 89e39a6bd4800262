//! 通知发送
//!
//! 调度器只依赖 `NotificationDispatcher`，具体渠道由配置决定：
//!
//! - **email**: HTTP 邮件网关
//! - **log**: 仅写日志

mod email;
mod log_dispatcher;
mod template;
mod types;

use std::sync::Arc;

use async_trait::async_trait;
use cert_shared::config::NotificationConfig;

pub use email::{EmailGatewayConfig, HttpEmailDispatcher};
pub use log_dispatcher::LogDispatcher;
pub use template::TemplateEngine;
pub use types::{DispatchReceipt, ReminderPayload, RenderedMessage};

use crate::error::{CertificationError, Result};
use crate::models::NotificationChannel;

/// 通知发送 trait
///
/// 实现需要可并发调用；发送失败返回 Err，由调度器写入台账
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// 渠道标识（写入台账）
    fn channel(&self) -> NotificationChannel;

    async fn send(&self, payload: &ReminderPayload) -> Result<DispatchReceipt>;
}

/// 按配置构建发送器
pub fn build_dispatcher(
    config: &NotificationConfig,
    timeout_ms: u64,
) -> Result<Arc<dyn NotificationDispatcher>> {
    match config.channel.to_ascii_lowercase().as_str() {
        "email" => {
            let endpoint = config.email_gateway_url.clone().ok_or_else(|| {
                CertificationError::Validation(
                    "notification.channel = email 时必须配置 email_gateway_url".to_string(),
                )
            })?;
            let dispatcher = HttpEmailDispatcher::new(EmailGatewayConfig {
                endpoint,
                api_key: config.email_api_key.clone(),
                from_address: config.from_address.clone(),
                from_name: config.from_name.clone(),
                timeout_ms,
            })?;
            Ok(Arc::new(dispatcher))
        }
        "log" => Ok(Arc::new(LogDispatcher::new()?)),
        other => Err(CertificationError::Validation(format!(
            "不支持的通知渠道: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_log_dispatcher() {
        let dispatcher = build_dispatcher(&NotificationConfig::default(), 1000).unwrap();
        assert_eq!(dispatcher.channel(), NotificationChannel::Log);
    }

    #[test]
    fn test_email_requires_gateway_url() {
        let config = NotificationConfig {
            channel: "email".to_string(),
            email_gateway_url: None,
            ..Default::default()
        };
        assert!(matches!(
            build_dispatcher(&config, 1000),
            Err(CertificationError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let config = NotificationConfig {
            channel: "pigeon".to_string(),
            ..Default::default()
        };
        assert!(build_dispatcher(&config, 1000).is_err());
    }
}
