//! 认证服务错误类型
//!
//! 定义生命周期、审批、提醒调度中的业务错误和系统错误

use cert_shared::error::SharedError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::CertificationStatus;

/// 认证服务错误类型
#[derive(Debug, Error)]
pub enum CertificationError {
    // === 目录相关错误 ===
    #[error("认证定义不存在: {0}")]
    DefinitionNotFound(Uuid),

    #[error("认证定义已停用，不能创建新记录: {0}")]
    DefinitionInactive(Uuid),

    // === 用户认证相关错误 ===
    #[error("用户认证记录不存在: {0}")]
    InstanceNotFound(Uuid),

    #[error("待审批提交不存在: {0}")]
    SubmissionNotFound(Uuid),

    #[error("用户已持有该认证的有效记录: user_id={user_id}, definition_id={definition_id}")]
    DuplicateClaim { user_id: String, definition_id: Uuid },

    #[error("状态流转不允许: instance_id={instance_id}, {from} -> {to}")]
    InvalidTransition {
        instance_id: Uuid,
        from: CertificationStatus,
        to: CertificationStatus,
    },

    #[error("奖金不可领取: instance_id={instance_id}, 原因={reason}")]
    BonusUnavailable { instance_id: Uuid, reason: String },

    // === 通知发送错误 ===
    #[error("通知发送失败: {0}")]
    DispatchFailure(String),

    #[error("通知发送超时: {0}ms")]
    DispatchTimeout(u64),

    // === 调度错误 ===
    #[error("上一轮任务仍在执行: {0}")]
    PassInProgress(String),

    // === 系统错误 ===
    #[error("持久化失败: {0}")]
    Persistence(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("基础设施错误: {0}")]
    Shared(#[from] SharedError),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 认证服务 Result 类型别名
pub type Result<T> = std::result::Result<T, CertificationError>;

impl CertificationError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_)
            | Self::Persistence(_)
            | Self::DispatchFailure(_)
            | Self::DispatchTimeout(_)
            | Self::PassInProgress(_) => true,
            Self::Shared(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Persistence(_)
                | Self::Shared(_)
                | Self::DispatchFailure(_)
                | Self::DispatchTimeout(_)
                | Self::PassInProgress(_)
                | Self::Internal(_)
        )
    }

    /// 是否为存储层故障
    ///
    /// 调度器据此统计连续失败次数，判断是否整批中止
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Persistence(_) | Self::Shared(SharedError::Database(_))
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DefinitionNotFound(_) | Self::DefinitionInactive(_) => "DEFINITION_NOT_FOUND",
            Self::InstanceNotFound(_) => "INSTANCE_NOT_FOUND",
            Self::SubmissionNotFound(_) => "SUBMISSION_NOT_FOUND",
            Self::DuplicateClaim { .. } => "DUPLICATE_CLAIM",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::BonusUnavailable { .. } => "BONUS_UNAVAILABLE",
            Self::DispatchFailure(_) => "DISPATCH_FAILURE",
            Self::DispatchTimeout(_) => "DISPATCH_TIMEOUT",
            Self::PassInProgress(_) => "PASS_IN_PROGRESS",
            Self::Persistence(_) | Self::Database(_) => "PERSISTENCE_FAILURE",
            Self::Shared(e) => e.code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(CertificationError::DispatchTimeout(10_000).is_retryable());
        assert!(CertificationError::Persistence("connection reset".to_string()).is_retryable());
        assert!(CertificationError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!CertificationError::DefinitionNotFound(Uuid::nil()).is_retryable());
        assert!(
            !CertificationError::DuplicateClaim {
                user_id: "u-1".to_string(),
                definition_id: Uuid::nil(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(CertificationError::InstanceNotFound(Uuid::nil()).is_business_error());
        assert!(
            CertificationError::InvalidTransition {
                instance_id: Uuid::nil(),
                from: CertificationStatus::Active,
                to: CertificationStatus::PendingApproval,
            }
            .is_business_error()
        );
        assert!(!CertificationError::Internal("panic".to_string()).is_business_error());
        assert!(!CertificationError::DispatchFailure("502".to_string()).is_business_error());
    }

    #[test]
    fn test_persistence_failure_classification() {
        assert!(CertificationError::Persistence("down".to_string()).is_persistence_failure());
        assert!(
            CertificationError::Shared(SharedError::Database(sqlx::Error::PoolClosed))
                .is_persistence_failure()
        );
        assert!(!CertificationError::DispatchFailure("x".to_string()).is_persistence_failure());
    }

    #[test]
    fn test_error_code() {
        // 停用的定义与不存在的定义对调用方是同一类错误
        assert_eq!(
            CertificationError::DefinitionInactive(Uuid::nil()).error_code(),
            "DEFINITION_NOT_FOUND"
        );
        assert_eq!(
            CertificationError::SubmissionNotFound(Uuid::nil()).error_code(),
            "SUBMISSION_NOT_FOUND"
        );
        assert_eq!(
            CertificationError::Shared(SharedError::Validation("x".to_string())).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        let err = CertificationError::InvalidTransition {
            instance_id: Uuid::nil(),
            from: CertificationStatus::Rejected,
            to: CertificationStatus::Active,
        };
        let message = err.to_string();
        assert!(message.contains("REJECTED"));
        assert!(message.contains("ACTIVE"));

        let err = CertificationError::DuplicateClaim {
            user_id: "user-123".to_string(),
            definition_id: Uuid::nil(),
        };
        assert!(err.to_string().contains("user-123"));
    }
}
