//! 用户认证实体定义
//!
//! 包含用户认证记录、管理员指派信息、提交数据和状态流转记录

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CertificationStatus;

/// 管理员指派信息
///
/// 仅由指派产生的记录携带，驳回时保留以便用户重新提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMetadata {
    pub assignment_id: Uuid,
    pub assigned_by: String,
    pub assigned_on: NaiveDate,
    pub deadline: Option<NaiveDate>,
    /// 覆盖目录计算出的奖金资格
    pub bonus_eligible_override: Option<bool>,
}

/// 用户认证记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCertificationInstance {
    pub id: Uuid,
    pub user_id: String,
    pub definition_id: Uuid,
    pub status: CertificationStatus,
    /// 获得日期
    pub obtained_on: Option<NaiveDate>,
    /// 到期日期（获得日期 + 有效期月数）
    pub expires_on: Option<NaiveDate>,
    pub certificate_number: Option<String>,
    pub verification_url: Option<String>,
    /// 上传证书文件引用
    pub file_ref: Option<String>,
    pub notes: Option<String>,
    pub bonus_eligible: bool,
    pub bonus_claimed: bool,
    /// 奖金金额（最小货币单位）
    pub bonus_amount: Option<i64>,
    pub assignment: Option<AssignmentMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserCertificationInstance {
    /// 距到期的整天数，未知到期日返回 None
    pub fn days_until_expiration(&self, today: NaiveDate) -> Option<i64> {
        self.expires_on.map(|d| (d - today).num_days())
    }

    /// 到期日严格早于今天即视为过期
    pub fn is_past_expiry(&self, today: NaiveDate) -> bool {
        self.expires_on.is_some_and(|d| d < today)
    }
}

/// 用户提交的认证数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionData {
    pub obtained_on: NaiveDate,
    pub certificate_number: Option<String>,
    pub verification_url: Option<String>,
    pub file_ref: Option<String>,
    pub notes: Option<String>,
}

/// 管理员指派请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub user_id: String,
    pub definition_id: Uuid,
    pub deadline: Option<NaiveDate>,
    pub bonus_eligible: Option<bool>,
}

/// 一次状态流转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub instance_id: Uuid,
    pub from: CertificationStatus,
    pub to: CertificationStatus,
}
