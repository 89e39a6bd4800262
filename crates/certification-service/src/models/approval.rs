//! 审批队列与审批历史

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ApprovalDecision;
use super::instance::SubmissionData;

/// 提交来源追溯
///
/// 存在时表示本次提交源自管理员指派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionTrace {
    pub original_instance_id: Uuid,
    pub assignment_id: Uuid,
}

/// 待审批提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: Uuid,
    /// 处于 PENDING_APPROVAL 的记录
    pub instance_id: Uuid,
    pub user_id: String,
    pub definition_id: Uuid,
    pub submission: SubmissionData,
    pub trace: Option<SubmissionTrace>,
    pub submitted_at: DateTime<Utc>,
}

impl PendingSubmission {
    /// 审批作用的记录 ID
    pub fn target_instance_id(&self) -> Uuid {
        self.trace
            .map(|t| t.original_instance_id)
            .unwrap_or(self.instance_id)
    }
}

/// 审批历史
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalHistoryEntry {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub instance_id: Uuid,
    pub user_id: String,
    pub definition_id: Uuid,
    pub decision: ApprovalDecision,
    pub decided_by: String,
    pub comments: Option<String>,
    pub decided_at: DateTime<Utc>,
}
