//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    ApprovalHistoryEntry, BountyCampaign, CertificationStatus, MasterCertificationDefinition,
    PendingSubmission, ReminderRecord, StatusTransition, UrgencyTier, UserCertificationInstance,
    UserContact,
};

/// 认证目录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn get_definition(&self, id: Uuid) -> Result<Option<MasterCertificationDefinition>>;
    async fn get_definitions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<MasterCertificationDefinition>>;
    async fn list_definitions(&self, active_only: bool)
    -> Result<Vec<MasterCertificationDefinition>>;
    async fn create_definition(&self, definition: &MasterCertificationDefinition) -> Result<()>;
    async fn update_definition(&self, definition: &MasterCertificationDefinition) -> Result<()>;
}

/// 用户认证仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstanceRepositoryTrait: Send + Sync {
    async fn get_instance(&self, id: Uuid) -> Result<Option<UserCertificationInstance>>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserCertificationInstance>>;
    async fn list_by_statuses(
        &self,
        statuses: &[CertificationStatus],
    ) -> Result<Vec<UserCertificationInstance>>;
    async fn upsert_instance(&self, instance: &UserCertificationInstance) -> Result<()>;
    /// 返回是否确实删除
    async fn delete_instance(&self, id: Uuid) -> Result<bool>;
    /// 批量流转，仅当当前状态仍等于 `from` 时生效，返回生效条数
    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
        at: DateTime<Utc>,
    ) -> Result<u64>;
    /// 标记奖金已领取，返回是否由本次调用完成标记
    async fn mark_bonus_claimed(&self, id: Uuid) -> Result<bool>;
}

/// 审批仓储接口
///
/// 队列与历史的写入都和记录更新在同一事务内完成
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApprovalRepositoryTrait: Send + Sync {
    /// 写入待审批记录并加入审批队列
    async fn enqueue_submission(
        &self,
        instance: &UserCertificationInstance,
        submission: &PendingSubmission,
    ) -> Result<()>;
    async fn get_pending(&self, id: Uuid) -> Result<Option<PendingSubmission>>;
    async fn list_pending(&self) -> Result<Vec<PendingSubmission>>;
    /// 移出队列、更新记录、追加历史；提交不在队列中时返回 SubmissionNotFound
    async fn commit_decision(
        &self,
        submission_id: Uuid,
        instance: &UserCertificationInstance,
        history: &ApprovalHistoryEntry,
    ) -> Result<()>;
    async fn list_history(&self, instance_id: Option<Uuid>) -> Result<Vec<ApprovalHistoryEntry>>;
}

/// 提醒台账仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReminderRepositoryTrait: Send + Sync {
    /// 该记录该档位最近一次投递成功的时间
    async fn last_delivered(
        &self,
        instance_id: Uuid,
        tier: UrgencyTier,
    ) -> Result<Option<DateTime<Utc>>>;
    /// 追加台账并（可选）执行状态流转，二者原子完成
    async fn record_outcome(
        &self,
        record: &ReminderRecord,
        transition: Option<StatusTransition>,
    ) -> Result<()>;
    async fn list_for_instance(&self, instance_id: Uuid) -> Result<Vec<ReminderRecord>>;
}

/// 用户通讯录接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectoryTrait: Send + Sync {
    async fn get_contact(&self, user_id: &str) -> Result<Option<UserContact>>;
}

/// 悬赏活动仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BountyRepositoryTrait: Send + Sync {
    async fn list_active_campaigns(&self) -> Result<Vec<BountyCampaign>>;
    async fn create_campaign(&self, campaign: &BountyCampaign) -> Result<()>;
}
