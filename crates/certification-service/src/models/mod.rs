//! 认证服务领域模型
//!
//! 包含认证目录、用户认证、审批、提醒台账、悬赏活动等核心实体定义

pub mod approval;
pub mod bounty;
pub mod enums;
pub mod instance;
pub mod master;
pub mod reminder;

// 重新导出常用类型
pub use approval::{ApprovalHistoryEntry, PendingSubmission, SubmissionTrace};
pub use bounty::{BountyCampaign, NewCampaign};
pub use enums::{
    ApprovalAction, ApprovalDecision, CertificationLevel, CertificationStatus, CompetencyTier,
    NotificationChannel, UrgencyTier,
};
pub use instance::{
    AssignmentMetadata, AssignmentRequest, StatusTransition, SubmissionData,
    UserCertificationInstance,
};
pub use master::{DefinitionPatch, MasterCertificationDefinition, NewDefinition};
pub use reminder::{ReminderRecord, UserContact};
