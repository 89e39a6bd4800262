//! 认证生命周期服务
//!
//! 管理员工专业认证从指派、提交、审批到过期的完整生命周期，并按到期远近发送分级提醒。
//!
//! ## 核心功能
//!
//! - **认证目录**：维护可申报的认证定义（厂商、级别、积分、有效期）
//! - **生命周期**：指派、提交、审批、到期与停用，所有状态变更经过流转表校验
//! - **审批工作流**：管理员通过或驳回，驳回指派来源的提交时回退到指派状态
//! - **到期提醒**：每日按紧急程度分档发送，台账去重并支持冷却期
//! - **状态巡检**：定期把到期记录推进到 EXPIRING_SOON / EXPIRED
//! - **奖金与能力等级**：奖金资格判定、悬赏活动、按有效积分计算能力等级
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `clock`: 时间来源抽象
//! - `lifecycle`: 生命周期规则与认证服务
//! - `approval`: 审批工作流
//! - `reminder`: 提醒调度与状态巡检
//! - `notification`: 模板与发送渠道
//! - `repository`: 数据库仓储层与内存实现
//! - `worker`: 周期任务

pub mod approval;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notification;
pub mod reminder;
pub mod repository;
pub mod worker;

pub use approval::ApprovalWorkflow;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CertificationError, Result};
pub use lifecycle::{BonusPolicy, CertificationService, CompetencySummary, SubmissionOutcome};
pub use models::*;
pub use notification::{NotificationDispatcher, ReminderPayload, build_dispatcher};
pub use reminder::{ReminderRunSummary, ReminderScheduler, ReminderSettings, RenewalLinks, StatusSweeper};
pub use repository::{InMemoryStore, Repositories};
pub use worker::{ReminderWorker, StatusSweepWorker};
