//! 认证生命周期
//!
//! 纯函数部分（到期日计算、状态流转、奖金资格、能力等级、审批决定）与
//! 编排仓储读写的 `CertificationService` 分开，前者不触碰存储。

mod bonus;
mod competency;
mod engine;
mod expiration;
mod service;
mod transitions;

pub use bonus::{BonusPolicy, determine_bonus_eligibility, select_bounty};
pub use competency::{
    CompetencySummary, compute_competency_summary, compute_competency_tier, total_active_points,
};
pub use engine::{
    ApprovalOutcome, create_from_assignment, decide_approval, find_assigned, submit_for_approval,
    sweep_statuses, validate_assignment,
};
pub use expiration::compute_expiration;
pub use service::{CertificationService, SubmissionOutcome};
pub use transitions::{ensure_transition, transition};
