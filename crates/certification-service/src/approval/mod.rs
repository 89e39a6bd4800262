//! 管理员审批

mod workflow;

pub use workflow::ApprovalWorkflow;
