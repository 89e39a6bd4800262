//! 认证服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use std::fmt;

use serde::{Deserialize, Serialize};

/// 认证级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationLevel {
    /// 入门级
    #[default]
    Entry,
    /// 助理级
    Associate,
    /// 专业级
    Professional,
    /// 专家级
    Expert,
}

/// 用户认证状态
///
/// 流转规则见 [`CertificationStatus::can_transition_to`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificationStatus {
    /// 管理员指派 - 等待用户提交
    AdminAssigned,
    /// 待审批
    PendingApproval,
    /// 有效
    Active,
    /// 即将过期（30 天内）
    ExpiringSoon,
    /// 已过期
    Expired,
    /// 已驳回
    Rejected,
    /// 已停用
    Inactive,
}

impl CertificationStatus {
    /// 状态流转表
    pub fn can_transition_to(self, to: Self) -> bool {
        use CertificationStatus::*;
        matches!(
            (self, to),
            (AdminAssigned, PendingApproval)
                | (PendingApproval, Active)
                | (PendingApproval, AdminAssigned)
                | (PendingApproval, Rejected)
                | (Active, ExpiringSoon)
                | (Active, Expired)
                | (ExpiringSoon, Expired)
                | (Active, Inactive)
                | (ExpiringSoon, Inactive)
                | (Expired, Inactive)
        )
    }

    /// 是否构成"有效占用"（同一用户同一认证只允许一条）
    pub fn is_live_claim(self) -> bool {
        matches!(
            self,
            Self::Active | Self::ExpiringSoon | Self::PendingApproval
        )
    }

    /// 终态不再自动流转
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Rejected | Self::Inactive)
    }

    /// 参与提醒调度的状态
    pub fn reminder_eligible() -> [Self; 2] {
        [Self::Active, Self::ExpiringSoon]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminAssigned => "ADMIN_ASSIGNED",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Active => "ACTIVE",
            Self::ExpiringSoon => "EXPIRING_SOON",
            Self::Expired => "EXPIRED",
            Self::Rejected => "REJECTED",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提醒紧急程度
///
/// 按阈值从远到近排列，派生的 `Ord` 即阈值降序
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyTier {
    /// 规划（提前一年）
    Planning,
    /// 准备（提前半年）
    Preparation,
    /// 行动（提前 90 天）
    Action,
    /// 紧急（30 天内）
    Urgent,
    /// 危急（7 天内）
    Critical,
    /// 已过期
    Expired,
}

impl UrgencyTier {
    /// 距到期的天数阈值
    pub fn threshold_days(self) -> i64 {
        match self {
            Self::Planning => 365,
            Self::Preparation => 180,
            Self::Action => 90,
            Self::Urgent => 30,
            Self::Critical => 7,
            Self::Expired => 0,
        }
    }

    /// 触发窗口 `(下界, 上界]`
    pub fn firing_window(self) -> (i64, i64) {
        match self {
            Self::Planning => (350, 365),
            Self::Preparation => (170, 180),
            Self::Action => (80, 90),
            Self::Urgent => (7, 30),
            Self::Critical => (0, 7),
            Self::Expired => (-7, 0),
        }
    }

    /// 剩余天数是否落在触发窗口内
    pub fn in_window(self, days_until_expiration: i64) -> bool {
        let (lower, upper) = self.firing_window();
        days_until_expiration > lower && days_until_expiration <= upper
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "PLANNING",
            Self::Preparation => "PREPARATION",
            Self::Action => "ACTION",
            Self::Urgent => "URGENT",
            Self::Critical => "CRITICAL",
            Self::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 能力等级
///
/// 按有效认证积分总和划分，阈值为闭区间下界
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompetencyTier {
    Entry,
    Bronze,
    BronzePlus,
    Silver,
    SilverPlus,
    Gold,
    GoldPlus,
    Platinum,
}

impl CompetencyTier {
    const LADDER: [Self; 8] = [
        Self::Entry,
        Self::Bronze,
        Self::BronzePlus,
        Self::Silver,
        Self::SilverPlus,
        Self::Gold,
        Self::GoldPlus,
        Self::Platinum,
    ];

    pub fn min_points(self) -> i64 {
        match self {
            Self::Entry => 0,
            Self::Bronze => 10,
            Self::BronzePlus => 15,
            Self::Silver => 25,
            Self::SilverPlus => 35,
            Self::Gold => 50,
            Self::GoldPlus => 75,
            Self::Platinum => 100,
        }
    }

    pub fn from_points(points: i64) -> Self {
        Self::LADDER
            .iter()
            .rev()
            .copied()
            .find(|tier| points >= tier.min_points())
            .unwrap_or(Self::Entry)
    }

    /// 下一等级，Platinum 为顶级
    pub fn next(self) -> Option<Self> {
        let index = Self::LADDER.iter().position(|t| *t == self)?;
        Self::LADDER.get(index + 1).copied()
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Bronze => "Bronze",
            Self::BronzePlus => "Bronze+",
            Self::Silver => "Silver",
            Self::SilverPlus => "Silver+",
            Self::Gold => "Gold",
            Self::GoldPlus => "Gold+",
            Self::Platinum => "Platinum",
        }
    }
}

/// 管理员审批动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

/// 审批结果（写入审批历史）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl From<ApprovalAction> for ApprovalDecision {
    fn from(action: ApprovalAction) -> Self {
        match action {
            ApprovalAction::Approve => Self::Approved,
            ApprovalAction::Reject => Self::Rejected,
        }
    }
}

impl ApprovalDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// 通知渠道
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    /// 邮件
    #[default]
    Email,
    /// 仅写日志（本地运行）
    Log,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Log => "LOG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use CertificationStatus::*;
        assert!(AdminAssigned.can_transition_to(PendingApproval));
        assert!(PendingApproval.can_transition_to(Active));
        assert!(PendingApproval.can_transition_to(AdminAssigned));
        assert!(PendingApproval.can_transition_to(Rejected));
        assert!(Active.can_transition_to(ExpiringSoon));
        assert!(ExpiringSoon.can_transition_to(Expired));

        assert!(!AdminAssigned.can_transition_to(Active));
        assert!(!Active.can_transition_to(PendingApproval));
        assert!(!ExpiringSoon.can_transition_to(Active));
        assert!(!Rejected.can_transition_to(Active));
        assert!(!Expired.can_transition_to(Active));
        assert!(!Inactive.can_transition_to(Active));
    }

    #[test]
    fn test_terminal_states_have_no_automatic_exit() {
        use CertificationStatus::*;
        let all = [
            AdminAssigned,
            PendingApproval,
            Active,
            ExpiringSoon,
            Expired,
            Rejected,
            Inactive,
        ];
        for terminal in [Rejected, Inactive] {
            assert!(terminal.is_terminal());
            assert!(all.iter().all(|to| !terminal.can_transition_to(*to)));
        }
        // 已过期只允许管理员停用
        assert!(Expired.is_terminal());
        assert!(Expired.can_transition_to(Inactive));
        assert!(!Expired.can_transition_to(ExpiringSoon));
    }

    #[test]
    fn test_live_claim() {
        assert!(CertificationStatus::Active.is_live_claim());
        assert!(CertificationStatus::ExpiringSoon.is_live_claim());
        assert!(CertificationStatus::PendingApproval.is_live_claim());
        assert!(!CertificationStatus::AdminAssigned.is_live_claim());
        assert!(!CertificationStatus::Expired.is_live_claim());
    }

    #[test]
    fn test_urgency_windows() {
        assert!(UrgencyTier::Planning.in_window(360));
        assert!(UrgencyTier::Planning.in_window(365));
        assert!(!UrgencyTier::Planning.in_window(350));
        assert!(!UrgencyTier::Planning.in_window(366));
        assert!(UrgencyTier::Urgent.in_window(8));
        assert!(!UrgencyTier::Urgent.in_window(7));
        assert!(UrgencyTier::Critical.in_window(7));
        assert!(!UrgencyTier::Critical.in_window(0));
        assert!(UrgencyTier::Expired.in_window(0));
        assert!(UrgencyTier::Expired.in_window(-6));
        assert!(!UrgencyTier::Expired.in_window(-7));
    }

    #[test]
    fn test_urgency_ordering_matches_thresholds() {
        assert!(UrgencyTier::Planning < UrgencyTier::Preparation);
        assert!(UrgencyTier::Planning.threshold_days() > UrgencyTier::Preparation.threshold_days());
        assert!(UrgencyTier::Critical < UrgencyTier::Expired);
    }

    #[test]
    fn test_competency_ladder() {
        assert_eq!(CompetencyTier::from_points(0), CompetencyTier::Entry);
        assert_eq!(CompetencyTier::from_points(9), CompetencyTier::Entry);
        assert_eq!(CompetencyTier::from_points(10), CompetencyTier::Bronze);
        assert_eq!(CompetencyTier::from_points(15), CompetencyTier::BronzePlus);
        assert_eq!(CompetencyTier::from_points(24), CompetencyTier::BronzePlus);
        assert_eq!(CompetencyTier::from_points(25), CompetencyTier::Silver);
        assert_eq!(CompetencyTier::from_points(35), CompetencyTier::SilverPlus);
        assert_eq!(CompetencyTier::from_points(50), CompetencyTier::Gold);
        assert_eq!(CompetencyTier::from_points(75), CompetencyTier::GoldPlus);
        assert_eq!(CompetencyTier::from_points(99), CompetencyTier::GoldPlus);
        assert_eq!(CompetencyTier::from_points(100), CompetencyTier::Platinum);
        assert_eq!(CompetencyTier::from_points(1_000), CompetencyTier::Platinum);
    }

    #[test]
    fn test_competency_next() {
        assert_eq!(CompetencyTier::Entry.next(), Some(CompetencyTier::Bronze));
        assert_eq!(CompetencyTier::GoldPlus.next(), Some(CompetencyTier::Platinum));
        assert_eq!(CompetencyTier::Platinum.next(), None);
        assert_eq!(CompetencyTier::SilverPlus.display_name(), "Silver+");
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&CertificationStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"PENDING_APPROVAL\"");
        let tier: UrgencyTier = serde_json::from_str("\"CRITICAL\"").unwrap();
        assert_eq!(tier, UrgencyTier::Critical);
    }
}
