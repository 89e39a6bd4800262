//! 悬赏活动

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 悬赏活动
///
/// 活动期内获得的指定认证在审批通过时计入奖金
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BountyCampaign {
    pub id: Uuid,
    pub name: String,
    /// 覆盖的认证定义，为空表示全部
    pub definition_ids: Vec<Uuid>,
    /// 奖金金额（最小货币单位）
    pub bonus_amount: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BountyCampaign {
    pub fn covers(&self, definition_id: Uuid) -> bool {
        self.definition_ids.is_empty() || self.definition_ids.contains(&definition_id)
    }

    /// 日期是否落在活动期内（含首尾）
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.starts_on && date <= self.ends_on
    }
}

/// 新建悬赏活动
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    pub definition_ids: Vec<Uuid>,
    pub bonus_amount: i64,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}
