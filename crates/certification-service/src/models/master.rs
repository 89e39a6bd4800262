//! 认证目录实体定义

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::CertificationLevel;

/// 认证定义（目录条目）
///
/// 只停用不删除；停用后不能再创建新记录，已有记录保持有效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MasterCertificationDefinition {
    pub id: Uuid,
    pub full_name: String,
    pub short_name: String,
    pub version: Option<String>,
    /// 厂商名称
    pub vendor: String,
    pub level: CertificationLevel,
    /// 积分（正整数）
    pub points: i32,
    /// 有效期（月）
    pub validity_months: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub introduced_on: Option<NaiveDate>,
    /// 停用日期
    pub retired_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建认证定义
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDefinition {
    pub full_name: String,
    pub short_name: String,
    pub version: Option<String>,
    pub vendor: String,
    pub level: CertificationLevel,
    pub points: i32,
    pub validity_months: i32,
    pub description: Option<String>,
    pub introduced_on: Option<NaiveDate>,
}

impl NewDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name 不能为空".to_string());
        }
        if self.short_name.trim().is_empty() {
            return Err("short_name 不能为空".to_string());
        }
        if self.vendor.trim().is_empty() {
            return Err("vendor 不能为空".to_string());
        }
        if self.points <= 0 {
            return Err(format!("points 必须大于 0: {}", self.points));
        }
        if self.validity_months <= 0 {
            return Err(format!("validity_months 必须大于 0: {}", self.validity_months));
        }
        Ok(())
    }

    pub fn into_definition(self, now: DateTime<Utc>) -> MasterCertificationDefinition {
        MasterCertificationDefinition {
            id: Uuid::now_v7(),
            full_name: self.full_name,
            short_name: self.short_name,
            version: self.version,
            vendor: self.vendor,
            level: self.level,
            points: self.points,
            validity_months: self.validity_months,
            description: self.description,
            is_active: true,
            introduced_on: self.introduced_on,
            retired_on: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 认证定义部分更新
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionPatch {
    pub full_name: Option<String>,
    pub short_name: Option<String>,
    pub version: Option<String>,
    pub vendor: Option<String>,
    pub level: Option<CertificationLevel>,
    pub points: Option<i32>,
    pub validity_months: Option<i32>,
    pub description: Option<String>,
}

impl DefinitionPatch {
    /// 应用到已有定义，校验规则与新建一致
    pub fn apply(
        self,
        definition: &mut MasterCertificationDefinition,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let mut draft = NewDefinition {
            full_name: self.full_name.unwrap_or_else(|| definition.full_name.clone()),
            short_name: self
                .short_name
                .unwrap_or_else(|| definition.short_name.clone()),
            version: self.version.or_else(|| definition.version.clone()),
            vendor: self.vendor.unwrap_or_else(|| definition.vendor.clone()),
            level: self.level.unwrap_or(definition.level),
            points: self.points.unwrap_or(definition.points),
            validity_months: self.validity_months.unwrap_or(definition.validity_months),
            description: self.description.or_else(|| definition.description.clone()),
            introduced_on: definition.introduced_on,
        };
        draft.validate()?;

        definition.full_name = std::mem::take(&mut draft.full_name);
        definition.short_name = std::mem::take(&mut draft.short_name);
        definition.version = draft.version;
        definition.vendor = draft.vendor;
        definition.level = draft.level;
        definition.points = draft.points;
        definition.validity_months = draft.validity_months;
        definition.description = draft.description;
        definition.updated_at = now;
        Ok(())
    }
}
