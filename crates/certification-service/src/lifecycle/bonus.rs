//! 奖金资格与悬赏金额

use cert_shared::config::BonusConfig;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{BountyCampaign, CertificationLevel, MasterCertificationDefinition};

/// 奖金资格规则
///
/// 各条件之间为"或"关系，任一满足即有资格
#[derive(Debug, Clone)]
pub struct BonusPolicy {
    pub points_threshold: i32,
    pub cloud_points_threshold: i32,
    cloud_vendors: Vec<String>,
    associate_vendors: Vec<String>,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        Self::from(&BonusConfig::default())
    }
}

impl From<&BonusConfig> for BonusPolicy {
    fn from(config: &BonusConfig) -> Self {
        Self {
            points_threshold: config.points_threshold,
            cloud_points_threshold: config.cloud_points_threshold,
            cloud_vendors: normalize(&config.cloud_vendors),
            associate_vendors: normalize(&config.associate_vendors),
        }
    }
}

fn normalize(vendors: &[String]) -> Vec<String> {
    vendors.iter().map(|v| v.trim().to_lowercase()).collect()
}

impl BonusPolicy {
    fn is_cloud_vendor(&self, vendor: &str) -> bool {
        self.cloud_vendors.contains(&vendor.trim().to_lowercase())
    }

    fn is_associate_vendor(&self, vendor: &str) -> bool {
        self.associate_vendors.contains(&vendor.trim().to_lowercase())
    }
}

/// 根据目录条目判断是否有奖金资格
pub fn determine_bonus_eligibility(
    definition: &MasterCertificationDefinition,
    policy: &BonusPolicy,
) -> bool {
    let senior_level = matches!(
        definition.level,
        CertificationLevel::Professional | CertificationLevel::Expert
    );
    let high_points = definition.points >= policy.points_threshold;
    let cloud_points = policy.is_cloud_vendor(&definition.vendor)
        && definition.points >= policy.cloud_points_threshold;
    let named_associate = policy.is_associate_vendor(&definition.vendor)
        && definition.level == CertificationLevel::Associate;

    senior_level || high_points || cloud_points || named_associate
}

/// 选出适用的悬赏金额
///
/// 只看启用中、覆盖该定义、活动期包含获得日期的活动，取最高金额
pub fn select_bounty(
    campaigns: &[BountyCampaign],
    definition_id: Uuid,
    obtained_on: NaiveDate,
) -> Option<i64> {
    campaigns
        .iter()
        .filter(|c| c.is_active && c.covers(definition_id) && c.contains(obtained_on))
        .map(|c| c.bonus_amount)
        .max()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn definition(vendor: &str, level: CertificationLevel, points: i32) -> MasterCertificationDefinition {
        let now = Utc::now();
        MasterCertificationDefinition {
            id: Uuid::new_v4(),
            full_name: "Sample".to_string(),
            short_name: "S".to_string(),
            version: None,
            vendor: vendor.to_string(),
            level,
            points,
            validity_months: 24,
            description: None,
            is_active: true,
            introduced_on: None,
            retired_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_senior_level_is_eligible() {
        let policy = BonusPolicy::default();
        assert!(determine_bonus_eligibility(
            &definition("Unknown", CertificationLevel::Professional, 1),
            &policy
        ));
        assert!(determine_bonus_eligibility(
            &definition("Unknown", CertificationLevel::Expert, 1),
            &policy
        ));
    }

    #[test]
    fn test_points_threshold() {
        let policy = BonusPolicy::default();
        assert!(determine_bonus_eligibility(
            &definition("Unknown", CertificationLevel::Entry, 20),
            &policy
        ));
        assert!(!determine_bonus_eligibility(
            &definition("Unknown", CertificationLevel::Entry, 19),
            &policy
        ));
    }

    #[test]
    fn test_cloud_vendor_lower_threshold() {
        let policy = BonusPolicy::default();
        assert!(determine_bonus_eligibility(
            &definition("aws", CertificationLevel::Entry, 15),
            &policy
        ));
        assert!(!determine_bonus_eligibility(
            &definition("AWS", CertificationLevel::Entry, 14),
            &policy
        ));
        // 非云厂商不享受 15 分门槛
        assert!(!determine_bonus_eligibility(
            &definition("CNCF", CertificationLevel::Entry, 15),
            &policy
        ));
    }

    #[test]
    fn test_named_vendor_associate() {
        let policy = BonusPolicy::default();
        assert!(determine_bonus_eligibility(
            &definition("CNCF", CertificationLevel::Associate, 5),
            &policy
        ));
        assert!(!determine_bonus_eligibility(
            &definition("Acme", CertificationLevel::Associate, 5),
            &policy
        ));
        assert!(!determine_bonus_eligibility(
            &definition("CNCF", CertificationLevel::Entry, 5),
            &policy
        ));
    }

    #[test]
    fn test_select_bounty_takes_highest_matching() {
        let definition_id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let campaign = |amount: i64, ids: Vec<Uuid>, active: bool| BountyCampaign {
            id: Uuid::new_v4(),
            name: format!("campaign-{}", amount),
            definition_ids: ids,
            bonus_amount: amount,
            starts_on: date(2024, 1, 1),
            ends_on: date(2024, 3, 31),
            is_active: active,
            created_at: Utc::now(),
        };
        let campaigns = vec![
            campaign(50_000, vec![], true),
            campaign(80_000, vec![definition_id], true),
            campaign(90_000, vec![other], true),
            campaign(99_000, vec![], false),
        ];

        assert_eq!(
            select_bounty(&campaigns, definition_id, date(2024, 2, 1)),
            Some(80_000)
        );
        assert_eq!(
            select_bounty(&campaigns, Uuid::new_v4(), date(2024, 3, 31)),
            Some(50_000)
        );
        assert_eq!(select_bounty(&campaigns, definition_id, date(2024, 4, 1)), None);
    }
}
