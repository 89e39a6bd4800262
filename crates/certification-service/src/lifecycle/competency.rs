//! 能力等级计算

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    CertificationStatus, CompetencyTier, MasterCertificationDefinition, UserCertificationInstance,
};

/// 用户能力概览
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencySummary {
    pub total_points: i64,
    pub tier: CompetencyTier,
    pub next_tier: Option<CompetencyTier>,
    /// 距下一等级还差的积分，已是顶级时为 0
    pub points_to_next: i64,
    pub active_certifications: usize,
}

/// 汇总 ACTIVE 记录的积分
///
/// 找不到目录条目的记录不计分
pub fn total_active_points(
    instances: &[UserCertificationInstance],
    catalog: &HashMap<Uuid, MasterCertificationDefinition>,
) -> (i64, usize) {
    instances
        .iter()
        .filter(|i| i.status == CertificationStatus::Active)
        .filter_map(|i| catalog.get(&i.definition_id))
        .fold((0, 0), |(points, count), d| {
            (points + i64::from(d.points), count + 1)
        })
}

pub fn compute_competency_tier(
    instances: &[UserCertificationInstance],
    catalog: &HashMap<Uuid, MasterCertificationDefinition>,
) -> CompetencyTier {
    CompetencyTier::from_points(total_active_points(instances, catalog).0)
}

pub fn compute_competency_summary(
    instances: &[UserCertificationInstance],
    catalog: &HashMap<Uuid, MasterCertificationDefinition>,
) -> CompetencySummary {
    let (total_points, active_certifications) = total_active_points(instances, catalog);
    let tier = CompetencyTier::from_points(total_points);
    let next_tier = tier.next();
    let points_to_next = next_tier
        .map(|next| next.min_points() - total_points)
        .unwrap_or(0);

    CompetencySummary {
        total_points,
        tier,
        next_tier,
        points_to_next,
        active_certifications,
    }
}
