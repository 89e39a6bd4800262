//! 悬赏活动仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::BountyRepositoryTrait;
use crate::error::Result;
use crate::models::BountyCampaign;

pub struct BountyRepository {
    pool: PgPool,
}

impl BountyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BountyRepositoryTrait for BountyRepository {
    async fn list_active_campaigns(&self) -> Result<Vec<BountyCampaign>> {
        let campaigns = sqlx::query_as::<_, BountyCampaign>(
            r#"
            SELECT id, name, definition_ids, bonus_amount, starts_on, ends_on, is_active, created_at
            FROM bounty_campaigns
            WHERE is_active = TRUE
            ORDER BY starts_on
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }

    async fn create_campaign(&self, campaign: &BountyCampaign) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bounty_campaigns (
                id, name, definition_ids, bonus_amount, starts_on, ends_on, is_active, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(campaign.id)
        .bind(&campaign.name)
        .bind(&campaign.definition_ids)
        .bind(campaign.bonus_amount)
        .bind(campaign.starts_on)
        .bind(campaign.ends_on)
        .bind(campaign.is_active)
        .bind(campaign.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
