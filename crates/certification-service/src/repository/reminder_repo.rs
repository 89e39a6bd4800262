//! 提醒台账仓储
//!
//! 台账只追加；台账写入与伴随的状态流转在同一事务中提交

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::instance_repo::transition_in;
use super::traits::ReminderRepositoryTrait;
use crate::error::Result;
use crate::models::{ReminderRecord, StatusTransition, UrgencyTier};

/// 提醒台账仓储
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderRepositoryTrait for ReminderRepository {
    async fn last_delivered(
        &self,
        instance_id: Uuid,
        tier: UrgencyTier,
    ) -> Result<Option<DateTime<Utc>>> {
        let last: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT MAX(sent_at)
            FROM reminder_log
            WHERE instance_id = $1 AND tier = $2 AND delivered = TRUE
            "#,
        )
        .bind(instance_id)
        .bind(tier)
        .fetch_one(&self.pool)
        .await?;

        Ok(last)
    }

    async fn record_outcome(
        &self,
        record: &ReminderRecord,
        transition: Option<StatusTransition>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reminder_log (
                id, instance_id, user_id, tier, channel, sent_at, delivered,
                days_remaining, summary, error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(record.instance_id)
        .bind(&record.user_id)
        .bind(record.tier)
        .bind(record.channel)
        .bind(record.sent_at)
        .bind(record.delivered)
        .bind(record.days_remaining)
        .bind(&record.summary)
        .bind(&record.error)
        .execute(&mut *tx)
        .await?;

        if let Some(change) = transition {
            transition_in(&mut tx, &change, record.sent_at).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_for_instance(&self, instance_id: Uuid) -> Result<Vec<ReminderRecord>> {
        let records = sqlx::query_as::<_, ReminderRecord>(
            r#"
            SELECT id, instance_id, user_id, tier, channel, sent_at, delivered,
                   days_remaining, summary, error
            FROM reminder_log
            WHERE instance_id = $1
            ORDER BY sent_at
            "#,
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
