//! 用户认证仓储
//!
//! 指派信息在表中展开为独立列，读取时重新组装为 `AssignmentMetadata`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::InstanceRepositoryTrait;
use crate::error::{CertificationError, Result};
use crate::models::{
    AssignmentMetadata, CertificationStatus, StatusTransition, UserCertificationInstance,
};

pub(crate) const INSTANCE_COLUMNS: &str = r#"
    id, user_id, definition_id, status, obtained_on, expires_on, certificate_number,
    verification_url, file_ref, notes, bonus_eligible, bonus_claimed, bonus_amount,
    assignment_id, assigned_by, assigned_on, assignment_deadline, bonus_eligible_override,
    created_at, updated_at
"#;

/// 用户认证行
#[derive(sqlx::FromRow)]
pub(crate) struct InstanceRow {
    id: Uuid,
    user_id: String,
    definition_id: Uuid,
    status: CertificationStatus,
    obtained_on: Option<NaiveDate>,
    expires_on: Option<NaiveDate>,
    certificate_number: Option<String>,
    verification_url: Option<String>,
    file_ref: Option<String>,
    notes: Option<String>,
    bonus_eligible: bool,
    bonus_claimed: bool,
    bonus_amount: Option<i64>,
    assignment_id: Option<Uuid>,
    assigned_by: Option<String>,
    assigned_on: Option<NaiveDate>,
    assignment_deadline: Option<NaiveDate>,
    bonus_eligible_override: Option<bool>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InstanceRow> for UserCertificationInstance {
    fn from(row: InstanceRow) -> Self {
        let assignment = match (row.assignment_id, row.assigned_by, row.assigned_on) {
            (Some(assignment_id), Some(assigned_by), Some(assigned_on)) => {
                Some(AssignmentMetadata {
                    assignment_id,
                    assigned_by,
                    assigned_on,
                    deadline: row.assignment_deadline,
                    bonus_eligible_override: row.bonus_eligible_override,
                })
            }
            _ => None,
        };

        Self {
            id: row.id,
            user_id: row.user_id,
            definition_id: row.definition_id,
            status: row.status,
            obtained_on: row.obtained_on,
            expires_on: row.expires_on,
            certificate_number: row.certificate_number,
            verification_url: row.verification_url,
            file_ref: row.file_ref,
            notes: row.notes,
            bonus_eligible: row.bonus_eligible,
            bonus_claimed: row.bonus_claimed,
            bonus_amount: row.bonus_amount,
            assignment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// 把唯一索引冲突映射为重复占用
pub(crate) fn map_claim_conflict(
    err: sqlx::Error,
    instance: &UserCertificationInstance,
) -> CertificationError {
    let unique_violation = err
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == "23505");
    if unique_violation {
        CertificationError::DuplicateClaim {
            user_id: instance.user_id.clone(),
            definition_id: instance.definition_id,
        }
    } else {
        CertificationError::Database(err)
    }
}

/// 在给定连接（通常是事务）上写入用户认证
pub(crate) async fn upsert_in(
    conn: &mut PgConnection,
    instance: &UserCertificationInstance,
) -> Result<()> {
    let assignment = instance.assignment.as_ref();

    sqlx::query(
        r#"
        INSERT INTO user_certifications (
            id, user_id, definition_id, status, obtained_on, expires_on, certificate_number,
            verification_url, file_ref, notes, bonus_eligible, bonus_claimed, bonus_amount,
            assignment_id, assigned_by, assigned_on, assignment_deadline, bonus_eligible_override,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
        ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            obtained_on = EXCLUDED.obtained_on,
            expires_on = EXCLUDED.expires_on,
            certificate_number = EXCLUDED.certificate_number,
            verification_url = EXCLUDED.verification_url,
            file_ref = EXCLUDED.file_ref,
            notes = EXCLUDED.notes,
            bonus_eligible = EXCLUDED.bonus_eligible,
            bonus_claimed = EXCLUDED.bonus_claimed,
            bonus_amount = EXCLUDED.bonus_amount,
            assignment_id = EXCLUDED.assignment_id,
            assigned_by = EXCLUDED.assigned_by,
            assigned_on = EXCLUDED.assigned_on,
            assignment_deadline = EXCLUDED.assignment_deadline,
            bonus_eligible_override = EXCLUDED.bonus_eligible_override,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(instance.id)
    .bind(&instance.user_id)
    .bind(instance.definition_id)
    .bind(instance.status)
    .bind(instance.obtained_on)
    .bind(instance.expires_on)
    .bind(&instance.certificate_number)
    .bind(&instance.verification_url)
    .bind(&instance.file_ref)
    .bind(&instance.notes)
    .bind(instance.bonus_eligible)
    .bind(instance.bonus_claimed)
    .bind(instance.bonus_amount)
    .bind(assignment.map(|a| a.assignment_id))
    .bind(assignment.map(|a| a.assigned_by.clone()))
    .bind(assignment.map(|a| a.assigned_on))
    .bind(assignment.and_then(|a| a.deadline))
    .bind(assignment.and_then(|a| a.bonus_eligible_override))
    .bind(instance.created_at)
    .bind(instance.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_claim_conflict(e, instance))?;

    Ok(())
}

/// 在给定连接上执行一次带条件的状态流转
pub(crate) async fn transition_in(
    conn: &mut PgConnection,
    change: &StatusTransition,
    at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE user_certifications
        SET status = $3, updated_at = $4
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(change.instance_id)
    .bind(change.from)
    .bind(change.to)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 用户认证仓储
pub struct InstanceRepository {
    pool: PgPool,
}

impl InstanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceRepositoryTrait for InstanceRepository {
    async fn get_instance(&self, id: Uuid) -> Result<Option<UserCertificationInstance>> {
        let sql = format!(
            "SELECT {} FROM user_certifications WHERE id = $1",
            INSTANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, InstanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserCertificationInstance>> {
        let sql = format!(
            "SELECT {} FROM user_certifications WHERE user_id = $1 ORDER BY created_at",
            INSTANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InstanceRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_by_statuses(
        &self,
        statuses: &[CertificationStatus],
    ) -> Result<Vec<UserCertificationInstance>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            "SELECT {} FROM user_certifications WHERE status = ANY($1) ORDER BY expires_on NULLS LAST, id",
            INSTANCE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InstanceRow>(&sql)
            .bind(&statuses)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_instance(&self, instance: &UserCertificationInstance) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        upsert_in(&mut conn, instance).await
    }

    async fn delete_instance(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_certifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut applied = 0;
        for change in transitions {
            if transition_in(&mut tx, change, at).await? {
                applied += 1;
            }
        }
        tx.commit().await?;

        Ok(applied)
    }

    async fn mark_bonus_claimed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_certifications
            SET bonus_claimed = TRUE, updated_at = NOW()
            WHERE id = $1 AND bonus_claimed = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
