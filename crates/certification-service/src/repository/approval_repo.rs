//! 审批仓储
//!
//! 审批队列与审批历史；队列变更与记录写入放在同一事务中

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::instance_repo::upsert_in;
use super::traits::ApprovalRepositoryTrait;
use crate::error::{CertificationError, Result};
use crate::models::{
    ApprovalHistoryEntry, PendingSubmission, SubmissionData, SubmissionTrace,
    UserCertificationInstance,
};

/// 待审批行
#[derive(sqlx::FromRow)]
struct PendingRow {
    id: Uuid,
    instance_id: Uuid,
    user_id: String,
    definition_id: Uuid,
    obtained_on: NaiveDate,
    certificate_number: Option<String>,
    verification_url: Option<String>,
    file_ref: Option<String>,
    notes: Option<String>,
    original_instance_id: Option<Uuid>,
    assignment_id: Option<Uuid>,
    submitted_at: DateTime<Utc>,
}

impl From<PendingRow> for PendingSubmission {
    fn from(row: PendingRow) -> Self {
        let trace = match (row.original_instance_id, row.assignment_id) {
            (Some(original_instance_id), Some(assignment_id)) => Some(SubmissionTrace {
                original_instance_id,
                assignment_id,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            instance_id: row.instance_id,
            user_id: row.user_id,
            definition_id: row.definition_id,
            submission: SubmissionData {
                obtained_on: row.obtained_on,
                certificate_number: row.certificate_number,
                verification_url: row.verification_url,
                file_ref: row.file_ref,
                notes: row.notes,
            },
            trace,
            submitted_at: row.submitted_at,
        }
    }
}

/// 审批仓储
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalRepositoryTrait for ApprovalRepository {
    async fn enqueue_submission(
        &self,
        instance: &UserCertificationInstance,
        submission: &PendingSubmission,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        upsert_in(&mut tx, instance).await?;

        sqlx::query(
            r#"
            INSERT INTO pending_submissions (
                id, instance_id, user_id, definition_id, obtained_on, certificate_number,
                verification_url, file_ref, notes, original_instance_id, assignment_id, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(submission.id)
        .bind(submission.instance_id)
        .bind(&submission.user_id)
        .bind(submission.definition_id)
        .bind(submission.submission.obtained_on)
        .bind(&submission.submission.certificate_number)
        .bind(&submission.submission.verification_url)
        .bind(&submission.submission.file_ref)
        .bind(&submission.submission.notes)
        .bind(submission.trace.map(|t| t.original_instance_id))
        .bind(submission.trace.map(|t| t.assignment_id))
        .bind(submission.submitted_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_pending(&self, id: Uuid) -> Result<Option<PendingSubmission>> {
        let row = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT id, instance_id, user_id, definition_id, obtained_on, certificate_number,
                   verification_url, file_ref, notes, original_instance_id, assignment_id, submitted_at
            FROM pending_submissions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        let rows = sqlx::query_as::<_, PendingRow>(
            r#"
            SELECT id, instance_id, user_id, definition_id, obtained_on, certificate_number,
                   verification_url, file_ref, notes, original_instance_id, assignment_id, submitted_at
            FROM pending_submissions
            ORDER BY submitted_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn commit_decision(
        &self,
        submission_id: Uuid,
        instance: &UserCertificationInstance,
        history: &ApprovalHistoryEntry,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM pending_submissions WHERE id = $1")
            .bind(submission_id)
            .execute(&mut *tx)
            .await?;
        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(CertificationError::SubmissionNotFound(submission_id));
        }

        upsert_in(&mut tx, instance).await?;

        sqlx::query(
            r#"
            INSERT INTO approval_history (
                id, submission_id, instance_id, user_id, definition_id, decision,
                decided_by, comments, decided_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(history.id)
        .bind(history.submission_id)
        .bind(history.instance_id)
        .bind(&history.user_id)
        .bind(history.definition_id)
        .bind(history.decision)
        .bind(&history.decided_by)
        .bind(&history.comments)
        .bind(history.decided_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_history(&self, instance_id: Option<Uuid>) -> Result<Vec<ApprovalHistoryEntry>> {
        let entries = sqlx::query_as::<_, ApprovalHistoryEntry>(
            r#"
            SELECT id, submission_id, instance_id, user_id, definition_id, decision,
                   decided_by, comments, decided_at
            FROM approval_history
            WHERE ($1::uuid IS NULL OR instance_id = $1)
            ORDER BY decided_at
            "#,
        )
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
