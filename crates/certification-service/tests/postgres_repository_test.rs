//! PostgreSQL 仓储集成测试
//!
//! 验证部分唯一索引、审批提交事务和提醒台账事务在真实数据库上的行为。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... \
//!   cargo test --test postgres_repository_test -- --ignored
//! ```

use std::path::Path;
use std::sync::Arc;

use certification::error::CertificationError;
use certification::lifecycle::{BonusPolicy, CertificationService};
use certification::models::{
    ApprovalAction, AssignmentRequest, CertificationLevel, CertificationStatus, NewDefinition,
    NotificationChannel, ReminderRecord, StatusTransition, SubmissionData, UrgencyTier,
};
use certification::repository::{
    InstanceRepository, InstanceRepositoryTrait, ReminderRepository, ReminderRepositoryTrait,
};
use certification::{ApprovalWorkflow, FixedClock, Repositories};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup() -> PgPool {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    sqlx::migrate::Migrator::new(dir.as_path())
        .await
        .expect("加载迁移失败")
        .run(&pool)
        .await
        .expect("执行迁移失败");
    pool
}

fn unique_user(prefix: &str) -> String {
    format!("integ_{}_{}", prefix, Uuid::new_v4().simple())
}

fn services(pool: &PgPool) -> (CertificationService, ApprovalWorkflow) {
    let repos = Repositories::postgres(pool.clone());
    let clock = Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    (
        CertificationService::new(repos.clone(), clock.clone(), BonusPolicy::default()),
        ApprovalWorkflow::new(repos, clock),
    )
}

fn new_definition() -> NewDefinition {
    NewDefinition {
        full_name: "HashiCorp Certified: Terraform Associate".to_string(),
        short_name: format!("TFA-{}", Uuid::new_v4().simple()),
        vendor: "HashiCorp".to_string(),
        level: CertificationLevel::Associate,
        points: 10,
        validity_months: 24,
        ..Default::default()
    }
}

fn submission(number: &str) -> SubmissionData {
    SubmissionData {
        obtained_on: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
        certificate_number: Some(number.to_string()),
        verification_url: None,
        file_ref: None,
        notes: Some("集成测试".to_string()),
    }
}

// ==================== 测试用例 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_live_claim_index_blocks_second_record() {
    let pool = setup().await;
    let (service, _) = services(&pool);
    let definition = service.create_definition(new_definition()).await.unwrap();
    let user_id = unique_user("dup");

    let first = service
        .submit(&user_id, definition.id, submission("TF-1"))
        .await
        .unwrap();

    // 绕过服务层校验直接写入，依赖数据库索引拦截
    let mut clone = first.instance.clone();
    clone.id = Uuid::now_v7();
    let repo = InstanceRepository::new(pool.clone());
    let err = repo.upsert_instance(&clone).await.unwrap_err();
    assert!(
        matches!(err, CertificationError::DuplicateClaim { .. }),
        "应映射为重复申报: {:?}",
        err
    );
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_rejection_round_trip_through_database() {
    let pool = setup().await;
    let (service, approvals) = services(&pool);
    let definition = service.create_definition(new_definition()).await.unwrap();
    let user_id = unique_user("reject");

    let assigned = service
        .assign(
            "integ_admin",
            AssignmentRequest {
                user_id: user_id.clone(),
                definition_id: definition.id,
                deadline: None,
                bonus_eligible: Some(true),
            },
        )
        .await
        .unwrap();
    let submitted = service
        .submit(&user_id, definition.id, submission("TF-2"))
        .await
        .unwrap();

    let outcome = approvals
        .decide(submitted.submission.id, ApprovalAction::Reject, "integ_admin", None)
        .await
        .unwrap();
    assert_eq!(outcome.instance.status, CertificationStatus::AdminAssigned);

    let stored = service.get_instance(assigned.id).await.unwrap();
    assert_eq!(stored.status, CertificationStatus::AdminAssigned);
    assert_eq!(stored.obtained_on, None);
    assert_eq!(stored.assignment, assigned.assignment);

    // 同一提交不能被重复审批
    let err = approvals
        .decide(submitted.submission.id, ApprovalAction::Approve, "integ_admin", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CertificationError::SubmissionNotFound(_)));

    let history = approvals.history(Some(assigned.id)).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_reminder_outcome_and_transition_committed_together() {
    let pool = setup().await;
    let (service, approvals) = services(&pool);
    let definition = service.create_definition(new_definition()).await.unwrap();
    let user_id = unique_user("reminder");

    let submitted = service
        .submit(&user_id, definition.id, submission("TF-3"))
        .await
        .unwrap();
    let active = approvals
        .decide(submitted.submission.id, ApprovalAction::Approve, "integ_admin", None)
        .await
        .unwrap()
        .instance;

    let repo = ReminderRepository::new(pool.clone());
    let record = ReminderRecord {
        id: Uuid::now_v7(),
        instance_id: active.id,
        user_id: user_id.clone(),
        tier: UrgencyTier::Urgent,
        channel: NotificationChannel::Email,
        sent_at: Utc::now(),
        delivered: true,
        days_remaining: 21,
        summary: "[URGENT] Terraform Associate".to_string(),
        error: None,
    };
    repo.record_outcome(
        &record,
        Some(StatusTransition {
            instance_id: active.id,
            from: CertificationStatus::Active,
            to: CertificationStatus::ExpiringSoon,
        }),
    )
    .await
    .unwrap();

    let last = repo
        .last_delivered(active.id, UrgencyTier::Urgent)
        .await
        .unwrap();
    assert!(last.is_some());
    assert!(
        repo.last_delivered(active.id, UrgencyTier::Critical)
            .await
            .unwrap()
            .is_none()
    );

    let stored = service.get_instance(active.id).await.unwrap();
    assert_eq!(stored.status, CertificationStatus::ExpiringSoon);
    assert_eq!(repo.list_for_instance(active.id).await.unwrap().len(), 1);
}
