//! 认证生命周期引擎
//!
//! 纯函数实现，不做任何 I/O：
//! - 指派校验（重复占用检查）
//! - 指派记录创建
//! - 提交审批（指派记录原地更新，不产生重复记录）
//! - 审批决定（通过 / 驳回，区分是否源自指派）
//! - 定期状态巡检
//!
//! 持久化由服务层通过仓储接口完成。

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::bonus::{BonusPolicy, determine_bonus_eligibility};
use super::expiration::compute_expiration;
use super::transitions::transition;
use crate::error::{CertificationError, Result};
use crate::models::{
    ApprovalAction, ApprovalDecision, ApprovalHistoryEntry, AssignmentMetadata,
    AssignmentRequest, CertificationStatus, MasterCertificationDefinition, PendingSubmission,
    StatusTransition, SubmissionData, UserCertificationInstance,
};

/// 审批结果
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub instance: UserCertificationInstance,
    pub history: ApprovalHistoryEntry,
}

/// 指派 / 提交前校验
///
/// - 定义不存在或已停用：NotFound 类错误
/// - 同一用户同一定义已有 ACTIVE / EXPIRING_SOON / PENDING_APPROVAL：DuplicateClaim
/// - ADMIN_ASSIGNED 不阻塞（它正是要被提交的前身）
pub fn validate_assignment(
    definition_id: Uuid,
    user_id: &str,
    definition: Option<&MasterCertificationDefinition>,
    existing: &[UserCertificationInstance],
) -> Result<MasterCertificationDefinition> {
    let definition = definition
        .filter(|d| d.id == definition_id)
        .ok_or(CertificationError::DefinitionNotFound(definition_id))?;

    if !definition.is_active {
        return Err(CertificationError::DefinitionInactive(definition_id));
    }

    let duplicate = existing.iter().any(|i| {
        i.user_id == user_id && i.definition_id == definition_id && i.status.is_live_claim()
    });
    if duplicate {
        return Err(CertificationError::DuplicateClaim {
            user_id: user_id.to_string(),
            definition_id,
        });
    }

    Ok(definition.clone())
}

/// 查找该用户在该定义上的指派记录
pub fn find_assigned<'a>(
    existing: &'a [UserCertificationInstance],
    user_id: &str,
    definition_id: Uuid,
) -> Option<&'a UserCertificationInstance> {
    existing
        .iter()
        .filter(|i| {
            i.user_id == user_id
                && i.definition_id == definition_id
                && i.status == CertificationStatus::AdminAssigned
        })
        .max_by_key(|i| i.created_at)
}

/// 根据管理员指派创建记录
pub fn create_from_assignment(
    definition: &MasterCertificationDefinition,
    request: &AssignmentRequest,
    assigned_by: &str,
    policy: &BonusPolicy,
    now: DateTime<Utc>,
) -> UserCertificationInstance {
    let bonus_eligible = request
        .bonus_eligible
        .unwrap_or_else(|| determine_bonus_eligibility(definition, policy));

    UserCertificationInstance {
        id: Uuid::now_v7(),
        user_id: request.user_id.clone(),
        definition_id: definition.id,
        status: CertificationStatus::AdminAssigned,
        obtained_on: None,
        expires_on: None,
        certificate_number: None,
        verification_url: None,
        file_ref: None,
        notes: None,
        bonus_eligible,
        bonus_claimed: false,
        bonus_amount: None,
        assignment: Some(AssignmentMetadata {
            assignment_id: Uuid::new_v4(),
            assigned_by: assigned_by.to_string(),
            assigned_on: now.date_naive(),
            deadline: request.deadline,
            bonus_eligible_override: request.bonus_eligible,
        }),
        created_at: now,
        updated_at: now,
    }
}

fn validate_submission(data: &SubmissionData, today: NaiveDate) -> Result<()> {
    if data.obtained_on > today {
        return Err(CertificationError::Validation(format!(
            "获得日期不能晚于今天: {}",
            data.obtained_on
        )));
    }
    Ok(())
}

fn apply_submission(
    instance: &mut UserCertificationInstance,
    data: &SubmissionData,
    definition: &MasterCertificationDefinition,
) -> Result<()> {
    instance.expires_on = Some(compute_expiration(
        data.obtained_on,
        definition.validity_months,
    )?);
    instance.obtained_on = Some(data.obtained_on);
    instance.certificate_number = data.certificate_number.clone();
    instance.verification_url = data.verification_url.clone();
    instance.file_ref = data.file_ref.clone();
    instance.notes = data.notes.clone();
    Ok(())
}

/// 提交审批
///
/// 传入 ADMIN_ASSIGNED 记录时原地更新并保留指派信息；否则新建 PENDING_APPROVAL 记录
pub fn submit_for_approval(
    existing: Option<UserCertificationInstance>,
    definition: &MasterCertificationDefinition,
    user_id: &str,
    data: &SubmissionData,
    policy: &BonusPolicy,
    now: DateTime<Utc>,
) -> Result<UserCertificationInstance> {
    validate_submission(data, now.date_naive())?;

    match existing {
        Some(mut instance) => {
            if instance.user_id != user_id || instance.definition_id != definition.id {
                return Err(CertificationError::Validation(format!(
                    "指派记录与提交不匹配: instance_id={}",
                    instance.id
                )));
            }
            transition(&mut instance, CertificationStatus::PendingApproval)?;
            apply_submission(&mut instance, data, definition)?;
            instance.updated_at = now;
            Ok(instance)
        }
        None => {
            let mut instance = UserCertificationInstance {
                id: Uuid::now_v7(),
                user_id: user_id.to_string(),
                definition_id: definition.id,
                status: CertificationStatus::PendingApproval,
                obtained_on: None,
                expires_on: None,
                certificate_number: None,
                verification_url: None,
                file_ref: None,
                notes: None,
                bonus_eligible: determine_bonus_eligibility(definition, policy),
                bonus_claimed: false,
                bonus_amount: None,
                assignment: None,
                created_at: now,
                updated_at: now,
            };
            apply_submission(&mut instance, data, definition)?;
            Ok(instance)
        }
    }
}

/// 审批决定
///
/// - 通过：记录置为 ACTIVE（源自指派时保留指派信息）
/// - 驳回且源自指派：回退到 ADMIN_ASSIGNED，清空获得/到期/证书字段
/// - 驳回且非指派：REJECTED（终态）
pub fn decide_approval(
    mut instance: UserCertificationInstance,
    submission: &PendingSubmission,
    action: ApprovalAction,
    admin_id: &str,
    comments: Option<String>,
    definition: &MasterCertificationDefinition,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome> {
    if instance.id != submission.target_instance_id() {
        return Err(CertificationError::Validation(format!(
            "审批记录与提交不匹配: submission_id={}, instance_id={}",
            submission.id, instance.id
        )));
    }

    let traced = submission.trace.filter(|t| {
        instance
            .assignment
            .as_ref()
            .is_some_and(|a| a.assignment_id == t.assignment_id)
    });

    match (action, traced) {
        (ApprovalAction::Approve, _) => {
            transition(&mut instance, CertificationStatus::Active)?;
            apply_submission(&mut instance, &submission.submission, definition)?;
        }
        (ApprovalAction::Reject, Some(_)) => {
            transition(&mut instance, CertificationStatus::AdminAssigned)?;
            instance.obtained_on = None;
            instance.expires_on = None;
            instance.certificate_number = None;
            instance.verification_url = None;
            instance.file_ref = None;
            instance.bonus_amount = None;
        }
        (ApprovalAction::Reject, None) => {
            transition(&mut instance, CertificationStatus::Rejected)?;
        }
    }
    instance.updated_at = now;

    let history = ApprovalHistoryEntry {
        id: Uuid::now_v7(),
        submission_id: submission.id,
        instance_id: instance.id,
        user_id: instance.user_id.clone(),
        definition_id: instance.definition_id,
        decision: ApprovalDecision::from(action),
        decided_by: admin_id.to_string(),
        comments,
        decided_at: now,
    };

    Ok(ApprovalOutcome { instance, history })
}

/// 定期状态巡检
///
/// - ACTIVE / EXPIRING_SOON 到期日早于今天：EXPIRED
/// - ACTIVE 距到期不超过 `expiring_soon_days` 天：EXPIRING_SOON
///
/// 幂等：对结果再跑一次不会产生新的流转
pub fn sweep_statuses(
    instances: &[UserCertificationInstance],
    today: NaiveDate,
    expiring_soon_days: i64,
) -> Vec<StatusTransition> {
    instances
        .iter()
        .filter_map(|instance| {
            let days = instance.days_until_expiration(today)?;
            let to = match instance.status {
                CertificationStatus::Active | CertificationStatus::ExpiringSoon
                    if instance.is_past_expiry(today) =>
                {
                    CertificationStatus::Expired
                }
                CertificationStatus::Active if days <= expiring_soon_days => {
                    CertificationStatus::ExpiringSoon
                }
                _ => return None,
            };
            Some(StatusTransition {
                instance_id: instance.id,
                from: instance.status,
                to,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CertificationLevel, SubmissionTrace};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        date(y, m, d).and_hms_opt(9, 0, 0).unwrap().and_utc()
    }

    fn definition() -> MasterCertificationDefinition {
        let now = at(2024, 1, 1);
        MasterCertificationDefinition {
            id: Uuid::new_v4(),
            full_name: "AWS Certified Solutions Architect - Professional".to_string(),
            short_name: "AWS SAP".to_string(),
            version: Some("C02".to_string()),
            vendor: "AWS".to_string(),
            level: CertificationLevel::Professional,
            points: 30,
            validity_months: 36,
            description: None,
            is_active: true,
            introduced_on: None,
            retired_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn submission_data(obtained_on: NaiveDate) -> SubmissionData {
        SubmissionData {
            obtained_on,
            certificate_number: Some("AWS-123".to_string()),
            verification_url: Some("https://verify.example.com/AWS-123".to_string()),
            file_ref: Some("uploads/aws-123.pdf".to_string()),
            notes: Some("first attempt".to_string()),
        }
    }

    fn assigned(def: &MasterCertificationDefinition) -> UserCertificationInstance {
        let request = AssignmentRequest {
            user_id: "user-1".to_string(),
            definition_id: def.id,
            deadline: Some(date(2024, 6, 30)),
            bonus_eligible: None,
        };
        create_from_assignment(def, &request, "admin-1", &BonusPolicy::default(), at(2024, 1, 1))
    }

    fn with_status(
        def: &MasterCertificationDefinition,
        status: CertificationStatus,
    ) -> UserCertificationInstance {
        let mut instance = assigned(def);
        instance.status = status;
        instance.assignment = None;
        instance
    }

    fn pending_for(
        instance: &UserCertificationInstance,
        data: SubmissionData,
    ) -> PendingSubmission {
        PendingSubmission {
            id: Uuid::new_v4(),
            instance_id: instance.id,
            user_id: instance.user_id.clone(),
            definition_id: instance.definition_id,
            submission: data,
            trace: instance.assignment.as_ref().map(|a| SubmissionTrace {
                original_instance_id: instance.id,
                assignment_id: a.assignment_id,
            }),
            submitted_at: at(2024, 1, 11),
        }
    }

    #[test]
    fn test_validate_assignment_not_found_and_inactive() {
        let def = definition();
        let err = validate_assignment(def.id, "user-1", None, &[]).unwrap_err();
        assert!(matches!(err, CertificationError::DefinitionNotFound(_)));

        let mut inactive = def.clone();
        inactive.is_active = false;
        let err = validate_assignment(def.id, "user-1", Some(&inactive), &[]).unwrap_err();
        assert!(matches!(err, CertificationError::DefinitionInactive(_)));
    }

    #[test]
    fn test_validate_assignment_blocks_live_claims() {
        let def = definition();
        for status in [
            CertificationStatus::Active,
            CertificationStatus::ExpiringSoon,
            CertificationStatus::PendingApproval,
        ] {
            let existing = vec![with_status(&def, status)];
            let err = validate_assignment(def.id, "user-1", Some(&def), &existing).unwrap_err();
            assert!(
                matches!(err, CertificationError::DuplicateClaim { .. }),
                "status {status} should block"
            );
        }
    }

    #[test]
    fn test_validate_assignment_allows_non_live_instances() {
        let def = definition();
        for status in [
            CertificationStatus::AdminAssigned,
            CertificationStatus::Expired,
            CertificationStatus::Rejected,
            CertificationStatus::Inactive,
        ] {
            let existing = vec![with_status(&def, status)];
            assert!(validate_assignment(def.id, "user-1", Some(&def), &existing).is_ok());
        }

        // 其他用户的有效记录不影响
        let mut other = with_status(&def, CertificationStatus::Active);
        other.user_id = "user-2".to_string();
        assert!(validate_assignment(def.id, "user-1", Some(&def), &[other]).is_ok());
    }

    #[test]
    fn test_create_from_assignment() {
        let def = definition();
        let instance = assigned(&def);
        assert_eq!(instance.status, CertificationStatus::AdminAssigned);
        assert!(instance.obtained_on.is_none());
        assert!(instance.expires_on.is_none());
        // PROFESSIONAL 级别默认有奖金资格
        assert!(instance.bonus_eligible);
        let meta = instance.assignment.unwrap();
        assert_eq!(meta.assigned_by, "admin-1");
        assert_eq!(meta.assigned_on, date(2024, 1, 1));

        let request = AssignmentRequest {
            user_id: "user-1".to_string(),
            definition_id: def.id,
            deadline: None,
            bonus_eligible: Some(false),
        };
        let overridden =
            create_from_assignment(&def, &request, "admin-1", &BonusPolicy::default(), at(2024, 1, 1));
        assert!(!overridden.bonus_eligible);
    }

    #[test]
    fn test_submit_updates_assignment_in_place() {
        let def = definition();
        let instance = assigned(&def);
        let assignment_id = instance.assignment.as_ref().unwrap().assignment_id;

        let submitted = submit_for_approval(
            Some(instance.clone()),
            &def,
            "user-1",
            &submission_data(date(2024, 1, 11)),
            &BonusPolicy::default(),
            at(2024, 1, 11),
        )
        .unwrap();

        assert_eq!(submitted.id, instance.id);
        assert_eq!(submitted.status, CertificationStatus::PendingApproval);
        assert_eq!(submitted.obtained_on, Some(date(2024, 1, 11)));
        assert_eq!(submitted.expires_on, Some(date(2027, 1, 11)));
        assert_eq!(submitted.certificate_number.as_deref(), Some("AWS-123"));
        assert_eq!(
            submitted.assignment.unwrap().assignment_id,
            assignment_id
        );
    }

    #[test]
    fn test_submit_without_assignment_creates_pending() {
        let def = definition();
        let submitted = submit_for_approval(
            None,
            &def,
            "user-1",
            &submission_data(date(2024, 1, 31)),
            &BonusPolicy::default(),
            at(2024, 2, 1),
        )
        .unwrap();
        assert_eq!(submitted.status, CertificationStatus::PendingApproval);
        assert!(submitted.assignment.is_none());
        assert_eq!(submitted.expires_on, Some(date(2027, 1, 31)));
    }

    #[test]
    fn test_submit_rejects_future_obtained_date() {
        let def = definition();
        let err = submit_for_approval(
            None,
            &def,
            "user-1",
            &submission_data(date(2024, 3, 1)),
            &BonusPolicy::default(),
            at(2024, 2, 1),
        )
        .unwrap_err();
        assert!(matches!(err, CertificationError::Validation(_)));
    }

    #[test]
    fn test_submit_on_non_assigned_instance_is_invalid_transition() {
        let def = definition();
        let active = with_status(&def, CertificationStatus::Active);
        let err = submit_for_approval(
            Some(active),
            &def,
            "user-1",
            &submission_data(date(2024, 1, 11)),
            &BonusPolicy::default(),
            at(2024, 1, 11),
        )
        .unwrap_err();
        assert!(matches!(err, CertificationError::InvalidTransition { .. }));
    }

    fn submitted_assignment(
        def: &MasterCertificationDefinition,
    ) -> (UserCertificationInstance, PendingSubmission) {
        let data = submission_data(date(2024, 1, 11));
        let instance = submit_for_approval(
            Some(assigned(def)),
            def,
            "user-1",
            &data,
            &BonusPolicy::default(),
            at(2024, 1, 11),
        )
        .unwrap();
        let pending = pending_for(&instance, data);
        (instance, pending)
    }

    #[test]
    fn test_approve_traced_keeps_identity_and_assignment() {
        let def = definition();
        let (instance, pending) = submitted_assignment(&def);

        let outcome = decide_approval(
            instance.clone(),
            &pending,
            ApprovalAction::Approve,
            "admin-1",
            Some("looks good".to_string()),
            &def,
            at(2024, 1, 13),
        )
        .unwrap();

        assert_eq!(outcome.instance.id, instance.id);
        assert_eq!(outcome.instance.status, CertificationStatus::Active);
        assert_eq!(outcome.instance.expires_on, Some(date(2027, 1, 11)));
        assert!(outcome.instance.assignment.is_some());
        assert_eq!(outcome.history.decision, ApprovalDecision::Approved);
        assert_eq!(outcome.history.submission_id, pending.id);
        assert_eq!(outcome.history.decided_by, "admin-1");
    }

    #[test]
    fn test_reject_traced_reverts_to_assigned() {
        let def = definition();
        let (instance, pending) = submitted_assignment(&def);
        let assignment_id = instance.assignment.as_ref().unwrap().assignment_id;

        let outcome = decide_approval(
            instance,
            &pending,
            ApprovalAction::Reject,
            "admin-1",
            Some("certificate unreadable".to_string()),
            &def,
            at(2024, 1, 13),
        )
        .unwrap();

        let reverted = outcome.instance;
        assert_eq!(reverted.status, CertificationStatus::AdminAssigned);
        assert!(reverted.obtained_on.is_none());
        assert!(reverted.expires_on.is_none());
        assert!(reverted.certificate_number.is_none());
        assert!(reverted.file_ref.is_none());
        assert_eq!(reverted.assignment.unwrap().assignment_id, assignment_id);
        assert_eq!(outcome.history.decision, ApprovalDecision::Rejected);
    }

    #[test]
    fn test_reject_untraced_is_terminal() {
        let def = definition();
        let data = submission_data(date(2024, 1, 11));
        let instance = submit_for_approval(
            None,
            &def,
            "user-1",
            &data,
            &BonusPolicy::default(),
            at(2024, 1, 11),
        )
        .unwrap();
        let pending = pending_for(&instance, data);

        let outcome = decide_approval(
            instance,
            &pending,
            ApprovalAction::Reject,
            "admin-1",
            None,
            &def,
            at(2024, 1, 12),
        )
        .unwrap();
        assert_eq!(outcome.instance.status, CertificationStatus::Rejected);
        assert!(outcome.instance.status.is_terminal());
    }

    #[test]
    fn test_decide_on_non_pending_is_invalid_transition() {
        let def = definition();
        let (instance, pending) = submitted_assignment(&def);
        let approved = decide_approval(
            instance,
            &pending,
            ApprovalAction::Approve,
            "admin-1",
            None,
            &def,
            at(2024, 1, 12),
        )
        .unwrap()
        .instance;

        let err = decide_approval(
            approved,
            &pending,
            ApprovalAction::Approve,
            "admin-1",
            None,
            &def,
            at(2024, 1, 12),
        )
        .unwrap_err();
        assert!(matches!(err, CertificationError::InvalidTransition { .. }));
    }

    fn expiring(
        def: &MasterCertificationDefinition,
        status: CertificationStatus,
        expires_on: NaiveDate,
    ) -> UserCertificationInstance {
        let mut instance = with_status(def, status);
        instance.expires_on = Some(expires_on);
        instance
    }

    #[test]
    fn test_sweep_statuses() {
        let def = definition();
        let today = date(2024, 6, 1);
        let instances = vec![
            expiring(&def, CertificationStatus::Active, date(2024, 6, 20)),
            expiring(&def, CertificationStatus::Active, date(2024, 5, 31)),
            expiring(&def, CertificationStatus::ExpiringSoon, date(2024, 5, 1)),
            expiring(&def, CertificationStatus::ExpiringSoon, date(2024, 6, 10)),
            expiring(&def, CertificationStatus::Active, date(2025, 6, 1)),
            // 到期当天仍未过期
            expiring(&def, CertificationStatus::ExpiringSoon, date(2024, 6, 1)),
            expiring(&def, CertificationStatus::Rejected, date(2024, 1, 1)),
        ];

        let transitions = sweep_statuses(&instances, today, 30);
        let to: Vec<_> = transitions.iter().map(|t| (t.instance_id, t.to)).collect();
        assert_eq!(
            to,
            vec![
                (instances[0].id, CertificationStatus::ExpiringSoon),
                (instances[1].id, CertificationStatus::Expired),
                (instances[2].id, CertificationStatus::Expired),
            ]
        );
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let def = definition();
        let today = date(2024, 6, 1);
        let mut instances = vec![
            expiring(&def, CertificationStatus::Active, date(2024, 6, 20)),
            expiring(&def, CertificationStatus::Active, date(2024, 5, 31)),
            expiring(&def, CertificationStatus::ExpiringSoon, date(2024, 5, 1)),
        ];

        for change in sweep_statuses(&instances, today, 30) {
            if let Some(instance) = instances.iter_mut().find(|i| i.id == change.instance_id) {
                instance.status = change.to;
            }
        }
        let after_first: Vec<_> = instances.iter().map(|i| i.status).collect();

        assert!(sweep_statuses(&instances, today, 30).is_empty());
        let after_second: Vec<_> = instances.iter().map(|i| i.status).collect();
        assert_eq!(after_first, after_second);
    }
}
