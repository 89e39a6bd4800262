//! 认证服务
//!
//! 在生命周期引擎之上编排仓储读写：
//! - 目录维护（新建、修改、停用、查询）
//! - 管理员指派与用户提交
//! - 记录停用与删除
//! - 能力等级查询
//! - 悬赏活动与奖金领取

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::bonus::BonusPolicy;
use super::competency::{CompetencySummary, compute_competency_summary};
use super::engine::{
    create_from_assignment, find_assigned, submit_for_approval, validate_assignment,
};
use super::transitions::transition;
use crate::clock::Clock;
use crate::error::{CertificationError, Result};
use crate::models::{
    AssignmentRequest, BountyCampaign, CertificationStatus, DefinitionPatch,
    MasterCertificationDefinition, NewCampaign, NewDefinition, PendingSubmission,
    SubmissionData, SubmissionTrace, UserCertificationInstance,
};
use crate::repository::Repositories;

/// 提交结果
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub instance: UserCertificationInstance,
    pub submission: PendingSubmission,
}

/// 认证服务
pub struct CertificationService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    policy: BonusPolicy,
}

impl CertificationService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, policy: BonusPolicy) -> Self {
        Self {
            repos,
            clock,
            policy,
        }
    }

    // ==================== 目录维护 ====================

    #[instrument(skip(self, input), fields(short_name = %input.short_name))]
    pub async fn create_definition(
        &self,
        input: NewDefinition,
    ) -> Result<MasterCertificationDefinition> {
        input.validate().map_err(CertificationError::Validation)?;

        let definition = input.into_definition(self.clock.now());
        self.repos.catalog.create_definition(&definition).await?;

        info!(definition_id = %definition.id, vendor = %definition.vendor, "认证定义已创建");
        Ok(definition)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_definition(
        &self,
        id: Uuid,
        patch: DefinitionPatch,
    ) -> Result<MasterCertificationDefinition> {
        let mut definition = self.get_definition(id).await?;
        patch
            .apply(&mut definition, self.clock.now())
            .map_err(CertificationError::Validation)?;
        self.repos.catalog.update_definition(&definition).await?;

        info!(definition_id = %id, "认证定义已更新");
        Ok(definition)
    }

    /// 停用认证定义
    ///
    /// 只停用不删除，已存在的用户记录不受影响
    #[instrument(skip(self))]
    pub async fn deactivate_definition(&self, id: Uuid) -> Result<MasterCertificationDefinition> {
        let mut definition = self.get_definition(id).await?;
        if !definition.is_active {
            return Ok(definition);
        }

        let now = self.clock.now();
        definition.is_active = false;
        definition.retired_on = Some(now.date_naive());
        definition.updated_at = now;
        self.repos.catalog.update_definition(&definition).await?;

        info!(definition_id = %id, "认证定义已停用");
        Ok(definition)
    }

    pub async fn get_definition(&self, id: Uuid) -> Result<MasterCertificationDefinition> {
        self.repos
            .catalog
            .get_definition(id)
            .await?
            .ok_or(CertificationError::DefinitionNotFound(id))
    }

    pub async fn list_definitions(
        &self,
        active_only: bool,
    ) -> Result<Vec<MasterCertificationDefinition>> {
        self.repos.catalog.list_definitions(active_only).await
    }

    // ==================== 指派与提交 ====================

    /// 管理员指派认证
    #[instrument(skip(self, request), fields(user_id = %request.user_id, definition_id = %request.definition_id))]
    pub async fn assign(
        &self,
        admin_id: &str,
        request: AssignmentRequest,
    ) -> Result<UserCertificationInstance> {
        let definition = self
            .repos
            .catalog
            .get_definition(request.definition_id)
            .await?;
        let existing = self.repos.instances.list_by_user(&request.user_id).await?;
        let definition = validate_assignment(
            request.definition_id,
            &request.user_id,
            definition.as_ref(),
            &existing,
        )?;

        let instance =
            create_from_assignment(&definition, &request, admin_id, &self.policy, self.clock.now());
        self.repos.instances.upsert_instance(&instance).await?;

        info!(
            instance_id = %instance.id,
            admin_id,
            bonus_eligible = instance.bonus_eligible,
            "认证已指派"
        );
        Ok(instance)
    }

    /// 用户提交认证
    ///
    /// 已有指派时原地更新该指派记录，记录写入与审批入队在同一原子操作中完成
    #[instrument(skip(self, data))]
    pub async fn submit(
        &self,
        user_id: &str,
        definition_id: Uuid,
        data: SubmissionData,
    ) -> Result<SubmissionOutcome> {
        let definition = self.repos.catalog.get_definition(definition_id).await?;
        let existing = self.repos.instances.list_by_user(user_id).await?;
        let definition =
            validate_assignment(definition_id, user_id, definition.as_ref(), &existing)?;

        let assigned = find_assigned(&existing, user_id, definition_id).cloned();
        let trace = assigned.as_ref().and_then(|i| {
            i.assignment.as_ref().map(|a| SubmissionTrace {
                original_instance_id: i.id,
                assignment_id: a.assignment_id,
            })
        });

        let now = self.clock.now();
        let instance =
            submit_for_approval(assigned, &definition, user_id, &data, &self.policy, now)?;
        let submission = PendingSubmission {
            id: Uuid::now_v7(),
            instance_id: instance.id,
            user_id: user_id.to_string(),
            definition_id,
            submission: data,
            trace,
            submitted_at: now,
        };

        self.repos
            .approvals
            .enqueue_submission(&instance, &submission)
            .await?;

        info!(
            instance_id = %instance.id,
            submission_id = %submission.id,
            traced = submission.trace.is_some(),
            "认证已提交审批"
        );
        Ok(SubmissionOutcome {
            instance,
            submission,
        })
    }

    // ==================== 记录管理 ====================

    pub async fn get_instance(&self, id: Uuid) -> Result<UserCertificationInstance> {
        self.repos
            .instances
            .get_instance(id)
            .await?
            .ok_or(CertificationError::InstanceNotFound(id))
    }

    pub async fn list_user_instances(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserCertificationInstance>> {
        self.repos.instances.list_by_user(user_id).await
    }

    /// 管理员停用记录
    #[instrument(skip(self))]
    pub async fn deactivate_instance(&self, id: Uuid) -> Result<UserCertificationInstance> {
        let mut instance = self.get_instance(id).await?;
        let change = transition(&mut instance, CertificationStatus::Inactive)?;
        instance.updated_at = self.clock.now();
        self.repos.instances.upsert_instance(&instance).await?;

        cert_shared::observability::metrics::record_status_transition(change.to.as_str(), 1);
        info!(instance_id = %id, from = %change.from, "认证记录已停用");
        Ok(instance)
    }

    /// 管理员删除记录（物理删除）
    #[instrument(skip(self))]
    pub async fn delete_instance(&self, id: Uuid) -> Result<()> {
        if !self.repos.instances.delete_instance(id).await? {
            return Err(CertificationError::InstanceNotFound(id));
        }
        warn!(instance_id = %id, "认证记录已被管理员删除");
        Ok(())
    }

    // ==================== 能力等级 ====================

    pub async fn competency_for_user(&self, user_id: &str) -> Result<CompetencySummary> {
        let instances = self.repos.instances.list_by_user(user_id).await?;

        let mut ids: Vec<Uuid> = instances
            .iter()
            .filter(|i| i.status == CertificationStatus::Active)
            .map(|i| i.definition_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let catalog: HashMap<Uuid, MasterCertificationDefinition> = self
            .repos
            .catalog
            .get_definitions_by_ids(&ids)
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        Ok(compute_competency_summary(&instances, &catalog))
    }

    // ==================== 悬赏与奖金 ====================

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn launch_campaign(&self, input: NewCampaign) -> Result<BountyCampaign> {
        if input.name.trim().is_empty() {
            return Err(CertificationError::Validation("活动名称不能为空".to_string()));
        }
        if input.bonus_amount <= 0 {
            return Err(CertificationError::Validation(format!(
                "bonus_amount 必须大于 0: {}",
                input.bonus_amount
            )));
        }
        if input.ends_on < input.starts_on {
            return Err(CertificationError::Validation(format!(
                "活动结束日期早于开始日期: {} < {}",
                input.ends_on, input.starts_on
            )));
        }

        let campaign = BountyCampaign {
            id: Uuid::now_v7(),
            name: input.name,
            definition_ids: input.definition_ids,
            bonus_amount: input.bonus_amount,
            starts_on: input.starts_on,
            ends_on: input.ends_on,
            is_active: true,
            created_at: self.clock.now(),
        };
        self.repos.bounties.create_campaign(&campaign).await?;

        info!(campaign_id = %campaign.id, bonus_amount = campaign.bonus_amount, "悬赏活动已创建");
        Ok(campaign)
    }

    /// 领取奖金
    ///
    /// 只有有效状态、已计入奖金且未领取的记录可以领取
    #[instrument(skip(self))]
    pub async fn claim_bonus(&self, instance_id: Uuid) -> Result<UserCertificationInstance> {
        let instance = self.get_instance(instance_id).await?;

        let unavailable = |reason: &str| CertificationError::BonusUnavailable {
            instance_id,
            reason: reason.to_string(),
        };
        if !matches!(
            instance.status,
            CertificationStatus::Active | CertificationStatus::ExpiringSoon
        ) {
            return Err(unavailable("记录不在有效状态"));
        }
        if !instance.bonus_eligible || instance.bonus_amount.is_none_or(|a| a <= 0) {
            return Err(unavailable("没有可领取的奖金"));
        }
        if instance.bonus_claimed {
            return Err(unavailable("奖金已领取"));
        }

        if !self.repos.instances.mark_bonus_claimed(instance_id).await? {
            return Err(unavailable("奖金已领取"));
        }

        info!(
            instance_id = %instance_id,
            user_id = %instance.user_id,
            amount = instance.bonus_amount,
            "奖金已领取"
        );
        self.get_instance(instance_id).await
    }
}
