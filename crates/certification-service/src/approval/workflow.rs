//! 审批工作流
//!
//! 每次决定都从待审批队列移除一条并追加一条审批历史，与记录更新一起原子提交。

use std::sync::Arc;

use cert_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{CertificationError, Result};
use crate::lifecycle::{ApprovalOutcome, decide_approval, select_bounty};
use crate::models::{
    ApprovalAction, ApprovalDecision, ApprovalHistoryEntry, CertificationStatus, PendingSubmission,
};
use crate::repository::Repositories;

pub struct ApprovalWorkflow {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl ApprovalWorkflow {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    /// 审批一条提交
    ///
    /// 通过且有奖金资格时按生效中的悬赏活动写入奖金金额
    #[instrument(skip(self, comments))]
    pub async fn decide(
        &self,
        submission_id: Uuid,
        action: ApprovalAction,
        admin_id: &str,
        comments: Option<String>,
    ) -> Result<ApprovalOutcome> {
        let submission = self
            .repos
            .approvals
            .get_pending(submission_id)
            .await?
            .ok_or(CertificationError::SubmissionNotFound(submission_id))?;

        let instance_id = submission.target_instance_id();
        let instance = self
            .repos
            .instances
            .get_instance(instance_id)
            .await?
            .ok_or(CertificationError::InstanceNotFound(instance_id))?;
        let definition = self
            .repos
            .catalog
            .get_definition(instance.definition_id)
            .await?
            .ok_or(CertificationError::DefinitionNotFound(instance.definition_id))?;

        let mut outcome = decide_approval(
            instance,
            &submission,
            action,
            admin_id,
            comments,
            &definition,
            self.clock.now(),
        )?;

        if outcome.instance.status == CertificationStatus::Active
            && outcome.instance.bonus_eligible
            && let Some(obtained_on) = outcome.instance.obtained_on
        {
            let campaigns = self.repos.bounties.list_active_campaigns().await?;
            if let Some(amount) = select_bounty(&campaigns, definition.id, obtained_on) {
                outcome.instance.bonus_amount = Some(amount);
            }
        }

        self.repos
            .approvals
            .commit_decision(submission_id, &outcome.instance, &outcome.history)
            .await?;

        let decision = ApprovalDecision::from(action);
        metrics::record_approval_decision(decision.as_str());
        info!(
            submission_id = %submission_id,
            instance_id = %outcome.instance.id,
            admin_id,
            decision = decision.as_str(),
            status = %outcome.instance.status,
            bonus_amount = outcome.instance.bonus_amount,
            "审批已完成"
        );

        Ok(outcome)
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        let mut pending = self.repos.approvals.list_pending().await?;
        pending.sort_by_key(|p| p.submitted_at);
        Ok(pending)
    }

    /// 审批历史，可按记录过滤
    pub async fn history(&self, instance_id: Option<Uuid>) -> Result<Vec<ApprovalHistoryEntry>> {
        let mut entries = self.repos.approvals.list_history(instance_id).await?;
        entries.sort_by_key(|h| h.decided_at);
        Ok(entries)
    }
}
