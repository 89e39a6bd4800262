//! 内存存储
//!
//! 实现全部仓储接口，所有数据放在同一把读写锁下，
//! 多记录写入（审批提交、台账 + 状态流转）在一次加锁内完成，语义与数据库事务一致。
//! 用于集成测试与本地运行。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::traits::{
    ApprovalRepositoryTrait, BountyRepositoryTrait, CatalogRepositoryTrait,
    InstanceRepositoryTrait, ReminderRepositoryTrait, UserDirectoryTrait,
};
use crate::error::{CertificationError, Result};
use crate::models::{
    ApprovalHistoryEntry, BountyCampaign, CertificationStatus, MasterCertificationDefinition,
    PendingSubmission, ReminderRecord, StatusTransition, UrgencyTier, UserCertificationInstance,
    UserContact,
};

#[derive(Default)]
struct State {
    definitions: HashMap<Uuid, MasterCertificationDefinition>,
    instances: HashMap<Uuid, UserCertificationInstance>,
    pending: Vec<PendingSubmission>,
    history: Vec<ApprovalHistoryEntry>,
    reminders: Vec<ReminderRecord>,
    contacts: HashMap<String, UserContact>,
    campaigns: Vec<BountyCampaign>,
}

impl State {
    /// 与数据库上的部分唯一索引保持一致
    fn check_live_claim(&self, instance: &UserCertificationInstance) -> Result<()> {
        if !instance.status.is_live_claim() {
            return Ok(());
        }
        let conflict = self.instances.values().any(|other| {
            other.id != instance.id
                && other.user_id == instance.user_id
                && other.definition_id == instance.definition_id
                && other.status.is_live_claim()
        });
        if conflict {
            return Err(CertificationError::DuplicateClaim {
                user_id: instance.user_id.clone(),
                definition_id: instance.definition_id,
            });
        }
        Ok(())
    }

    fn apply_transition(&mut self, change: &StatusTransition, now: DateTime<Utc>) -> bool {
        match self.instances.get_mut(&change.instance_id) {
            Some(instance) if instance.status == change.from => {
                instance.status = change.to;
                instance.updated_at = now;
                true
            }
            _ => false,
        }
    }
}

/// 内存存储
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入用户联系方式
    pub fn put_contact(&self, contact: UserContact) {
        self.state
            .write()
            .contacts
            .insert(contact.user_id.clone(), contact);
    }

    pub fn put_definition(&self, definition: MasterCertificationDefinition) {
        self.state
            .write()
            .definitions
            .insert(definition.id, definition);
    }

    /// 直接写入记录，不做占用检查
    pub fn put_instance(&self, instance: UserCertificationInstance) {
        self.state.write().instances.insert(instance.id, instance);
    }

    pub fn instance_count(&self) -> usize {
        self.state.read().instances.len()
    }

    pub fn reminder_count(&self) -> usize {
        self.state.read().reminders.len()
    }
}

#[async_trait]
impl CatalogRepositoryTrait for InMemoryStore {
    async fn get_definition(&self, id: Uuid) -> Result<Option<MasterCertificationDefinition>> {
        Ok(self.state.read().definitions.get(&id).cloned())
    }

    async fn get_definitions_by_ids(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<MasterCertificationDefinition>> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| state.definitions.get(id).cloned())
            .collect())
    }

    async fn list_definitions(
        &self,
        active_only: bool,
    ) -> Result<Vec<MasterCertificationDefinition>> {
        let mut definitions: Vec<_> = self
            .state
            .read()
            .definitions
            .values()
            .filter(|d| !active_only || d.is_active)
            .cloned()
            .collect();
        definitions.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(definitions)
    }

    async fn create_definition(&self, definition: &MasterCertificationDefinition) -> Result<()> {
        let mut state = self.state.write();
        if state.definitions.contains_key(&definition.id) {
            return Err(CertificationError::Persistence(format!(
                "认证定义已存在: {}",
                definition.id
            )));
        }
        state.definitions.insert(definition.id, definition.clone());
        Ok(())
    }

    async fn update_definition(&self, definition: &MasterCertificationDefinition) -> Result<()> {
        let mut state = self.state.write();
        match state.definitions.get_mut(&definition.id) {
            Some(existing) => {
                *existing = definition.clone();
                Ok(())
            }
            None => Err(CertificationError::DefinitionNotFound(definition.id)),
        }
    }
}

#[async_trait]
impl InstanceRepositoryTrait for InMemoryStore {
    async fn get_instance(&self, id: Uuid) -> Result<Option<UserCertificationInstance>> {
        Ok(self.state.read().instances.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<UserCertificationInstance>> {
        let mut instances: Vec<_> = self
            .state
            .read()
            .instances
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        instances.sort_by_key(|i| i.created_at);
        Ok(instances)
    }

    async fn list_by_statuses(
        &self,
        statuses: &[CertificationStatus],
    ) -> Result<Vec<UserCertificationInstance>> {
        let mut instances: Vec<_> = self
            .state
            .read()
            .instances
            .values()
            .filter(|i| statuses.contains(&i.status))
            .cloned()
            .collect();
        instances.sort_by_key(|i| (i.expires_on, i.id));
        Ok(instances)
    }

    async fn upsert_instance(&self, instance: &UserCertificationInstance) -> Result<()> {
        let mut state = self.state.write();
        state.check_live_claim(instance)?;
        state.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn delete_instance(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().instances.remove(&id).is_some())
    }

    async fn apply_transitions(
        &self,
        transitions: &[StatusTransition],
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut state = self.state.write();
        let applied = transitions
            .iter()
            .filter(|change| state.apply_transition(change, at))
            .count();
        Ok(applied as u64)
    }

    async fn mark_bonus_claimed(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write();
        match state.instances.get_mut(&id) {
            Some(instance) if !instance.bonus_claimed => {
                instance.bonus_claimed = true;
                instance.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ApprovalRepositoryTrait for InMemoryStore {
    async fn enqueue_submission(
        &self,
        instance: &UserCertificationInstance,
        submission: &PendingSubmission,
    ) -> Result<()> {
        let mut state = self.state.write();
        state.check_live_claim(instance)?;
        state.instances.insert(instance.id, instance.clone());
        state.pending.push(submission.clone());
        Ok(())
    }

    async fn get_pending(&self, id: Uuid) -> Result<Option<PendingSubmission>> {
        Ok(self
            .state
            .read()
            .pending
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_pending(&self) -> Result<Vec<PendingSubmission>> {
        Ok(self.state.read().pending.clone())
    }

    async fn commit_decision(
        &self,
        submission_id: Uuid,
        instance: &UserCertificationInstance,
        history: &ApprovalHistoryEntry,
    ) -> Result<()> {
        let mut state = self.state.write();
        let position = state
            .pending
            .iter()
            .position(|p| p.id == submission_id)
            .ok_or(CertificationError::SubmissionNotFound(submission_id))?;
        state.check_live_claim(instance)?;

        state.pending.remove(position);
        state.instances.insert(instance.id, instance.clone());
        state.history.push(history.clone());
        Ok(())
    }

    async fn list_history(&self, instance_id: Option<Uuid>) -> Result<Vec<ApprovalHistoryEntry>> {
        Ok(self
            .state
            .read()
            .history
            .iter()
            .filter(|h| instance_id.is_none_or(|id| h.instance_id == id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ReminderRepositoryTrait for InMemoryStore {
    async fn last_delivered(
        &self,
        instance_id: Uuid,
        tier: UrgencyTier,
    ) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .state
            .read()
            .reminders
            .iter()
            .filter(|r| r.instance_id == instance_id && r.tier == tier && r.delivered)
            .map(|r| r.sent_at)
            .max())
    }

    async fn record_outcome(
        &self,
        record: &ReminderRecord,
        transition: Option<StatusTransition>,
    ) -> Result<()> {
        let mut state = self.state.write();
        state.reminders.push(record.clone());
        if let Some(change) = transition {
            state.apply_transition(&change, record.sent_at);
        }
        Ok(())
    }

    async fn list_for_instance(&self, instance_id: Uuid) -> Result<Vec<ReminderRecord>> {
        Ok(self
            .state
            .read()
            .reminders
            .iter()
            .filter(|r| r.instance_id == instance_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserDirectoryTrait for InMemoryStore {
    async fn get_contact(&self, user_id: &str) -> Result<Option<UserContact>> {
        Ok(self.state.read().contacts.get(user_id).cloned())
    }
}

#[async_trait]
impl BountyRepositoryTrait for InMemoryStore {
    async fn list_active_campaigns(&self) -> Result<Vec<BountyCampaign>> {
        Ok(self
            .state
            .read()
            .campaigns
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn create_campaign(&self, campaign: &BountyCampaign) -> Result<()> {
        self.state.write().campaigns.push(campaign.clone());
        Ok(())
    }
}
