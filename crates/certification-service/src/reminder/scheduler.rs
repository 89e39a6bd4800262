//! 每日到期提醒
//!
//! 一轮提醒分两步：
//! 1. 规划：逐条记录计算剩余天数、适用档位和冷却期，得到待发送列表
//! 2. 发送：限定并发地调用发送器，每条结果（成功或失败）都写入台账；
//!    成功投递且剩余天数进入 EXPIRING_SOON 区间的 ACTIVE 记录在同一原子操作中流转
//!
//! 单条记录的错误只记录日志；连续的持久化失败达到上限视为存储故障，中止本轮。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use cert_shared::config::SchedulerConfig;
use cert_shared::observability::metrics;
use chrono::{DateTime, Duration, Utc};
use futures::{StreamExt, stream};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::renewal::RenewalLinks;
use super::schedule::{derive_schedule, find_applicable_tier, should_fire};
use crate::clock::Clock;
use crate::error::{CertificationError, Result};
use crate::models::{
    CertificationStatus, MasterCertificationDefinition, ReminderRecord, StatusTransition,
    UrgencyTier, UserCertificationInstance, UserContact,
};
use crate::notification::{DispatchReceipt, NotificationDispatcher, ReminderPayload};
use crate::repository::Repositories;
use crate::worker::SingleFlight;

/// 提醒调度参数
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub cooldown: Duration,
    pub expiring_soon_days: i64,
    pub dispatch_concurrency: usize,
    pub dispatch_timeout: StdDuration,
    pub max_consecutive_failures: u32,
}

impl From<&SchedulerConfig> for ReminderSettings {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            cooldown: Duration::days(config.cooldown_days),
            expiring_soon_days: config.expiring_soon_days,
            dispatch_concurrency: config.dispatch_concurrency.max(1),
            dispatch_timeout: StdDuration::from_millis(config.dispatch_timeout_ms),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

/// 一轮提醒的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderRunSummary {
    /// 候选记录数
    pub examined: usize,
    pub sent: usize,
    /// 发送失败（已写入台账）
    pub failed: usize,
    /// 缺联系人、关闭邮件、缺目录条目等
    pub skipped: usize,
    /// 不在触发窗口或处于冷却期
    pub not_due: usize,
    /// 持久化错误
    pub errors: usize,
}

struct ReminderJob {
    instance_id: Uuid,
    status: CertificationStatus,
    tier: UrgencyTier,
    days_remaining: i64,
    /// 本轮基准时间，写入台账
    planned_at: DateTime<Utc>,
    payload: ReminderPayload,
}

/// 连续持久化失败计数
struct FailureStreak {
    current: u32,
    limit: u32,
}

impl FailureStreak {
    fn new(limit: u32) -> Self {
        Self { current: 0, limit }
    }

    fn reset(&mut self) {
        self.current = 0;
    }

    /// 记一次失败，达到上限时返回中止错误
    fn fail(&mut self, err: &CertificationError) -> Result<()> {
        self.current += 1;
        if self.current >= self.limit {
            return Err(CertificationError::Persistence(format!(
                "连续 {} 次持久化失败，中止本轮提醒: {}",
                self.current, err
            )));
        }
        Ok(())
    }
}

/// 到期提醒调度器
pub struct ReminderScheduler {
    repos: Repositories,
    dispatcher: Arc<dyn NotificationDispatcher>,
    renewal: RenewalLinks,
    clock: Arc<dyn Clock>,
    settings: ReminderSettings,
    guard: SingleFlight,
}

impl ReminderScheduler {
    pub fn new(
        repos: Repositories,
        dispatcher: Arc<dyn NotificationDispatcher>,
        renewal: RenewalLinks,
        clock: Arc<dyn Clock>,
        settings: ReminderSettings,
    ) -> Self {
        Self {
            repos,
            dispatcher,
            renewal,
            clock,
            settings,
            guard: SingleFlight::new(),
        }
    }

    /// 执行一轮提醒
    ///
    /// 上一轮仍在执行时直接返回 `PassInProgress`
    pub async fn run_pass(&self) -> Result<ReminderRunSummary> {
        let Some(_guard) = self.guard.try_acquire() else {
            warn!("上一轮提醒仍在执行，跳过本次触发");
            return Err(CertificationError::PassInProgress("reminder".to_string()));
        };
        self.process_daily_reminders(self.clock.now()).await
    }

    #[instrument(skip(self))]
    pub async fn process_daily_reminders(&self, now: DateTime<Utc>) -> Result<ReminderRunSummary> {
        let started = Instant::now();
        let today = now.date_naive();

        let instances = self
            .repos
            .instances
            .list_by_statuses(&CertificationStatus::reminder_eligible())
            .await
            .inspect_err(|e| error!(error = %e, "加载待提醒记录失败，本轮中止"))?;

        let mut summary = ReminderRunSummary {
            examined: instances.len(),
            ..Default::default()
        };
        let mut streak = FailureStreak::new(self.settings.max_consecutive_failures);
        let mut contacts: HashMap<String, Option<UserContact>> = HashMap::new();
        let mut definitions: HashMap<Uuid, Option<MasterCertificationDefinition>> = HashMap::new();
        let mut jobs = Vec::new();

        for instance in &instances {
            match self
                .plan(instance, today, now, &mut contacts, &mut definitions)
                .await
            {
                Ok(Planned::Job(job)) => {
                    streak.reset();
                    jobs.push(*job);
                }
                Ok(Planned::Skipped) => {
                    streak.reset();
                    summary.skipped += 1;
                }
                Ok(Planned::NotDue) => {
                    streak.reset();
                    summary.not_due += 1;
                }
                Err(e) => {
                    error!(instance_id = %instance.id, error = %e, "规划提醒失败，跳过该记录");
                    summary.errors += 1;
                    streak.fail(&e)?;
                }
            }
        }

        debug!(jobs = jobs.len(), "提醒规划完成");

        let mut outcomes = stream::iter(jobs)
            .map(|job| self.dispatch(job))
            .buffer_unordered(self.settings.dispatch_concurrency);

        while let Some((job, outcome)) = outcomes.next().await {
            let delivered = outcome.is_ok();
            if delivered {
                summary.sent += 1;
            } else {
                summary.failed += 1;
            }
            metrics::record_reminder(job.tier.as_str(), if delivered { "sent" } else { "failed" });

            match self.record(&job, outcome).await {
                Ok(()) => streak.reset(),
                Err(e) => {
                    error!(instance_id = %job.instance_id, error = %e, "写入提醒台账失败");
                    summary.errors += 1;
                    streak.fail(&e)?;
                }
            }
        }

        metrics::record_reminder_pass(started.elapsed().as_secs_f64());
        info!(
            examined = summary.examined,
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            not_due = summary.not_due,
            errors = summary.errors,
            "本轮到期提醒完成"
        );

        Ok(summary)
    }

    async fn plan(
        &self,
        instance: &UserCertificationInstance,
        today: chrono::NaiveDate,
        now: DateTime<Utc>,
        contacts: &mut HashMap<String, Option<UserContact>>,
        definitions: &mut HashMap<Uuid, Option<MasterCertificationDefinition>>,
    ) -> Result<Planned> {
        let (Some(expires_on), Some(days)) =
            (instance.expires_on, instance.days_until_expiration(today))
        else {
            warn!(instance_id = %instance.id, "有效记录缺少到期日，跳过");
            return Ok(Planned::Skipped);
        };

        let contact = match contacts.get(&instance.user_id) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = self.repos.users.get_contact(&instance.user_id).await?;
                contacts.insert(instance.user_id.clone(), fetched.clone());
                fetched
            }
        };
        let Some(contact) = contact else {
            warn!(user_id = %instance.user_id, "用户没有联系方式，跳过");
            return Ok(Planned::Skipped);
        };
        if !contact.email_enabled {
            debug!(user_id = %instance.user_id, "用户已关闭邮件提醒");
            return Ok(Planned::Skipped);
        }

        let definition = match definitions.get(&instance.definition_id) {
            Some(cached) => cached.clone(),
            None => {
                let fetched = self
                    .repos
                    .catalog
                    .get_definition(instance.definition_id)
                    .await?;
                definitions.insert(instance.definition_id, fetched.clone());
                fetched
            }
        };
        let Some(definition) = definition else {
            warn!(
                instance_id = %instance.id,
                definition_id = %instance.definition_id,
                "认证定义不存在，跳过"
            );
            return Ok(Planned::Skipped);
        };

        let schedule = derive_schedule(definition.validity_months);
        let Some(tier) = find_applicable_tier(days, &schedule) else {
            return Ok(Planned::NotDue);
        };

        let last = self.repos.reminders.last_delivered(instance.id, tier).await?;
        if !should_fire(tier, days, last, now, self.settings.cooldown) {
            return Ok(Planned::NotDue);
        }

        let payload = ReminderPayload {
            instance_id: instance.id,
            user_id: instance.user_id.clone(),
            recipient_email: contact.email,
            recipient_name: contact.display_name,
            certification_name: definition.full_name.clone(),
            vendor: definition.vendor.clone(),
            expires_on,
            days_remaining: days,
            tier,
            renewal_url: self.renewal.lookup(&definition.vendor),
            certificate_number: instance.certificate_number.clone(),
        };

        Ok(Planned::Job(Box::new(ReminderJob {
            instance_id: instance.id,
            status: instance.status,
            tier,
            days_remaining: days,
            planned_at: now,
            payload,
        })))
    }

    async fn dispatch(&self, job: ReminderJob) -> (ReminderJob, Result<DispatchReceipt>) {
        let outcome = match tokio::time::timeout(
            self.settings.dispatch_timeout,
            self.dispatcher.send(&job.payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(CertificationError::DispatchTimeout(
                self.settings.dispatch_timeout.as_millis() as u64,
            )),
        };

        if let Err(e) = &outcome {
            warn!(
                instance_id = %job.instance_id,
                tier = %job.tier,
                error = %e,
                "提醒发送失败"
            );
        }
        (job, outcome)
    }

    /// 写入台账，成功投递时附带 ACTIVE -> EXPIRING_SOON
    async fn record(&self, job: &ReminderJob, outcome: Result<DispatchReceipt>) -> Result<()> {
        let delivered = outcome.is_ok();
        let record = ReminderRecord {
            id: Uuid::now_v7(),
            instance_id: job.instance_id,
            user_id: job.payload.user_id.clone(),
            tier: job.tier,
            channel: self.dispatcher.channel(),
            sent_at: job.planned_at,
            delivered,
            days_remaining: job.days_remaining,
            summary: job.payload.summary(),
            error: outcome.err().map(|e| e.to_string()),
        };

        let transition = (delivered
            && job.status == CertificationStatus::Active
            && job.days_remaining <= self.settings.expiring_soon_days)
            .then_some(StatusTransition {
                instance_id: job.instance_id,
                from: CertificationStatus::Active,
                to: CertificationStatus::ExpiringSoon,
            });

        self.repos.reminders.record_outcome(&record, transition).await?;

        if transition.is_some() {
            metrics::record_status_transition(CertificationStatus::ExpiringSoon.as_str(), 1);
            info!(instance_id = %job.instance_id, "认证进入即将到期状态");
        }
        Ok(())
    }
}

enum Planned {
    Job(Box<ReminderJob>),
    Skipped,
    NotDue,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::clock::FixedClock;
    use crate::models::CertificationLevel;
    use crate::notification::MockNotificationDispatcher;
    use crate::repository::{
        MockApprovalRepositoryTrait, MockBountyRepositoryTrait, MockCatalogRepositoryTrait,
        MockInstanceRepositoryTrait, MockReminderRepositoryTrait, MockUserDirectoryTrait,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn definition(id: Uuid) -> MasterCertificationDefinition {
        let now = Utc::now();
        MasterCertificationDefinition {
            id,
            full_name: "Certified Kubernetes Administrator".to_string(),
            short_name: "CKA".to_string(),
            version: None,
            vendor: "CNCF".to_string(),
            level: CertificationLevel::Associate,
            points: 15,
            validity_months: 24,
            description: None,
            is_active: true,
            introduced_on: None,
            retired_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_instance(user_id: &str, definition_id: Uuid, expires_on: NaiveDate) -> UserCertificationInstance {
        let now = Utc::now();
        UserCertificationInstance {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            definition_id,
            status: CertificationStatus::Active,
            obtained_on: Some(date(2023, 1, 1)),
            expires_on: Some(expires_on),
            certificate_number: None,
            verification_url: None,
            file_ref: None,
            notes: None,
            bonus_eligible: false,
            bonus_claimed: false,
            bonus_amount: None,
            assignment: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn contact(user_id: &str) -> UserContact {
        UserContact {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            display_name: user_id.to_string(),
            email_enabled: true,
        }
    }

    #[tokio::test]
    async fn test_persistence_outage_aborts_pass() {
        let definition_id = Uuid::new_v4();
        let expires = date(2025, 1, 21);
        let batch: Vec<_> = (0..5)
            .map(|i| active_instance(&format!("user-{i}"), definition_id, expires))
            .collect();

        let mut instances = MockInstanceRepositoryTrait::new();
        instances
            .expect_list_by_statuses()
            .returning(move |_| Ok(batch.clone()));

        let mut users = MockUserDirectoryTrait::new();
        users
            .expect_get_contact()
            .returning(|user_id| Ok(Some(contact(user_id))));

        let mut catalog = MockCatalogRepositoryTrait::new();
        catalog
            .expect_get_definition()
            .returning(|id| Ok(Some(definition(id))));

        let mut reminders = MockReminderRepositoryTrait::new();
        reminders.expect_last_delivered().returning(|_, _| {
            Err(CertificationError::Persistence("connection reset".to_string()))
        });
        reminders.expect_record_outcome().never();

        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_send().never();

        let repos = Repositories {
            catalog: Arc::new(catalog),
            instances: Arc::new(instances),
            approvals: Arc::new(MockApprovalRepositoryTrait::new()),
            reminders: Arc::new(reminders),
            users: Arc::new(users),
            bounties: Arc::new(MockBountyRepositoryTrait::new()),
        };

        let clock = Arc::new(FixedClock::at_date(date(2025, 1, 1)));
        let settings = ReminderSettings {
            max_consecutive_failures: 3,
            ..Default::default()
        };
        let scheduler = ReminderScheduler::new(
            repos,
            Arc::new(dispatcher),
            RenewalLinks::default(),
            clock,
            settings,
        );

        let err = scheduler.run_pass().await.unwrap_err();
        assert!(err.is_persistence_failure());
    }

    #[tokio::test]
    async fn test_load_failure_aborts_before_dispatch() {
        let mut instances = MockInstanceRepositoryTrait::new();
        instances
            .expect_list_by_statuses()
            .returning(|_| Err(CertificationError::Persistence("pool closed".to_string())));

        let mut dispatcher = MockNotificationDispatcher::new();
        dispatcher.expect_send().never();

        let repos = Repositories {
            catalog: Arc::new(MockCatalogRepositoryTrait::new()),
            instances: Arc::new(instances),
            approvals: Arc::new(MockApprovalRepositoryTrait::new()),
            reminders: Arc::new(MockReminderRepositoryTrait::new()),
            users: Arc::new(MockUserDirectoryTrait::new()),
            bounties: Arc::new(MockBountyRepositoryTrait::new()),
        };
        let scheduler = ReminderScheduler::new(
            repos,
            Arc::new(dispatcher),
            RenewalLinks::default(),
            Arc::new(FixedClock::at_date(date(2025, 1, 1))),
            ReminderSettings::default(),
        );

        assert!(scheduler.run_pass().await.is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = ReminderSettings::from(&SchedulerConfig {
            dispatch_concurrency: 0,
            ..Default::default()
        });
        assert_eq!(settings.dispatch_concurrency, 1);
        assert_eq!(settings.cooldown, Duration::days(7));
        assert_eq!(settings.expiring_soon_days, 30);
    }
}
