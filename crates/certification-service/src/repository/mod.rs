//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 跨多张表的写入（审批提交、台账 + 状态流转）在仓储内部用事务保证原子性
//! - 定义 trait 接口以支持 mock 测试，并提供内存实现用于集成测试

mod approval_repo;
mod bounty_repo;
mod catalog_repo;
mod instance_repo;
mod memory_store;
mod reminder_repo;
mod traits;
mod user_directory_repo;

use std::sync::Arc;

use sqlx::PgPool;

pub use approval_repo::ApprovalRepository;
pub use bounty_repo::BountyRepository;
pub use catalog_repo::CatalogRepository;
pub use instance_repo::InstanceRepository;
pub use memory_store::InMemoryStore;
pub use reminder_repo::ReminderRepository;
pub use traits::*;
pub use user_directory_repo::UserDirectoryRepository;

/// 服务层依赖的全部仓储
#[derive(Clone)]
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepositoryTrait>,
    pub instances: Arc<dyn InstanceRepositoryTrait>,
    pub approvals: Arc<dyn ApprovalRepositoryTrait>,
    pub reminders: Arc<dyn ReminderRepositoryTrait>,
    pub users: Arc<dyn UserDirectoryTrait>,
    pub bounties: Arc<dyn BountyRepositoryTrait>,
}

impl Repositories {
    /// PostgreSQL 实现
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            catalog: Arc::new(CatalogRepository::new(pool.clone())),
            instances: Arc::new(InstanceRepository::new(pool.clone())),
            approvals: Arc::new(ApprovalRepository::new(pool.clone())),
            reminders: Arc::new(ReminderRepository::new(pool.clone())),
            users: Arc::new(UserDirectoryRepository::new(pool.clone())),
            bounties: Arc::new(BountyRepository::new(pool)),
        }
    }

    /// 所有仓储共用一个内存存储
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            instances: store.clone(),
            approvals: store.clone(),
            reminders: store.clone(),
            users: store.clone(),
            bounties: store,
        }
    }
}
